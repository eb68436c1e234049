use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

/// How a resolved plan is executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Cached, pre-bound per-pair mapper.
    #[default]
    Compiled,
    /// Walk the plan field by field, looking up converters on every call.
    Interpreted,
}

/// Callback run on the finished target before it is returned.
pub type PostConfigure = Arc<dyn Fn(&mut dyn Any) + Send + Sync>;

/// Per-call mapping options.
#[derive(Clone)]
pub struct MapOptions {
    /// Omit writes for every null source value.
    pub skip_nulls: bool,
    /// Silently drop source fields with no target counterpart. When `false`
    /// the first such field fails the map with `UnmatchedField`.
    pub ignore_missing_target: bool,
    pub strategy: Strategy,
    /// Emit a `debug` event with the elapsed time of every map call.
    pub timing_diagnostics: bool,
    pub post_configure: Option<PostConfigure>,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            skip_nulls: false,
            ignore_missing_target: true,
            strategy: Strategy::Compiled,
            timing_diagnostics: false,
            post_configure: None,
        }
    }
}

impl fmt::Debug for MapOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapOptions")
            .field("skip_nulls", &self.skip_nulls)
            .field("ignore_missing_target", &self.ignore_missing_target)
            .field("strategy", &self.strategy)
            .field("timing_diagnostics", &self.timing_diagnostics)
            .field("post_configure", &self.post_configure.is_some())
            .finish()
    }
}

impl MapOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_skip_nulls(mut self, skip_nulls: bool) -> Self {
        self.skip_nulls = skip_nulls;
        self
    }

    pub fn with_ignore_missing_target(mut self, ignore: bool) -> Self {
        self.ignore_missing_target = ignore;
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_timing_diagnostics(mut self, enabled: bool) -> Self {
        self.timing_diagnostics = enabled;
        self
    }

    /// Run `f` on every target of type `T` produced with these options.
    ///
    /// Targets of any other type are left alone (with a warning).
    pub fn with_post_configure<T, F>(mut self, f: F) -> Self
    where
        T: Any,
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        self.post_configure = Some(Arc::new(move |target: &mut dyn Any| {
            match target.downcast_mut::<T>() {
                Some(target) => f(target),
                None => tracing::warn!(
                    expected = std::any::type_name::<T>(),
                    "post-configure skipped: target has another type"
                ),
            }
        }));
        self
    }
}
