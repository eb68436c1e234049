use std::io::Read;
use std::sync::Arc;

use clap::Parser;
use remap_api::error::MapError;
use remap_api::record::Record;
use remap_api::value::Value;
use remap_engine::{EngineConfig, EngineError, Mapper};

#[derive(Parser)]
#[command(name = "remap", about = "Map JSON rows between configured shapes")]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(long, default_value = "remap.toml", env = "REMAP_CONFIG")]
    config: String,

    /// Name of the source shape.
    #[arg(long)]
    from: String,

    /// Name of the target shape.
    #[arg(long)]
    to: String,

    /// JSON file holding an array of source rows (or one object), `-` for stdin.
    #[arg(long, default_value = "-")]
    input: String,

    /// Pretty-print the output.
    #[arg(long)]
    pretty: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        tracing::error!(error = %e, "remap failed");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), EngineError> {
    tracing::info!(config = %cli.config, "loading configuration");
    let config = EngineConfig::load(&cli.config)?;
    let shapes = config.shapes()?;
    let source = shapes.require(&cli.from)?;
    let target = shapes.require(&cli.to)?;

    let mapper = Mapper::from_config(&config);
    register_builtin_converters(&mapper);

    let rows = read_rows(&cli.input)?;
    let records = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            Record::from_json(Arc::clone(source), row)
                .map_err(|e| EngineError::Input(format!("row {i}: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mapped = mapper.map_records(&records, target, mapper.defaults())?;
    tracing::info!(
        rows = mapped.len(),
        from = %cli.from,
        to = %cli.to,
        "mapped rows"
    );

    let out = serde_json::Value::Array(mapped.iter().map(Record::to_json).collect());
    let text = if cli.pretty {
        serde_json::to_string_pretty(&out)
    } else {
        serde_json::to_string(&out)
    }
    .map_err(std::io::Error::from)?;
    println!("{text}");
    Ok(())
}

/// Read the input document. A single object is treated as one row.
fn read_rows(input: &str) -> Result<Vec<serde_json::Value>, EngineError> {
    let text = if input == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        text
    } else {
        std::fs::read_to_string(input).map_err(|e| EngineError::Input(format!("{input}: {e}")))?
    };

    match serde_json::from_str(&text) {
        Ok(serde_json::Value::Array(rows)) => Ok(rows),
        Ok(row @ serde_json::Value::Object(_)) => Ok(vec![row]),
        Ok(_) => Err(EngineError::Input(format!(
            "{input}: expected an array of objects"
        ))),
        Err(e) => Err(EngineError::Input(format!("{input}: {e}"))),
    }
}

/// String converters available to `converter = "..."` in the config.
fn register_builtin_converters(mapper: &Mapper) {
    mapper.register_field_converter("trim", |v: Value| map_string(v, |s| s.trim().to_string()));
    mapper.register_field_converter("upper", |v: Value| map_string(v, |s| s.to_uppercase()));
    mapper.register_field_converter("lower", |v: Value| map_string(v, |s| s.to_lowercase()));
}

fn map_string(value: Value, f: impl Fn(&str) -> String) -> Result<Value, MapError> {
    Ok(match value {
        Value::String(s) => Value::String(f(&s)),
        other => other,
    })
}
