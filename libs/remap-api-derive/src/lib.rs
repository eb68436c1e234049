use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Expr, ExprPath, Fields, Lit, LitStr, UnOp};

/// Derive macro for mappable shapes.
///
/// Generates `Mappable` (field accessors by index) and `MapTarget` (static
/// shape descriptor + constructor) for a struct with named fields.
///
/// Field attributes:
///
/// - `#[map(rename = "other")]`: write into target field `other`, even when
///   the target also has a field of this name.
/// - `#[map(skip_if_null)]`: do not write when this source value is null.
/// - `#[map(default = <literal>)]`: value written into this target field when
///   the source value is null.
/// - `#[map(converter = "name")]`: post-process with the named field converter.
/// - `#[map(ignore)]`: leave the field out of the shape.
///
/// Container attributes:
///
/// - `#[map(name = "Shape")]`: shape name used in diagnostics (defaults to
///   the type name).
/// - `#[map(construct = path::to::fn)]`: `fn() -> Result<Self, MapError>`
///   used instead of `Default::default()`. A string literal holding the path
///   is accepted too.
///
/// # Example
///
/// ```ignore
/// #[derive(Mappable, Default)]
/// pub struct CustomerDto {
///     pub id: i64,
///     #[map(rename = "display_name")]
///     pub name: String,
///     #[map(skip_if_null)]
///     pub email: Option<String>,
/// }
/// ```
#[proc_macro_derive(Mappable, attributes(map))]
pub fn derive_mappable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match derive_impl(&input) {
        Ok(tokens) => tokens,
        Err(e) => e.to_compile_error().into(),
    }
}

fn derive_impl(input: &DeriveInput) -> Result<TokenStream, syn::Error> {
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Mappable does not support generic types",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Mappable only supports structs with named fields",
                ))
            }
        },
        _ => return Err(syn::Error::new_spanned(name, "Mappable only supports structs")),
    };

    // Container #[map(...)] attributes.
    let mut shape_name = name.to_string();
    let mut construct: Option<ExprPath> = None;
    for attr in &input.attrs {
        if !attr.path().is_ident("map") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let value: LitStr = meta.value()?.parse()?;
                shape_name = value.value();
            } else if meta.path.is_ident("construct") {
                let value = meta.value()?;
                construct = Some(if value.peek(LitStr) {
                    value.parse::<LitStr>()?.parse()?
                } else {
                    value.parse()?
                });
            } else {
                return Err(meta.error("unknown container attribute (expected `name` or `construct`)"));
            }
            Ok(())
        })?;
    }

    let mut shape_fields = Vec::new();
    let mut read_arms = Vec::new();
    let mut write_arms = Vec::new();

    for field in fields {
        let field_name = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new_spanned(field, "expected named field"))?;
        let field_name_str = field_name.to_string();
        let field_ty = &field.ty;

        // Parse #[map(...)] attribute.
        let mut rename: Option<String> = None;
        let mut converter: Option<String> = None;
        let mut default: Option<Expr> = None;
        let mut skip_if_null = false;
        let mut ignore = false;

        for attr in &field.attrs {
            if !attr.path().is_ident("map") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    let value: LitStr = meta.value()?.parse()?;
                    rename = Some(value.value());
                } else if meta.path.is_ident("converter") {
                    let value: LitStr = meta.value()?.parse()?;
                    converter = Some(value.value());
                } else if meta.path.is_ident("default") {
                    default = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("skip_if_null") {
                    skip_if_null = true;
                } else if meta.path.is_ident("ignore") {
                    ignore = true;
                } else {
                    return Err(meta.error(
                        "unknown field attribute (expected `rename`, `skip_if_null`, `default`, `converter` or `ignore`)",
                    ));
                }
                Ok(())
            })?;
        }

        if ignore {
            continue;
        }

        let index = shape_fields.len();

        let mut field_expr = quote! {
            ::remap_api::shape::Field::of::<#field_ty>(#field_name_str)
        };
        if let Some(rename) = rename {
            field_expr = quote! { #field_expr.rename(#rename) };
        }
        if skip_if_null {
            field_expr = quote! { #field_expr.skip_if_null() };
        }
        if let Some(converter) = converter {
            field_expr = quote! { #field_expr.converter(#converter) };
        }
        if let Some(expr) = default {
            let value = default_value(&expr)?;
            field_expr = quote! { #field_expr.default_value(#value) };
        }
        shape_fields.push(field_expr);

        read_arms.push(quote! {
            #index => Ok(::remap_api::value::FieldValue::to_value(&self.#field_name)),
        });
        write_arms.push(quote! {
            #index => {
                self.#field_name = <#field_ty as ::remap_api::value::FieldValue>::from_value(value)?;
                Ok(())
            }
        });
    }

    let construct_body = match construct {
        Some(path) => quote! { #path() },
        None => quote! { Ok(<Self as ::core::default::Default>::default()) },
    };

    let expanded = quote! {
        impl ::remap_api::mappable::Mappable for #name {
            fn shape(&self) -> &::remap_api::shape::Shape {
                <Self as ::remap_api::mappable::MapTarget>::target_shape()
            }

            fn read_field(
                &self,
                index: usize,
            ) -> Result<::remap_api::value::Value, ::remap_api::error::MapError> {
                match index {
                    #(#read_arms)*
                    _ => Err(::remap_api::error::MapError::FieldIndex {
                        shape: #shape_name.to_string(),
                        index,
                    }),
                }
            }

            fn write_field(
                &mut self,
                index: usize,
                value: ::remap_api::value::Value,
            ) -> Result<(), ::remap_api::error::MapError> {
                match index {
                    #(#write_arms)*
                    _ => Err(::remap_api::error::MapError::FieldIndex {
                        shape: #shape_name.to_string(),
                        index,
                    }),
                }
            }

            fn as_any(&self) -> &dyn ::core::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::core::any::Any {
                self
            }
        }

        impl ::remap_api::mappable::MapTarget for #name {
            fn target_shape() -> &'static ::remap_api::shape::Shape {
                static SHAPE: ::std::sync::OnceLock<::remap_api::shape::Shape> =
                    ::std::sync::OnceLock::new();
                SHAPE.get_or_init(|| {
                    ::remap_api::shape::Shape::builder_for::<Self>(#shape_name)
                        #(.field(#shape_fields))*
                        .build()
                })
            }

            fn construct() -> Result<Self, ::remap_api::error::MapError> {
                #construct_body
            }
        }
    };

    Ok(TokenStream::from(expanded))
}

/// Turn a `default = <literal>` (optionally negated) into a `Value` expression.
fn default_value(expr: &Expr) -> Result<proc_macro2::TokenStream, syn::Error> {
    match expr {
        Expr::Lit(lit) => literal_value(&lit.lit),
        Expr::Unary(unary) if matches!(unary.op, UnOp::Neg(_)) => match unary.expr.as_ref() {
            Expr::Lit(lit) => match &lit.lit {
                Lit::Int(i) => {
                    let magnitude: i128 = i.base10_parse()?;
                    let value = i64::try_from(-magnitude)
                        .map_err(|_| syn::Error::new_spanned(i, "default does not fit in i64"))?;
                    Ok(if value == i64::MIN {
                        quote! { ::remap_api::value::Value::I64(::core::primitive::i64::MIN) }
                    } else {
                        let positive = -value;
                        quote! { ::remap_api::value::Value::I64(-#positive) }
                    })
                }
                Lit::Float(f) => Ok(quote! { ::remap_api::value::Value::F64(-(#f as f64)) }),
                other => Err(syn::Error::new_spanned(other, "only numbers can be negated")),
            },
            other => Err(syn::Error::new_spanned(other, "only numbers can be negated")),
        },
        other => Err(syn::Error::new_spanned(
            other,
            "default must be a literal (string, integer, float, bool or char)",
        )),
    }
}

fn literal_value(lit: &Lit) -> Result<proc_macro2::TokenStream, syn::Error> {
    Ok(match lit {
        Lit::Str(s) => quote! { ::remap_api::value::Value::String(#s.to_string()) },
        Lit::Int(i) => match i.base10_parse::<i64>() {
            Ok(value) => quote! { ::remap_api::value::Value::I64(#value) },
            Err(_) => {
                let value: u64 = i.base10_parse()?;
                quote! { ::remap_api::value::Value::U64(#value) }
            }
        },
        Lit::Float(f) => quote! { ::remap_api::value::Value::F64(#f as f64) },
        Lit::Bool(b) => quote! { ::remap_api::value::Value::Bool(#b) },
        Lit::Char(c) => quote! { ::remap_api::value::Value::Char(#c) },
        other => {
            return Err(syn::Error::new_spanned(
                other,
                "unsupported default literal (expected string, integer, float, bool or char)",
            ))
        }
    })
}
