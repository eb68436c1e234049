use remap_api::Mappable;
use remap_api::error::MapError;
use remap_api::mappable::{MapTarget, Mappable as _};
use remap_api::value::{Value, ValueType};

#[derive(Mappable, Default, Debug, PartialEq)]
#[map(name = "Customer")]
struct Customer {
    id: i64,
    #[map(rename = "display_name")]
    name: String,
    #[map(skip_if_null)]
    email: Option<String>,
    #[map(default = -1)]
    score: i32,
    #[map(converter = "upper")]
    tags: Vec<String>,
    #[map(ignore)]
    cache: u64,
}

fn seeded() -> Result<Seeded, MapError> {
    Ok(Seeded { value: 42 })
}

#[derive(Mappable, Debug)]
#[map(construct = seeded)]
struct Seeded {
    value: u32,
}

#[test]
fn shape_describes_fields_in_order() {
    let shape = Customer::target_shape();
    assert_eq!(shape.name(), "Customer");
    let names: Vec<_> = shape.fields().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["id", "name", "email", "score", "tags"]);

    let (_, email) = shape.field("email").unwrap();
    assert_eq!(email.value_type, ValueType::String);
    assert!(email.nullable);
    assert!(email.annotations.skip_if_null);

    let (_, name) = shape.field("name").unwrap();
    assert_eq!(name.annotations.rename.as_deref(), Some("display_name"));

    let (_, score) = shape.field("score").unwrap();
    assert_eq!(score.annotations.default, Some(Value::I64(-1)));

    let (_, tags) = shape.field("tags").unwrap();
    assert_eq!(tags.value_type, ValueType::List(Box::new(ValueType::String)));
    assert_eq!(tags.annotations.converter.as_deref(), Some("upper"));

    assert!(shape.field("cache").is_none());
}

#[test]
fn shape_is_shared_by_instances() {
    let a = Customer::default();
    let b = Customer::default();
    assert!(std::ptr::eq(a.shape(), b.shape()));
    assert!(std::ptr::eq(a.shape(), Customer::target_shape()));
}

#[test]
fn reads_and_writes_by_index() {
    let mut customer = Customer {
        id: 7,
        name: "Ada".into(),
        email: None,
        ..Default::default()
    };
    assert_eq!(customer.read_field(0).unwrap(), Value::I64(7));
    assert_eq!(customer.read_field(2).unwrap(), Value::Null);

    customer.write_field(2, Value::from("ada@example.com")).unwrap();
    assert_eq!(customer.email.as_deref(), Some("ada@example.com"));

    customer.write_field(0, Value::Null).unwrap();
    assert_eq!(customer.id, 0);

    customer
        .write_field(4, Value::List(vec![Value::from("a"), Value::from("b")]))
        .unwrap();
    assert_eq!(customer.tags, ["a", "b"]);
}

#[test]
fn wrong_representation_and_bad_index_fail() {
    let mut customer = Customer::default();
    let err = customer.write_field(0, Value::from("7")).unwrap_err();
    assert!(matches!(err, MapError::TypeMismatch { expected: ValueType::I64, .. }));

    let err = customer.read_field(9).unwrap_err();
    assert!(matches!(err, MapError::FieldIndex { index: 9, .. }));
}

#[test]
fn custom_constructor_is_used() {
    let seeded = Seeded::construct().unwrap();
    assert_eq!(seeded.value, 42);
    assert_eq!(Customer::construct().unwrap(), Customer::default());
}

#[derive(Mappable, Default, Debug)]
struct Limits {
    #[map(default = 18446744073709551615)]
    ceiling: u64,
    #[map(default = -9223372036854775808)]
    floor: i64,
    #[map(default = 7u32)]
    small: u32,
}

#[test]
fn integer_defaults_keep_their_range() {
    let shape = Limits::target_shape();
    let default_of = |name: &str| shape.field(name).unwrap().1.annotations.default.clone();
    assert_eq!(default_of("ceiling"), Some(Value::U64(u64::MAX)));
    assert_eq!(default_of("floor"), Some(Value::I64(i64::MIN)));
    assert_eq!(default_of("small"), Some(Value::I64(7)));
}
