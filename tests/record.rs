use rust_sql::{init_shape, project_row, record, ErrorKind, Record, RowShape, Value};

#[derive(Debug, Default, PartialEq)]
struct Item {
    id: i32,
    name: String,
}

record! {
    Item {
        "Id" => id,
        "Name" => name,
    }
}

#[derive(Debug, Default, PartialEq)]
struct Account {
    id: i64,
    label: Option<String>,
    total: f64,
}

record! {
    Account {
        "Id" => id,
        "Label" => label,
        "Total" => total,
    }
    readonly ["Balance", "Id"]
}

#[derive(Debug, Default, PartialEq)]
struct Shadowed {
    first: i32,
    second: i32,
}

record! {
    Shadowed {
        "Value" => first,
        "Value" => second,
    }
}

#[test]
fn test_extra_columns_are_ignored() {
    let shape = init_shape::<Item, _>(&["Id", "Name", "Extra"]);
    assert_eq!(shape.width(), 3);
    assert_eq!(shape.index_of(0), Some(0));
    assert_eq!(shape.index_of(1), Some(1));
    assert_eq!(shape.index_of(2), None);

    let item = project_row(
        vec![Value::I64(1), Value::from("Widget"), Value::from("ignored")],
        &shape,
    )
    .unwrap();
    assert_eq!(
        item,
        Item {
            id: 1,
            name: "Widget".into()
        }
    );
}

#[test]
fn test_shape_is_reused_for_every_row() {
    let shape = RowShape::<Item>::new(&["Name", "Id"]);
    let rows = vec![
        vec![Value::from("a"), Value::I32(1)],
        vec![Value::from("b"), Value::from("2")],
        vec![Value::DbNull, Value::DbNull],
    ];
    let items: Vec<Item> = rows
        .into_iter()
        .map(|row| shape.project(row))
        .collect::<rust_sql::Result<_>>()
        .unwrap();

    assert_eq!(items[0], Item { id: 1, name: "a".into() });
    assert_eq!(items[1], Item { id: 2, name: "b".into() });
    assert_eq!(items[2], Item::default());
}

#[test]
fn test_column_names_match_case_sensitively() {
    let shape = init_shape::<Item, _>(&["id", "NAME"]);
    assert_eq!(shape.index_of(0), None);
    assert_eq!(shape.index_of(1), None);

    let item = shape.project(vec![Value::I64(9), Value::from("x")]).unwrap();
    assert_eq!(item, Item::default());
}

#[test]
fn test_readonly_properties_are_never_written() {
    let properties = Account::properties();
    assert_eq!(properties.len(), 5);
    assert!(properties[0].is_writable());
    assert!(!properties[3].is_writable());
    assert_eq!(properties[3].name, "Balance");

    let shape = init_shape::<Account, _>(&["Id", "Balance", "Label", "Total"]);
    assert_eq!(shape.index_of(0), Some(0));
    assert_eq!(shape.index_of(1), None);

    let account = shape
        .project(vec![
            Value::I64(3),
            Value::F64(99.0),
            Value::DbNull,
            Value::from("12.5"),
        ])
        .unwrap();
    assert_eq!(
        account,
        Account {
            id: 3,
            label: None,
            total: 12.5
        }
    );
}

#[test]
fn test_first_matching_property_wins() {
    let shape = init_shape::<Shadowed, _>(&["Value"]);
    assert_eq!(shape.index_of(0), Some(0));
    let row = shape.project(vec![Value::I32(4)]).unwrap();
    assert_eq!(row, Shadowed { first: 4, second: 0 });
}

#[test]
fn test_row_width_must_match_shape() {
    let shape = init_shape::<Item, _>(&["Id", "Name"]);
    let err = shape.project(vec![Value::I32(1)]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Shape);
    assert_eq!(err.to_string(), "row has 1 values, shape expects 2");
}

#[test]
fn test_cell_errors_carry_the_column() {
    let shape = init_shape::<Item, _>(&["Extra", "Id"]);
    let err = shape
        .project(vec![Value::from("whatever"), Value::from("seven")])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
    assert!(err.to_string().starts_with("column 'Id':"), "{err}");
}

#[test]
fn test_empty_shape_builds_defaults() {
    let columns: [&str; 0] = [];
    let shape = init_shape::<Item, _>(&columns);
    assert_eq!(shape.width(), 0);
    assert_eq!(shape.project(Vec::new()).unwrap(), Item::default());
}
