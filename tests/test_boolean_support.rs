//! Integration tests for BOOLEAN columns and parameters.

use bytes::Bytes;
use firebird_core_rs::protocol::constants::*;
use firebird_core_rs::{DatatypeCoder, FbValue, FieldDescriptor, FieldMetadata, Row, RowDescriptor};

fn boolean_field(name: &str) -> FieldDescriptor {
    FieldDescriptor::from_raw(0, SQL_BOOLEAN + 1, 0, 0, 1)
        .unwrap()
        .with_names(name, name)
        .with_relation("WITHBOOLEAN", "WITHBOOLEAN")
}

/// Decode one row per value of a nullable BOOLEAN column.
fn rows(values: &[Option<&[u8]>]) -> Vec<Row> {
    let coder = DatatypeCoder::default();
    let descriptor = RowDescriptor::builder().add(boolean_field("COLUMN_BOOLEAN")).build();
    values
        .iter()
        .map(|v| {
            Row::decode(&coder, descriptor.clone(), &[v.map(Bytes::copy_from_slice)]).unwrap()
        })
        .collect()
}

#[test]
fn test_select_boolean_values() {
    let rows = rows(&[Some(&[0]), Some(&[1]), None]);
    let seen: Vec<(bool, bool)> = rows
        .iter()
        .map(|row| (row.get_boolean(0).unwrap(), row.is_null(0).unwrap()))
        .collect();
    assert_eq!(seen, vec![(false, false), (true, false), (false, true)]);
}

#[test]
fn test_boolean_by_name_and_as_string() {
    let rows = rows(&[Some(&[1]), None]);
    assert_eq!(rows[0].get_by_name("column_boolean"), Some(&FbValue::Boolean(true)));
    assert_eq!(rows[0].get_string(0).unwrap().as_deref(), Some("TRUE"));
    assert_eq!(rows[1].get_string(0).unwrap(), None);
    assert_eq!(rows[1].get_i64(0).unwrap(), 0);
}

#[test]
fn test_boolean_parameter_encoding() {
    let coder = DatatypeCoder::default();
    let field = boolean_field("PARAM");
    assert_eq!(coder.encode(&field, &FbValue::Boolean(true)).unwrap().as_deref(), Some(&[1u8][..]));
    assert_eq!(coder.encode(&field, &FbValue::Boolean(false)).unwrap().as_deref(), Some(&[0u8][..]));
    assert_eq!(coder.encode(&field, &FbValue::Int(5)).unwrap().as_deref(), Some(&[1u8][..]));
    assert_eq!(coder.encode(&field, &FbValue::String("false".into())).unwrap().as_deref(), Some(&[0u8][..]));
    assert_eq!(coder.encode(&field, &FbValue::Null).unwrap(), None);
}

#[test]
fn test_boolean_metadata() {
    let field = boolean_field("COLUMN_BOOLEAN");
    for md in [FieldMetadata::for_column(&field), FieldMetadata::for_parameter(&field)] {
        assert_eq!(md.jdbc_type, JDBC_BOOLEAN);
        assert_eq!(md.type_name, "BOOLEAN");
        assert_eq!(md.precision, 1);
        assert_eq!(md.scale, 0);
        assert!(!md.signed);
        assert!(md.is_nullable());
    }
    assert_eq!(FieldMetadata::for_column(&field).table_name, "WITHBOOLEAN");
}
