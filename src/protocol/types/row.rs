//! Row type for query results.

use std::sync::Arc;

use bytes::Bytes;

use crate::error::{Error, Result};

use super::descriptor::{FieldDescriptor, RowDescriptor};
use super::value::{DatatypeCoder, FbValue};

/// A row of query results.
#[derive(Debug, Clone)]
pub struct Row {
    /// Column values.
    values: Vec<FbValue>,
    /// Shared row descriptor (reference counted).
    descriptor: Arc<RowDescriptor>,
}

impl Row {
    /// Create a new row with values and a shared descriptor.
    pub fn new(values: Vec<FbValue>, descriptor: Arc<RowDescriptor>) -> Self {
        Self { values, descriptor }
    }

    /// Decode raw field data (one entry per field, `None` for NULL).
    pub fn decode(
        coder: &DatatypeCoder,
        descriptor: Arc<RowDescriptor>,
        fields: &[Option<Bytes>],
    ) -> Result<Self> {
        if fields.len() != descriptor.len() {
            return Err(Error::protocol(format!(
                "Row has {} fields, descriptor has {}",
                fields.len(),
                descriptor.len()
            )));
        }
        let values = descriptor
            .fields()
            .iter()
            .zip(fields)
            .map(|(field, data)| coder.decode(field, data.as_deref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { values, descriptor })
    }

    /// Get value by column index (0-based).
    pub fn get(&self, index: usize) -> Option<&FbValue> {
        self.values.get(index)
    }

    /// Get value by column name (case-insensitive).
    pub fn get_by_name(&self, name: &str) -> Option<&FbValue> {
        self.descriptor
            .find_by_name(name)
            .and_then(|idx| self.values.get(idx))
    }

    fn value(&self, index: usize) -> Result<&FbValue> {
        self.values.get(index).ok_or(Error::ColumnIndexOutOfBounds {
            index,
            count: self.values.len(),
        })
    }

    /// Whether the value at `index` is NULL.
    pub fn is_null(&self, index: usize) -> Result<bool> {
        Ok(self.value(index)?.is_null())
    }

    /// Boolean value at `index`.
    ///
    /// SQL NULL and the BOOLEAN `UNKNOWN` truth value both read as `false`;
    /// use [`is_null`](Self::is_null) to tell them apart from `FALSE`.
    pub fn get_boolean(&self, index: usize) -> Result<bool> {
        self.value(index)?.to_bool()
    }

    /// Integer value at `index`; NULL reads as 0.
    pub fn get_i64(&self, index: usize) -> Result<i64> {
        self.value(index)?.to_i64()
    }

    /// String value at `index`; `None` for NULL.
    pub fn get_string(&self, index: usize) -> Result<Option<String>> {
        let value = self.value(index)?;
        Ok((!value.is_null()).then(|| value.to_string()))
    }

    /// Exact numeric value at `index` as a decimal string; `None` for NULL.
    pub fn get_decimal(&self, index: usize) -> Result<Option<String>> {
        match self.value(index)? {
            FbValue::Null => Ok(None),
            FbValue::Decimal(s) => Ok(Some(s.clone())),
            v @ (FbValue::Short(_) | FbValue::Int(_) | FbValue::BigInt(_) | FbValue::Int128(_)) => {
                Ok(Some(v.to_string()))
            }
            other => Err(Error::type_conversion(format!(
                "Cannot convert {:?} to an exact numeric",
                other
            ))),
        }
    }

    /// Get the number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the row is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get all values.
    pub fn values(&self) -> &[FbValue] {
        &self.values
    }

    /// Get field descriptors.
    pub fn fields(&self) -> &[FieldDescriptor] {
        self.descriptor.fields()
    }

    /// Get column labels.
    pub fn column_names(&self) -> Vec<&str> {
        self.fields().iter().map(|f| f.field_name.as_str()).collect()
    }

    /// Iterate over values.
    pub fn iter(&self) -> impl Iterator<Item = &FbValue> {
        self.values.iter()
    }
}

impl IntoIterator for Row {
    type Item = FbValue;
    type IntoIter = std::vec::IntoIter<FbValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl<'a> IntoIterator for &'a Row {
    type Item = &'a FbValue;
    type IntoIter = std::slice::Iter<'a, FbValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::constants::*;

    fn make_test_descriptor() -> Arc<RowDescriptor> {
        RowDescriptor::builder()
            .add(
                FieldDescriptor::from_raw(0, SQL_VARYING + 1, CS_UTF8 as i16, 0, 400)
                    .unwrap()
                    .with_names("NAME", "NAME"),
            )
            .add(
                FieldDescriptor::from_raw(1, SQL_LONG, 0, 0, 4)
                    .unwrap()
                    .with_names("VALUE", "VALUE"),
            )
            .build()
    }

    #[test]
    fn test_row_access() {
        let row = Row::new(
            vec![FbValue::String("test".to_string()), FbValue::Int(42)],
            make_test_descriptor(),
        );

        assert_eq!(row.len(), 2);
        assert_eq!(row.get(0), Some(&FbValue::String("test".to_string())));
        assert_eq!(row.get_by_name("value"), Some(&FbValue::Int(42)));
        assert_eq!(row.get_by_name("VALUE"), row.get_by_name("value"));
        assert_eq!(row.get_i64(1).unwrap(), 42);
        assert!(row.get_boolean(5).is_err());
    }

    #[test]
    fn test_row_decode() {
        let coder = DatatypeCoder::default();
        let row = Row::decode(
            &coder,
            make_test_descriptor(),
            &[None, Some(Bytes::from_static(&[0, 0, 0, 7]))],
        )
        .unwrap();
        assert!(row.is_null(0).unwrap());
        assert_eq!(row.get_string(0).unwrap(), None);
        assert_eq!(row.get_string(1).unwrap(), Some("7".to_string()));
        assert_eq!(row.column_names(), vec!["NAME", "VALUE"]);
    }

    #[test]
    fn test_row_decode_field_count_mismatch() {
        let coder = DatatypeCoder::default();
        assert!(Row::decode(&coder, make_test_descriptor(), &[None]).is_err());
    }
}
