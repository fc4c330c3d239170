//! Field and row descriptors as reported by the server on prepare.
//!
//! These structs preserve the raw descriptor data. For the externally
//! visible JDBC view (type code, precision, ...) use
//! [`FieldMetadata`](super::FieldMetadata).

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::protocol::constants::*;

use super::encoding::Charset;
use super::sql_type::SqlType;

/// Name of the row identifier pseudo column.
pub const DB_KEY_NAME: &str = "DB_KEY";

/// Bytes of row identifier contributed by each table.
pub const DB_KEY_BYTES_PER_TABLE: u32 = 8;

/// Descriptor of a single column or parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// 0-based position in the row.
    pub position: usize,
    pub sql_type: SqlType,
    pub sub_type: i16,
    /// Negative scale for scaled numerics (`-2` means two decimals).
    pub scale: i16,
    /// Length in bytes.
    pub length: u32,
    pub nullable: bool,
    /// Column alias.
    pub field_name: String,
    /// Underlying column name.
    pub original_name: String,
    pub relation_name: String,
    pub relation_alias: String,
    pub owner_name: String,
    /// Declared precision, when known from the system tables.
    pub declared_precision: Option<u8>,
}

impl FieldDescriptor {
    /// Create from raw descriptor values. The low bit of `raw_type` is the
    /// nullable flag.
    pub fn from_raw(
        position: usize,
        raw_type: u16,
        sub_type: i16,
        scale: i16,
        length: u32,
    ) -> Result<Self> {
        Ok(Self {
            position,
            sql_type: SqlType::from_raw(raw_type)?,
            sub_type,
            scale,
            length,
            nullable: raw_type & 1 == 1,
            field_name: String::new(),
            original_name: String::new(),
            relation_name: String::new(),
            relation_alias: String::new(),
            owner_name: String::new(),
            declared_precision: None,
        })
    }

    /// Set the column alias and underlying column name.
    pub fn with_names(mut self, field_name: &str, original_name: &str) -> Self {
        self.field_name = field_name.to_string();
        self.original_name = original_name.to_string();
        self
    }

    /// Set the owning relation.
    pub fn with_relation(mut self, relation_name: &str, relation_alias: &str) -> Self {
        self.relation_name = relation_name.to_string();
        self.relation_alias = relation_alias.to_string();
        self
    }

    /// Set the declared precision.
    pub fn with_declared_precision(mut self, precision: u8) -> Self {
        self.declared_precision = Some(precision);
        self
    }

    /// Raw type code including the nullable bit.
    pub fn raw_type(&self) -> u16 {
        self.sql_type.type_code() | self.nullable as u16
    }

    /// Character set id of this field.
    ///
    /// Character types carry it in the low byte of the subtype, text blobs
    /// in the low byte of the scale. Everything else is binary.
    pub fn charset_id(&self) -> u8 {
        match self.sql_type {
            SqlType::Text | SqlType::Varying => (self.sub_type & 0xFF) as u8,
            SqlType::Blob if self.sub_type == BLOB_SUB_TYPE_TEXT => (self.scale & 0xFF) as u8,
            _ => CS_BINARY,
        }
    }

    /// Character set of this field, if known.
    pub fn charset(&self) -> Option<&'static Charset> {
        Charset::by_id(self.charset_id())
    }

    /// Whether this is the `RDB$DB_KEY` pseudo column.
    pub fn is_db_key(&self) -> bool {
        self.original_name == DB_KEY_NAME
            && self.sql_type == SqlType::Text
            && (self.sub_type & 0xFF) as u8 == CS_BINARY
    }

    /// Byte used to pad fixed-width character values.
    pub fn padding_byte(&self) -> u8 {
        if self.charset_id() == CS_BINARY {
            0x00
        } else {
            0x20
        }
    }
}

/// Descriptors of all fields of a row, shared by every row of a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowDescriptor {
    fields: Vec<FieldDescriptor>,
    contributing_tables: usize,
}

impl RowDescriptor {
    /// Start building a descriptor.
    pub fn builder() -> RowDescriptorBuilder {
        RowDescriptorBuilder::default()
    }

    /// An empty descriptor (statements without output).
    pub fn empty() -> Arc<Self> {
        Arc::new(Self {
            fields: Vec::new(),
            contributing_tables: 0,
        })
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field at a 0-based index.
    pub fn get(&self, index: usize) -> Result<&FieldDescriptor> {
        self.fields.get(index).ok_or(Error::ColumnIndexOutOfBounds {
            index,
            count: self.fields.len(),
        })
    }

    /// Find a field by alias (case-insensitive).
    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.field_name.eq_ignore_ascii_case(name))
    }

    /// Number of base tables contributing rows, used to size `RDB$DB_KEY`.
    pub fn contributing_tables(&self) -> usize {
        self.contributing_tables
    }
}

/// Builder for [`RowDescriptor`].
#[derive(Debug, Default)]
pub struct RowDescriptorBuilder {
    fields: Vec<FieldDescriptor>,
    contributing_tables: Option<usize>,
}

impl RowDescriptorBuilder {
    /// Append a field; its position is set to its index.
    pub fn add(mut self, mut field: FieldDescriptor) -> Self {
        field.position = self.fields.len();
        self.fields.push(field);
        self
    }

    /// Number of base tables the statement reads, as counted at prepare.
    ///
    /// Without it the count is inferred from the distinct relations among
    /// the fields and the server-reported `RDB$DB_KEY` lengths; a view
    /// over a join is a single relation with a longer key.
    pub fn contributing_tables(mut self, count: usize) -> Self {
        self.contributing_tables = Some(count);
        self
    }

    /// Finish the descriptor, sizing every `RDB$DB_KEY` field to 8 bytes per
    /// contributing table.
    ///
    /// An explicit table count sets the key length; an inferred one only
    /// grows it.
    pub fn build(self) -> Arc<RowDescriptor> {
        let explicit = self.contributing_tables;
        let tables = explicit.unwrap_or_else(|| {
            let relations = self
                .fields
                .iter()
                .filter(|f| !f.relation_name.is_empty())
                .map(|f| f.relation_name.as_str())
                .collect::<HashSet<_>>()
                .len();
            let from_keys = self
                .fields
                .iter()
                .filter(|f| f.is_db_key())
                .map(|f| (f.length / DB_KEY_BYTES_PER_TABLE) as usize)
                .max()
                .unwrap_or(0);
            relations.max(from_keys)
        });
        let tables = tables.max(1);
        let fields = self
            .fields
            .into_iter()
            .map(|mut f| {
                if f.is_db_key() {
                    let sized = DB_KEY_BYTES_PER_TABLE * tables as u32;
                    f.length = match explicit {
                        Some(_) => sized,
                        None => f.length.max(sized),
                    };
                }
                f
            })
            .collect();
        Arc::new(RowDescriptor {
            fields,
            contributing_tables: tables,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_key(relation: &str) -> FieldDescriptor {
        FieldDescriptor::from_raw(0, SQL_TEXT, CS_BINARY as i16, 0, 8)
            .unwrap()
            .with_names("DB_KEY", DB_KEY_NAME)
            .with_relation(relation, relation)
    }

    #[test]
    fn test_nullable_bit() {
        let f = FieldDescriptor::from_raw(0, SQL_LONG + 1, 0, 0, 4).unwrap();
        assert!(f.nullable);
        assert_eq!(f.raw_type(), SQL_LONG + 1);
        let f = FieldDescriptor::from_raw(0, SQL_LONG, 0, 0, 4).unwrap();
        assert!(!f.nullable);
    }

    #[test]
    fn test_charset_id_sources() {
        let varchar = FieldDescriptor::from_raw(0, SQL_VARYING, 0x0104, 0, 40).unwrap();
        assert_eq!(varchar.charset_id(), CS_UTF8);
        let text_blob = FieldDescriptor::from_raw(0, SQL_BLOB, 1, CS_WIN1252 as i16, 8).unwrap();
        assert_eq!(text_blob.charset_id(), CS_WIN1252);
        let binary_blob = FieldDescriptor::from_raw(0, SQL_BLOB, 0, 0, 8).unwrap();
        assert_eq!(binary_blob.charset_id(), CS_BINARY);
        assert_eq!(binary_blob.padding_byte(), 0);
        assert_eq!(varchar.padding_byte(), b' ');
    }

    #[test]
    fn test_db_key_single_table() {
        let desc = RowDescriptor::builder().add(db_key("EMPLOYEE")).build();
        assert!(desc.get(0).unwrap().is_db_key());
        assert_eq!(desc.get(0).unwrap().length, 8);
    }

    #[test]
    fn test_db_key_join_counts_tables() {
        let name = FieldDescriptor::from_raw(0, SQL_VARYING, 4, 0, 40)
            .unwrap()
            .with_names("NAME", "NAME")
            .with_relation("DEPARTMENT", "D");
        let desc = RowDescriptor::builder()
            .add(db_key("EMPLOYEE"))
            .add(name)
            .build();
        assert_eq!(desc.contributing_tables(), 2);
        assert_eq!(desc.get(0).unwrap().length, 16);
        assert_eq!(desc.get(1).unwrap().position, 1);
    }

    #[test]
    fn test_db_key_of_joined_view_keeps_server_length() {
        let key = FieldDescriptor::from_raw(0, SQL_TEXT, CS_BINARY as i16, 0, 16)
            .unwrap()
            .with_names("DB_KEY", DB_KEY_NAME)
            .with_relation("V_EMP_DEPT", "V_EMP_DEPT");
        let desc = RowDescriptor::builder().add(key).build();
        assert_eq!(desc.get(0).unwrap().length, 16);
        assert_eq!(desc.contributing_tables(), 2);
    }

    #[test]
    fn test_db_key_explicit_table_count() {
        let desc = RowDescriptor::builder()
            .add(db_key("V_EMP_DEPT"))
            .contributing_tables(3)
            .build();
        assert_eq!(desc.get(0).unwrap().length, 24);
    }

    #[test]
    fn test_find_by_name_and_bounds() {
        let desc = RowDescriptor::builder()
            .add(
                FieldDescriptor::from_raw(0, SQL_LONG, 0, 0, 4)
                    .unwrap()
                    .with_names("ID", "ID"),
            )
            .build();
        assert_eq!(desc.find_by_name("id"), Some(0));
        assert!(matches!(
            desc.get(3),
            Err(Error::ColumnIndexOutOfBounds { index: 3, count: 1 })
        ));
    }
}
