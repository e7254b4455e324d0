//! # Table Module - *Record batch of named columns*
//!
//! A `Table` is a set of equal-length `FieldArray` columns with a name and
//! key/value metadata.
//!
//! On the wire a table is a record batch: one `+s` struct array whose children are
//! the columns. The root schema carries the table name and metadata, and is never
//! nullable.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::enums::error::{BridgeError, Result};
use crate::ffi::schema::Schema;
use crate::{Array, Field, FieldArray, MaskedArray, StructArray};

/// # Table
///
/// ### Fields
/// - `cols`: named columns, all `n_rows` long.
/// - `n_rows`: row count, explicit so that zero-column tables keep a length.
/// - `name`: travels as the root schema name.
/// - `metadata`: travels as the root schema metadata.
///
/// ## Example
/// ```rust
/// use colbridge::{Array, IntegerArray, StringArray, Table};
/// use colbridge::structs::field_array::field_array;
///
/// let t = Table::try_new(
///     "people",
///     vec![
///         field_array("id", Array::from_int64(IntegerArray::from_slice(&[1, 2, 3]))),
///         field_array("name", Array::from_string32(StringArray::from_strs(&["a", "b", "c"]))),
///     ],
/// )
/// .unwrap();
/// assert_eq!(t.n_rows, 3);
/// assert_eq!(t.col_names(), vec!["id", "name"]);
/// assert_eq!(t.slice(1, 2).n_rows, 2);
/// ```
#[derive(Default, PartialEq, Clone, Debug)]
pub struct Table {
    pub cols: Vec<FieldArray>,
    pub n_rows: usize,
    pub name: String,
    pub metadata: BTreeMap<String, String>,
}

impl Table {
    /// Builds a table, taking the row count from the first column.
    ///
    /// # Errors
    /// `SchemaError` when the columns have different lengths.
    pub fn try_new(name: impl Into<String>, cols: Vec<FieldArray>) -> Result<Self> {
        let n_rows = cols.first().map_or(0, FieldArray::len);
        for c in &cols {
            if c.len() != n_rows {
                return Err(BridgeError::schema(format!(
                    "column '{}' has {} rows, expected {n_rows}",
                    c.field.name,
                    c.len()
                )));
            }
        }
        Ok(Table {
            cols,
            n_rows,
            name: name.into(),
            metadata: BTreeMap::new(),
        })
    }

    /// Table with no columns and no rows.
    pub fn new_empty() -> Self {
        Table::default()
    }

    /// Attaches table-level metadata.
    pub fn with_metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    #[inline]
    pub fn n_cols(&self) -> usize {
        self.cols.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    pub fn col_names(&self) -> Vec<&str> {
        self.cols.iter().map(|c| c.field.name.as_str()).collect()
    }

    /// Column named `name`.
    pub fn col(&self, name: &str) -> Option<&FieldArray> {
        self.cols.iter().find(|c| c.field.name == name)
    }

    /// Column fields plus table metadata.
    pub fn schema(&self) -> Schema {
        Schema::new(
            self.cols.iter().map(|c| (*c.field).clone()).collect(),
            self.metadata.clone(),
        )
    }

    /// Zero-copy window over every column.
    pub fn slice(&self, offset: usize, len: usize) -> Self {
        assert!(offset + len <= self.n_rows, "Table::slice out of bounds");
        Table {
            cols: self.cols.iter().map(|c| c.slice(offset, len)).collect(),
            n_rows: len,
            name: self.name.clone(),
            metadata: self.metadata.clone(),
        }
    }

    /// The columns as one struct array, the wire shape of a record batch.
    pub fn to_struct_array(&self) -> Result<StructArray> {
        StructArray::try_new_with_len(
            Arc::from(self.cols.iter().map(|c| (*c.field).clone()).collect::<Vec<Field>>()),
            self.cols.iter().map(|c| c.array.clone()).collect(),
            None,
            self.n_rows,
        )
    }

    /// Splits a struct array back into columns.
    ///
    /// # Errors
    /// `ImportError` when the struct has row-level nulls, which a record batch cannot hold.
    pub fn from_struct_array(
        name: impl Into<String>,
        array: &StructArray,
        metadata: BTreeMap<String, String>,
    ) -> Result<Self> {
        if array.null_count() > 0 {
            return Err(BridgeError::import(format!(
                "record batch root has {} null rows",
                array.null_count()
            )));
        }
        let cols = array
            .fields
            .iter()
            .zip(&array.children)
            .map(|(f, c)| FieldArray::new(f.clone(), c.clone()))
            .collect();
        Ok(Table {
            cols,
            n_rows: array.len,
            name: name.into(),
            metadata,
        })
    }

    /// Column values, decoded, in column order.
    pub fn to_columns(&self) -> Vec<(String, Array)> {
        self.cols
            .iter()
            .map(|c| (c.field.name.clone(), c.array.clone()))
            .collect()
    }
}

impl Display for Table {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Table \"{}\" [{} rows x {} cols]", self.name, self.n_rows, self.n_cols())?;
        for c in &self.cols {
            writeln!(f, "  {c}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::field_array::field_array;
    use crate::{IntegerArray, Scalar};

    #[test]
    fn ragged_columns_rejected() {
        let err = Table::try_new(
            "t",
            vec![
                field_array("a", Array::from_int32(IntegerArray::from_slice(&[1, 2]))),
                field_array("b", Array::from_int32(IntegerArray::from_slice(&[1]))),
            ],
        )
        .unwrap_err();
        assert!(err.to_string().contains("column 'b'"));
    }

    #[test]
    fn struct_round_trip_keeps_columns() {
        let t = Table::try_new("t", vec![field_array("a", Array::from_int32(IntegerArray::from_slice(&[7, 8])))])
            .unwrap();
        let s = t.to_struct_array().unwrap();
        let back = Table::from_struct_array("t", &s, BTreeMap::new()).unwrap();
        assert_eq!(back, t);
        assert_eq!(back.col("a").unwrap().array.value(1), Scalar::Int(8));
    }
}
