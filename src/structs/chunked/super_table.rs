//! # **SuperTable** - *Record batches sharing one schema*
//!
//! A sequence of `Table` batches with a common `Schema`. Crosses the boundary as an
//! `ArrowArrayStream` of `+s` record batches.

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::enums::error::{BridgeError, Result};
use crate::ffi::schema::Schema;
use crate::{SuperArray, Table};

/// # SuperTable
///
/// ### Fields
/// - `batches`: record batches, each matching `schema`.
/// - `schema`: column fields and table metadata.
/// - `n_rows`: total rows across batches.
/// - `name`: table name.
#[derive(PartialEq, Clone, Debug, Default)]
pub struct SuperTable {
    pub batches: Vec<Arc<Table>>,
    pub schema: Schema,
    pub n_rows: usize,
    pub name: String,
}

impl SuperTable {
    /// Builds a batched table over `schema`.
    ///
    /// # Errors
    /// `SchemaError` when a batch's columns do not match the schema fields.
    pub fn try_new(name: impl Into<String>, schema: Schema, batches: Vec<Table>) -> Result<Self> {
        let mut st = SuperTable {
            batches: Vec::with_capacity(batches.len()),
            schema,
            n_rows: 0,
            name: name.into(),
        };
        for b in batches {
            st.push(b)?;
        }
        Ok(st)
    }

    /// Builds a batched table, taking the schema and name from the first batch.
    ///
    /// # Errors
    /// `SchemaError` when `batches` is empty or the batches disagree.
    pub fn from_batches(batches: Vec<Table>) -> Result<Self> {
        let Some(first) = batches.first() else {
            return Err(BridgeError::schema("cannot infer a schema from zero batches"));
        };
        let (name, schema) = (first.name.clone(), first.schema());
        Self::try_new(name, schema, batches)
    }

    /// Appends a batch, checking it against the schema.
    pub fn push(&mut self, batch: Table) -> Result<()> {
        if batch.n_cols() != self.schema.fields.len() {
            return Err(BridgeError::schema(format!(
                "batch has {} columns, schema has {}",
                batch.n_cols(),
                self.schema.fields.len()
            )));
        }
        for (col, field) in batch.cols.iter().zip(&self.schema.fields) {
            if col.field.name != field.name || col.field.dtype != field.dtype {
                return Err(BridgeError::schema(format!(
                    "batch column {} does not match schema field {}",
                    col.field, field
                )));
            }
        }
        self.n_rows += batch.n_rows;
        self.batches.push(Arc::new(batch));
        Ok(())
    }

    #[inline]
    pub fn n_batches(&self) -> usize {
        self.batches.len()
    }

    #[inline]
    pub fn n_cols(&self) -> usize {
        self.schema.fields.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    /// Column `idx` across all batches, as a chunked array.
    pub fn column(&self, idx: usize) -> Result<SuperArray> {
        let Some(field) = self.schema.fields.get(idx) else {
            return Err(BridgeError::schema(format!("no column {idx}")));
        };
        SuperArray::try_new(
            field.clone(),
            self.batches.iter().map(|b| b.cols[idx].array.clone()).collect(),
        )
    }

    /// The batches as owned tables, named after this table.
    pub fn to_tables(&self) -> Vec<Table> {
        self.batches
            .iter()
            .map(|b| {
                let mut t = (**b).clone();
                t.name.clone_from(&self.name);
                t.metadata.clone_from(&self.schema.metadata);
                t
            })
            .collect()
    }
}

impl Display for SuperTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SuperTable \"{}\" [{} rows in {} batches x {} cols]",
            self.name,
            self.n_rows,
            self.n_batches(),
            self.n_cols()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::field_array::field_array;
    use crate::{Array, IntegerArray, Scalar};

    fn batch(vals: &[i64]) -> Table {
        Table::try_new("t", vec![field_array("id", Array::from_int64(IntegerArray::from_slice(vals)))]).unwrap()
    }

    #[test]
    fn batches_share_schema() {
        let st = SuperTable::from_batches(vec![batch(&[1, 2, 3]), batch(&[4, 5])]).unwrap();
        assert_eq!(st.n_rows, 5);
        let col = st.column(0).unwrap();
        assert_eq!(col.to_list().last(), Some(&Scalar::Int(5)));
    }

    #[test]
    fn mismatched_batch_rejected() {
        let mut st = SuperTable::from_batches(vec![batch(&[1])]).unwrap();
        let other = Table::try_new("t", vec![field_array("x", Array::from_int64(IntegerArray::from_slice(&[1])))])
            .unwrap();
        assert!(st.push(other).is_err());
        assert_eq!(st.n_batches(), 1);
    }
}
