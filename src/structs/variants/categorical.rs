//! # **CategoricalArray Module** - *Dictionary-encoded array*
//!
//! Integer keys referencing a shared values array (the dictionary).
//!
//! ## Interop
//! - Keys may use any signed or unsigned integer width, and the values may be any array.
//! - On export the keys fill the parent `ArrowArray` and the values travel as its
//!   `dictionary` descriptor. The parent schema's format is the key format, and the
//!   dictionary schema describes the values.
//! - `ordered` maps to the `DICTIONARY_ORDERED` schema flag.

use std::collections::HashMap;
use std::sync::Arc;

use crate::enums::error::{BridgeError, Result};
use crate::ffi::arrow_dtype::{ArrowType, IndexType};
use crate::{Array, Bitmask, IntegerArray, NumericArray, Scalar, StringArray};

/// # CategoricalArray
///
/// ### Fields
/// - `keys`: integer indices into `values`. Null keys are null entries.
/// - `values`: the dictionary.
/// - `ordered`: whether the dictionary order is semantically meaningful.
///
/// ## Example
/// ```rust
/// use colbridge::{CategoricalArray, Scalar};
///
/// let cat = CategoricalArray::from_strs(&[Some("cat"), Some("dog"), Some("cat"), None]);
/// assert_eq!(cat.values.len(), 2);
/// assert_eq!(cat.value(2), Scalar::String("cat".into()));
/// assert_eq!(cat.value(3), Scalar::Null);
/// ```
#[derive(PartialEq, Clone, Debug)]
pub struct CategoricalArray {
    pub keys: NumericArray,
    pub values: Array,
    pub ordered: bool,
}

impl CategoricalArray {
    /// Builds a categorical array, checking every non-null key indexes into `values`.
    ///
    /// # Errors
    /// - `SchemaError` if `keys` are floating point.
    /// - `ImportError` naming the first key out of range.
    pub fn try_new(keys: NumericArray, values: Array, ordered: bool) -> Result<Self> {
        if keys.index_type().is_none() {
            return Err(BridgeError::schema(format!(
                "dictionary keys must be integers, found {}",
                keys.arrow_type()
            )));
        }
        let n_values = values.len() as i128;
        for i in 0..keys.len() {
            if let Some(k) = keys.key_at(i) {
                if k < 0 || k >= n_values {
                    return Err(BridgeError::import(format!(
                        "dictionary key {k} at index {i} is out of range for {n_values} values"
                    )));
                }
            }
        }
        Ok(Self {
            keys,
            values,
            ordered,
        })
    }

    /// Dictionary-encodes strings with `i32` keys, in first-seen order.
    pub fn from_strs(values: &[Option<&str>]) -> Self {
        let mut lookup: HashMap<&str, i32> = HashMap::new();
        let mut uniques: Vec<&str> = Vec::new();
        let keys: Vec<Option<i32>> = values
            .iter()
            .map(|v| {
                v.map(|s| {
                    *lookup.entry(s).or_insert_with(|| {
                        uniques.push(s);
                        (uniques.len() - 1) as i32
                    })
                })
            })
            .collect();
        let keys = if keys.iter().all(Option::is_some) {
            IntegerArray::from_slice(&keys.iter().flatten().copied().collect::<Vec<_>>())
        } else {
            IntegerArray::from_options(&keys)
        };
        Self {
            keys: keys.into(),
            values: Array::from_string32(StringArray::from_strs(&uniques)),
            ordered: false,
        }
    }

    /// Number of entries (keys).
    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Validity of the keys.
    #[inline]
    pub fn null_mask(&self) -> Option<&Bitmask> {
        self.keys.null_mask()
    }

    #[inline]
    pub fn null_count(&self) -> usize {
        self.keys.null_count()
    }

    /// Key width.
    pub fn index_type(&self) -> IndexType {
        // integer keys are checked on construction
        self.keys.index_type().unwrap_or(IndexType::Int32)
    }

    /// `Dictionary { index, values, ordered }`.
    pub fn arrow_type(&self) -> ArrowType {
        ArrowType::Dictionary {
            index: self.index_type(),
            values: Arc::new(self.values.arrow_type()),
            ordered: self.ordered,
        }
    }

    /// Decoded value at `idx`.
    pub fn value(&self, idx: usize) -> Scalar {
        match self.keys.key_at(idx) {
            Some(k) => self.values.value(k as usize),
            None => Scalar::Null,
        }
    }

    /// Zero-copy window over the keys. The dictionary is shared unchanged.
    pub fn slice(&self, offset: usize, len: usize) -> Self {
        Self {
            keys: self.keys.slice(offset, len),
            values: self.values.clone(),
            ordered: self.ordered,
        }
    }
}
