//! Copyright © 2025 Peter Garfield Bower. All rights reserved.
//!
//! # **Colbridge** - *Zero-copy columnar interchange over the Arrow C interfaces*
//!
//! Moves arrays, record batches, chunked arrays and lazy batch streams between two
//! independently managed memory domains without copying buffer payloads.
//!
//! ## Layers
//! - **Type mapping** ([`ffi::format`]): `ArrowType` <-> Arrow format strings.
//! - **Schemas** ([`ffi::schema`]): `Field` <-> `ArrowSchema` trees, including metadata.
//! - **Arrays** ([`ffi::export`], [`ffi::import`]): `Array` <-> `ArrowArray`, with the
//!   release callback owning the source buffers until the consumer lets go.
//! - **Streams** ([`ffi::stream`]): a pull-based `ArrowArrayStream` producer state machine,
//!   and a consumer that releases the foreign stream exactly once on every exit path.
//! - **Capsules** ([`ffi::capsule`]): single-use ownership handles exposed under the
//!   `arrow_schema`, `arrow_array` and `arrow_array_stream` capability names.
//!
//! ## Ownership
//! Every buffer is a [`SharedBuffer`] with an atomic reference count. Exporting clones the
//! array (an `Arc` bump per buffer) into the descriptor's private data, and the release
//! callback drops it. Importing wraps the foreign `ArrowArray` in a single shared owner whose
//! `Drop` invokes the foreign release, so it runs once, when the last imported buffer goes.
//!
//! ## Example
//! ```rust
//! use colbridge::{Array, Field, FieldArray, IntegerArray, ArrowType};
//! use colbridge::ffi::{export::export_field_array, import::import_field_array};
//!
//! let ints = IntegerArray::<i64>::from_options(&[Some(1), None, Some(3)]);
//! let fa = FieldArray::new(Field::new("x", ArrowType::Int64, true, None), Array::from_int64(ints));
//!
//! let (array, schema) = export_field_array(&fa).unwrap();
//! let back = unsafe { import_field_array(array, schema) }.unwrap();
//! assert_eq!(back.array.to_list(), fa.array.to_list());
//! ```

pub mod enums {
    pub mod array;
    pub mod error;
    pub mod scalar;
    pub mod time_units;
    pub mod collections {
        pub mod numeric_array;
        #[cfg(feature = "datetime")]
        pub mod temporal_array;
        pub mod text_array;
    }
}

pub mod structs {
    #[cfg(feature = "chunked")]
    pub mod chunked {
        pub mod super_array;
        pub mod super_table;
    }

    pub mod variants {
        pub mod boolean;
        pub mod categorical;
        #[cfg(feature = "datetime")]
        pub mod datetime;
        pub mod float;
        pub mod integer;
        #[cfg(feature = "datetime")]
        pub mod interval;
        pub mod list;
        pub mod string;
        pub mod struct_array;
    }
    pub mod bitmask;
    pub mod buffer;
    pub mod field;
    pub mod field_array;
    pub mod shared_buffer;
    pub mod table;
}

pub mod ffi {
    pub mod arrow_c_ffi;
    pub mod arrow_dtype;
    pub mod capsule;
    pub mod export;
    pub mod format;
    pub mod import;
    pub mod metadata;
    pub mod schema;
    pub mod stream;
}

pub mod traits {
    pub mod masked_array;
    pub mod type_unions;
}

#[cfg(feature = "cast_arrow")]
pub mod conversions;
pub mod macros;

pub use enums::array::Array;
pub use enums::collections::numeric_array::NumericArray;
#[cfg(feature = "datetime")]
pub use enums::collections::temporal_array::TemporalArray;
pub use enums::collections::text_array::TextArray;
pub use enums::error::{BridgeError, Result};
pub use enums::scalar::Scalar;
pub use enums::time_units::{IntervalUnit, TimeUnit};

pub use ffi::arrow_dtype::{ArrowType, IndexType};
pub use ffi::schema::Schema;
pub use structs::bitmask::Bitmask;
pub use structs::buffer::Buffer;
#[cfg(feature = "chunked")]
pub use structs::chunked::{super_array::SuperArray, super_table::SuperTable};
pub use structs::field::Field;
pub use structs::field_array::FieldArray;
pub use structs::shared_buffer::SharedBuffer;
pub use structs::table::Table;
pub use structs::variants::boolean::BooleanArray;
pub use structs::variants::categorical::CategoricalArray;
#[cfg(feature = "datetime")]
pub use structs::variants::datetime::DatetimeArray;
pub use structs::variants::float::FloatArray;
pub use structs::variants::integer::IntegerArray;
#[cfg(feature = "datetime")]
pub use structs::variants::interval::IntervalArray;
pub use structs::variants::list::ListArray;
pub use structs::variants::string::StringArray;
pub use structs::variants::struct_array::StructArray;
pub use traits::masked_array::MaskedArray;
pub use traits::type_unions::{Float, Integer, OffsetType, Primitive};
pub use vec64::{Vec64, vec64};
