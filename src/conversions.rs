//! # **Conversions Module** - *Casts to and from arrow-rs*
//!
//! Enabled by `cast_arrow`. Every conversion crosses the C Data Interface, in both
//! directions, so arrow-rs sees exactly what any other consumer would: buffers are
//! shared rather than copied, and each side's release callback frees its own memory.
//!
//! The descriptor structs here and arrow-rs's `FFI_ArrowArray` / `FFI_ArrowSchema` are
//! both the published C layouts, so a descriptor is moved between them with a bitwise
//! read that leaves the source released.

use std::sync::Arc;

use arrow::array::ffi::{FFI_ArrowArray, FFI_ArrowSchema, from_ffi, to_ffi};
use arrow::array::{Array as _, ArrayRef, StructArray as ArrowStructArray, make_array};
use arrow::datatypes::{Field as ArrowField, Schema as ArrowSchemaRs};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;

use crate::enums::error::{BridgeError, Result};
use crate::ffi::arrow_c_ffi::{ArrowArray, ArrowSchema};
use crate::ffi::export::{export_field_array, export_table};
use crate::ffi::import::{import_field_array, import_table};
use crate::{FieldArray, Table};

impl From<ArrowError> for BridgeError {
    fn from(e: ArrowError) -> Self {
        BridgeError::ImportError(format!("arrow-rs: {e}"))
    }
}

/// Moves our descriptors into arrow-rs's equivalents.
fn into_arrow_rs(array: ArrowArray, schema: ArrowSchema) -> (FFI_ArrowArray, FFI_ArrowSchema) {
    // Same #[repr(C)] layout, and neither of ours implements Drop.
    unsafe {
        (
            std::mem::transmute::<ArrowArray, FFI_ArrowArray>(array),
            std::mem::transmute::<ArrowSchema, FFI_ArrowSchema>(schema),
        )
    }
}

/// Moves arrow-rs descriptors into ours. arrow-rs's `Drop` does not run on the moved-from
/// values, as `transmute` consumes them.
fn from_arrow_rs(array: FFI_ArrowArray, schema: FFI_ArrowSchema) -> (ArrowArray, ArrowSchema) {
    unsafe {
        (
            std::mem::transmute::<FFI_ArrowArray, ArrowArray>(array),
            std::mem::transmute::<FFI_ArrowSchema, ArrowSchema>(schema),
        )
    }
}

impl FieldArray {
    /// Casts to an arrow-rs field and array, without copying buffers.
    pub fn to_apache_arrow(&self) -> Result<(ArrowField, ArrayRef)> {
        let (array, schema) = export_field_array(self)?;
        let (array, schema) = into_arrow_rs(array, schema);
        let field = ArrowField::try_from(&schema)?;
        let data = unsafe { from_ffi(array, &schema) }?;
        Ok((field, make_array(data)))
    }

    /// Casts from an arrow-rs field and array, without copying buffers.
    pub fn from_apache_arrow(field: &ArrowField, array: &ArrayRef) -> Result<FieldArray> {
        let schema = FFI_ArrowSchema::try_from(field)?;
        let (array, _) = to_ffi(&array.to_data())?;
        let (array, schema) = from_arrow_rs(array, schema);
        unsafe { import_field_array(array, schema) }
    }
}

impl Table {
    /// Casts to an arrow-rs `RecordBatch`. The table metadata becomes the schema
    /// metadata.
    pub fn to_apache_arrow(&self) -> Result<RecordBatch> {
        let (array, schema) = export_table(self)?;
        let (array, schema) = into_arrow_rs(array, schema);
        let root = ArrowField::try_from(&schema)?;
        let data = unsafe { from_ffi(array, &schema) }?;
        let batch = ArrowStructArray::from(data);
        let fields = batch.fields().clone();
        let rs_schema = ArrowSchemaRs::new(fields).with_metadata(root.metadata().clone());
        Ok(RecordBatch::try_new(Arc::new(rs_schema), batch.columns().to_vec())?)
    }

    /// Casts from an arrow-rs `RecordBatch`, naming the table `name`.
    pub fn from_apache_arrow(name: &str, batch: &RecordBatch) -> Result<Table> {
        let schema = batch.schema();
        let root = ArrowField::new_struct(name, schema.fields().clone(), false)
            .with_metadata(schema.metadata().clone());
        let ffi_schema = FFI_ArrowSchema::try_from(&root)?;
        let struct_array: ArrowStructArray = batch.clone().into();
        let (array, _) = to_ffi(&struct_array.to_data())?;
        let (array, schema) = from_arrow_rs(array, ffi_schema);
        unsafe { import_table(array, schema) }
    }
}
