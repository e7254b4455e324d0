//! # **Schema Module** - *Field trees <-> ArrowSchema trees*
//!
//! Exports a `Field` (or a bare `ArrowType`) as an `ArrowSchema` tree whose strings,
//! metadata and child descriptors are owned by the root's private data, and imports a
//! foreign `ArrowSchema` tree back into a `Field`.
//!
//! ## Export in two phases
//! The tree is first built as owned Rust values, where every fallible step (type
//! encoding, interior NULs, metadata length) can fail and simply drop. Only then is it
//! converted into raw descriptors, which cannot fail, so no partially built C tree is
//! ever leaked.
//!
//! ## Release
//! Each exported node's release callback frees its own strings and recursively releases
//! and frees its children and dictionary. A child the consumer moved out (and marked
//! released) is skipped, but its struct memory is still freed.

use std::collections::BTreeMap;
use std::ffi::{CStr, CString, c_char};
use std::ptr;

use tracing::{debug, trace};

use crate::enums::error::{BridgeError, Result};
use crate::ffi::arrow_c_ffi::{ARROW_FLAG_NULLABLE, ArrowSchema};
use crate::ffi::arrow_dtype::ArrowType;
use crate::ffi::format::{FormatDescriptor, decode_type, encode_type};
use crate::ffi::metadata::{decode_metadata, encode_metadata};
use crate::Field;

/// Schema of a record batch: column fields plus table-level metadata.
///
/// Crosses the boundary as a non-nullable `+s` root whose children are the fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    pub fields: Vec<Field>,
    pub metadata: BTreeMap<String, String>,
}

impl Schema {
    #[inline]
    pub fn new(fields: Vec<Field>, metadata: BTreeMap<String, String>) -> Self {
        Self { fields, metadata }
    }

    /// `ArrowType::Struct` over the fields.
    pub fn struct_type(&self) -> ArrowType {
        ArrowType::struct_of(self.fields.clone())
    }

    /// Root field of a record batch named `name`.
    pub fn root_field(&self, name: impl Into<String>) -> Field {
        Field::new(name, self.struct_type(), false, Some(self.metadata.clone()))
    }

    /// Exports as a `+s` root.
    pub fn export(&self, name: &str) -> Result<ArrowSchema> {
        export_field(&self.root_field(name))
    }

    /// Imports a `+s` root, returning its name with the schema.
    ///
    /// # Errors
    /// `SchemaError` when the root is not a struct.
    pub fn import(schema: &ArrowSchema) -> Result<(String, Schema)> {
        let root = import_schema(schema)?;
        Schema::from_root_field(root)
    }

    /// Splits a record batch root field into its name and schema.
    pub fn from_root_field(root: Field) -> Result<(String, Schema)> {
        match &root.dtype {
            ArrowType::Struct(fields) => Ok((
                root.name.clone(),
                Schema::new(fields.to_vec(), root.metadata.clone()),
            )),
            other => Err(BridgeError::schema(format!(
                "record batch schema must be a struct, found {other}"
            ))),
        }
    }
}

impl From<Vec<Field>> for Schema {
    fn from(fields: Vec<Field>) -> Self {
        Self {
            fields,
            ..Default::default()
        }
    }
}

/// Owned form of one schema node, built before any raw pointer exists.
struct SchemaNode {
    format: CString,
    name: CString,
    metadata: Option<Vec<u8>>,
    flags: i64,
    children: Vec<SchemaNode>,
    dictionary: Option<Box<SchemaNode>>,
}

/// Everything an exported `ArrowSchema` points into.
struct SchemaPrivateData {
    format: CString,
    name: CString,
    metadata: Option<Vec<u8>>,
    children: Box<[*mut ArrowSchema]>,
    dictionary: *mut ArrowSchema,
}

fn c_string(s: &str, what: &str) -> Result<CString> {
    CString::new(s).map_err(|_| BridgeError::schema(format!("{what} '{s}' contains a NUL byte")))
}

fn build_node(
    dtype: &ArrowType,
    name: &str,
    nullable: bool,
    metadata: &BTreeMap<String, String>,
) -> Result<SchemaNode> {
    let FormatDescriptor {
        format,
        children,
        dictionary,
        flags,
    } = encode_type(dtype)?;
    let children = children
        .iter()
        .map(|c| build_node(&c.dtype, &c.name, c.nullable, &c.metadata))
        .collect::<Result<Vec<_>>>()?;
    let dictionary = match dictionary {
        Some(values) => Some(Box::new(build_node(&values, "", true, &BTreeMap::new())?)),
        None => None,
    };
    Ok(SchemaNode {
        format: c_string(&format, "format")?,
        name: c_string(name, "field name")?,
        metadata: encode_metadata(metadata)?,
        flags: flags | if nullable { ARROW_FLAG_NULLABLE } else { 0 },
        children,
        dictionary,
    })
}

fn into_ffi(node: SchemaNode) -> ArrowSchema {
    let n_children = node.children.len() as i64;
    let children: Box<[*mut ArrowSchema]> = node
        .children
        .into_iter()
        .map(|c| Box::into_raw(Box::new(into_ffi(c))))
        .collect();
    let dictionary = node
        .dictionary
        .map_or(ptr::null_mut(), |d| Box::into_raw(Box::new(into_ffi(*d))));
    let mut private = Box::new(SchemaPrivateData {
        format: node.format,
        name: node.name,
        metadata: node.metadata,
        children,
        dictionary,
    });
    ArrowSchema {
        format: private.format.as_ptr(),
        name: private.name.as_ptr(),
        metadata: private
            .metadata
            .as_ref()
            .map_or(ptr::null(), |m| m.as_ptr() as *const c_char),
        flags: node.flags,
        n_children,
        children: if n_children == 0 {
            ptr::null_mut()
        } else {
            private.children.as_mut_ptr()
        },
        dictionary,
        release: Some(release_schema),
        private_data: Box::into_raw(private).cast(),
    }
}

unsafe extern "C" fn release_schema(schema: *mut ArrowSchema) {
    if schema.is_null() {
        return;
    }
    let schema = unsafe { &mut *schema };
    if schema.release.is_none() || schema.private_data.is_null() {
        return;
    }
    let private = unsafe { Box::from_raw(schema.private_data as *mut SchemaPrivateData) };
    for &child in private.children.iter() {
        let mut child = unsafe { Box::from_raw(child) };
        child.release();
    }
    if !private.dictionary.is_null() {
        let mut dict = unsafe { Box::from_raw(private.dictionary) };
        dict.release();
    }
    drop(private);
    trace!("released exported ArrowSchema");
    schema.private_data = ptr::null_mut();
    schema.release = None;
}

/// Exports a type as an `ArrowSchema` node named `name`.
pub fn export_schema(dtype: &ArrowType, name: &str, nullable: bool) -> Result<ArrowSchema> {
    let node = build_node(dtype, name, nullable, &BTreeMap::new())?;
    Ok(into_ffi(node))
}

/// Exports a field, including its metadata.
pub fn export_field(field: &Field) -> Result<ArrowSchema> {
    let node = build_node(&field.dtype, &field.name, field.nullable, &field.metadata)?;
    debug!(
        name = %field.name,
        format = ?node.format,
        n_children = node.children.len(),
        "exporting schema"
    );
    Ok(into_ffi(node))
}

/// Imports a schema tree into a `Field`. The schema is borrowed and not released.
///
/// # Errors
/// - `SchemaError` for a released schema, a negative child count, non-UTF-8 strings,
///   or malformed metadata.
/// - `NullPointer` for a null format or child pointer.
/// - `UnsupportedType` for an unrecognised format string.
pub fn import_schema(schema: &ArrowSchema) -> Result<Field> {
    if schema.is_released() {
        return Err(BridgeError::schema("ArrowSchema has already been released"));
    }
    if schema.format.is_null() {
        return Err(BridgeError::NullPointer("ArrowSchema.format"));
    }
    let format = unsafe { CStr::from_ptr(schema.format) }
        .to_str()
        .map_err(|_| BridgeError::schema("format string is not valid UTF-8"))?
        .to_string();
    let name = if schema.name.is_null() {
        String::new()
    } else {
        unsafe { CStr::from_ptr(schema.name) }
            .to_str()
            .map_err(|_| BridgeError::schema("field name is not valid UTF-8"))?
            .to_string()
    };
    let metadata = unsafe { decode_metadata(schema.metadata)? };

    let n_children = usize::try_from(schema.n_children)
        .map_err(|_| BridgeError::schema(format!("negative child count {}", schema.n_children)))?;
    let mut children = Vec::with_capacity(n_children);
    if n_children > 0 {
        if schema.children.is_null() {
            return Err(BridgeError::NullPointer("ArrowSchema.children"));
        }
        for i in 0..n_children {
            let child = unsafe { *schema.children.add(i) };
            if child.is_null() {
                return Err(BridgeError::NullPointer("ArrowSchema child"));
            }
            children.push(import_schema(unsafe { &*child })?);
        }
    }
    let dictionary = if schema.dictionary.is_null() {
        None
    } else {
        Some(std::sync::Arc::new(import_schema(unsafe { &*schema.dictionary })?.dtype))
    };
    let dtype = decode_type(&FormatDescriptor {
        format,
        children,
        dictionary,
        flags: schema.flags,
    })?;
    Ok(Field::new(
        name,
        dtype,
        schema.flags & ARROW_FLAG_NULLABLE != 0,
        Some(metadata),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::arrow_c_ffi::ARROW_FLAG_DICTIONARY_ORDERED;
    use crate::ffi::arrow_dtype::IndexType;
    use std::sync::Arc;

    #[test]
    fn field_tree_round_trip() {
        let mut meta = BTreeMap::new();
        meta.insert("origin".to_string(), "sensor-7".to_string());
        let field = Field::new(
            "reading",
            ArrowType::struct_of(vec![
                Field::new("id", ArrowType::UInt32, false, None),
                Field::new(
                    "tags",
                    ArrowType::list_of(Field::new("item", ArrowType::String, true, None)),
                    true,
                    None,
                ),
                Field::new(
                    "kind",
                    ArrowType::Dictionary {
                        index: IndexType::Int16,
                        values: Arc::new(ArrowType::LargeString),
                        ordered: true,
                    },
                    true,
                    None,
                ),
            ]),
            true,
            Some(meta),
        );
        let mut c = export_field(&field).unwrap();
        assert_eq!(c.n_children, 3);
        let kind = unsafe { &**c.children.add(2) };
        assert_eq!(unsafe { CStr::from_ptr(kind.format) }.to_str().unwrap(), "s");
        assert_eq!(kind.flags, ARROW_FLAG_DICTIONARY_ORDERED | ARROW_FLAG_NULLABLE);
        assert_eq!(import_schema(&c).unwrap(), field);
        c.release();
        assert!(c.is_released());
    }

    #[test]
    fn released_schema_rejected() {
        let err = import_schema(&ArrowSchema::empty()).unwrap_err();
        assert!(matches!(err, BridgeError::SchemaError(_)));
    }

    #[test]
    fn nul_in_name_fails_before_allocation() {
        let err = export_schema(&ArrowType::Int8, "a\0b", true).unwrap_err();
        assert!(err.to_string().contains("NUL"));
    }

    #[test]
    fn moved_child_is_skipped_on_release() {
        let mut c = export_field(&Field::new(
            "s",
            ArrowType::struct_of(vec![Field::new("x", ArrowType::Int64, true, None)]),
            false,
            None,
        ))
        .unwrap();
        let mut moved = unsafe { (**c.children).take() };
        c.release();
        assert_eq!(import_schema(&moved).unwrap().name, "x");
        moved.release();
    }

    #[test]
    fn schema_root_round_trip() {
        let mut meta = BTreeMap::new();
        meta.insert("table_name".to_string(), "t".to_string());
        let schema = Schema::new(vec![Field::new("a", ArrowType::Float64, true, None)], meta);
        let mut c = schema.export("batch").unwrap();
        assert_eq!(c.flags & ARROW_FLAG_NULLABLE, 0);
        let (name, back) = Schema::import(&c).unwrap();
        assert_eq!(name, "batch");
        assert_eq!(back, schema);
        c.release();
    }
}
