//! # **Metadata Module** - *ArrowSchema key/value metadata encoding*
//!
//! The `ArrowSchema.metadata` buffer: an `int32` pair count, then for each pair an
//! `int32` key length, the key bytes, an `int32` value length and the value bytes.
//! All integers are native-endian. A null pointer means no metadata.

use std::collections::BTreeMap;
use std::ffi::c_char;

use crate::enums::error::{BridgeError, Result};

/// Encodes metadata, or `None` when there is nothing to encode.
///
/// # Errors
/// `SchemaError` when the pair count or a key or value length exceeds `i32::MAX`.
pub fn encode_metadata(metadata: &BTreeMap<String, String>) -> Result<Option<Vec<u8>>> {
    if metadata.is_empty() {
        return Ok(None);
    }
    let cap = 4 + metadata.iter().map(|(k, v)| 8 + k.len() + v.len()).sum::<usize>();
    let mut out = Vec::with_capacity(cap);
    out.extend_from_slice(&to_i32(metadata.len(), "metadata pair count")?.to_ne_bytes());
    for (k, v) in metadata {
        out.extend_from_slice(&to_i32(k.len(), "metadata key length")?.to_ne_bytes());
        out.extend_from_slice(k.as_bytes());
        out.extend_from_slice(&to_i32(v.len(), "metadata value length")?.to_ne_bytes());
        out.extend_from_slice(v.as_bytes());
    }
    Ok(Some(out))
}

fn to_i32(n: usize, what: &str) -> Result<i32> {
    i32::try_from(n).map_err(|_| BridgeError::schema(format!("{what} {n} exceeds i32::MAX")))
}

/// Decodes metadata from an `ArrowSchema.metadata` pointer.
///
/// # Errors
/// `SchemaError` on a negative count or length, or a key or value that is not UTF-8.
///
/// # Safety
/// `ptr` must be null or point at a well-formed metadata buffer. The buffer carries no
/// total length, so its extent is only known by walking it.
pub unsafe fn decode_metadata(ptr: *const c_char) -> Result<BTreeMap<String, String>> {
    let mut out = BTreeMap::new();
    if ptr.is_null() {
        return Ok(out);
    }
    let mut cursor = ptr as *const u8;
    let n = unsafe { read_len(&mut cursor, "metadata pair count")? };
    for _ in 0..n {
        let key = unsafe { read_str(&mut cursor, "metadata key")? };
        let value = unsafe { read_str(&mut cursor, "metadata value")? };
        out.insert(key, value);
    }
    Ok(out)
}

unsafe fn read_len(cursor: &mut *const u8, what: &str) -> Result<usize> {
    let n = unsafe { (*cursor as *const i32).read_unaligned() };
    *cursor = unsafe { cursor.add(4) };
    usize::try_from(n).map_err(|_| BridgeError::schema(format!("{what} is negative ({n})")))
}

unsafe fn read_str(cursor: &mut *const u8, what: &str) -> Result<String> {
    let len = unsafe { read_len(cursor, what)? };
    let bytes = unsafe { std::slice::from_raw_parts(*cursor, len) };
    *cursor = unsafe { cursor.add(len) };
    String::from_utf8(bytes.to_vec()).map_err(|_| BridgeError::schema(format!("{what} is not valid UTF-8")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_metadata_is_a_null_pointer() {
        assert_eq!(encode_metadata(&BTreeMap::new()).unwrap(), None);
        assert!(unsafe { decode_metadata(std::ptr::null()) }.unwrap().is_empty());
    }

    #[test]
    fn pairs_survive_encoding() {
        let mut m = BTreeMap::new();
        m.insert("table_name".to_string(), "people".to_string());
        m.insert("".to_string(), "ünïcode".to_string());
        let bytes = encode_metadata(&m).unwrap().unwrap();
        assert_eq!(&bytes[..4], &2i32.to_ne_bytes());
        let back = unsafe { decode_metadata(bytes.as_ptr() as *const c_char) }.unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn negative_length_rejected() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1i32.to_ne_bytes());
        bytes.extend_from_slice(&(-3i32).to_ne_bytes());
        let err = unsafe { decode_metadata(bytes.as_ptr() as *const c_char) }.unwrap_err();
        assert!(err.to_string().contains("negative"));
    }
}
