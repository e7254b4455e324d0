//! # **Format Module** - *ArrowType <-> Arrow format strings*
//!
//! Maps each logical type onto the format string, children and dictionary of an
//! `ArrowSchema` node, and back.
//!
//! | Type                     | Format              |
//! |--------------------------|---------------------|
//! | Null / Boolean           | `n` / `b`           |
//! | Int8..Int64              | `c` `s` `i` `l`     |
//! | UInt8..UInt64            | `C` `S` `I` `L`     |
//! | Float32 / Float64        | `f` / `g`           |
//! | String / LargeString     | `u` / `U`           |
//! | Utf8View                 | `vu`                |
//! | Date32 / Date64          | `tdD` / `tdm`       |
//! | Time32 / Time64          | `tts` `ttm` / `ttu` `ttn` |
//! | Timestamp(unit, tz)      | `tss:` `tsm:` `tsu:` `tsn:`, then the timezone |
//! | Duration(unit)           | `tDs` `tDm` `tDu` `tDn` |
//! | Interval(unit)           | `tiM` `tiD` `tin`   |
//! | Struct / List / LargeList| `+s` / `+l` / `+L`  |
//!
//! A dictionary type encodes as its *index* format, with the value type moved to the
//! `dictionary` slot and the ordered flag in `flags`.

use std::sync::Arc;

#[cfg(feature = "datetime")]
use crate::enums::time_units::{IntervalUnit, TimeUnit};
use crate::enums::error::{BridgeError, Result};
use crate::ffi::arrow_c_ffi::ARROW_FLAG_DICTIONARY_ORDERED;
use crate::ffi::arrow_dtype::{ArrowType, IndexType};
use crate::Field;

/// One schema node's type information, minus name, nullability and metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatDescriptor {
    pub format: String,
    pub children: Vec<Field>,
    pub dictionary: Option<Arc<ArrowType>>,
    /// Type-derived flags only (`DICTIONARY_ORDERED`). Nullability is added by the caller.
    pub flags: i64,
}

impl FormatDescriptor {
    fn leaf(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            children: Vec::new(),
            dictionary: None,
            flags: 0,
        }
    }
}

/// Encodes a logical type.
///
/// # Errors
/// `UnsupportedType` for parameter combinations with no encoding, such as
/// `Time32(Microseconds)` or a `Days` unit outside `Date32`.
pub fn encode_type(dtype: &ArrowType) -> Result<FormatDescriptor> {
    let fmt = match dtype {
        ArrowType::Null => "n",
        ArrowType::Boolean => "b",
        ArrowType::Int8 => "c",
        ArrowType::Int16 => "s",
        ArrowType::Int32 => "i",
        ArrowType::Int64 => "l",
        ArrowType::UInt8 => "C",
        ArrowType::UInt16 => "S",
        ArrowType::UInt32 => "I",
        ArrowType::UInt64 => "L",
        ArrowType::Float32 => "f",
        ArrowType::Float64 => "g",
        ArrowType::String => "u",
        ArrowType::LargeString => "U",
        ArrowType::Utf8View => "vu",
        #[cfg(feature = "datetime")]
        ArrowType::Date32 => "tdD",
        #[cfg(feature = "datetime")]
        ArrowType::Date64 => "tdm",
        #[cfg(feature = "datetime")]
        ArrowType::Time32(unit) => match unit {
            TimeUnit::Seconds => "tts",
            TimeUnit::Milliseconds => "ttm",
            _ => return Err(BridgeError::unsupported(dtype.to_string())),
        },
        #[cfg(feature = "datetime")]
        ArrowType::Time64(unit) => match unit {
            TimeUnit::Microseconds => "ttu",
            TimeUnit::Nanoseconds => "ttn",
            _ => return Err(BridgeError::unsupported(dtype.to_string())),
        },
        #[cfg(feature = "datetime")]
        ArrowType::Timestamp(unit, tz) => {
            let c = unit
                .format_char()
                .ok_or_else(|| BridgeError::unsupported(dtype.to_string()))?;
            return Ok(FormatDescriptor::leaf(format!("ts{c}:{}", tz.as_deref().unwrap_or(""))));
        }
        #[cfg(feature = "datetime")]
        ArrowType::Duration(unit) => {
            let c = unit
                .format_char()
                .ok_or_else(|| BridgeError::unsupported(dtype.to_string()))?;
            return Ok(FormatDescriptor::leaf(format!("tD{c}")));
        }
        #[cfg(feature = "datetime")]
        ArrowType::Interval(unit) => return Ok(FormatDescriptor::leaf(format!("ti{}", unit.format_char()))),
        ArrowType::Dictionary {
            index,
            values,
            ordered,
        } => {
            let mut d = encode_type(&index.key_type())?;
            d.dictionary = Some(values.clone());
            if *ordered {
                d.flags |= ARROW_FLAG_DICTIONARY_ORDERED;
            }
            return Ok(d);
        }
        ArrowType::Struct(fields) => {
            let mut d = FormatDescriptor::leaf("+s");
            d.children = fields.to_vec();
            return Ok(d);
        }
        ArrowType::List(child) => {
            let mut d = FormatDescriptor::leaf("+l");
            d.children = vec![(**child).clone()];
            return Ok(d);
        }
        ArrowType::LargeList(child) => {
            let mut d = FormatDescriptor::leaf("+L");
            d.children = vec![(**child).clone()];
            return Ok(d);
        }
    };
    Ok(FormatDescriptor::leaf(fmt))
}

/// Decodes a schema node's type.
///
/// # Errors
/// - `UnsupportedType` for unrecognised formats, or a dictionary whose index format is
///   not an integer.
/// - `SchemaError` when a list does not have exactly one child.
pub fn decode_type(desc: &FormatDescriptor) -> Result<ArrowType> {
    if let Some(values) = &desc.dictionary {
        let key = decode_leaf(&desc.format)?;
        let index = IndexType::from_key_type(&key).ok_or_else(|| BridgeError::unsupported(desc.format.clone()))?;
        return Ok(ArrowType::Dictionary {
            index,
            values: values.clone(),
            ordered: desc.flags & ARROW_FLAG_DICTIONARY_ORDERED != 0,
        });
    }
    match desc.format.as_str() {
        "+s" => Ok(ArrowType::Struct(Arc::from(desc.children.clone()))),
        "+l" | "+L" => {
            let [child] = desc.children.as_slice() else {
                return Err(BridgeError::schema(format!(
                    "list format '{}' needs exactly one child, found {}",
                    desc.format,
                    desc.children.len()
                )));
            };
            let child = Arc::new(child.clone());
            Ok(if desc.format == "+l" {
                ArrowType::List(child)
            } else {
                ArrowType::LargeList(child)
            })
        }
        other => {
            if !desc.children.is_empty() {
                return Err(BridgeError::schema(format!(
                    "format '{other}' takes no children, found {}",
                    desc.children.len()
                )));
            }
            decode_leaf(other)
        }
    }
}

/// Decodes a format string on its own. Nested formats decode with no children.
pub fn decode_format(format: &str) -> Result<ArrowType> {
    decode_type(&FormatDescriptor::leaf(format))
}

fn decode_leaf(format: &str) -> Result<ArrowType> {
    let t = match format {
        "n" => ArrowType::Null,
        "b" => ArrowType::Boolean,
        "c" => ArrowType::Int8,
        "s" => ArrowType::Int16,
        "i" => ArrowType::Int32,
        "l" => ArrowType::Int64,
        "C" => ArrowType::UInt8,
        "S" => ArrowType::UInt16,
        "I" => ArrowType::UInt32,
        "L" => ArrowType::UInt64,
        "f" => ArrowType::Float32,
        "g" => ArrowType::Float64,
        "u" => ArrowType::String,
        "U" => ArrowType::LargeString,
        "vu" => ArrowType::Utf8View,
        #[cfg(feature = "datetime")]
        "tdD" => ArrowType::Date32,
        #[cfg(feature = "datetime")]
        "tdm" => ArrowType::Date64,
        #[cfg(feature = "datetime")]
        "tts" => ArrowType::Time32(TimeUnit::Seconds),
        #[cfg(feature = "datetime")]
        "ttm" => ArrowType::Time32(TimeUnit::Milliseconds),
        #[cfg(feature = "datetime")]
        "ttu" => ArrowType::Time64(TimeUnit::Microseconds),
        #[cfg(feature = "datetime")]
        "ttn" => ArrowType::Time64(TimeUnit::Nanoseconds),
        #[cfg(feature = "datetime")]
        other => return decode_parametrised_temporal(other),
        #[cfg(not(feature = "datetime"))]
        other => return Err(BridgeError::unsupported(other)),
    };
    Ok(t)
}

#[cfg(feature = "datetime")]
fn decode_parametrised_temporal(format: &str) -> Result<ArrowType> {
    let unsupported = || BridgeError::unsupported(format);
    if let Some(rest) = format.strip_prefix("ts") {
        let mut chars = rest.chars();
        let unit = chars.next().and_then(TimeUnit::from_format_char).ok_or_else(unsupported)?;
        let tz = chars.as_str().strip_prefix(':').ok_or_else(unsupported)?;
        let tz = (!tz.is_empty()).then(|| Arc::<str>::from(tz));
        return Ok(ArrowType::Timestamp(unit, tz));
    }
    if let Some(rest) = format.strip_prefix("tD") {
        let mut chars = rest.chars();
        let unit = chars.next().and_then(TimeUnit::from_format_char).ok_or_else(unsupported)?;
        if chars.next().is_some() {
            return Err(unsupported());
        }
        return Ok(ArrowType::Duration(unit));
    }
    if let Some(rest) = format.strip_prefix("ti") {
        let mut chars = rest.chars();
        let unit = chars.next().and_then(IntervalUnit::from_format_char).ok_or_else(unsupported)?;
        if chars.next().is_some() {
            return Err(unsupported());
        }
        return Ok(ArrowType::Interval(unit));
    }
    Err(unsupported())
}
