//! Shared implementation macros for the fixed-width array variants.

/// Implements `Integer` for each listed primitive.
#[macro_export]
macro_rules! impl_usize_conversions {
    ($($t:ty),*) => {
        $(
            impl $crate::traits::type_unions::Integer for $t {
                #[inline]
                fn as_usize(self) -> usize {
                    self as usize
                }

                #[inline]
                fn from_usize(v: usize) -> Self {
                    v as $t
                }
            }
        )*
    };
}

/// Constructors, accessors, zero-copy slicing and `MaskedArray` for an array type
/// shaped `{ data: Buffer<T>, null_mask: Option<Bitmask> }`.
///
/// The bound trait must be in scope at the call site.
#[macro_export]
macro_rules! impl_primitive_array {
    ($name:ident, $bound:ident) => {
        impl<T: $bound> $name<T> {
            /// Constructs an array over `data` with an optional validity bitmap.
            ///
            /// # Panics
            /// If the mask length differs from the data length.
            pub fn new(data: impl Into<$crate::Buffer<T>>, null_mask: Option<$crate::Bitmask>) -> Self {
                let data = data.into();
                if let Some(mask) = &null_mask {
                    assert_eq!(mask.len(), data.len(), "null mask length must match data length");
                }
                Self { data, null_mask }
            }

            /// Dense array copied from a slice, without a null mask.
            pub fn from_slice(values: &[T]) -> Self {
                Self::new($crate::Buffer::from_slice(values), None)
            }

            /// Array from optional values. `None` entries become nulls.
            pub fn from_options(values: &[Option<T>]) -> Self {
                let data: Vec<T> = values.iter().map(|v| v.unwrap_or_default()).collect();
                let valid: Vec<bool> = values.iter().map(Option::is_some).collect();
                Self::new(data, Some($crate::Bitmask::from_bools(&valid)))
            }

            /// Raw values, including the placeholder values behind nulls.
            #[inline]
            pub fn values(&self) -> &[T] {
                self.data.as_slice()
            }

            /// Value at `idx`, or `None` when null or out of bounds.
            #[inline]
            pub fn get(&self, idx: usize) -> Option<T> {
                if idx >= self.data.len() || $crate::MaskedArray::is_null(self, idx) {
                    None
                } else {
                    Some(self.data[idx])
                }
            }

            /// Zero-copy window `[offset, offset + len)`.
            pub fn slice(&self, offset: usize, len: usize) -> Self {
                Self {
                    data: self.data.slice(offset, len),
                    null_mask: self.null_mask.as_ref().map(|m| m.slice(offset, len)),
                }
            }
        }

        impl<T: $bound> $crate::MaskedArray for $name<T> {
            #[inline]
            fn len(&self) -> usize {
                self.data.len()
            }

            #[inline]
            fn null_mask(&self) -> Option<&$crate::Bitmask> {
                self.null_mask.as_ref()
            }
        }

        impl<T: $bound> From<Vec<T>> for $name<T> {
            fn from(values: Vec<T>) -> Self {
                Self::new(values, None)
            }
        }
    };
}
