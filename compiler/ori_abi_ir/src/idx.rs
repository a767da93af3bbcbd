//! Canonical type handle.
//!
//! `Idx` is the only way ABI queries refer to a type. Types live in the
//! module's [`Pool`](crate::Pool) and are referenced by a 32-bit index, so
//! type equality is index equality.
//!
//! Primitive types are pre-interned at fixed indices (0-15) and can be
//! matched on directly without a pool lookup.

use std::fmt;

/// A 32-bit index into the type pool.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct Idx(u32);

impl Idx {
    // === Primitive Types (indices 0-15) ===

    /// `Bool` (1 byte).
    pub const BOOL: Self = Self(0);
    /// `Int8`.
    pub const INT8: Self = Self(1);
    /// `Int16`.
    pub const INT16: Self = Self(2);
    /// `Int32`.
    pub const INT32: Self = Self(3);
    /// `Int64`.
    pub const INT64: Self = Self(4);
    /// `UInt8`.
    pub const UINT8: Self = Self(5);
    /// `UInt16`.
    pub const UINT16: Self = Self(6);
    /// `UInt32`.
    pub const UINT32: Self = Self(7);
    /// `UInt64`.
    pub const UINT64: Self = Self(8);
    /// `Int`: pointer-sized signed integer.
    pub const INT: Self = Self(9);
    /// `UInt`: pointer-sized unsigned integer.
    pub const UINT: Self = Self(10);
    /// `Float32`.
    pub const FLOAT32: Self = Self(11);
    /// `Float64`.
    pub const FLOAT64: Self = Self(12);
    /// Untyped machine pointer.
    pub const RAW_POINTER: Self = Self(13);
    /// The unit type `()`.
    pub const UNIT: Self = Self(14);
    /// The never type (no values).
    pub const NEVER: Self = Self(15);

    /// Number of pre-interned primitive types.
    pub const PRIMITIVE_COUNT: u32 = 16;

    /// Sentinel value indicating no type.
    pub const NONE: Self = Self(u32::MAX);

    /// Create an index from a raw u32 value.
    ///
    /// The caller must ensure the index is valid in the pool it is used with.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw u32 value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Check if this is a pre-interned primitive.
    #[inline]
    pub const fn is_primitive(self) -> bool {
        self.0 < Self::PRIMITIVE_COUNT
    }

    /// Check if this is the NONE sentinel.
    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }

    /// Human-readable name for primitives, `None` for pooled types.
    #[inline]
    pub const fn name(self) -> Option<&'static str> {
        match self.0 {
            0 => Some("Bool"),
            1 => Some("Int8"),
            2 => Some("Int16"),
            3 => Some("Int32"),
            4 => Some("Int64"),
            5 => Some("UInt8"),
            6 => Some("UInt16"),
            7 => Some("UInt32"),
            8 => Some("UInt64"),
            9 => Some("Int"),
            10 => Some("UInt"),
            11 => Some("Float32"),
            12 => Some("Float64"),
            13 => Some("RawPointer"),
            14 => Some("()"),
            15 => Some("Never"),
            _ => None,
        }
    }
}

impl fmt::Debug for Idx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "Idx::{name}"),
            None if self.is_none() => write!(f, "Idx::NONE"),
            None => write!(f, "Idx({})", self.0),
        }
    }
}

impl fmt::Display for Idx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None if self.is_none() => f.write_str("<none>"),
            None => write!(f, "type#{}", self.0),
        }
    }
}

// Idx must stay exactly 4 bytes
const _: () = assert!(std::mem::size_of::<Idx>() == 4);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_are_below_dynamic_range() {
        assert!(Idx::BOOL.is_primitive());
        assert!(Idx::NEVER.is_primitive());
        assert!(!Idx::from_raw(Idx::PRIMITIVE_COUNT).is_primitive());
        assert!(!Idx::NONE.is_primitive());
    }

    #[test]
    fn debug_and_display_names() {
        assert_eq!(format!("{:?}", Idx::INT32), "Idx::Int32");
        assert_eq!(format!("{}", Idx::RAW_POINTER), "RawPointer");
        assert_eq!(format!("{:?}", Idx::from_raw(40)), "Idx(40)");
        assert_eq!(format!("{}", Idx::NONE), "<none>");
    }
}
