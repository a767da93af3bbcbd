//! Type kind tag.
//!
//! Tags are grouped into ranges:
//! - 0-15: primitives (match the pre-interned `Idx` constants one-to-one)
//! - 32-47: structural and nominal aggregates
//! - 96-111: types whose layout is never known statically

use std::fmt;

use crate::Idx;

/// Type kind discriminant.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(u8)]
pub enum Tag {
    // === Primitives (0-15) ===
    Bool = 0,
    Int8 = 1,
    Int16 = 2,
    Int32 = 3,
    Int64 = 4,
    UInt8 = 5,
    UInt16 = 6,
    UInt32 = 7,
    UInt64 = 8,
    /// Pointer-sized signed integer.
    Int = 9,
    /// Pointer-sized unsigned integer.
    UInt = 10,
    Float32 = 11,
    Float64 = 12,
    RawPointer = 13,
    Unit = 14,
    Never = 15,

    // === Aggregates (32-47) ===
    /// Anonymous product `(A, B, ...)`.
    Tuple = 32,
    /// Value-type nominal aggregate.
    Struct = 33,
    /// Tagged union.
    Enum = 34,
    /// Reference-counted class instance (a single pointer).
    Class = 35,
    /// Boxed existential `any P & Q`.
    Existential = 36,
    /// Thick closure `{ fn_ptr, context }`.
    Function = 37,
    /// Inline fixed-size array.
    FixedArray = 38,
    /// Weak class reference; values must stay in memory.
    Weak = 39,

    // === Layout known only at runtime (96-111) ===
    /// Unsubstituted generic parameter.
    GenericParam = 96,
    /// Opaque result type.
    Opaque = 97,
}

impl Tag {
    /// All primitive tags, in `Idx` order.
    pub const PRIMITIVES: [Tag; Idx::PRIMITIVE_COUNT as usize] = [
        Tag::Bool,
        Tag::Int8,
        Tag::Int16,
        Tag::Int32,
        Tag::Int64,
        Tag::UInt8,
        Tag::UInt16,
        Tag::UInt32,
        Tag::UInt64,
        Tag::Int,
        Tag::UInt,
        Tag::Float32,
        Tag::Float64,
        Tag::RawPointer,
        Tag::Unit,
        Tag::Never,
    ];

    #[inline]
    pub const fn is_primitive(self) -> bool {
        (self as u8) < 16
    }

    /// True for nominal aggregates backed by a declaration.
    #[inline]
    pub const fn is_nominal(self) -> bool {
        matches!(self, Tag::Struct | Tag::Enum | Tag::Class)
    }

    /// The pre-interned `Idx` of a primitive tag.
    #[inline]
    pub const fn primitive_idx(self) -> Option<Idx> {
        if self.is_primitive() {
            Some(Idx::from_raw(self as u32))
        } else {
            None
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
