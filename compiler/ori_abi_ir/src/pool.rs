//! Append-only type pool.
//!
//! Every resolved type handed to ABI lowering is interned here and referred
//! to by [`Idx`]. Structurally equal types intern to the same index.
//!
//! The pool is shared behind `&` by every query, but substituting generic
//! arguments into a nominal's field types produces types that were never
//! written in source. Interning therefore goes through an internal
//! `RwLock`; existing entries are never modified, only appended.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::{Idx, Name, NominalId, Tag};

/// Structural description of an interned type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeData {
    /// One of the pre-interned primitives.
    Primitive(Tag),
    /// `(A, B, ...)`.
    Tuple(Vec<Idx>),
    /// Struct declaration applied to generic arguments.
    Struct { decl: NominalId, args: Vec<Idx> },
    /// Enum declaration applied to generic arguments.
    Enum { decl: NominalId, args: Vec<Idx> },
    /// Class declaration applied to generic arguments.
    Class { decl: NominalId, args: Vec<Idx> },
    /// `any P & Q`.
    Existential { protocols: Vec<Name> },
    /// `(P...) -> R` as a thick closure.
    Function { params: Vec<Idx>, ret: Idx },
    /// `[T; len]`.
    FixedArray { element: Idx, len: u32 },
    /// `weak T`.
    Weak(Idx),
    /// Generic parameter, indexed flat across the enclosing contexts.
    GenericParam { index: u32, name: Name },
    /// Opaque result type.
    Opaque { name: Name },
}

impl TypeData {
    pub fn tag(&self) -> Tag {
        match self {
            TypeData::Primitive(tag) => *tag,
            TypeData::Tuple(_) => Tag::Tuple,
            TypeData::Struct { .. } => Tag::Struct,
            TypeData::Enum { .. } => Tag::Enum,
            TypeData::Class { .. } => Tag::Class,
            TypeData::Existential { .. } => Tag::Existential,
            TypeData::Function { .. } => Tag::Function,
            TypeData::FixedArray { .. } => Tag::FixedArray,
            TypeData::Weak(_) => Tag::Weak,
            TypeData::GenericParam { .. } => Tag::GenericParam,
            TypeData::Opaque { .. } => Tag::Opaque,
        }
    }

    /// True if every child index is below `len`, which also excludes the sentinel.
    fn children_below(&self, len: usize) -> bool {
        let below = |idx: &Idx| (idx.raw() as usize) < len;
        match self {
            TypeData::Primitive(_)
            | TypeData::Existential { .. }
            | TypeData::GenericParam { .. }
            | TypeData::Opaque { .. } => true,
            TypeData::Tuple(elems)
            | TypeData::Struct { args: elems, .. }
            | TypeData::Enum { args: elems, .. }
            | TypeData::Class { args: elems, .. } => elems.iter().all(below),
            TypeData::Function { params, ret } => params.iter().all(below) && below(ret),
            TypeData::FixedArray { element: inner, .. } | TypeData::Weak(inner) => below(inner),
        }
    }
}

struct PoolInner {
    items: Vec<TypeData>,
    map: FxHashMap<TypeData, Idx>,
}

/// Interned type storage for one module.
pub struct Pool {
    inner: RwLock<PoolInner>,
}

impl Pool {
    /// Create a pool with the primitives pre-interned at their fixed indices.
    pub fn new() -> Self {
        let mut inner = PoolInner {
            items: Vec::with_capacity(64),
            map: FxHashMap::default(),
        };
        for (i, tag) in Tag::PRIMITIVES.iter().enumerate() {
            let data = TypeData::Primitive(*tag);
            #[expect(
                clippy::cast_possible_truncation,
                reason = "bounded by Idx::PRIMITIVE_COUNT"
            )]
            inner.map.insert(data.clone(), Idx::from_raw(i as u32));
            inner.items.push(data);
        }
        Self {
            inner: RwLock::new(inner),
        }
    }

    /// Intern a type, returning the existing index for equal data.
    ///
    /// Children must already be interned. Data that mentions [`Idx::NONE`] or
    /// an index at or past the end of the pool is not stored and yields
    /// [`Idx::NONE`], so the pool never holds a cycle.
    pub fn intern(&self, data: TypeData) -> Idx {
        if let TypeData::Primitive(tag) = &data {
            if let Some(idx) = tag.primitive_idx() {
                return idx;
            }
        }

        {
            let guard = self.inner.read();
            if let Some(&idx) = guard.map.get(&data) {
                return idx;
            }
        }

        let mut guard = self.inner.write();
        // Double-check after acquiring the write lock
        if let Some(&idx) = guard.map.get(&data) {
            return idx;
        }
        if !data.children_below(guard.items.len()) {
            return Idx::NONE;
        }
        let raw = u32::try_from(guard.items.len())
            .unwrap_or_else(|_| panic!("type pool exceeded u32::MAX entries"));
        let idx = Idx::from_raw(raw);
        guard.items.push(data.clone());
        guard.map.insert(data, idx);
        idx
    }

    /// Structural data for `idx`, or `None` for the sentinel and stale indices.
    pub fn get(&self, idx: Idx) -> Option<TypeData> {
        if idx.is_none() {
            return None;
        }
        self.inner.read().items.get(idx.raw() as usize).cloned()
    }

    pub fn tag(&self, idx: Idx) -> Option<Tag> {
        if let Some(tag) = Tag::PRIMITIVES.get(idx.raw() as usize) {
            return Some(*tag);
        }
        self.get(idx).map(|data| data.tag())
    }

    pub fn contains(&self, idx: Idx) -> bool {
        !idx.is_none() && (idx.raw() as usize) < self.len()
    }

    pub fn len(&self) -> usize {
        self.inner.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // === Constructors ===

    pub fn tuple(&self, elems: &[Idx]) -> Idx {
        if elems.is_empty() {
            return Idx::UNIT;
        }
        self.intern(TypeData::Tuple(elems.to_vec()))
    }

    pub fn struct_type(&self, decl: NominalId, args: &[Idx]) -> Idx {
        self.intern(TypeData::Struct {
            decl,
            args: args.to_vec(),
        })
    }

    pub fn enum_type(&self, decl: NominalId, args: &[Idx]) -> Idx {
        self.intern(TypeData::Enum {
            decl,
            args: args.to_vec(),
        })
    }

    pub fn class_type(&self, decl: NominalId, args: &[Idx]) -> Idx {
        self.intern(TypeData::Class {
            decl,
            args: args.to_vec(),
        })
    }

    /// `any P & Q`; protocols are sorted so composition order is irrelevant.
    pub fn existential(&self, protocols: &[Name]) -> Idx {
        let mut protocols = protocols.to_vec();
        protocols.sort_unstable();
        protocols.dedup();
        self.intern(TypeData::Existential { protocols })
    }

    pub fn function(&self, params: &[Idx], ret: Idx) -> Idx {
        self.intern(TypeData::Function {
            params: params.to_vec(),
            ret,
        })
    }

    pub fn fixed_array(&self, element: Idx, len: u32) -> Idx {
        self.intern(TypeData::FixedArray { element, len })
    }

    pub fn weak(&self, referent: Idx) -> Idx {
        self.intern(TypeData::Weak(referent))
    }

    pub fn generic_param(&self, index: u32, name: Name) -> Idx {
        self.intern(TypeData::GenericParam { index, name })
    }

    pub fn opaque(&self, name: Name) -> Idx {
        self.intern(TypeData::Opaque { name })
    }

    // === Queries ===

    /// Replace every `GenericParam { index }` in `ty` with `args[index]`.
    ///
    /// Parameters without a corresponding argument are left in place, so a
    /// partially applied type keeps its unknown layout. Concrete subtrees are
    /// returned as they are.
    pub fn substitute(&self, ty: Idx, args: &[Idx]) -> Idx {
        if args.is_empty() || !self.has_generic_params(ty) {
            return ty;
        }
        let Some(data) = self.get(ty) else {
            return ty;
        };
        let subst_all =
            |tys: &[Idx]| -> Vec<Idx> { tys.iter().map(|&t| self.substitute(t, args)).collect() };
        match data {
            TypeData::Primitive(_) | TypeData::Existential { .. } | TypeData::Opaque { .. } => ty,
            TypeData::GenericParam { index, .. } => {
                args.get(index as usize).copied().unwrap_or(ty)
            }
            TypeData::Tuple(elems) => self.tuple(&subst_all(&elems)),
            TypeData::Struct { decl, args: inner } => self.struct_type(decl, &subst_all(&inner)),
            TypeData::Enum { decl, args: inner } => self.enum_type(decl, &subst_all(&inner)),
            TypeData::Class { decl, args: inner } => self.class_type(decl, &subst_all(&inner)),
            TypeData::Function { params, ret } => {
                self.function(&subst_all(&params), self.substitute(ret, args))
            }
            TypeData::FixedArray { element, len } => {
                self.fixed_array(self.substitute(element, args), len)
            }
            TypeData::Weak(referent) => self.weak(self.substitute(referent, args)),
        }
    }

    /// True if `ty` mentions an unsubstituted generic parameter anywhere.
    pub fn has_generic_params(&self, ty: Idx) -> bool {
        if ty.is_primitive() {
            return false;
        }
        match self.get(ty) {
            None
            | Some(
                TypeData::Primitive(_) | TypeData::Existential { .. } | TypeData::Opaque { .. },
            ) => false,
            Some(TypeData::GenericParam { .. }) => true,
            Some(
                TypeData::Tuple(elems)
                | TypeData::Struct { args: elems, .. }
                | TypeData::Enum { args: elems, .. }
                | TypeData::Class { args: elems, .. },
            ) => elems.iter().any(|&e| self.has_generic_params(e)),
            Some(TypeData::Function { params, ret }) => {
                params.iter().any(|&p| self.has_generic_params(p)) || self.has_generic_params(ret)
            }
            Some(TypeData::FixedArray { element: inner, .. } | TypeData::Weak(inner)) => {
                self.has_generic_params(inner)
            }
        }
    }

    /// The flat index of `ty` if it is a generic parameter.
    pub fn generic_param_index(&self, ty: Idx) -> Option<u32> {
        match self.get(ty)? {
            TypeData::GenericParam { index, .. } => Some(index),
            _ => None,
        }
    }
}

impl Default for Pool {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool").field("len", &self.len()).finish()
    }
}
