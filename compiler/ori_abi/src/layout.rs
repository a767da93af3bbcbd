//! Type layout oracle.
//!
//! Computes size, alignment, and address-only-ness for every type with a
//! statically fixed layout. Results are memoized per `Idx` behind a
//! `RwLock` so a single store can serve concurrent queries.
//!
//! # Layout rules
//!
//! Aggregates place fields in declaration order, each at the next offset
//! aligned to the field's alignment, and round the total up to the largest
//! alignment. Enums without payloads are just a tag; an enum with a single
//! case is laid out as its payload; any other enum with payloads stores the
//! largest payload followed by the tag.
//!
//! # Recursion
//!
//! Each query carries its own visiting stack. A type that is reached again
//! while it is still being laid out contains itself by value and has no
//! layout. Nesting is additionally capped at [`MAX_LAYOUT_DEPTH`] so that
//! polymorphic recursion (`S<T>` containing `S<(T, T)>`) terminates. The cap
//! counts nesting height below a type rather than the depth of the current
//! query, so the answer for a type never depends on which query saw it first.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use ori_abi_ir::{Idx, Module, NominalDecl, NominalId, NominalKind, TypeData};

use crate::LayoutError;

/// Maximum aggregate nesting height before layout gives up.
pub const MAX_LAYOUT_DEPTH: usize = 64;

/// Byte size and alignment of a type.
///
/// `alignment` is never zero and `size` is always a multiple of it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct SizeAndAlignment {
    pub size: u64,
    pub alignment: u64,
}

impl SizeAndAlignment {
    /// Layout of `()`, `Never`, and empty aggregates.
    pub const ZERO: Self = Self {
        size: 0,
        alignment: 1,
    };

    #[inline]
    pub const fn new(size: u64, alignment: u64) -> Self {
        Self { size, alignment }
    }

    /// A scalar whose alignment equals its size.
    #[inline]
    pub const fn scalar(bytes: u64) -> Self {
        Self {
            size: bytes,
            alignment: bytes,
        }
    }

    #[inline]
    pub const fn is_zero_sized(self) -> bool {
        self.size == 0
    }
}

/// Full layout facts for one type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeLayout {
    pub size_and_alignment: SizeAndAlignment,
    /// Values must stay in memory (the type holds a weak reference).
    pub address_only: bool,
}

impl TypeLayout {
    const fn loadable(size_and_alignment: SizeAndAlignment) -> Self {
        Self {
            size_and_alignment,
            address_only: false,
        }
    }

    #[inline]
    pub const fn size(&self) -> u64 {
        self.size_and_alignment.size
    }

    #[inline]
    pub const fn alignment(&self) -> u64 {
        self.size_and_alignment.alignment
    }
}

/// Round `offset` up to the next multiple of `align`.
///
/// Returns `None` on overflow.
#[inline]
pub fn align_up(offset: u64, align: u64) -> Option<u64> {
    offset.checked_next_multiple_of(align.max(1))
}

/// Tag width in bytes for an enum with `case_count` cases.
pub fn tag_bytes(case_count: usize) -> u64 {
    match case_count {
        0 | 1 => 0,
        2..=0x100 => 1,
        0x101..=0x1_0000 => 2,
        _ => 4,
    }
}

/// Unsigned integer type holding a tag of `bytes` width.
pub(crate) fn tag_type(bytes: u64) -> Option<Idx> {
    match bytes {
        1 => Some(Idx::UINT8),
        2 => Some(Idx::UINT16),
        4 => Some(Idx::UINT32),
        _ => None,
    }
}

/// Cached layout plus the nesting height below it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Entry {
    layout: TypeLayout,
    height: usize,
}

/// Fields of a tuple or struct placed in order.
struct RecordLayout {
    layout: TypeLayout,
    height: usize,
    offsets: SmallVec<[u64; 4]>,
}

/// Memoizing layout oracle for one module and pointer width.
pub struct LayoutStore<'m> {
    module: &'m Module,
    pointer_width: u64,
    cache: RwLock<FxHashMap<Idx, Result<Entry, LayoutError>>>,
}

impl<'m> LayoutStore<'m> {
    pub fn new(module: &'m Module, pointer_width: u64) -> Self {
        Self {
            module,
            pointer_width,
            cache: RwLock::new(FxHashMap::default()),
        }
    }

    pub fn module(&self) -> &'m Module {
        self.module
    }

    pub fn pointer_width(&self) -> u64 {
        self.pointer_width
    }

    /// Layout of `ty`, or the reason it has none.
    pub fn layout(&self, ty: Idx) -> Result<TypeLayout, LayoutError> {
        let mut stack = Vec::new();
        self.layout_in(ty, &mut stack).map(|entry| entry.layout)
    }

    /// Size and alignment of `ty` if it has a fixed layout.
    pub fn size_and_alignment(&self, ty: Idx) -> Option<SizeAndAlignment> {
        self.layout(ty).ok().map(|layout| layout.size_and_alignment)
    }

    /// Layout of a declaration's unspecialised type.
    ///
    /// Generic declarations have no layout without arguments.
    pub fn nominal_layout(&self, id: NominalId) -> Result<TypeLayout, LayoutError> {
        self.visible_nominal(id)?;
        if let Some(&first) = self.module.generic_param_types(id).first() {
            return Err(LayoutError::UnresolvedGeneric(first));
        }
        let ty = self
            .module
            .nominal_type(id, &[])
            .ok_or(LayoutError::UnknownNominal(id))?;
        self.layout(ty)
    }

    /// Byte offset of each of `fields` when laid out as a record.
    pub(crate) fn field_offsets(
        &self,
        owner: Idx,
        fields: &[Idx],
    ) -> Result<SmallVec<[u64; 4]>, LayoutError> {
        let mut stack = Vec::new();
        self.record(owner, fields, &mut stack)
            .map(|record| record.offsets)
    }

    /// Field types of `decl<args>` with the arguments substituted.
    pub(crate) fn struct_fields(
        &self,
        owner: Idx,
        decl: NominalId,
        args: &[Idx],
    ) -> Result<SmallVec<[Idx; 4]>, LayoutError> {
        let nominal = self.visible_nominal(decl)?;
        let NominalKind::Struct { fields } = &nominal.kind else {
            return Err(LayoutError::InvalidType(owner));
        };
        let pool = self.module.pool();
        Ok(fields.iter().map(|f| pool.substitute(f.ty, args)).collect())
    }

    /// Case payloads of `decl<args>` with the arguments substituted.
    pub(crate) fn enum_payloads(
        &self,
        owner: Idx,
        decl: NominalId,
        args: &[Idx],
    ) -> Result<SmallVec<[Option<Idx>; 4]>, LayoutError> {
        let nominal = self.visible_nominal(decl)?;
        let NominalKind::Enum { cases } = &nominal.kind else {
            return Err(LayoutError::InvalidType(owner));
        };
        let pool = self.module.pool();
        Ok(cases
            .iter()
            .map(|case| case.payload.map(|p| pool.substitute(p, args)))
            .collect())
    }

    fn visible_nominal(&self, id: NominalId) -> Result<&'m NominalDecl, LayoutError> {
        let decl = self
            .module
            .nominal(id)
            .ok_or(LayoutError::UnknownNominal(id))?;
        if decl.is_resilient {
            return Err(LayoutError::Resilient(id));
        }
        Ok(decl)
    }

    // -- Core computation --

    fn layout_in(&self, ty: Idx, stack: &mut Vec<Idx>) -> Result<Entry, LayoutError> {
        if let Some(layout) = self.primitive_layout(ty) {
            return Ok(Entry { layout, height: 0 });
        }

        let cached = self.cache.read().get(&ty).cloned();
        if let Some(cached) = cached {
            let entry = cached?;
            if stack.len() + entry.height > MAX_LAYOUT_DEPTH {
                return Err(LayoutError::DepthLimit(ty));
            }
            return Ok(entry);
        }

        if stack.contains(&ty) {
            tracing::warn!(?ty, "recursive type contains itself by value");
            return Err(LayoutError::Cycle(ty));
        }
        if stack.len() >= MAX_LAYOUT_DEPTH {
            tracing::warn!(?ty, depth = stack.len(), "layout nesting limit reached");
            return Err(LayoutError::DepthLimit(ty));
        }

        stack.push(ty);
        let result = self.compute(ty, stack).map(|(layout, below)| Entry {
            layout,
            height: below + 1,
        });
        stack.pop();

        // A depth failure belongs to the query that hit it, not to `ty`.
        if matches!(result, Err(LayoutError::DepthLimit(_))) {
            return result;
        }
        self.cache.write().entry(ty).or_insert(result).clone()
    }

    fn primitive_layout(&self, ty: Idx) -> Option<TypeLayout> {
        let size_and_alignment = match ty {
            Idx::BOOL | Idx::INT8 | Idx::UINT8 => SizeAndAlignment::scalar(1),
            Idx::INT16 | Idx::UINT16 => SizeAndAlignment::scalar(2),
            Idx::INT32 | Idx::UINT32 | Idx::FLOAT32 => SizeAndAlignment::scalar(4),
            Idx::INT64 | Idx::UINT64 | Idx::FLOAT64 => SizeAndAlignment::scalar(8),
            Idx::INT | Idx::UINT | Idx::RAW_POINTER => SizeAndAlignment::scalar(self.pointer_width),
            Idx::UNIT | Idx::NEVER => SizeAndAlignment::ZERO,
            _ => return None,
        };
        Some(TypeLayout::loadable(size_and_alignment))
    }

    /// Layout of a non-primitive type and the nesting height of its children.
    fn compute(&self, ty: Idx, stack: &mut Vec<Idx>) -> Result<(TypeLayout, usize), LayoutError> {
        let Some(data) = self.module.pool().get(ty) else {
            return Err(LayoutError::InvalidType(ty));
        };
        let p = self.pointer_width;

        match data {
            TypeData::Primitive(tag) => tag
                .primitive_idx()
                .and_then(|idx| self.primitive_layout(idx))
                .map(|layout| (layout, 0))
                .ok_or(LayoutError::InvalidType(ty)),
            TypeData::Tuple(elems) => {
                let record = self.record(ty, &elems, stack)?;
                Ok((record.layout, record.height))
            }
            TypeData::Struct { decl, args } => {
                let fields = self.struct_fields(ty, decl, &args)?;
                let record = self.record(ty, &fields, stack)?;
                Ok((record.layout, record.height))
            }
            TypeData::Enum { decl, args } => {
                let payloads = self.enum_payloads(ty, decl, &args)?;
                self.enumeration(ty, &payloads, stack)
            }
            TypeData::Class { .. } => Ok((TypeLayout::loadable(SizeAndAlignment::scalar(p)), 0)),
            TypeData::Existential { protocols } => {
                let words = 1 + protocols.len().max(1) as u64;
                Ok((TypeLayout::loadable(SizeAndAlignment::new(words * p, p)), 0))
            }
            TypeData::Function { .. } => {
                Ok((TypeLayout::loadable(SizeAndAlignment::new(2 * p, p)), 0))
            }
            TypeData::FixedArray { element, len } => {
                let elem = self.layout_in(element, stack)?;
                let size = elem
                    .layout
                    .size()
                    .checked_mul(u64::from(len))
                    .ok_or(LayoutError::TooLarge(ty))?;
                let layout = TypeLayout {
                    size_and_alignment: SizeAndAlignment::new(size, elem.layout.alignment()),
                    address_only: elem.layout.address_only,
                };
                Ok((layout, elem.height))
            }
            TypeData::Weak(_) => Ok((
                TypeLayout {
                    size_and_alignment: SizeAndAlignment::scalar(p),
                    address_only: true,
                },
                0,
            )),
            TypeData::GenericParam { .. } => Err(LayoutError::UnresolvedGeneric(ty)),
            TypeData::Opaque { .. } => Err(LayoutError::Opaque(ty)),
        }
    }

    fn record(
        &self,
        owner: Idx,
        fields: &[Idx],
        stack: &mut Vec<Idx>,
    ) -> Result<RecordLayout, LayoutError> {
        let mut offsets = SmallVec::with_capacity(fields.len());
        let mut offset = 0u64;
        let mut alignment = 1u64;
        let mut address_only = false;
        let mut height = 0;

        for &field in fields {
            let entry = self.layout_in(field, stack)?;
            let field_offset =
                align_up(offset, entry.layout.alignment()).ok_or(LayoutError::TooLarge(owner))?;
            offsets.push(field_offset);
            offset = field_offset
                .checked_add(entry.layout.size())
                .ok_or(LayoutError::TooLarge(owner))?;
            alignment = alignment.max(entry.layout.alignment());
            address_only |= entry.layout.address_only;
            height = height.max(entry.height);
        }

        let size = align_up(offset, alignment).ok_or(LayoutError::TooLarge(owner))?;
        Ok(RecordLayout {
            layout: TypeLayout {
                size_and_alignment: SizeAndAlignment::new(size, alignment),
                address_only,
            },
            height,
            offsets,
        })
    }

    fn enumeration(
        &self,
        owner: Idx,
        payloads: &[Option<Idx>],
        stack: &mut Vec<Idx>,
    ) -> Result<(TypeLayout, usize), LayoutError> {
        let tag = tag_bytes(payloads.len());

        if payloads.iter().all(Option::is_none) {
            let layout = if tag == 0 {
                SizeAndAlignment::ZERO
            } else {
                SizeAndAlignment::scalar(tag)
            };
            return Ok((TypeLayout::loadable(layout), 0));
        }

        if let [Some(only)] = payloads {
            let entry = self.layout_in(*only, stack)?;
            return Ok((entry.layout, entry.height));
        }

        let mut payload_size = 0u64;
        let mut alignment = tag.max(1);
        let mut address_only = false;
        let mut height = 0;
        for &payload in payloads.iter().flatten() {
            let entry = self.layout_in(payload, stack)?;
            payload_size = payload_size.max(entry.layout.size());
            alignment = alignment.max(entry.layout.alignment());
            address_only |= entry.layout.address_only;
            height = height.max(entry.height);
        }

        let size = align_up(payload_size, tag)
            .and_then(|tag_offset| tag_offset.checked_add(tag))
            .and_then(|end| align_up(end, alignment))
            .ok_or(LayoutError::TooLarge(owner))?;
        Ok((
            TypeLayout {
                size_and_alignment: SizeAndAlignment::new(size, alignment),
                address_only,
            },
            height,
        ))
    }
}

impl std::fmt::Debug for LayoutStore<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutStore")
            .field("pointer_width", &self.pointer_width)
            .field("cached", &self.cache.read().len())
            .finish_non_exhaustive()
    }
}
