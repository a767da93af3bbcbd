//! Record flattening.
//!
//! Decomposes a value into the primitive members a direct-passing ABI moves
//! through registers, each with its byte offset from the start of the
//! outermost value. Members come out in layout order, so offsets never
//! decrease and spans never overlap.
//!
//! Flattening is lazy: [`RecordMembers`] is an iterator over an explicit
//! work stack. When it meets a member with no register form it yields one
//! [`RecordItem::Unrepresentable`] and stops.

use std::iter::FusedIterator;

use ori_abi_ir::{Idx, TypeData};

use crate::layout::{tag_bytes, tag_type, LayoutStore};

/// One primitive member of a flattened record.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct RecordMember {
    /// Byte offset from the start of the outermost value.
    pub offset: u64,
    pub size: u64,
    /// A primitive type or a class reference.
    pub ty: Idx,
}

/// The member that stopped flattening.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Unrepresentable {
    pub offset: u64,
    pub ty: Idx,
}

/// Item produced by [`RecordMembers`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RecordItem {
    Member(RecordMember),
    /// Terminal: nothing follows.
    Unrepresentable(Unrepresentable),
}

#[derive(Copy, Clone, Debug)]
enum Frame {
    Type {
        ty: Idx,
        offset: u64,
    },
    /// Remaining elements of a fixed array, expanded one at a time.
    Array {
        element: Idx,
        offset: u64,
        stride: u64,
        remaining: u32,
    },
}

/// Lazy flattening of one type into [`RecordItem`]s.
pub struct RecordMembers<'a, 'm> {
    layouts: &'a LayoutStore<'m>,
    stack: Vec<Frame>,
    done: bool,
}

impl<'a, 'm> RecordMembers<'a, 'm> {
    pub fn new(layouts: &'a LayoutStore<'m>, ty: Idx) -> Self {
        Self {
            layouts,
            stack: vec![Frame::Type { ty, offset: 0 }],
            done: false,
        }
    }

    /// All members, or the member that made the record unrepresentable.
    pub fn collect_members(self) -> Result<Vec<RecordMember>, Unrepresentable> {
        let mut members = Vec::new();
        for item in self {
            match item {
                RecordItem::Member(member) => members.push(member),
                RecordItem::Unrepresentable(stop) => return Err(stop),
            }
        }
        Ok(members)
    }

    /// Report every member to `f` if the whole record is representable.
    ///
    /// Nothing is reported for an unrepresentable record.
    pub fn for_each_member(self, mut f: impl FnMut(u64, u64, Idx)) -> bool {
        match self.collect_members() {
            Ok(members) => {
                for member in members {
                    f(member.offset, member.size, member.ty);
                }
                true
            }
            Err(_) => false,
        }
    }

    /// Expand one type at `offset`: yield a leaf, push children, or stop.
    fn expand(&mut self, ty: Idx, offset: u64) -> Option<RecordItem> {
        let stop = RecordItem::Unrepresentable(Unrepresentable { offset, ty });

        let Ok(layout) = self.layouts.layout(ty) else {
            return Some(stop);
        };
        if layout.address_only {
            return Some(stop);
        }
        if layout.size() == 0 {
            return None;
        }
        let leaf = |ty, size| {
            Some(RecordItem::Member(RecordMember { offset, size, ty }))
        };
        if ty.is_primitive() {
            return leaf(ty, layout.size());
        }

        let Some(data) = self.layouts.module().pool().get(ty) else {
            return Some(stop);
        };
        match data {
            TypeData::Class { .. } => leaf(ty, layout.size()),
            TypeData::Function { .. } => {
                let word = self.layouts.pointer_width();
                self.stack.push(Frame::Type {
                    ty: Idx::RAW_POINTER,
                    offset: offset + word,
                });
                leaf(Idx::RAW_POINTER, word)
            }
            TypeData::Tuple(elems) => self.push_fields(ty, offset, &elems),
            TypeData::Struct { decl, args } => {
                match self.layouts.struct_fields(ty, decl, &args) {
                    Ok(fields) => self.push_fields(ty, offset, &fields),
                    Err(_) => Some(stop),
                }
            }
            TypeData::Enum { decl, args } => {
                let Ok(payloads) = self.layouts.enum_payloads(ty, decl, &args) else {
                    return Some(stop);
                };
                // Zero-sized payloads leave only the tag at offset zero.
                let payload_free = payloads.iter().flatten().all(|&payload| {
                    self.layouts
                        .size_and_alignment(payload)
                        .is_some_and(|sa| sa.is_zero_sized())
                });
                if payload_free {
                    let bytes = tag_bytes(payloads.len());
                    return match tag_type(bytes) {
                        Some(tag_ty) => leaf(tag_ty, bytes),
                        None => Some(stop),
                    };
                }
                match payloads.as_slice() {
                    [Some(payload)] => {
                        self.stack.push(Frame::Type {
                            ty: *payload,
                            offset,
                        });
                        None
                    }
                    _ => Some(stop),
                }
            }
            TypeData::FixedArray { element, len } => {
                let stride = layout.size() / u64::from(len.max(1));
                self.stack.push(Frame::Array {
                    element,
                    offset,
                    stride,
                    remaining: len,
                });
                None
            }
            TypeData::Primitive(_)
            | TypeData::Existential { .. }
            | TypeData::Weak(_)
            | TypeData::GenericParam { .. }
            | TypeData::Opaque { .. } => Some(stop),
        }
    }

    fn push_fields(&mut self, owner: Idx, offset: u64, fields: &[Idx]) -> Option<RecordItem> {
        let Ok(offsets) = self.layouts.field_offsets(owner, fields) else {
            return Some(RecordItem::Unrepresentable(Unrepresentable { offset, ty: owner }));
        };
        for (&field, &field_offset) in fields.iter().zip(offsets.iter()).rev() {
            self.stack.push(Frame::Type {
                ty: field,
                offset: offset + field_offset,
            });
        }
        None
    }
}

impl Iterator for RecordMembers<'_, '_> {
    type Item = RecordItem;

    fn next(&mut self) -> Option<RecordItem> {
        if self.done {
            return None;
        }
        while let Some(frame) = self.stack.pop() {
            let (ty, offset) = match frame {
                Frame::Type { ty, offset } => (ty, offset),
                Frame::Array {
                    element,
                    offset,
                    stride,
                    remaining,
                } => {
                    if remaining > 1 {
                        self.stack.push(Frame::Array {
                            element,
                            offset: offset + stride,
                            stride,
                            remaining: remaining - 1,
                        });
                    }
                    (element, offset)
                }
            };
            match self.expand(ty, offset) {
                Some(item @ RecordItem::Unrepresentable(_)) => {
                    self.done = true;
                    self.stack.clear();
                    return Some(item);
                }
                Some(item) => return Some(item),
                None => {}
            }
        }
        self.done = true;
        None
    }
}

impl FusedIterator for RecordMembers<'_, '_> {}

impl std::fmt::Debug for RecordMembers<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordMembers")
            .field("pending", &self.stack.len())
            .field("done", &self.done)
            .finish()
    }
}
