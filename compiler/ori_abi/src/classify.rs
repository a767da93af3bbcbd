//! Direct vs indirect passing.
//!
//! A value travels by value only if every check below passes, in order:
//!
//! 1. its layout is known
//! 2. it is not address-only
//! 3. its size fits the position's byte budget
//! 4. it flattens into primitive members
//! 5. the member count fits `max_direct_members`
//!
//! The first failing check is recorded as the [`IndirectReason`].

use ori_abi_ir::Idx;

use crate::config::AbiConfig;
use crate::flatten::{RecordItem, RecordMembers};
use crate::layout::LayoutStore;

/// Where a value appears in a signature.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Position {
    Parameter,
    Result,
}

/// Why a value is passed through memory.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum IndirectReason {
    UnknownLayout,
    AddressOnly,
    TooLarge { size: u64, budget: u64 },
    Unrepresentable,
    TooManyMembers { count: usize, budget: usize },
    /// `inout` parameters are passed by address regardless of type.
    InOut,
}

/// How a parameter or result crosses the call boundary.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Passing {
    Direct,
    Indirect(IndirectReason),
}

impl Passing {
    #[inline]
    pub fn is_direct(self) -> bool {
        matches!(self, Passing::Direct)
    }

    #[inline]
    pub fn is_indirect(self) -> bool {
        !self.is_direct()
    }

    pub fn indirect_reason(self) -> Option<IndirectReason> {
        match self {
            Passing::Direct => None,
            Passing::Indirect(reason) => Some(reason),
        }
    }
}

/// Classify a value of type `ty` at `position`.
pub fn classify(
    ty: Idx,
    position: Position,
    layouts: &LayoutStore<'_>,
    config: &AbiConfig,
) -> Passing {
    let budget = match position {
        Position::Parameter => config.max_direct_param_bytes(),
        Position::Result => config.max_direct_result_bytes(),
    };

    let layout = match layouts.layout(ty) {
        Ok(layout) => layout,
        Err(err) => {
            tracing::trace!(?ty, %err, "no fixed layout");
            return Passing::Indirect(IndirectReason::UnknownLayout);
        }
    };
    if layout.address_only {
        return Passing::Indirect(IndirectReason::AddressOnly);
    }
    if layout.size() > budget {
        return Passing::Indirect(IndirectReason::TooLarge {
            size: layout.size(),
            budget,
        });
    }

    let mut count = 0usize;
    for item in RecordMembers::new(layouts, ty) {
        match item {
            RecordItem::Member(_) => count += 1,
            RecordItem::Unrepresentable(stop) => {
                tracing::trace!(?ty, member = ?stop.ty, offset = stop.offset, "unrepresentable member");
                return Passing::Indirect(IndirectReason::Unrepresentable);
            }
        }
    }
    let max_members = config.max_direct_members();
    if count > max_members {
        return Passing::Indirect(IndirectReason::TooManyMembers {
            count,
            budget: max_members,
        });
    }

    Passing::Direct
}
