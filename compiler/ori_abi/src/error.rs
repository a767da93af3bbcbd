//! Error types for ABI queries.
//!
//! Public queries mostly answer with `Option`/`bool`: a caller that cannot
//! get a layout falls back to passing indirectly. These types carry the cause
//! for `try_*` entry points, tracing, and tests.

use ori_abi_ir::{FunctionId, Idx, NominalId};
use thiserror::Error;

/// Why a type has no fixed layout.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("layout depends on unresolved generic parameter {0:?}")]
    UnresolvedGeneric(Idx),

    #[error("opaque type {0:?} has no static layout")]
    Opaque(Idx),

    #[error("nominal {0:?} is resilient; its layout is not visible here")]
    Resilient(NominalId),

    #[error("type {0:?} contains itself by value")]
    Cycle(Idx),

    #[error("type {0:?} is nested too deeply (limit {limit})", limit = crate::layout::MAX_LAYOUT_DEPTH)]
    DepthLimit(Idx),

    #[error("size of {0:?} overflows u64")]
    TooLarge(Idx),

    #[error("{0:?} does not name a valid type")]
    InvalidType(Idx),

    #[error("{0:?} does not name a declaration in this module")]
    UnknownNominal(NominalId),
}

/// Why a function signature could not be lowered.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LowerError {
    #[error("unknown function {0:?}")]
    UnknownFunction(FunctionId),

    #[error("{what} has no fixed layout")]
    Layout {
        what: String,
        #[source]
        source: LayoutError,
    },

    #[error("generic requirement on {0:?} does not name a generic parameter")]
    InvalidRequirement(Idx),
}

/// Invalid target or budget configuration.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unsupported target '{triple}'. Supported targets: {}", supported.join(", "))]
    UnsupportedTarget {
        triple: String,
        supported: Vec<&'static str>,
    },

    #[error("invalid target triple '{triple}': {reason}")]
    InvalidTripleFormat { triple: String, reason: String },

    #[error("invalid ABI budget `{field}`: {reason}")]
    InvalidBudget {
        field: &'static str,
        reason: &'static str,
    },
}
