//! Resolved-program model for Ori ABI lowering.
//!
//! ABI lowering runs after type checking and only ever reads. This crate is
//! the boundary between the two: an interned type [`Pool`] addressed by
//! [`Idx`], interned [`Name`]s, and a [`Module`] of resolved nominal and
//! function declarations with their solved generic requirements.
//!
//! Nothing here computes layout; see `ori_abi` for that.

mod decl;
mod idx;
mod name;
mod pool;
mod tag;

pub use decl::{
    EnumCaseDecl, EnumCaseId, FieldDecl, FunctionDecl, FunctionId, GenericRequirement,
    GenericRequirementKind, Module, NominalDecl, NominalId, NominalKind, ParamConvention,
    ParamDecl,
};
pub use idx::Idx;
pub use name::{Name, StringInterner};
pub use pool::{Pool, TypeData};
pub use tag::Tag;
