//! Implicit ABI parameters.
//!
//! Besides its explicit parameters a call may carry generic context, the
//! receiver, and an error slot. They follow the explicit parameters in a
//! fixed category order:
//!
//! 1. generic requirements the caller must pass, in requirement order
//! 2. metadata sources: requirements whose metadata an argument already
//!    carries, in requirement order
//! 3. the receiver
//! 4. the error slot of a throwing function
//!
//! Metadata for `T` can be recovered from an argument when an explicit
//! parameter (first match wins), or failing that the receiver, is a class
//! instance whose generic arguments contain `T` directly. Witness tables
//! always have to be passed.

use smallvec::SmallVec;

use ori_abi_ir::{FunctionDecl, GenericRequirement, Idx, Module, TypeData};

use crate::LowerError;

/// One implicit parameter.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AbiAdditionalParam {
    /// Metadata or witness table passed by the caller.
    GenericRequirement(GenericRequirement),
    /// Metadata recovered from the argument of this type.
    GenericTypeMetadataSource(Idx),
    SelfParam,
    Error,
}

impl AbiAdditionalParam {
    /// The requirement payload.
    ///
    /// # Panics
    ///
    /// Panics unless this is [`AbiAdditionalParam::GenericRequirement`].
    pub fn generic_requirement(&self) -> &GenericRequirement {
        match self {
            AbiAdditionalParam::GenericRequirement(req) => req,
            other => panic!("generic_requirement() called on {other:?}"),
        }
    }

    /// The type of the argument metadata is recovered from.
    ///
    /// # Panics
    ///
    /// Panics unless this is [`AbiAdditionalParam::GenericTypeMetadataSource`].
    pub fn metadata_source_type(&self) -> Idx {
        match self {
            AbiAdditionalParam::GenericTypeMetadataSource(ty) => *ty,
            other => panic!("metadata_source_type() called on {other:?}"),
        }
    }
}

pub type AdditionalParams = SmallVec<[AbiAdditionalParam; 1]>;

/// Compute the implicit parameters of `decl`.
pub fn additional_params(
    module: &Module,
    decl: &FunctionDecl,
) -> Result<AdditionalParams, LowerError> {
    let pool = module.pool();
    let mut passed = AdditionalParams::new();
    let mut sources = AdditionalParams::new();

    for req in &decl.requirements {
        if pool.generic_param_index(req.ty).is_none() {
            return Err(LowerError::InvalidRequirement(req.ty));
        }
        let source = if req.is_metadata() {
            metadata_source(module, decl, req.ty)
        } else {
            None
        };
        match source {
            Some(ty) => sources.push(AbiAdditionalParam::GenericTypeMetadataSource(ty)),
            None => passed.push(AbiAdditionalParam::GenericRequirement(*req)),
        }
    }

    passed.extend(sources);
    if decl.self_param.is_some() {
        passed.push(AbiAdditionalParam::SelfParam);
    }
    if decl.throws {
        passed.push(AbiAdditionalParam::Error);
    }
    Ok(passed)
}

/// The argument type carrying `param`'s metadata, if any.
fn metadata_source(module: &Module, decl: &FunctionDecl, param: Idx) -> Option<Idx> {
    let pool = module.pool();
    let carries = |ty: Idx| {
        matches!(pool.get(ty), Some(TypeData::Class { args, .. }) if args.contains(&param))
    };
    decl.params
        .iter()
        .chain(decl.self_param.iter())
        .map(|p| p.ty)
        .find(|&ty| carries(ty))
}
