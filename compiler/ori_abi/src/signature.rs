//! Lowered function signatures.
//!
//! [`LoweredFunctionSignature`] is the physical view of one function
//! declaration: which results come back through hidden output pointers,
//! which (if any) come back in registers, how each explicit parameter is
//! passed, and which implicit parameters trail the explicit ones.
//!
//! The ABI parameter list is, in order:
//!
//! ```text
//! [indirect result pointers...] [explicit parameters...] [additional params...]
//! ```
//!
//! A signature borrows the declaration from the module and the provider
//! that produced it; its own classification results are an owned snapshot.

use smallvec::SmallVec;

use ori_abi_ir::{FunctionDecl, FunctionId, Idx, ParamDecl};

use crate::classify::{IndirectReason, Passing, Position};
use crate::flatten::RecordMembers;
use crate::implicit::{self, AbiAdditionalParam, AdditionalParams};
use crate::layout::SizeAndAlignment;
use crate::provider::AbiDetailsProvider;
use crate::{LayoutError, LowerError};

// ---------------------------------------------------------------------------
// Parameter views
// ---------------------------------------------------------------------------

/// A result returned through a hidden output pointer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct IndirectResultValue {
    ty: Idx,
    result_index: usize,
    sret: bool,
}

impl IndirectResultValue {
    /// The type of the result stored through the pointer.
    pub fn ty(&self) -> Idx {
        self.ty
    }

    /// Position among the declaration's formal results.
    pub fn result_index(&self) -> usize {
        self.result_index
    }

    /// True for the first indirect result only (the `sret` slot).
    pub fn has_sret(&self) -> bool {
        self.sret
    }
}

/// An explicit parameter passed by value.
#[derive(Copy, Clone)]
pub struct DirectParameter<'p, 'm> {
    provider: &'p AbiDetailsProvider<'m>,
    decl: &'m ParamDecl,
    index: usize,
}

impl<'p, 'm> DirectParameter<'p, 'm> {
    pub fn param_decl(&self) -> &'m ParamDecl {
        self.decl
    }

    /// Position among the explicit parameters.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The primitive members moved in registers.
    pub fn enumerate_record_members(&self) -> RecordMembers<'p, 'm> {
        RecordMembers::new(self.provider.layouts(), self.decl.ty)
    }
}

impl std::fmt::Debug for DirectParameter<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectParameter")
            .field("decl", self.decl)
            .field("index", &self.index)
            .finish()
    }
}

/// An explicit parameter passed by address.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct IndirectParameter<'m> {
    decl: &'m ParamDecl,
    index: usize,
    reason: IndirectReason,
}

impl<'m> IndirectParameter<'m> {
    pub fn param_decl(&self) -> &'m ParamDecl {
        self.decl
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn reason(&self) -> IndirectReason {
        self.reason
    }
}

/// One entry of the physical parameter list, excluding additional params.
#[derive(Copy, Clone, Debug)]
pub enum AbiParameter<'p, 'm> {
    IndirectResult(IndirectResultValue),
    Direct(DirectParameter<'p, 'm>),
    Indirect(IndirectParameter<'m>),
}

/// The results returned in registers, viewed as one record.
#[derive(Copy, Clone)]
pub struct DirectResultType<'p, 'm> {
    provider: &'p AbiDetailsProvider<'m>,
    ty: Idx,
}

impl<'p, 'm> DirectResultType<'p, 'm> {
    /// The single direct result, or a tuple of several.
    pub fn ty(&self) -> Idx {
        self.ty
    }

    pub fn size_and_alignment(&self) -> Option<SizeAndAlignment> {
        self.provider.size_and_alignment(self.ty)
    }

    pub fn enumerate_record_members(&self) -> RecordMembers<'p, 'm> {
        RecordMembers::new(self.provider.layouts(), self.ty)
    }
}

impl std::fmt::Debug for DirectResultType<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectResultType")
            .field("ty", &self.ty)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Lowered signature
// ---------------------------------------------------------------------------

/// The ABI-level shape of one function declaration.
pub struct LoweredFunctionSignature<'p, 'm> {
    provider: &'p AbiDetailsProvider<'m>,
    decl: &'m FunctionDecl,
    /// One entry per explicit parameter, in declaration order.
    params: SmallVec<[Passing; 4]>,
    indirect_results: SmallVec<[IndirectResultValue; 1]>,
    direct_result: Option<Idx>,
    additional: AdditionalParams,
}

impl<'p, 'm> LoweredFunctionSignature<'p, 'm> {
    pub(crate) fn lower(
        provider: &'p AbiDetailsProvider<'m>,
        id: FunctionId,
    ) -> Result<Self, LowerError> {
        let module = provider.module();
        let decl = module.function(id).ok_or(LowerError::UnknownFunction(id))?;

        for param in decl.params.iter().chain(decl.self_param.iter()) {
            check_layout(provider, param.ty, || {
                format!("parameter `{}`", module.lookup(param.name))
            })?;
        }
        for (index, &ty) in decl.results.iter().enumerate() {
            check_layout(provider, ty, || format!("result {index}"))?;
        }

        let params = decl
            .params
            .iter()
            .map(|param| provider.param_passing(param))
            .collect();

        let (direct_result, indirect_results) = split_results(provider, &decl.results);
        let direct_result = direct_result.filter(|&ty| {
            provider
                .size_and_alignment(ty)
                .is_some_and(|sa| !sa.is_zero_sized())
        });

        let additional = implicit::additional_params(module, decl)?;

        Ok(Self {
            provider,
            decl,
            params,
            indirect_results,
            direct_result,
            additional,
        })
    }

    pub fn function_decl(&self) -> &'m FunctionDecl {
        self.decl
    }

    /// Number of hidden output pointers at the front of the parameter list.
    pub fn num_indirect_result_values(&self) -> usize {
        self.indirect_results.len()
    }

    pub fn indirect_result_values(&self) -> &[IndirectResultValue] {
        &self.indirect_results
    }

    /// The results returned in registers, if there is anything to return.
    pub fn direct_result_type(&self) -> Option<DirectResultType<'p, 'm>> {
        self.direct_result.map(|ty| DirectResultType {
            provider: self.provider,
            ty,
        })
    }

    /// Implicit parameters following the explicit ones.
    pub fn additional_params(&self) -> &[AbiAdditionalParam] {
        &self.additional
    }

    /// Indirect results, then explicit parameters in declaration order.
    pub fn abi_parameters(&self) -> impl Iterator<Item = AbiParameter<'p, 'm>> + '_ {
        let provider = self.provider;
        let decl: &'m FunctionDecl = self.decl;
        let explicit = decl
            .params
            .iter()
            .zip(self.params.iter())
            .enumerate()
            .map(move |(index, (param, passing))| match *passing {
                Passing::Direct => AbiParameter::Direct(DirectParameter {
                    provider,
                    decl: param,
                    index,
                }),
                Passing::Indirect(reason) => AbiParameter::Indirect(IndirectParameter {
                    decl: param,
                    index,
                    reason,
                }),
            });
        self.indirect_results
            .iter()
            .copied()
            .map(AbiParameter::IndirectResult)
            .chain(explicit)
    }

    /// Walk [`abi_parameters`](Self::abi_parameters), dispatching by kind.
    pub fn visit_parameter_list(
        &self,
        mut indirect_result: impl FnMut(&IndirectResultValue),
        mut direct_param: impl FnMut(&DirectParameter<'p, 'm>),
        mut indirect_param: impl FnMut(&IndirectParameter<'m>),
    ) {
        for param in self.abi_parameters() {
            match &param {
                AbiParameter::IndirectResult(value) => indirect_result(value),
                AbiParameter::Direct(direct) => direct_param(direct),
                AbiParameter::Indirect(indirect) => indirect_param(indirect),
            }
        }
    }
}

impl std::fmt::Debug for LoweredFunctionSignature<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoweredFunctionSignature")
            .field("params", &self.params)
            .field("indirect_results", &self.indirect_results)
            .field("direct_result", &self.direct_result)
            .field("additional", &self.additional)
            .finish_non_exhaustive()
    }
}

/// Split results into the register-returned value and hidden output pointers.
///
/// Results that fit on their own start out direct. If together they do not
/// fit the return budget, direct results are demoted from the back until the
/// rest do. A single remaining result always fits, since it classified
/// direct on its own. Indirect results stay in result order and the first
/// one carries `sret`.
fn split_results(
    provider: &AbiDetailsProvider<'_>,
    results: &[Idx],
) -> (Option<Idx>, SmallVec<[IndirectResultValue; 1]>) {
    let mut direct: SmallVec<[usize; 2]> = (0..results.len())
        .filter(|&index| !provider.should_return_indirectly(results[index]))
        .collect();

    let direct_result = loop {
        match direct.as_slice() {
            [] => break None,
            [single] => break Some(results[*single]),
            several => {
                let tys: SmallVec<[Idx; 4]> = several.iter().map(|&i| results[i]).collect();
                let combined = provider.module().pool().tuple(&tys);
                match provider.passing(combined, Position::Result) {
                    Passing::Direct => break Some(combined),
                    Passing::Indirect(reason) => {
                        let demoted = direct.pop();
                        tracing::debug!(?combined, ?reason, ?demoted, "demoting direct result");
                    }
                }
            }
        }
    };

    let mut indirect = SmallVec::<[IndirectResultValue; 1]>::new();
    for (result_index, &ty) in results.iter().enumerate() {
        if !direct.contains(&result_index) {
            indirect.push(IndirectResultValue {
                ty,
                result_index,
                sret: indirect.is_empty(),
            });
        }
    }
    (direct_result, indirect)
}

/// Fail on layouts that are broken rather than merely unknown.
fn check_layout(
    provider: &AbiDetailsProvider<'_>,
    ty: Idx,
    what: impl FnOnce() -> String,
) -> Result<(), LowerError> {
    match provider.layouts().layout(ty) {
        Ok(_)
        | Err(
            LayoutError::UnresolvedGeneric(_) | LayoutError::Opaque(_) | LayoutError::Resilient(_),
        ) => Ok(()),
        Err(source) => Err(LowerError::Layout {
            what: what(),
            source,
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "tests use unwrap to panic on unexpected state")]
mod tests;
