//! The ABI details provider.
//!
//! One [`AbiDetailsProvider`] answers every ABI question about one module
//! under one target configuration. Queries are read-only from the caller's
//! point of view; layouts and passing decisions are memoized internally and
//! the first computed value for a key is the one every later reader sees.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use ori_abi_ir::{FunctionId, GenericRequirement, Idx, Module, NominalId, ParamConvention, ParamDecl};

use crate::classify::{self, IndirectReason, Passing, Position};
use crate::config::AbiConfig;
use crate::enum_tags::{self, EnumTagMapping};
use crate::flatten::RecordMembers;
use crate::implicit::AdditionalParams;
use crate::layout::{LayoutStore, SizeAndAlignment};
use crate::metadata::{self, FunctionABISignature};
use crate::signature::LoweredFunctionSignature;
use crate::{ConfigError, LowerError};

/// ABI query engine bound to a module and a target.
pub struct AbiDetailsProvider<'m> {
    module: &'m Module,
    config: AbiConfig,
    layouts: LayoutStore<'m>,
    passing: RwLock<FxHashMap<(Idx, Position), Passing>>,
}

impl<'m> AbiDetailsProvider<'m> {
    /// Bind a provider to `module`, rejecting configurations that fail
    /// [`AbiConfig::validate`].
    pub fn new(module: &'m Module, config: AbiConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let layouts = LayoutStore::new(module, config.pointer_width());
        Ok(Self {
            module,
            config,
            layouts,
            passing: RwLock::new(FxHashMap::default()),
        })
    }

    pub fn module(&self) -> &'m Module {
        self.module
    }

    pub fn config(&self) -> &AbiConfig {
        &self.config
    }

    pub fn layouts(&self) -> &LayoutStore<'m> {
        &self.layouts
    }

    // -- Layout --

    /// Size and alignment of `ty`, if it has a fixed layout.
    pub fn size_and_alignment(&self, ty: Idx) -> Option<SizeAndAlignment> {
        self.layouts.size_and_alignment(ty)
    }

    /// Size and alignment of a non-generic, non-resilient declaration.
    pub fn nominal_size_and_alignment(&self, id: NominalId) -> Option<SizeAndAlignment> {
        match self.layouts.nominal_layout(id) {
            Ok(layout) => Some(layout.size_and_alignment),
            Err(err) => {
                tracing::trace!(?id, %err, "nominal has no fixed layout");
                None
            }
        }
    }

    // -- Classification --

    /// Memoized classification of `ty` at `position`.
    pub fn passing(&self, ty: Idx, position: Position) -> Passing {
        let cached = self.passing.read().get(&(ty, position)).copied();
        if let Some(passing) = cached {
            return passing;
        }
        let passing = classify::classify(ty, position, &self.layouts, &self.config);
        tracing::trace!(?ty, ?position, ?passing, "classified");
        *self.passing.write().entry((ty, position)).or_insert(passing)
    }

    /// Classification of an explicit parameter, honouring `inout`.
    pub fn param_passing(&self, param: &ParamDecl) -> Passing {
        match param.convention {
            ParamConvention::InOut => Passing::Indirect(IndirectReason::InOut),
            ParamConvention::Owned | ParamConvention::Borrowed => {
                self.passing(param.ty, Position::Parameter)
            }
        }
    }

    pub fn should_pass_indirectly(&self, ty: Idx) -> bool {
        self.passing(ty, Position::Parameter).is_indirect()
    }

    pub fn should_return_indirectly(&self, ty: Idx) -> bool {
        self.passing(ty, Position::Result).is_indirect()
    }

    // -- Flattening --

    /// Primitive members of `ty` in layout order.
    pub fn enumerate_record_members(&self, ty: Idx) -> RecordMembers<'_, 'm> {
        RecordMembers::new(&self.layouts, ty)
    }

    /// Report each `(offset, size, type)` member of `ty` to `f`.
    ///
    /// Returns `false`, without reporting anything, if `ty` cannot be
    /// flattened.
    pub fn enumerate_direct_passing_record_members(
        &self,
        ty: Idx,
        f: impl FnMut(u64, u64, Idx),
    ) -> bool {
        self.enumerate_record_members(ty).for_each_member(f)
    }

    // -- Signatures --

    /// Lower a function declaration, or `None` if it cannot be lowered.
    pub fn lower(&self, id: FunctionId) -> Option<LoweredFunctionSignature<'_, 'm>> {
        self.try_lower(id).ok()
    }

    #[tracing::instrument(level = "debug", skip_all, fields(function = id.raw()))]
    pub fn try_lower(&self, id: FunctionId) -> Result<LoweredFunctionSignature<'_, 'm>, LowerError> {
        let result = LoweredFunctionSignature::lower(self, id);
        if let Err(err) = &result {
            tracing::debug!(%err, "lowering failed");
        }
        result
    }

    /// Implicit parameters of a function; empty if it cannot be lowered.
    pub fn function_abi_additional_params(&self, id: FunctionId) -> AdditionalParams {
        self.lower(id)
            .map(|sig| sig.additional_params().iter().copied().collect())
            .unwrap_or_default()
    }

    // -- Enums --

    #[tracing::instrument(level = "debug", skip_all, fields(decl = id.raw()))]
    pub fn enum_tag_mapping(&self, id: NominalId) -> Option<EnumTagMapping> {
        enum_tags::enum_tag_mapping(self.module, id)
    }

    // -- Metadata access --

    #[allow(
        clippy::unused_self,
        reason = "the signature is target-independent today but queried like every other fact"
    )]
    pub fn type_metadata_access_function_signature(&self) -> FunctionABISignature {
        metadata::type_metadata_access_function_signature()
    }

    pub fn metadata_access_generic_requirement_parameters(
        &self,
        id: NominalId,
    ) -> SmallVec<[GenericRequirement; 2]> {
        metadata::generic_requirement_parameters(self.module, id)
    }
}

impl std::fmt::Debug for AbiDetailsProvider<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AbiDetailsProvider")
            .field("config", &self.config)
            .field("layouts", &self.layouts)
            .finish_non_exhaustive()
    }
}
