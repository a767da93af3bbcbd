//! Type metadata access functions.
//!
//! Every nominal type has an accessor the runtime calls to obtain its
//! metadata. The accessor takes a request word and returns a two-word
//! response `{ metadata pointer, state }`. Generic types additionally take
//! their generic requirements as trailing arguments.

use smallvec::{smallvec, SmallVec};

use ori_abi_ir::{GenericRequirement, GenericRequirementKind, Idx, Module, NominalId};

/// Member types of one record crossing the ABI boundary.
///
/// Never empty.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeRecordABIRepresentation {
    members: SmallVec<[Idx; 4]>,
}

impl TypeRecordABIRepresentation {
    /// Returns `None` for an empty member list.
    pub fn new(members: SmallVec<[Idx; 4]>) -> Option<Self> {
        if members.is_empty() {
            None
        } else {
            Some(Self { members })
        }
    }

    pub fn members(&self) -> &[Idx] {
        &self.members
    }
}

/// Signature of a metadata access function.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionABISignature {
    pub return_type: TypeRecordABIRepresentation,
    pub parameter_types: SmallVec<[TypeRecordABIRepresentation; 4]>,
}

/// `(request: Int) -> (metadata: RawPointer, state: Int)`.
pub fn type_metadata_access_function_signature() -> FunctionABISignature {
    FunctionABISignature {
        return_type: TypeRecordABIRepresentation {
            members: smallvec![Idx::RAW_POINTER, Idx::INT],
        },
        parameter_types: smallvec![TypeRecordABIRepresentation {
            members: smallvec![Idx::INT],
        }],
    }
}

/// Generic arguments the accessor for `id` takes after the request.
///
/// Walks from the outermost enclosing declaration inwards. Each declaration
/// contributes one metadata requirement per generic parameter it
/// introduces, then its own witness-table requirements.
pub fn generic_requirement_parameters(
    module: &Module,
    id: NominalId,
) -> SmallVec<[GenericRequirement; 2]> {
    let pool = module.pool();
    let mut params = SmallVec::new();
    let mut flat_index = 0u32;

    for ctx in module.context_chain(id) {
        let Some(decl) = module.nominal(ctx) else {
            continue;
        };
        for &name in &decl.generic_params {
            params.push(GenericRequirement::metadata(pool.generic_param(flat_index, name)));
            flat_index += 1;
        }
        params.extend(
            decl.requirements
                .iter()
                .filter(|req| matches!(req.kind, GenericRequirementKind::WitnessTable { .. }))
                .copied(),
        );
    }
    params
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, reason = "tests use unwrap to panic on unexpected state")]
mod tests;
