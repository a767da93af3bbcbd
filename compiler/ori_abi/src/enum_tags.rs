//! Enum case tags.
//!
//! Tags are assigned `0..n` in declaration order and never depend on
//! payloads, so adding a payload to a case does not renumber the others.
//! Each case also gets the symbol of its per-case metadata global.

use indexmap::IndexMap;

use ori_abi_ir::{EnumCaseId, Module, NominalId};

use crate::mangle::Mangler;

/// Tag and global symbol for one enum case.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct EnumElementInfo {
    pub tag: u32,
    pub global_variable_name: String,
}

/// Case-to-tag mapping in declaration order.
pub type EnumTagMapping = IndexMap<EnumCaseId, EnumElementInfo>;

/// Tags for every case of `id`, or `None` if `id` is not an enum.
pub fn enum_tag_mapping(module: &Module, id: NominalId) -> Option<EnumTagMapping> {
    let cases = module.nominal(id)?.enum_cases()?;
    let mangler = Mangler::new();

    let mut mapping = IndexMap::with_capacity(cases.len());
    for tag in 0..u32::try_from(cases.len()).ok()? {
        let case = EnumCaseId { decl: id, index: tag };
        let global_variable_name = mangler.mangle_enum_case(module, case)?;
        mapping.insert(
            case,
            EnumElementInfo {
                tag,
                global_variable_name,
            },
        );
    }
    Some(mapping)
}
