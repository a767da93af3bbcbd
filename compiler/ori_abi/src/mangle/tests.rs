use pretty_assertions::assert_eq;

use ori_abi_ir::{EnumCaseDecl, NominalDecl};

use super::*;

#[test]
fn top_level_enum_case() {
    let mut module = Module::new("geo");
    let id = module.add_nominal(NominalDecl::enumeration(
        module.intern("Direction"),
        vec![
            EnumCaseDecl::unit(module.intern("north")),
            EnumCaseDecl::unit(module.intern("south")),
        ],
    ));

    let mangler = Mangler::new();
    assert_eq!(
        mangler.mangle_enum_case(&module, EnumCaseId { decl: id, index: 1 }),
        Some("_ori_geo$Direction$$case$south".to_string())
    );
}

#[test]
fn nested_enum_in_module_path() {
    let mut module = Module::new("data/x");
    let outer = module.add_nominal(NominalDecl::structure(module.intern("Outer"), vec![]));
    let inner = module.add_nominal(
        NominalDecl::enumeration(module.intern("Inner"), vec![EnumCaseDecl::unit(module.intern("a"))])
            .with_parent(outer),
    );

    assert_eq!(
        Mangler::new().mangle_enum_case(&module, EnumCaseId { decl: inner, index: 0 }),
        Some("_ori_data$x$Outer$Inner$$case$a".to_string())
    );
}

#[test]
fn special_characters_are_escaped() {
    let mut module = Module::new("m");
    let id = module.add_nominal(NominalDecl::enumeration(
        module.intern("Pair<A>"),
        vec![EnumCaseDecl::unit(module.intern("x-y@"))],
    ));

    assert_eq!(
        Mangler::new().mangle_enum_case(&module, EnumCaseId { decl: id, index: 0 }),
        Some("_ori_m$Pair$LTA$GT$$case$x$Dy$40".to_string())
    );
}

#[test]
fn empty_module_name_is_omitted() {
    let mut module = Module::new("");
    let id = module.add_nominal(NominalDecl::enumeration(
        module.intern("E"),
        vec![EnumCaseDecl::unit(module.intern("a"))],
    ));
    assert_eq!(
        Mangler::new().mangle_enum_case(&module, EnumCaseId { decl: id, index: 0 }),
        Some("_ori_E$$case$a".to_string())
    );
}

#[test]
fn non_cases_are_rejected() {
    let mut module = Module::new("m");
    let s = module.add_nominal(NominalDecl::structure(module.intern("S"), vec![]));
    let e = module.add_nominal(NominalDecl::enumeration(
        module.intern("E"),
        vec![EnumCaseDecl::unit(module.intern("a"))],
    ));
    let mangler = Mangler::new();

    assert_eq!(mangler.mangle_enum_case(&module, EnumCaseId { decl: s, index: 0 }), None);
    assert_eq!(mangler.mangle_enum_case(&module, EnumCaseId { decl: e, index: 1 }), None);
}
