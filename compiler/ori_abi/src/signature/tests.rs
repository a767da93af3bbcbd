use pretty_assertions::assert_eq;

use ori_abi_ir::{FieldDecl, GenericRequirement, Module, NominalDecl, NominalKind, ParamConvention};

use super::*;
use crate::AbiConfig;

fn x86_64() -> AbiConfig {
    AbiConfig::from_triple("x86_64-unknown-linux-gnu").unwrap()
}

fn param(module: &Module, name: &str, ty: Idx) -> ParamDecl {
    ParamDecl::new(module.intern(name), ty)
}

/// Collects the visitor callbacks as a compact trace.
fn trace(sig: &LoweredFunctionSignature<'_, '_>) -> Vec<String> {
    let events = std::cell::RefCell::new(Vec::new());
    sig.visit_parameter_list(
        |r| events.borrow_mut().push(format!("result#{} sret={}", r.result_index(), r.has_sret())),
        |d| events.borrow_mut().push(format!("direct#{}", d.index())),
        |i| events.borrow_mut().push(format!("indirect#{} {:?}", i.index(), i.reason())),
    );
    events.into_inner()
}

#[test]
fn multiple_indirect_results_only_first_has_sret() {
    let mut module = Module::new("m");
    let big = module.pool().tuple(&[Idx::INT; 5]);
    let id = module.add_function(FunctionDecl::new(
        module.intern("split"),
        vec![],
        &[big, Idx::INT32, big],
    ));
    let provider = AbiDetailsProvider::new(&module, x86_64()).unwrap();
    let sig = provider.lower(id).unwrap();

    assert_eq!(sig.num_indirect_result_values(), 2);
    assert_eq!(
        trace(&sig),
        vec!["result#0 sret=true", "result#2 sret=false"]
    );
    let direct = sig.direct_result_type().unwrap();
    assert_eq!(direct.ty(), Idx::INT32);
}

#[test]
fn several_direct_results_form_a_tuple() {
    let mut module = Module::new("m");
    let id = module.add_function(FunctionDecl::new(
        module.intern("divmod"),
        vec![],
        &[Idx::INT32, Idx::INT64],
    ));
    let provider = AbiDetailsProvider::new(&module, x86_64()).unwrap();
    let sig = provider.lower(id).unwrap();

    let direct = sig.direct_result_type().unwrap();
    assert_eq!(direct.ty(), module.pool().tuple(&[Idx::INT32, Idx::INT64]));
    assert_eq!(direct.size_and_alignment(), Some(SizeAndAlignment::new(16, 8)));
    let offsets: Vec<_> = direct
        .enumerate_record_members()
        .collect_members()
        .unwrap()
        .iter()
        .map(|m| m.offset)
        .collect();
    assert_eq!(offsets, vec![0, 8]);
}

#[test]
fn combined_direct_results_over_budget_are_demoted() {
    let mut module = Module::new("m");
    let three = module.pool().tuple(&[Idx::INT8; 3]);
    let id = module.add_function(FunctionDecl::new(
        module.intern("many"),
        vec![],
        &[three, three],
    ));
    let provider = AbiDetailsProvider::new(&module, x86_64()).unwrap();
    let sig = provider.try_lower(id).unwrap();

    // Six members exceed the member budget together; the last one moves out.
    assert_eq!(sig.direct_result_type().unwrap().ty(), three);
    assert_eq!(trace(&sig), vec!["result#1 sret=true"]);
}

#[test]
fn demotion_keeps_the_largest_fitting_prefix() {
    let mut module = Module::new("m");
    let id = module.add_function(FunctionDecl::new(
        module.intern("five"),
        vec![],
        &[Idx::INT64; 5],
    ));
    let provider = AbiDetailsProvider::new(&module, x86_64()).unwrap();
    assert!(!provider.should_return_indirectly(Idx::INT64));

    let sig = provider.lower(id).unwrap();
    let direct = sig.direct_result_type().unwrap();
    assert_eq!(direct.ty(), module.pool().tuple(&[Idx::INT64; 4]));
    assert_eq!(direct.size_and_alignment(), Some(SizeAndAlignment::new(32, 8)));
    assert_eq!(sig.num_indirect_result_values(), 1);
    assert_eq!(trace(&sig), vec!["result#4 sret=true"]);
}

#[test]
fn demoted_results_stay_in_result_order() {
    let mut module = Module::new("m");
    let big = module.pool().tuple(&[Idx::INT; 5]);
    let id = module.add_function(FunctionDecl::new(
        module.intern("mixed"),
        vec![],
        &[Idx::INT64, Idx::INT64, Idx::INT64, Idx::INT64, Idx::INT64, big],
    ));
    let provider = AbiDetailsProvider::new(&module, x86_64()).unwrap();
    let sig = provider.lower(id).unwrap();

    assert_eq!(
        trace(&sig),
        vec!["result#4 sret=true", "result#5 sret=false"]
    );
}

#[test]
fn unit_results_have_no_direct_type() {
    let mut module = Module::new("m");
    let none = module.add_function(FunctionDecl::new(module.intern("f"), vec![], &[]));
    let unit = module.add_function(FunctionDecl::new(module.intern("g"), vec![], &[Idx::UNIT]));
    let provider = AbiDetailsProvider::new(&module, x86_64()).unwrap();

    for id in [none, unit] {
        let sig = provider.lower(id).unwrap();
        assert!(sig.direct_result_type().is_none());
        assert_eq!(sig.num_indirect_result_values(), 0);
    }
}

#[test]
fn inout_is_always_indirect() {
    let mut module = Module::new("m");
    let counter = param(&module, "counter", Idx::INT).with_convention(ParamConvention::InOut);
    let borrowed = param(&module, "b", Idx::INT).with_convention(ParamConvention::Borrowed);
    let id = module.add_function(FunctionDecl::new(
        module.intern("bump"),
        vec![counter, borrowed],
        &[],
    ));
    let provider = AbiDetailsProvider::new(&module, x86_64()).unwrap();
    let sig = provider.lower(id).unwrap();

    assert_eq!(trace(&sig), vec!["indirect#0 InOut", "direct#1"]);
    // The type itself still classifies as direct.
    assert!(!provider.should_pass_indirectly(Idx::INT));
}

#[test]
fn parameters_are_visited_once_in_order() {
    let mut module = Module::new("m");
    let any = module.pool().existential(&[]);
    let big = module.pool().tuple(&[Idx::INT; 5]);
    let params = vec![
        param(&module, "a", Idx::INT32),
        param(&module, "b", any),
        param(&module, "c", Idx::FLOAT64),
        param(&module, "d", big),
    ];
    let id = module.add_function(FunctionDecl::new(module.intern("f"), params, &[big]));
    let provider = AbiDetailsProvider::new(&module, x86_64()).unwrap();
    let sig = provider.lower(id).unwrap();

    assert_eq!(
        trace(&sig),
        vec![
            "result#0 sret=true".to_string(),
            "direct#0".to_string(),
            "indirect#1 Unrepresentable".to_string(),
            "direct#2".to_string(),
            "indirect#3 TooLarge { size: 40, budget: 32 }".to_string(),
        ]
    );
    assert_eq!(sig.abi_parameters().count(), 5);
}

#[test]
fn direct_parameter_members() {
    let mut module = Module::new("m");
    let point = module.add_nominal(NominalDecl::structure(
        module.intern("Point"),
        vec![
            FieldDecl::new(module.intern("x"), Idx::FLOAT32),
            FieldDecl::new(module.intern("y"), Idx::FLOAT32),
        ],
    ));
    let point_ty = module.pool().struct_type(point, &[]);
    let id = module.add_function(FunctionDecl::new(
        module.intern("norm"),
        vec![param(&module, "p", point_ty)],
        &[Idx::FLOAT32],
    ));
    let provider = AbiDetailsProvider::new(&module, x86_64()).unwrap();
    let sig = provider.lower(id).unwrap();

    let Some(AbiParameter::Direct(p)) = sig.abi_parameters().next() else {
        panic!("expected a direct parameter");
    };
    assert_eq!(p.param_decl().ty, point_ty);
    let members = p.enumerate_record_members().collect_members().unwrap();
    assert_eq!(
        members.iter().map(|m| (m.offset, m.ty)).collect::<Vec<_>>(),
        vec![(0, Idx::FLOAT32), (4, Idx::FLOAT32)]
    );
}

#[test]
fn cyclic_parameter_fails_lowering() {
    let mut module = Module::new("m");
    let id = module.add_nominal(NominalDecl::structure(module.intern("Loop"), vec![]));
    let ty = module.pool().struct_type(id, &[]);
    let field = module.intern("next");
    if let Some(decl) = module.nominal_mut(id) {
        decl.kind = NominalKind::Struct {
            fields: vec![FieldDecl::new(field, ty)],
        };
    }
    let f = module.add_function(FunctionDecl::new(
        module.intern("walk"),
        vec![param(&module, "l", ty)],
        &[],
    ));
    let provider = AbiDetailsProvider::new(&module, x86_64()).unwrap();

    assert_eq!(
        provider.try_lower(f).map(|_| ()),
        Err(LowerError::Layout {
            what: "parameter `l`".to_string(),
            source: LayoutError::Cycle(ty),
        })
    );
    assert!(provider.should_pass_indirectly(ty));
    assert!(provider.should_return_indirectly(ty));
}

#[test]
fn unknown_function_fails() {
    let mut module = Module::new("m");
    let id = module.add_function(FunctionDecl::new(module.intern("f"), vec![], &[]));
    let other = Module::new("other");
    let provider = AbiDetailsProvider::new(&other, x86_64()).unwrap();

    assert_eq!(
        provider.try_lower(id).map(|_| ()),
        Err(LowerError::UnknownFunction(id))
    );
}

#[test]
fn malformed_requirement_fails() {
    let mut module = Module::new("m");
    let id = module.add_function(
        FunctionDecl::new(module.intern("f"), vec![], &[])
            .with_requirements(vec![GenericRequirement::metadata(Idx::INT)]),
    );
    let provider = AbiDetailsProvider::new(&module, x86_64()).unwrap();
    assert_eq!(
        provider.try_lower(id).map(|_| ()),
        Err(LowerError::InvalidRequirement(Idx::INT))
    );
    assert!(provider.function_abi_additional_params(id).is_empty());
}
