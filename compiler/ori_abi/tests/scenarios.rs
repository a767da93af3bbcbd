//! End-to-end ABI scenarios through the public provider API.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]

use ori_abi::{
    AbiAdditionalParam, AbiConfig, AbiDetailsProvider, AbiParameter, RecordItem, RecordMember,
};
use ori_abi_ir::{
    EnumCaseDecl, FieldDecl, FunctionDecl, GenericRequirement, Idx, Module, NominalDecl, ParamDecl,
};
use pretty_assertions::assert_eq;

fn x86_64() -> AbiConfig {
    AbiConfig::from_triple("x86_64-unknown-linux-gnu").unwrap()
}

#[test]
fn scalar_function_is_fully_direct() {
    // f(x: Int32, y: Int32) -> Int32
    let mut module = Module::new("demo");
    let f = module.add_function(FunctionDecl::new(
        module.intern("f"),
        vec![
            ParamDecl::new(module.intern("x"), Idx::INT32),
            ParamDecl::new(module.intern("y"), Idx::INT32),
        ],
        &[Idx::INT32],
    ));
    let provider = AbiDetailsProvider::new(&module, x86_64()).unwrap();
    let sig = provider.lower(f).expect("scalar function lowers");

    assert_eq!(sig.num_indirect_result_values(), 0);
    let result = sig.direct_result_type().expect("direct result");
    assert_eq!(
        result.enumerate_record_members().collect_members(),
        Ok(vec![RecordMember {
            offset: 0,
            size: 4,
            ty: Idx::INT32
        }])
    );

    let mut direct = Vec::new();
    let (mut results, mut indirect) = (0, 0);
    sig.visit_parameter_list(
        |_| results += 1,
        |p| direct.push(module.lookup(p.param_decl().name)),
        |_| indirect += 1,
    );
    assert_eq!(direct, vec!["x", "y"]);
    assert_eq!((results, indirect), (0, 0));
    assert!(sig.additional_params().is_empty());
}

#[test]
fn five_word_record_is_returned_indirectly() {
    let mut module = Module::new("demo");
    let words: Vec<_> = ["a", "b", "c", "d", "e"]
        .iter()
        .map(|n| FieldDecl::new(module.intern(n), Idx::INT))
        .collect();
    let record = module.add_nominal(NominalDecl::structure(module.intern("Five"), words));
    let record_ty = module.pool().struct_type(record, &[]);
    let make = module.add_function(FunctionDecl::new(module.intern("make"), vec![], &[record_ty]));
    let provider = AbiDetailsProvider::new(&module, x86_64()).unwrap();

    let sig = provider.lower(make).unwrap();
    assert_eq!(sig.num_indirect_result_values(), 1);
    assert!(sig.direct_result_type().is_none());

    let first = sig.abi_parameters().next();
    match first {
        Some(AbiParameter::IndirectResult(value)) => {
            assert!(value.has_sret());
            assert_eq!(value.ty(), record_ty);
        }
        other => panic!("expected indirect result, got {other:?}"),
    }
}

#[test]
fn generic_identity_passes_everything_indirectly() {
    // g<T>(value: T) -> T
    let mut module = Module::new("demo");
    let t_name = module.intern("T");
    let t = module.pool().generic_param(0, t_name);
    let g = module.add_function(
        FunctionDecl::new(
            module.intern("g"),
            vec![ParamDecl::new(module.intern("value"), t)],
            &[t],
        )
        .with_generic_params(vec![t_name])
        .with_requirements(vec![GenericRequirement::metadata(t)]),
    );
    let provider = AbiDetailsProvider::new(&module, x86_64()).unwrap();

    assert!(provider.should_pass_indirectly(t));
    assert!(provider.should_return_indirectly(t));

    let sig = provider.lower(g).unwrap();
    assert_eq!(sig.num_indirect_result_values(), 1);
    assert!(sig.direct_result_type().is_none());

    let mut indirect_params = 0;
    sig.visit_parameter_list(|_| {}, |_| panic!("no direct params"), |_| {
        indirect_params += 1;
    });
    assert_eq!(indirect_params, 1);

    assert_eq!(
        sig.additional_params(),
        &[AbiAdditionalParam::GenericRequirement(
            GenericRequirement::metadata(t)
        )]
    );
    assert_eq!(
        provider.function_abi_additional_params(g).as_slice(),
        sig.additional_params()
    );
}

#[test]
fn enum_cases_are_tagged_in_order() {
    let mut module = Module::new("demo");
    let abc = module.add_nominal(NominalDecl::enumeration(
        module.intern("Abc"),
        ["A", "B", "C"]
            .iter()
            .map(|n| EnumCaseDecl::unit(module.intern(n)))
            .collect(),
    ));
    let provider = AbiDetailsProvider::new(&module, x86_64()).unwrap();

    let mapping = provider.enum_tag_mapping(abc).unwrap();
    let tags: Vec<_> = module
        .nominal(abc)
        .and_then(|d| d.enum_cases())
        .unwrap()
        .iter()
        .zip(mapping.values())
        .map(|(case, info)| (module.lookup(case.name), info.tag))
        .collect();
    assert_eq!(tags, vec![("A", 0), ("B", 1), ("C", 2)]);
}

#[test]
fn existential_field_forces_indirect_passing() {
    let mut module = Module::new("demo");
    let shape = module.intern("Shape");
    let any_shape = module.pool().existential(&[shape]);
    let holder = module.add_nominal(NominalDecl::structure(
        module.intern("Holder"),
        vec![
            FieldDecl::new(module.intern("id"), Idx::INT32),
            FieldDecl::new(module.intern("shape"), any_shape),
        ],
    ));
    let holder_ty = module.pool().struct_type(holder, &[]);
    let provider = AbiDetailsProvider::new(&module, x86_64()).unwrap();

    assert!(!provider.enumerate_direct_passing_record_members(holder_ty, |_, _, _| {}));
    let last = provider.enumerate_record_members(holder_ty).last();
    assert!(matches!(last, Some(RecordItem::Unrepresentable(u)) if u.ty == any_shape));
    assert!(provider.should_pass_indirectly(holder_ty));
    assert!(provider.should_return_indirectly(holder_ty));
}

#[test]
fn metadata_accessor_for_nested_generic() {
    let mut module = Module::new("demo");
    let (k, v) = (module.intern("K"), module.intern("V"));
    let hashable = module.intern("Hashable");
    let k_ty = module.pool().generic_param(0, k);
    let v_ty = module.pool().generic_param(1, v);
    let dict = module.add_nominal(
        NominalDecl::structure(module.intern("Dict"), vec![])
            .with_generic_params(vec![k])
            .with_requirements(vec![GenericRequirement::witness_table(k_ty, hashable)]),
    );
    let entry = module.add_nominal(
        NominalDecl::structure(module.intern("Entry"), vec![])
            .with_parent(dict)
            .with_generic_params(vec![v]),
    );
    let provider = AbiDetailsProvider::new(&module, x86_64()).unwrap();

    let sig = provider.type_metadata_access_function_signature();
    assert_eq!(sig.return_type.members(), &[Idx::RAW_POINTER, Idx::INT]);
    assert_eq!(
        provider
            .metadata_access_generic_requirement_parameters(entry)
            .as_slice(),
        &[
            GenericRequirement::metadata(k_ty),
            GenericRequirement::witness_table(k_ty, hashable),
            GenericRequirement::metadata(v_ty),
        ]
    );
}

#[test]
fn method_on_generic_class_recovers_metadata_from_self() {
    let mut module = Module::new("demo");
    let t_name = module.intern("T");
    let t = module.pool().generic_param(0, t_name);
    let list = module.add_nominal(NominalDecl::class(module.intern("List")).with_generic_params(vec![t_name]));
    let list_t = module.pool().class_type(list, &[t]);
    let first = module.add_function(
        FunctionDecl::new(module.intern("first"), vec![], &[t])
            .with_parent(list)
            .with_requirements(vec![GenericRequirement::metadata(t)])
            .with_self(ParamDecl::new(module.intern("self"), list_t))
            .throwing(),
    );
    let provider = AbiDetailsProvider::new(&module, x86_64()).unwrap();

    assert_eq!(
        provider.function_abi_additional_params(first).as_slice(),
        &[
            AbiAdditionalParam::GenericTypeMetadataSource(list_t),
            AbiAdditionalParam::SelfParam,
            AbiAdditionalParam::Error,
        ]
    );
}
