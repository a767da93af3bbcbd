use pretty_assertions::assert_eq;

use ori_abi_ir::NominalDecl;

use super::*;

#[test]
fn accessor_signature_shape() {
    let sig = type_metadata_access_function_signature();
    assert_eq!(sig.return_type.members(), &[Idx::RAW_POINTER, Idx::INT]);
    assert_eq!(sig.parameter_types.len(), 1);
    assert_eq!(sig.parameter_types[0].members(), &[Idx::INT]);
}

#[test]
fn record_representation_is_never_empty() {
    assert_eq!(TypeRecordABIRepresentation::new(SmallVec::new()), None);
    let one = TypeRecordABIRepresentation::new(smallvec![Idx::INT]).unwrap();
    assert_eq!(one.members(), &[Idx::INT]);
}

#[test]
fn non_generic_type_takes_nothing() {
    let mut module = Module::new("m");
    let id = module.add_nominal(NominalDecl::structure(module.intern("Point"), vec![]));
    assert!(generic_requirement_parameters(&module, id).is_empty());
}

#[test]
fn requirements_walk_outermost_first() {
    let mut module = Module::new("m");
    let (a, b, c) = (module.intern("A"), module.intern("B"), module.intern("C"));
    let hashable = module.intern("Hashable");
    let eq = module.intern("Eq");

    let a_ty = module.pool().generic_param(0, a);
    let b_ty = module.pool().generic_param(1, b);
    let c_ty = module.pool().generic_param(2, c);

    let outer = module.add_nominal(
        NominalDecl::structure(module.intern("Outer"), vec![])
            .with_generic_params(vec![a, b])
            .with_requirements(vec![
                GenericRequirement::metadata(a_ty),
                GenericRequirement::witness_table(a_ty, hashable),
            ]),
    );
    let inner = module.add_nominal(
        NominalDecl::enumeration(module.intern("Inner"), vec![])
            .with_parent(outer)
            .with_generic_params(vec![c])
            .with_requirements(vec![GenericRequirement::witness_table(c_ty, eq)]),
    );

    assert_eq!(
        generic_requirement_parameters(&module, inner).as_slice(),
        &[
            GenericRequirement::metadata(a_ty),
            GenericRequirement::metadata(b_ty),
            GenericRequirement::witness_table(a_ty, hashable),
            GenericRequirement::metadata(c_ty),
            GenericRequirement::witness_table(c_ty, eq),
        ]
    );
}
