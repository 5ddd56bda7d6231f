use super::*;
use crate::intern::TypeInterner;
use crate::types::{ClassId, ClassKind};

fn hierarchy(interner: &TypeInterner) -> (ClassId, ClassId, ClassId) {
    let list = interner.declare_class("List", ClassKind::Interface, &[("E", Variance::Covariant)]);
    let mutable =
        interner.declare_class("MutableList", ClassKind::Interface, &[("E", Variance::Invariant)]);
    let comparator =
        interner.declare_class("Comparator", ClassKind::Interface, &[("T", Variance::Contravariant)]);
    let e = interner.class_info(mutable).expect("mutable").type_params[0].param;
    interner.set_supertypes(mutable, vec![interner.class_type(list, vec![e])]);
    (list, mutable, comparator)
}

#[test]
fn test_top_and_bottom() {
    let interner = TypeInterner::new();
    assert!(is_subtype_of(&interner, TypeId::INT, TypeId::ANY));
    assert!(is_subtype_of(&interner, TypeId::NOTHING, TypeId::STRING));
    assert!(is_subtype_of(&interner, TypeId::NULL, TypeId::NULLABLE_ANY));
    assert!(!is_subtype_of(&interner, TypeId::ANY, TypeId::INT));
    assert!(!is_subtype_of(&interner, TypeId::INT, TypeId::STRING));
}

#[test]
fn test_error_and_dynamic_are_compatible() {
    let interner = TypeInterner::new();
    assert!(is_subtype_of(&interner, TypeId::ERROR, TypeId::INT));
    assert!(is_subtype_of(&interner, TypeId::STRING, TypeId::DYNAMIC));
}

#[test]
fn test_nullability() {
    let interner = TypeInterner::new();
    let int_q = interner.nullable(TypeId::INT);
    assert!(is_subtype_of(&interner, TypeId::INT, int_q));
    assert!(is_subtype_of(&interner, TypeId::NULL, int_q));
    assert!(!is_subtype_of(&interner, int_q, TypeId::INT));
    assert!(!is_subtype_of(&interner, TypeId::NULL, TypeId::INT));
    assert!(!is_subtype_of(&interner, TypeId::NULLABLE_ANY, TypeId::ANY));
}

#[test]
fn test_type_parameter_uses_bound() {
    let interner = TypeInterner::new();
    let t = interner.type_parameter("T");
    assert!(!is_subtype_of(&interner, t, TypeId::ANY));
    assert!(is_subtype_of(&interner, t, TypeId::NULLABLE_ANY));
    interner.set_upper_bound(t, TypeId::INT);
    assert!(is_subtype_of(&interner, t, TypeId::ANY));
    assert!(is_subtype_of(&interner, t, TypeId::INT));
    assert!(!is_subtype_of(&interner, TypeId::INT, t));
}

#[test]
fn test_class_variance() {
    let interner = TypeInterner::new();
    let (list, mutable, comparator) = hierarchy(&interner);
    let list_int = interner.class_type(list, vec![TypeId::INT]);
    let list_any = interner.class_type(list, vec![TypeId::ANY]);
    let mutable_int = interner.class_type(mutable, vec![TypeId::INT]);
    let mutable_any = interner.class_type(mutable, vec![TypeId::ANY]);
    let cmp_int = interner.class_type(comparator, vec![TypeId::INT]);
    let cmp_any = interner.class_type(comparator, vec![TypeId::ANY]);

    assert!(is_subtype_of(&interner, list_int, list_any));
    assert!(!is_subtype_of(&interner, list_any, list_int));
    assert!(is_subtype_of(&interner, mutable_int, list_any));
    assert!(!is_subtype_of(&interner, mutable_int, mutable_any));
    assert!(is_subtype_of(&interner, cmp_any, cmp_int));
    assert!(!is_subtype_of(&interner, cmp_int, cmp_any));
    assert!(!is_subtype_of(&interner, list_int, mutable_int));
}

#[test]
fn test_function_types() {
    let interner = TypeInterner::new();
    let any_to_int = interner.function(None, vec![TypeId::ANY], TypeId::INT);
    let int_to_any = interner.function(None, vec![TypeId::INT], TypeId::ANY);
    let two_params = interner.function(None, vec![TypeId::INT, TypeId::INT], TypeId::ANY);
    assert!(is_subtype_of(&interner, any_to_int, int_to_any));
    assert!(!is_subtype_of(&interner, int_to_any, any_to_int));
    assert!(!is_subtype_of(&interner, two_params, int_to_any));

    let with_receiver = interner.function(Some(TypeId::INT), vec![], TypeId::UNIT);
    let without_receiver = interner.function(None, vec![], TypeId::UNIT);
    assert!(!is_subtype_of(&interner, with_receiver, without_receiver));
}

#[test]
fn test_variables_only_relate_to_themselves() {
    let interner = TypeInterner::new();
    let v = interner.variable(interner.fresh_variable());
    assert!(is_subtype_of(&interner, v, v));
    assert!(!is_subtype_of(&interner, v, TypeId::INT));
    assert!(is_subtype_of(&interner, v, TypeId::NULLABLE_ANY));
}

#[test]
fn test_result_cycle_counts_as_true() {
    assert!(SubtypeResult::CycleDetected.is_true());
    assert!(!SubtypeResult::False.is_true());
}
