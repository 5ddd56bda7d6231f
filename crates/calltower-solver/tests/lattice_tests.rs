use super::*;
use crate::intern::TypeInterner;
use crate::types::{ClassKind, Variance};

#[test]
fn test_join_of_related_classes_is_the_supertype() {
    let interner = TypeInterner::new();
    let animal = interner.declare_class("Animal", ClassKind::Class, &[]);
    let dog = interner.declare_class("Dog", ClassKind::Class, &[]);
    let cat = interner.declare_class("Cat", ClassKind::Class, &[]);
    let animal_ty = interner.class_type(animal, vec![]);
    interner.set_supertypes(dog, vec![animal_ty]);
    interner.set_supertypes(cat, vec![animal_ty]);
    let dog_ty = interner.class_type(dog, vec![]);
    let cat_ty = interner.class_type(cat, vec![]);

    assert_eq!(common_supertype(&interner, &[dog_ty, cat_ty]), animal_ty);
    assert_eq!(common_supertype(&interner, &[cat_ty, dog_ty]), animal_ty);
    assert_eq!(common_supertype(&interner, &[dog_ty, animal_ty]), animal_ty);
}

#[test]
fn test_join_of_unrelated_is_any() {
    let interner = TypeInterner::new();
    assert_eq!(common_supertype(&interner, &[TypeId::INT, TypeId::STRING]), TypeId::ANY);
}

#[test]
fn test_join_with_null_is_nullable() {
    let interner = TypeInterner::new();
    let joined = common_supertype(&interner, &[TypeId::INT, TypeId::NULL]);
    assert_eq!(joined, interner.nullable(TypeId::INT));
    assert_eq!(common_supertype(&interner, &[TypeId::NOTHING, TypeId::INT]), TypeId::INT);
    assert_eq!(common_supertype(&interner, &[]), TypeId::NOTHING);
}

#[test]
fn test_join_propagates_error() {
    let interner = TypeInterner::new();
    assert_eq!(
        common_supertype(&interner, &[TypeId::INT, TypeId::ERROR]),
        TypeId::ERROR
    );
}

#[test]
fn test_join_of_generic_instances() {
    let interner = TypeInterner::new();
    let list = interner.declare_class("List", ClassKind::Interface, &[("E", Variance::Covariant)]);
    let list_int = interner.class_type(list, vec![TypeId::INT]);
    let list_any = interner.class_type(list, vec![TypeId::ANY]);
    assert_eq!(common_supertype(&interner, &[list_int, list_any]), list_any);
}

#[test]
fn test_join_of_function_types() {
    let interner = TypeInterner::new();
    let f = interner.function(None, vec![TypeId::INT], TypeId::INT);
    let g = interner.function(None, vec![TypeId::INT], TypeId::STRING);
    assert_eq!(
        common_supertype(&interner, &[f, g]),
        interner.function(None, vec![TypeId::INT], TypeId::ANY)
    );
}

#[test]
fn test_meet() {
    let interner = TypeInterner::new();
    let int_q = interner.nullable(TypeId::INT);
    assert_eq!(
        common_subtype(&interner, &[TypeId::ANY, TypeId::INT, int_q]),
        Some(TypeId::INT)
    );
    assert_eq!(common_subtype(&interner, &[TypeId::INT, TypeId::STRING]), None);
    assert_eq!(common_subtype(&interner, &[TypeId::NULLABLE_ANY]), Some(TypeId::NULLABLE_ANY));
}
