//! Join and meet over the subtype lattice.
//!
//! The constraint solver picks a variable's value as the join (least common
//! supertype) of its lower bounds, falling back to the meet (greatest common
//! subtype) of its upper bounds. Both are order-independent: the inputs are
//! sorted and deduplicated first, and ties are broken by `TypeId`.

use crate::class_hierarchy::supertype_closure;
use crate::db::TypeDatabase;
use crate::subtype::SubtypeChecker;
use crate::types::{FunctionShape, TypeData, TypeId};

/// Least common supertype of `types`.
///
/// Returns `Nothing` for an empty input. When several unrelated minimal
/// common supertypes exist the result falls back to `Any`.
pub fn common_supertype(db: &dyn TypeDatabase, types: &[TypeId]) -> TypeId {
    let mut types: Vec<TypeId> = types.to_vec();
    types.sort_unstable();
    types.dedup();

    if let Some(escape) = types.iter().find(|t| t.is_any_compatible()) {
        return *escape;
    }

    let nullable = types.iter().any(|t| db.is_nullable(*t));
    let mut candidates: Vec<TypeId> = types
        .iter()
        .map(|t| db.not_null(*t))
        .filter(|t| *t != TypeId::NOTHING)
        .collect();
    candidates.sort_unstable();
    candidates.dedup();

    let joined = match candidates.len() {
        0 => TypeId::NOTHING,
        1 => candidates[0],
        _ => join_non_null(db, &candidates),
    };
    if nullable { db.nullable(joined) } else { joined }
}

fn join_non_null(db: &dyn TypeDatabase, types: &[TypeId]) -> TypeId {
    let mut checker = SubtypeChecker::new(db);

    // One of the inputs may already be above all others.
    if let Some(top) = types
        .iter()
        .find(|candidate| types.iter().all(|t| checker.is_subtype_of(*t, **candidate)))
    {
        return *top;
    }

    if let Some(joined) = join_functions(db, types) {
        return joined;
    }

    let common: Vec<TypeId> = supertype_closure(db, types[0])
        .into_iter()
        .filter(|sup| types.iter().all(|t| checker.is_subtype_of(*t, *sup)))
        .collect();
    let mut minimal: Vec<TypeId> = common
        .iter()
        .copied()
        .filter(|c| {
            !common
                .iter()
                .any(|other| other != c && checker.is_subtype_of(*other, *c))
        })
        .collect();
    minimal.sort_unstable();
    minimal.dedup();
    match minimal.as_slice() {
        [single] => *single,
        _ => TypeId::ANY,
    }
}

/// Function types of one arity join pointwise: meet of parameters, join of
/// returns.
fn join_functions(db: &dyn TypeDatabase, types: &[TypeId]) -> Option<TypeId> {
    let shapes: Vec<FunctionShape> = types
        .iter()
        .map(|t| db.function_shape(*t))
        .collect::<Option<_>>()?;
    let first = shapes.first()?;
    if shapes
        .iter()
        .any(|s| s.params.len() != first.params.len() || s.receiver.is_some() != first.receiver.is_some())
    {
        return None;
    }

    let receiver = match first.receiver {
        Some(_) => {
            let receivers: Vec<TypeId> = shapes.iter().filter_map(|s| s.receiver).collect();
            Some(common_subtype(db, &receivers)?)
        }
        None => None,
    };
    let mut params = Vec::with_capacity(first.params.len());
    for i in 0..first.params.len() {
        let column: Vec<TypeId> = shapes.iter().map(|s| s.params[i]).collect();
        params.push(common_subtype(db, &column)?);
    }
    let returns: Vec<TypeId> = shapes.iter().map(|s| s.return_type).collect();
    let return_type = common_supertype(db, &returns);
    Some(db.intern(TypeData::Function(FunctionShape {
        receiver,
        params,
        return_type,
    })))
}

/// Greatest common subtype of `types`: the input that is a subtype of all
/// others.
///
/// `Any?` places no restriction and is ignored; an empty input yields `Any?`.
/// `None` when no input is below all the rest.
pub fn common_subtype(db: &dyn TypeDatabase, types: &[TypeId]) -> Option<TypeId> {
    let mut types: Vec<TypeId> = types
        .iter()
        .copied()
        .filter(|t| *t != TypeId::NULLABLE_ANY)
        .collect();
    types.sort_unstable();
    types.dedup();
    if types.is_empty() {
        return Some(TypeId::NULLABLE_ANY);
    }
    let mut checker = SubtypeChecker::new(db);
    types
        .iter()
        .copied()
        .find(|candidate| types.iter().all(|t| checker.is_subtype_of(*candidate, *t)))
}

#[cfg(test)]
#[path = "../tests/lattice_tests.rs"]
mod lattice_tests;
