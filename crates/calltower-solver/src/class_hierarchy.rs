//! Nominal class hierarchy queries.
//!
//! Supertypes are stored over the class's own type parameters
//! (`class ArrayList<E> : List<E>`). Viewing a concrete class type as one of
//! its supertypes substitutes the actual arguments along the way, so
//! `ArrayList<Int>` seen as `List` is `List<Int>`.
//!
//! The hierarchy is assumed acyclic; the walk is still depth-bounded so a
//! malformed class table cannot hang resolution.

use crate::db::TypeDatabase;
use crate::instantiate::{TypeSubstitution, instantiate_type};
use crate::recursion::RecursionProfile;
use crate::types::{ClassId, ClassType, TypeData, TypeId};
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use tracing::trace;

/// The class type behind `ty`, if it is one.
pub fn as_class_type(db: &dyn TypeDatabase, ty: TypeId) -> Option<ClassType> {
    match db.lookup(ty).as_deref() {
        Some(TypeData::Class(class)) => Some(class.clone()),
        _ => None,
    }
}

/// Direct supertypes of a class type, instantiated with its arguments.
pub fn direct_supertypes(db: &dyn TypeDatabase, class: &ClassType) -> Vec<TypeId> {
    let Some(info) = db.class_info(class.class) else {
        return Vec::new();
    };
    let params: Vec<TypeId> = info.type_params.iter().map(|p| p.param).collect();
    let subst = TypeSubstitution::from_args(&params, &class.args);
    info.supertypes
        .iter()
        .map(|sup| instantiate_type(db, *sup, &subst))
        .collect()
}

/// View class type `ty` as an instance of `target`.
///
/// Breadth-first, so the nearest path wins when a class reaches `target`
/// through several routes.
pub fn supertype_as(db: &dyn TypeDatabase, ty: TypeId, target: ClassId) -> Option<TypeId> {
    let start = as_class_type(db, ty)?;
    if start.class == target {
        return Some(ty);
    }

    let max_depth = RecursionProfile::SupertypeWalk.max_depth();
    let mut seen = FxHashSet::default();
    let mut queue = VecDeque::from([(start, 0u32)]);
    while let Some((class, depth)) = queue.pop_front() {
        if depth >= max_depth {
            trace!(class = class.class.0, "supertype walk depth exceeded");
            break;
        }
        for sup in direct_supertypes(db, &class) {
            if !seen.insert(sup) {
                continue;
            }
            let Some(sup_class) = as_class_type(db, sup) else {
                continue;
            };
            if sup_class.class == target {
                return Some(sup);
            }
            queue.push_back((sup_class, depth + 1));
        }
    }
    None
}

/// `ty` followed by all of its transitive supertypes, nearest first.
///
/// Non-class types yield just themselves.
pub fn supertype_closure(db: &dyn TypeDatabase, ty: TypeId) -> Vec<TypeId> {
    let mut result = vec![ty];
    let mut seen = FxHashSet::from_iter([ty]);
    let max_depth = RecursionProfile::SupertypeWalk.max_depth();
    let mut frontier = vec![ty];
    let mut depth = 0;
    while !frontier.is_empty() && depth < max_depth {
        let mut next = Vec::new();
        for current in frontier {
            let Some(class) = as_class_type(db, current) else {
                continue;
            };
            for sup in direct_supertypes(db, &class) {
                if seen.insert(sup) {
                    result.push(sup);
                    next.push(sup);
                }
            }
        }
        frontier = next;
        depth += 1;
    }
    result
}

/// Whether class `sub` inherits from class `sup` (or is it).
pub fn is_subclass(db: &dyn TypeDatabase, sub: ClassId, sup: ClassId) -> bool {
    if sub == sup {
        return true;
    }
    let self_type = match db.class_info(sub) {
        Some(info) => db.class_type(sub, info.type_params.iter().map(|p| p.param).collect()),
        None => return false,
    };
    supertype_as(db, self_type, sup).is_some()
}

#[cfg(test)]
#[path = "../tests/class_hierarchy_tests.rs"]
mod class_hierarchy_tests;
