//! Human-readable type rendering for diagnostics.

use crate::db::TypeDatabase;
use crate::types::{TypeData, TypeId};
use std::fmt::Write;

/// Renders types in source syntax: `List<Int>`, `Int.(String) -> R`, `T?`.
///
/// Unsolved type variables print as `?N`.
pub struct TypeFormatter<'a> {
    db: &'a dyn TypeDatabase,
}

impl<'a> TypeFormatter<'a> {
    pub fn new(db: &'a dyn TypeDatabase) -> Self {
        TypeFormatter { db }
    }

    pub fn format(&self, ty: TypeId) -> String {
        let mut out = String::new();
        self.write_type(&mut out, ty);
        out
    }

    pub fn format_list(&self, types: &[TypeId]) -> String {
        let mut out = String::new();
        self.write_list(&mut out, types);
        out
    }

    fn write_list(&self, out: &mut String, types: &[TypeId]) {
        for (i, ty) in types.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            self.write_type(out, *ty);
        }
    }

    fn write_type(&self, out: &mut String, ty: TypeId) {
        let Some(data) = self.db.lookup(ty) else {
            let _ = write!(out, "<unknown#{}>", ty.0);
            return;
        };
        match data.as_ref() {
            TypeData::Intrinsic(kind) => out.push_str(kind.name()),
            TypeData::Class(class) => {
                match self.db.class_info(class.class) {
                    Some(info) => out.push_str(&self.db.resolve_atom(info.name)),
                    None => {
                        let _ = write!(out, "<class#{}>", class.class.0);
                    }
                }
                if !class.args.is_empty() {
                    out.push('<');
                    self.write_list(out, &class.args);
                    out.push('>');
                }
            }
            TypeData::Nullable(inner) => {
                let parenthesize = self.db.function_shape(*inner).is_some();
                if parenthesize {
                    out.push('(');
                }
                self.write_type(out, *inner);
                if parenthesize {
                    out.push(')');
                }
                out.push('?');
            }
            TypeData::Function(shape) => {
                if let Some(receiver) = shape.receiver {
                    self.write_type(out, receiver);
                    out.push('.');
                }
                out.push('(');
                self.write_list(out, &shape.params);
                out.push_str(") -> ");
                self.write_type(out, shape.return_type);
            }
            TypeData::TypeParameter(info) => out.push_str(&self.db.resolve_atom(info.name)),
            TypeData::Variable(var) => {
                let _ = write!(out, "?{}", var.0);
            }
        }
    }
}
