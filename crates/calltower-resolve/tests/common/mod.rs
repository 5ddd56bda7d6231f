//! Shared fixture for the scenario tests.

#![allow(dead_code)]

use calltower_common::{Atom, Span};
use calltower_resolve::{
    CallArgument, CallExpr, ContainerId, ContainerTree, Declaration, DeclarationKind,
    DeclarationLevel, DeclarationStore, Expr, ImplicitScopeTower, LambdaExpr, LambdaParam,
    ModuleId, Statement, ValueParameter,
};
use calltower_solver::{TypeDatabase, TypeId, TypeInterner};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

pub struct World {
    pub types: TypeInterner,
    pub tree: ContainerTree,
    pub store: DeclarationStore,
    pub module: ModuleId,
    pub pkg: ContainerId,
    offset: AtomicU32,
}

impl World {
    pub fn new() -> Self {
        let types = TypeInterner::new();
        let mut tree = ContainerTree::new();
        let module = tree.add_module(types.intern_string("app"));
        let pkg = tree.add_package(types.intern_string("app"), module);
        World {
            types,
            tree,
            store: DeclarationStore::new(),
            module,
            pkg,
            offset: AtomicU32::new(0),
        }
    }

    pub fn atom(&self, s: &str) -> Atom {
        self.types.intern_string(s)
    }

    /// A fresh, non-overlapping span.
    pub fn span(&self) -> Span {
        let start = self.offset.fetch_add(10, Ordering::Relaxed);
        Span::new(start, start + 5)
    }

    pub fn declare(
        &self,
        name: &str,
        kind: DeclarationKind,
        f: impl FnOnce(&mut Declaration),
    ) -> Arc<Declaration> {
        self.declare_in(self.pkg, name, kind, f)
    }

    pub fn declare_in(
        &self,
        container: ContainerId,
        name: &str,
        kind: DeclarationKind,
        f: impl FnOnce(&mut Declaration),
    ) -> Arc<Declaration> {
        let mut decl = Declaration::new(self.atom(name), kind, container);
        f(&mut decl);
        self.store.add(decl)
    }

    pub fn function(&self, name: &str, params: &[(&str, TypeId)], ret: TypeId) -> Arc<Declaration> {
        self.declare(name, DeclarationKind::Function, |d| {
            d.value_params = params.iter().map(|(n, ty)| self.param(n, *ty)).collect();
            d.return_type = ret;
        })
    }

    pub fn param(&self, name: &str, ty: TypeId) -> ValueParameter {
        ValueParameter::new(self.atom(name), ty)
    }

    pub fn fn_type(&self, params: &[TypeId], ret: TypeId) -> TypeId {
        self.types.function(None, params.to_vec(), ret)
    }

    pub fn tower(&self, levels: Vec<Vec<Arc<Declaration>>>) -> ImplicitScopeTower<'_> {
        self.tower_at(self.pkg, levels)
    }

    pub fn tower_at(
        &self,
        location: ContainerId,
        levels: Vec<Vec<Arc<Declaration>>>,
    ) -> ImplicitScopeTower<'_> {
        let mut tower = ImplicitScopeTower::new(&self.types, &self.tree, location);
        for level in levels {
            tower.push_level(DeclarationLevel::importing(level));
        }
        tower
    }

    pub fn call(&self, name: &str, args: Vec<Expr>) -> CallExpr {
        CallExpr::new(
            self.atom(name),
            args.into_iter().map(CallArgument::positional).collect(),
            self.span(),
        )
    }

    pub fn int(&self, value: i64) -> Expr {
        Expr::int(value, self.span())
    }

    pub fn string(&self, value: &str) -> Expr {
        Expr::string(value, self.span())
    }

    pub fn name(&self, name: &str) -> Expr {
        Expr::name(self.atom(name), self.span())
    }

    /// `{ statements }` without declared parameters.
    pub fn lambda(&self, body: Vec<Expr>) -> LambdaExpr {
        LambdaExpr::new(
            Vec::new(),
            body.into_iter().map(Statement::Expression).collect(),
            self.span(),
        )
    }

    /// `{ name: ty -> statements }`.
    pub fn lambda_with(&self, params: &[(&str, Option<TypeId>)], body: Vec<Expr>) -> LambdaExpr {
        LambdaExpr::new(
            params
                .iter()
                .map(|(name, ty)| LambdaParam {
                    name: self.atom(name),
                    ty: *ty,
                })
                .collect(),
            body.into_iter().map(Statement::Expression).collect(),
            self.span(),
        )
    }
}
