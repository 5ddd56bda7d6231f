//! Scenario files: a program's declarations plus the calls to resolve in it.
//!
//! ```json
//! {
//!   "options": { "allowDynamic": false },
//!   "classes": [{ "name": "Box", "typeParams": [{ "name": "T", "variance": "out" }] }],
//!   "declarations": [{
//!     "name": "apply",
//!     "typeParams": [{ "name": "T" }, { "name": "R" }],
//!     "params": [{ "name": "x", "type": "T" }, { "name": "f", "type": "(T) -> R" }],
//!     "returns": "R"
//!   }],
//!   "calls": [{
//!     "call": { "name": "apply", "args": [{ "int": 5 }],
//!               "lambda": { "body": [{ "binary": { "op": "+", "lhs": { "name": "it" }, "rhs": { "int": 1 } } }] } }
//!   }]
//! }
//! ```
//!
//! [`Program::build`] turns the declarative part into the resolver's shared
//! tables; calls are lowered separately by the driver.

use crate::type_syntax::{TypeSyntax, parse_type};
use anyhow::{Context, Result, bail};
use calltower_resolve::tower::MemberIndex;
use calltower_resolve::{
    ContainerId, ContainerTree, Declaration, DeclarationKind, DeclarationStore, Modifiers,
    ModuleId, ResolutionOptions, ValueParameter, Visibility,
};
use calltower_solver::{ClassId, ClassKind, TypeDatabase, TypeId, TypeInterner, Variance};
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

/// Name of the module and package that exist in every program.
pub const ROOT: &str = "main";

// =============================================================================
// File model
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    #[serde(default)]
    pub options: ResolutionOptions,
    #[serde(default)]
    pub modules: Vec<ModuleSpec>,
    #[serde(default)]
    pub containers: Vec<ContainerSpec>,
    #[serde(default)]
    pub classes: Vec<ClassSpec>,
    #[serde(default)]
    pub declarations: Vec<DeclarationSpec>,
    #[serde(default)]
    pub calls: Vec<CallSpec>,
    pub move_check: Option<MoveCheckSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleSpec {
    pub name: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum ContainerSpec {
    /// A package; its module defaults to the root module.
    Package { name: String, module: Option<String> },
    /// A function body, optionally owned by a declaration label.
    Function {
        name: String,
        parent: Option<String>,
        owner: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClassKindSpec {
    #[default]
    Class,
    Interface,
    Object,
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VarianceSpec {
    #[default]
    Invariant,
    In,
    Out,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeParamSpec {
    pub name: String,
    #[serde(default)]
    pub variance: VarianceSpec,
    pub bound: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSpec {
    pub name: String,
    #[serde(default)]
    pub kind: ClassKindSpec,
    #[serde(default)]
    pub type_params: Vec<TypeParamSpec>,
    #[serde(default)]
    pub supertypes: Vec<String>,
    /// Enclosing class; otherwise the class lives in `container`.
    pub outer: Option<String>,
    #[serde(default)]
    pub inner: bool,
    pub container: Option<String>,
    #[serde(default)]
    pub members: Vec<DeclarationSpec>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KindSpec {
    #[default]
    Function,
    Variable,
    Object,
    Constructor,
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VisibilitySpec {
    #[default]
    Public,
    Internal,
    Protected,
    Private,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ModifierSpec {
    Infix,
    Operator,
    Hidden,
    LowPriority,
    Error,
    Synthesized,
    StaticExtension,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub vararg: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclarationSpec {
    pub name: String,
    /// Handle used by scopes and references; defaults to the name, so
    /// overloads share it.
    pub label: Option<String>,
    #[serde(default)]
    pub kind: KindSpec,
    pub container: Option<String>,
    #[serde(default)]
    pub visibility: VisibilitySpec,
    #[serde(default)]
    pub type_params: Vec<TypeParamSpec>,
    pub receiver: Option<String>,
    #[serde(default)]
    pub params: Vec<ParamSpec>,
    pub returns: Option<String>,
    #[serde(default)]
    pub modifiers: Vec<ModifierSpec>,
    #[serde(default)]
    pub inherited: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelSpec {
    /// Local levels stop the search when they contain the name.
    #[serde(default)]
    pub local: bool,
    pub declarations: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSpec {
    pub label: Option<String>,
    /// Container of the call site; the root package by default.
    pub location: Option<String>,
    /// Innermost first. Defaults to one level with every top-level declaration.
    pub levels: Option<Vec<LevelSpec>>,
    /// Innermost first.
    #[serde(default)]
    pub implicit_receivers: Vec<String>,
    pub expected: Option<String>,
    #[serde(default)]
    pub debugger: bool,
    /// Resolve with an already-cancelled token.
    #[serde(default)]
    pub cancelled: bool,
    pub call: CallExprSpec,
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CallFormSpec {
    #[default]
    Regular,
    Infix,
    Operator,
    Invoke,
    UnaryPlusAsPlus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallExprSpec {
    pub name: String,
    pub receiver: Option<Box<ExprSpec>>,
    #[serde(default)]
    pub safe: bool,
    #[serde(default)]
    pub type_args: Vec<String>,
    #[serde(default)]
    pub args: Vec<ArgSpec>,
    /// Trailing lambda.
    pub lambda: Option<LambdaSpec>,
    #[serde(default)]
    pub form: CallFormSpec,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ArgSpec {
    Named { name: String, value: ExprSpec },
    Positional(ExprSpec),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExprSpec {
    Int(i64),
    Long(i64),
    Double(f64),
    Bool(bool),
    String(String),
    Char(char),
    Null,
    This,
    Name(String),
    Member {
        receiver: Box<ExprSpec>,
        name: String,
        #[serde(default)]
        safe: bool,
    },
    Call(Box<CallExprSpec>),
    Binary {
        op: String,
        lhs: Box<ExprSpec>,
        rhs: Box<ExprSpec>,
    },
    Lambda(LambdaSpec),
    Paren(Box<ExprSpec>),
    /// An opaque value of the given type.
    Typed(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LambdaParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LambdaSpec {
    #[serde(default)]
    pub params: Vec<LambdaParamSpec>,
    #[serde(default)]
    pub body: Vec<StatementSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum StatementSpec {
    Local {
        val: String,
        #[serde(rename = "type")]
        ty: Option<String>,
        init: ExprSpec,
    },
    Expression(ExprSpec),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveCheckSpec {
    pub declarations: Vec<String>,
    pub target: String,
    #[serde(default)]
    pub references: Vec<ReferenceSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceSpec {
    pub site: String,
    pub target: String,
}

pub fn parse_scenario(text: &str) -> Result<Scenario> {
    serde_json::from_str(text).context("invalid scenario file")
}

// =============================================================================
// Program tables
// =============================================================================

struct ClassEntry {
    id: ClassId,
    params: Vec<(String, TypeId)>,
    container: ContainerId,
}

/// Shared tables built from a scenario.
pub struct Program {
    pub types: TypeInterner,
    pub tree: ContainerTree,
    pub store: DeclarationStore,
    pub members: MemberIndex,
    pub root: ContainerId,
    modules: FxHashMap<String, ModuleId>,
    containers: FxHashMap<String, ContainerId>,
    classes: FxHashMap<String, ClassEntry>,
    labels: FxHashMap<String, Vec<Arc<Declaration>>>,
    top_level: Vec<Arc<Declaration>>,
}

impl Program {
    pub fn build(scenario: &Scenario) -> Result<Program> {
        let types = TypeInterner::new();
        let mut tree = ContainerTree::new();
        let root_module = tree.add_module(types.intern_string(ROOT));
        let root = tree.add_package(types.intern_string(ROOT), root_module);
        let mut program = Program {
            types,
            tree,
            store: DeclarationStore::new(),
            members: MemberIndex::new(),
            root,
            modules: FxHashMap::from_iter([(ROOT.to_string(), root_module)]),
            containers: FxHashMap::from_iter([(ROOT.to_string(), root)]),
            classes: FxHashMap::default(),
            labels: FxHashMap::default(),
            top_level: Vec::new(),
        };

        program.add_modules(&scenario.modules)?;
        program.add_packages(&scenario.containers)?;
        program.add_classes(&scenario.classes)?;
        program.add_functions(&scenario.containers)?;
        for spec in &scenario.declarations {
            let decl = program.add_declaration(spec, None)?;
            program.top_level.push(decl);
        }
        for class in &scenario.classes {
            for member in &class.members {
                program.add_declaration(member, Some(&class.name))?;
            }
        }
        program.assign_owners(&scenario.containers)?;
        debug!(
            declarations = program.store.len(),
            classes = program.classes.len(),
            "scenario program built"
        );
        Ok(program)
    }

    fn add_modules(&mut self, modules: &[ModuleSpec]) -> Result<()> {
        for module in modules {
            let id = self.tree.add_module(self.types.intern_string(&module.name));
            self.modules.insert(module.name.clone(), id);
        }
        for module in modules {
            let from = self.module(&module.name)?;
            for dependency in &module.depends_on {
                let to = self.module(dependency)?;
                self.tree.add_module_dependency(from, to);
            }
        }
        Ok(())
    }

    fn add_packages(&mut self, containers: &[ContainerSpec]) -> Result<()> {
        for spec in containers {
            if let ContainerSpec::Package { name, module } = spec {
                let module = self.module(module.as_deref().unwrap_or(ROOT))?;
                let id = self.tree.add_package(self.types.intern_string(name), module);
                self.define_container(name, id)?;
            }
        }
        Ok(())
    }

    fn add_functions(&mut self, containers: &[ContainerSpec]) -> Result<()> {
        for spec in containers {
            if let ContainerSpec::Function { name, parent, .. } = spec {
                let parent = self.container(parent.as_deref().unwrap_or(ROOT))?;
                let id = self.tree.add_function(self.types.intern_string(name), parent);
                self.define_container(name, id)?;
            }
        }
        Ok(())
    }

    fn assign_owners(&mut self, containers: &[ContainerSpec]) -> Result<()> {
        for spec in containers {
            if let ContainerSpec::Function {
                name,
                owner: Some(owner),
                ..
            } = spec
            {
                let container = self.container(name)?;
                let decl = self.single(owner)?;
                self.tree.set_owner(container, decl.id);
            }
        }
        Ok(())
    }

    fn add_classes(&mut self, classes: &[ClassSpec]) -> Result<()> {
        for spec in classes {
            let params: Vec<(&str, Variance)> = spec
                .type_params
                .iter()
                .map(|p| (p.name.as_str(), variance(p.variance)))
                .collect();
            let id = self.types.declare_class(&spec.name, class_kind(spec.kind), &params);
            let parent = match (&spec.outer, &spec.container) {
                (Some(outer), _) => self.class(outer)?.container,
                (None, Some(container)) => self.container(container)?,
                (None, None) => self.root,
            };
            let container = self.tree.add_class(self.types.intern_string(&spec.name), id, parent);
            self.define_container(&spec.name, container)?;
            let params: Vec<(String, TypeId)> = self
                .types
                .class_info(id)
                .map(|info| {
                    spec.type_params
                        .iter()
                        .zip(&info.type_params)
                        .map(|(p, tp)| (p.name.clone(), tp.param))
                        .collect()
                })
                .unwrap_or_default();
            if let Some(outer) = &spec.outer {
                let outer = self.class(outer)?.id;
                self.types.set_outer(id, outer, spec.inner);
            }
            self.classes.insert(
                spec.name.clone(),
                ClassEntry {
                    id,
                    params,
                    container,
                },
            );
        }
        // Supertypes and bounds may mention any class.
        for spec in classes {
            let entry = self.class(&spec.name)?;
            let scope = entry.params.clone();
            let id = entry.id;
            for (param, (_, ty)) in spec.type_params.iter().zip(&scope) {
                if let Some(bound) = &param.bound {
                    let bound = self.resolve_type(bound, &scope)?;
                    self.types.set_upper_bound(*ty, bound);
                }
            }
            let supertypes = spec
                .supertypes
                .iter()
                .map(|s| self.resolve_type(s, &scope))
                .collect::<Result<Vec<_>>>()?;
            self.types.set_supertypes(id, supertypes);
        }
        Ok(())
    }

    fn add_declaration(
        &mut self,
        spec: &DeclarationSpec,
        member_of: Option<&str>,
    ) -> Result<Arc<Declaration>> {
        let (mut scope, container, class) = match member_of {
            Some(class) => {
                let entry = self.class(class)?;
                (entry.params.clone(), entry.container, Some(entry.id))
            }
            None => {
                let container = match &spec.container {
                    Some(name) => self.container(name)?,
                    None => self.root,
                };
                (Vec::new(), container, None)
            }
        };

        let mut decl = Declaration::new(
            self.types.intern_string(&spec.name),
            declaration_kind(spec.kind),
            container,
        );
        for param in &spec.type_params {
            let ty = self.types.type_parameter(&param.name);
            scope.push((param.name.clone(), ty));
            decl.type_params.push(ty);
        }
        for (param, ty) in spec.type_params.iter().zip(decl.type_params.clone()) {
            if let Some(bound) = &param.bound {
                let bound = self.resolve_type(bound, &scope)?;
                self.types.set_upper_bound(ty, bound);
            }
        }

        decl.visibility = visibility(spec.visibility);
        decl.modifiers = spec.modifiers.iter().fold(Modifiers::empty(), |m, s| m | modifier(*s));
        if spec.inherited {
            decl.origin = calltower_resolve::DeclarationOrigin::Inherited;
        }
        decl.dispatch_receiver = class.map(|id| self.types.class_self_type(id));
        decl.extension_receiver = spec
            .receiver
            .as_deref()
            .map(|r| self.resolve_type(r, &scope))
            .transpose()?;
        decl.value_params = spec
            .params
            .iter()
            .map(|p| {
                let mut param = ValueParameter::new(
                    self.types.intern_string(&p.name),
                    self.resolve_type(&p.ty, &scope)?,
                );
                if p.default {
                    param = param.with_default();
                }
                if p.vararg {
                    param = param.vararg();
                }
                Ok(param)
            })
            .collect::<Result<Vec<_>>>()?;
        decl.return_type = match (&spec.returns, spec.kind) {
            (Some(ty), _) => self.resolve_type(ty, &scope)?,
            (None, KindSpec::Constructor) => match class {
                Some(id) => self.types.class_self_type(id),
                None => bail!("constructor '{}' must be a class member", spec.name),
            },
            (None, _) => TypeId::UNIT,
        };

        let decl = self.store.add(decl);
        if let Some(class) = class
            && spec.kind != KindSpec::Constructor
        {
            self.members.add(class, Arc::clone(&decl));
        }
        let label = spec.label.clone().unwrap_or_else(|| spec.name.clone());
        self.labels.entry(label).or_default().push(Arc::clone(&decl));
        Ok(decl)
    }

    // -------------------------------------------------------------------------
    // Lookups
    // -------------------------------------------------------------------------

    fn define_container(&mut self, name: &str, id: ContainerId) -> Result<()> {
        if self.containers.insert(name.to_string(), id).is_some() {
            bail!("container '{name}' is defined twice");
        }
        Ok(())
    }

    fn module(&self, name: &str) -> Result<ModuleId> {
        self.modules
            .get(name)
            .copied()
            .with_context(|| format!("unknown module '{name}'"))
    }

    pub fn container(&self, name: &str) -> Result<ContainerId> {
        self.containers
            .get(name)
            .copied()
            .with_context(|| format!("unknown container '{name}'"))
    }

    fn class(&self, name: &str) -> Result<&ClassEntry> {
        self.classes
            .get(name)
            .with_context(|| format!("unknown class '{name}'"))
    }

    /// Every declaration carrying `label`.
    pub fn declarations(&self, label: &str) -> Result<&[Arc<Declaration>]> {
        self.labels
            .get(label)
            .map(Vec::as_slice)
            .with_context(|| format!("unknown declaration '{label}'"))
    }

    /// The one declaration carrying `label`.
    pub fn single(&self, label: &str) -> Result<&Arc<Declaration>> {
        match self.declarations(label)? {
            [decl] => Ok(decl),
            _ => bail!("declaration label '{label}' is ambiguous"),
        }
    }

    /// Top-level declarations in file order.
    pub fn top_level(&self) -> &[Arc<Declaration>] {
        &self.top_level
    }

    /// Resolve a written type against type parameters in `scope` (innermost
    /// last), then built-in types, then classes.
    pub fn resolve_type(&self, source: &str, scope: &[(String, TypeId)]) -> Result<TypeId> {
        let syntax = parse_type(source)?;
        self.lower_type(&syntax, scope)
            .with_context(|| format!("in type '{source}'"))
    }

    fn lower_type(&self, syntax: &TypeSyntax, scope: &[(String, TypeId)]) -> Result<TypeId> {
        match syntax {
            TypeSyntax::Nullable(inner) => Ok(self.types.nullable(self.lower_type(inner, scope)?)),
            TypeSyntax::Function {
                receiver,
                params,
                ret,
            } => {
                let receiver = receiver
                    .as_deref()
                    .map(|r| self.lower_type(r, scope))
                    .transpose()?;
                let params = params
                    .iter()
                    .map(|p| self.lower_type(p, scope))
                    .collect::<Result<Vec<_>>>()?;
                Ok(self.types.function(receiver, params, self.lower_type(ret, scope)?))
            }
            TypeSyntax::Named { name, args } => {
                if let Some((_, ty)) = scope.iter().rev().find(|(n, _)| n == name) {
                    if !args.is_empty() {
                        bail!("type parameter '{name}' takes no arguments");
                    }
                    return Ok(*ty);
                }
                if let Some(ty) = builtin(name) {
                    if !args.is_empty() {
                        bail!("'{name}' takes no type arguments");
                    }
                    return Ok(ty);
                }
                let entry = self.class(name)?;
                if args.len() != entry.params.len() {
                    bail!(
                        "'{name}' expects {} type arguments, found {}",
                        entry.params.len(),
                        args.len()
                    );
                }
                let args = args
                    .iter()
                    .map(|a| self.lower_type(a, scope))
                    .collect::<Result<Vec<_>>>()?;
                Ok(self.types.class_type(entry.id, args))
            }
        }
    }

    pub fn describe_type(&self, ty: TypeId) -> String {
        calltower_solver::TypeFormatter::new(&self.types).format(ty)
    }
}

fn builtin(name: &str) -> Option<TypeId> {
    Some(match name {
        "Int" => TypeId::INT,
        "Long" => TypeId::LONG,
        "Double" => TypeId::DOUBLE,
        "Boolean" => TypeId::BOOLEAN,
        "Char" => TypeId::CHAR,
        "String" => TypeId::STRING,
        "Unit" => TypeId::UNIT,
        "Any" => TypeId::ANY,
        "Nothing" => TypeId::NOTHING,
        "dynamic" => TypeId::DYNAMIC,
        _ => return None,
    })
}

fn class_kind(kind: ClassKindSpec) -> ClassKind {
    match kind {
        ClassKindSpec::Class => ClassKind::Class,
        ClassKindSpec::Interface => ClassKind::Interface,
        ClassKindSpec::Object => ClassKind::Object,
    }
}

fn variance(variance: VarianceSpec) -> Variance {
    match variance {
        VarianceSpec::Invariant => Variance::Invariant,
        VarianceSpec::In => Variance::Contravariant,
        VarianceSpec::Out => Variance::Covariant,
    }
}

fn declaration_kind(kind: KindSpec) -> DeclarationKind {
    match kind {
        KindSpec::Function => DeclarationKind::Function,
        KindSpec::Variable => DeclarationKind::Variable,
        KindSpec::Object => DeclarationKind::Object,
        KindSpec::Constructor => DeclarationKind::Constructor,
    }
}

fn visibility(visibility: VisibilitySpec) -> Visibility {
    match visibility {
        VisibilitySpec::Public => Visibility::Public,
        VisibilitySpec::Internal => Visibility::Internal,
        VisibilitySpec::Protected => Visibility::Protected,
        VisibilitySpec::Private => Visibility::Private,
    }
}

fn modifier(modifier: ModifierSpec) -> Modifiers {
    match modifier {
        ModifierSpec::Infix => Modifiers::INFIX,
        ModifierSpec::Operator => Modifiers::OPERATOR,
        ModifierSpec::Hidden => Modifiers::HIDDEN,
        ModifierSpec::LowPriority => Modifiers::LOW_PRIORITY,
        ModifierSpec::Error => Modifiers::ERROR,
        ModifierSpec::Synthesized => Modifiers::SYNTHESIZED,
        ModifierSpec::StaticExtension => Modifiers::STATIC_EXTENSION,
    }
}

#[cfg(test)]
#[path = "../tests/scenario_tests.rs"]
mod scenario_tests;
