//! Expression trees handed to the resolver, and the analyzer seam that
//! types them.
//!
//! The resolver never types expressions itself; it goes through an
//! [`ExpressionAnalyzer`]. Lambda bodies are analyzed through the same seam,
//! which is how calls nested in lambdas are resolved re-entrantly.

use crate::error::AnalysisAbort;
use crate::resolver::CallResolver;
use crate::tower::ImplicitScopeTower;
use crate::trace::BindingTrace;
use calltower_common::diagnostics::diagnostic_codes;
use calltower_common::{Atom, Diagnostic, Span};
use calltower_solver::{TypeFormatter, TypeId, is_subtype_of};
use tracing::trace;

/// Stack space kept free before growing; recursion on deeply nested trees
/// switches to a fresh segment instead of overflowing.
const STACK_RED_ZONE: usize = 64 * 1024;
const STACK_GROW_SIZE: usize = 1024 * 1024;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    NotEq,
}

impl BinaryOp {
    /// Name of the operator function a non-builtin use resolves to.
    pub fn operator_name(self) -> &'static str {
        match self {
            BinaryOp::Add => "plus",
            BinaryOp::Sub => "minus",
            BinaryOp::Mul => "times",
            BinaryOp::Div => "div",
            BinaryOp::Rem => "rem",
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => "compareTo",
            BinaryOp::Eq | BinaryOp::NotEq => "equals",
        }
    }

    fn is_comparison(self) -> bool {
        matches!(self, BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    IntLiteral(i64),
    LongLiteral(i64),
    DoubleLiteral(f64),
    BooleanLiteral(bool),
    StringLiteral(String),
    CharLiteral(char),
    NullLiteral,
    Name(Atom),
    This,
    Member {
        receiver: Box<Expr>,
        name: Atom,
        safe: bool,
    },
    Call(Box<CallExpr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Lambda(Box<LambdaExpr>),
    Parenthesized(Box<Expr>),
    /// An already-typed value (synthetic operands, test fixtures).
    Typed(TypeId),
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr { kind, span }
    }

    pub fn int(value: i64, span: Span) -> Self {
        Expr::new(ExprKind::IntLiteral(value), span)
    }

    pub fn string(value: impl Into<String>, span: Span) -> Self {
        Expr::new(ExprKind::StringLiteral(value.into()), span)
    }

    pub fn name(name: Atom, span: Span) -> Self {
        Expr::new(ExprKind::Name(name), span)
    }

    pub fn typed(ty: TypeId, span: Span) -> Self {
        Expr::new(ExprKind::Typed(ty), span)
    }

    pub fn call(call: CallExpr) -> Self {
        let span = call.span;
        Expr::new(ExprKind::Call(Box::new(call)), span)
    }

    pub fn lambda(lambda: LambdaExpr) -> Self {
        let span = lambda.span;
        Expr::new(ExprKind::Lambda(Box::new(lambda)), span)
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        let span = lhs.span.merge(rhs.span);
        Expr::new(
            ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            span,
        )
    }

    pub fn parenthesized(inner: Expr, span: Span) -> Self {
        Expr::new(ExprKind::Parenthesized(Box::new(inner)), span)
    }

    /// The expression inside one level of parentheses.
    pub fn strip_parentheses(&self) -> &Expr {
        match &self.kind {
            ExprKind::Parenthesized(inner) => inner,
            _ => self,
        }
    }

    pub fn as_lambda(&self) -> Option<&LambdaExpr> {
        match &self.kind {
            ExprKind::Lambda(lambda) => Some(lambda),
            _ => None,
        }
    }
}

/// How a call was written; decides which modifier the callee needs.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum CallForm {
    #[default]
    Regular,
    /// `a foo b`
    Infix,
    /// `a + b` resolved to `a.plus(b)`.
    Operator,
    /// `f(x)` where `f` is a value with an `invoke` operator.
    Invoke,
    /// `+a` resolved through the legacy `plus()` convention.
    UnaryPlusAsPlus,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CallArgument {
    pub name: Option<Atom>,
    pub value: Expr,
    /// Written after the parentheses: `foo(1) { ... }`.
    pub is_trailing_lambda: bool,
}

impl CallArgument {
    pub fn positional(value: Expr) -> Self {
        CallArgument {
            name: None,
            value,
            is_trailing_lambda: false,
        }
    }

    pub fn named(name: Atom, value: Expr) -> Self {
        CallArgument {
            name: Some(name),
            value,
            is_trailing_lambda: false,
        }
    }

    pub fn trailing_lambda(lambda: LambdaExpr) -> Self {
        CallArgument {
            name: None,
            value: Expr::lambda(lambda),
            is_trailing_lambda: true,
        }
    }

    pub fn is_lambda(&self) -> bool {
        self.value.strip_parentheses().as_lambda().is_some()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CallExpr {
    pub receiver: Option<Box<Expr>>,
    /// `receiver?.name(...)`
    pub safe_call: bool,
    pub name: Atom,
    pub type_args: Vec<TypeId>,
    pub args: Vec<CallArgument>,
    pub form: CallForm,
    pub span: Span,
}

impl CallExpr {
    pub fn new(name: Atom, args: Vec<CallArgument>, span: Span) -> Self {
        CallExpr {
            receiver: None,
            safe_call: false,
            name,
            type_args: Vec::new(),
            args,
            form: CallForm::Regular,
            span,
        }
    }

    #[must_use]
    pub fn with_receiver(mut self, receiver: Expr) -> Self {
        self.receiver = Some(Box::new(receiver));
        self
    }

    #[must_use]
    pub fn with_type_args(mut self, type_args: Vec<TypeId>) -> Self {
        self.type_args = type_args;
        self
    }

    #[must_use]
    pub fn with_form(mut self, form: CallForm) -> Self {
        self.form = form;
        self
    }

    pub fn argument_spans(&self) -> Vec<Span> {
        self.args.iter().map(|arg| arg.value.span).collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LambdaParam {
    pub name: Atom,
    /// Explicit annotation, if written.
    pub ty: Option<TypeId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LambdaExpr {
    pub params: Vec<LambdaParam>,
    pub body: Vec<Statement>,
    pub span: Span,
}

impl LambdaExpr {
    pub fn new(params: Vec<LambdaParam>, body: Vec<Statement>, span: Span) -> Self {
        LambdaExpr { params, body, span }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    Expression(Expr),
    Local {
        name: Atom,
        ty: Option<TypeId>,
        initializer: Expr,
        span: Span,
    },
}

/// Whether the result type feeds an enclosing constraint system.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ContextDependency {
    /// Checked against the expected type on the spot.
    #[default]
    Independent,
    /// Left to the enclosing call's constraint system.
    Dependent,
}

/// Where and how an expression is analyzed.
#[derive(Clone, Copy)]
pub struct AnalysisScope<'t, 'a> {
    pub tower: &'t ImplicitScopeTower<'a>,
    pub expected_type: Option<TypeId>,
    pub dependency: ContextDependency,
    /// Number of lambda bodies being analyzed around this expression.
    pub lambda_depth: u32,
}

impl<'t, 'a> AnalysisScope<'t, 'a> {
    pub fn new(tower: &'t ImplicitScopeTower<'a>) -> Self {
        AnalysisScope {
            tower,
            expected_type: None,
            dependency: ContextDependency::Independent,
            lambda_depth: 0,
        }
    }

    #[must_use]
    pub fn expecting(self, expected_type: Option<TypeId>) -> Self {
        AnalysisScope {
            expected_type,
            ..self
        }
    }

    #[must_use]
    pub fn dependent(self) -> Self {
        AnalysisScope {
            dependency: ContextDependency::Dependent,
            ..self
        }
    }

    #[must_use]
    pub fn independent(self) -> Self {
        AnalysisScope {
            dependency: ContextDependency::Independent,
            ..self
        }
    }
}

/// Types expressions. Implementations must be shareable between sessions.
pub trait ExpressionAnalyzer: Send + Sync {
    fn analyze(
        &self,
        resolver: &CallResolver<'_>,
        scope: &AnalysisScope<'_, '_>,
        expr: &Expr,
        trace: &mut BindingTrace,
    ) -> Result<TypeId, AnalysisAbort>;
}

/// Analyzer for the expression forms defined in this module.
#[derive(Debug, Default)]
pub struct SimpleExpressionAnalyzer;

impl SimpleExpressionAnalyzer {
    fn analyze_kind(
        &self,
        resolver: &CallResolver<'_>,
        scope: &AnalysisScope<'_, '_>,
        expr: &Expr,
        trace: &mut BindingTrace,
    ) -> Result<TypeId, AnalysisAbort> {
        let db = scope.tower.db();
        let ty = match &expr.kind {
            ExprKind::IntLiteral(_) => TypeId::INT,
            ExprKind::LongLiteral(_) => TypeId::LONG,
            ExprKind::DoubleLiteral(_) => TypeId::DOUBLE,
            ExprKind::BooleanLiteral(_) => TypeId::BOOLEAN,
            ExprKind::StringLiteral(_) => TypeId::STRING,
            ExprKind::CharLiteral(_) => TypeId::CHAR,
            ExprKind::NullLiteral => TypeId::NULL,
            ExprKind::Typed(ty) => *ty,
            ExprKind::This => match scope.tower.implicit_receivers().first() {
                Some(receiver) => receiver.ty,
                None => {
                    trace.report(Diagnostic::from_code(
                        expr.span,
                        diagnostic_codes::UNRESOLVED_REFERENCE,
                        &["this"],
                    ));
                    TypeId::ERROR
                }
            },
            ExprKind::Name(name) => resolver.resolve_variable(scope, None, *name, expr.span, trace)?,
            ExprKind::Member {
                receiver,
                name,
                safe,
            } => {
                let inner = scope.independent().expecting(None);
                let receiver_type = self.analyze(resolver, &inner, receiver, trace)?;
                let receiver = crate::candidate::ReceiverValue::new(receiver_type);
                let ty = resolver.resolve_variable(scope, Some((receiver, *safe)), *name, expr.span, trace)?;
                if *safe { db.nullable(ty) } else { ty }
            }
            ExprKind::Call(call) => resolver.resolve_call_in_scope(scope, call, trace)?,
            ExprKind::Binary { op, lhs, rhs } => {
                self.analyze_binary(resolver, scope, expr.span, *op, lhs, rhs, trace)?
            }
            ExprKind::Lambda(lambda) => resolver.analyze_lambda_value(scope, lambda, trace)?,
            ExprKind::Parenthesized(inner) => self.analyze(resolver, scope, inner, trace)?,
        };
        Ok(ty)
    }

    fn analyze_binary(
        &self,
        resolver: &CallResolver<'_>,
        scope: &AnalysisScope<'_, '_>,
        span: Span,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        trace: &mut BindingTrace,
    ) -> Result<TypeId, AnalysisAbort> {
        let operand_scope = scope.independent().expecting(None);
        let left = self.analyze(resolver, &operand_scope, lhs, trace)?;
        let right = self.analyze(resolver, &operand_scope, rhs, trace)?;
        if let Some(ty) = builtin_binary(op, left, right) {
            return Ok(ty);
        }
        let db = scope.tower.db();
        let call = CallExpr::new(
            db.intern_string(op.operator_name()),
            vec![CallArgument::positional(Expr::typed(right, rhs.span))],
            span,
        )
        .with_receiver(Expr::typed(left, lhs.span))
        .with_form(CallForm::Operator);
        let result = resolver.resolve_call_in_scope(&scope.independent().expecting(None), &call, trace)?;
        Ok(if op.is_comparison() || matches!(op, BinaryOp::Eq | BinaryOp::NotEq) {
            TypeId::BOOLEAN
        } else {
            result
        })
    }
}

fn numeric_rank(ty: TypeId) -> Option<u8> {
    match ty {
        TypeId::INT => Some(0),
        TypeId::LONG => Some(1),
        TypeId::DOUBLE => Some(2),
        _ => None,
    }
}

/// Arithmetic and comparison on primitive operands.
fn builtin_binary(op: BinaryOp, left: TypeId, right: TypeId) -> Option<TypeId> {
    if matches!(op, BinaryOp::Eq | BinaryOp::NotEq) {
        return Some(TypeId::BOOLEAN);
    }
    if left == TypeId::ERROR || right == TypeId::ERROR {
        return Some(TypeId::ERROR);
    }
    if op == BinaryOp::Add && left == TypeId::STRING {
        return Some(TypeId::STRING);
    }
    if op.is_comparison() && left == TypeId::STRING && right == TypeId::STRING {
        return Some(TypeId::BOOLEAN);
    }
    let (l, r) = (numeric_rank(left)?, numeric_rank(right)?);
    if op.is_comparison() {
        return Some(TypeId::BOOLEAN);
    }
    Some(if l >= r { left } else { right })
}

impl ExpressionAnalyzer for SimpleExpressionAnalyzer {
    fn analyze(
        &self,
        resolver: &CallResolver<'_>,
        scope: &AnalysisScope<'_, '_>,
        expr: &Expr,
        trace: &mut BindingTrace,
    ) -> Result<TypeId, AnalysisAbort> {
        scope.tower.cancellation().check()?;
        let ty = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
            self.analyze_kind(resolver, scope, expr, trace)
        })?;
        trace!(start = expr.span.start, ty = ty.0, "expression type");
        trace.record_type(expr.span, ty);

        if scope.dependency == ContextDependency::Independent
            && let Some(expected) = scope.expected_type
        {
            let db = scope.tower.db();
            if !is_subtype_of(db, ty, expected) {
                let formatter = TypeFormatter::new(db);
                trace.report(Diagnostic::from_code(
                    expr.span,
                    diagnostic_codes::TYPE_MISMATCH,
                    &[&formatter.format(ty), &formatter.format(expected)],
                ));
            }
        }
        Ok(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_arithmetic_widens() {
        assert_eq!(builtin_binary(BinaryOp::Add, TypeId::INT, TypeId::INT), Some(TypeId::INT));
        assert_eq!(builtin_binary(BinaryOp::Mul, TypeId::INT, TypeId::LONG), Some(TypeId::LONG));
        assert_eq!(builtin_binary(BinaryOp::Sub, TypeId::DOUBLE, TypeId::INT), Some(TypeId::DOUBLE));
        assert_eq!(builtin_binary(BinaryOp::Lt, TypeId::INT, TypeId::DOUBLE), Some(TypeId::BOOLEAN));
        assert_eq!(builtin_binary(BinaryOp::Add, TypeId::STRING, TypeId::INT), Some(TypeId::STRING));
        assert_eq!(builtin_binary(BinaryOp::Add, TypeId::INT, TypeId::STRING), None);
        assert_eq!(builtin_binary(BinaryOp::Eq, TypeId::ANY, TypeId::INT), Some(TypeId::BOOLEAN));
    }

    #[test]
    fn test_strip_parentheses_removes_one_level() {
        let inner = Expr::int(1, Span::new(2, 3));
        let once = Expr::parenthesized(inner.clone(), Span::new(1, 4));
        let twice = Expr::parenthesized(once.clone(), Span::new(0, 5));
        assert_eq!(once.strip_parentheses(), &inner);
        assert_eq!(twice.strip_parentheses(), &once);
    }

    #[test]
    fn test_trailing_lambda_argument_is_lambda() {
        let lambda = LambdaExpr::new(vec![], vec![], Span::new(0, 2));
        let arg = CallArgument::trailing_lambda(lambda);
        assert!(arg.is_lambda());
        assert!(arg.is_trailing_lambda);
        assert!(!CallArgument::positional(Expr::int(1, Span::DUMMY)).is_lambda());
    }
}
