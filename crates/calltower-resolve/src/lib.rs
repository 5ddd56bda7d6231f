//! Call resolution for a statically typed language with overloading,
//! extension functions, implicit receivers and lambdas.
//!
//! Resolution of one call runs in four phases:
//!
//! - **Gathering**: the [`tower::ImplicitScopeTower`] yields candidates level
//!   by level through a lazy, cancellable [`sequence::CandidateSequence`]
//! - **Shape check**: arguments are mapped to parameters and calling
//!   conventions are checked ([`arguments`])
//! - **Inference**: each surviving candidate gets its own constraint system;
//!   lambda arguments are re-analyzed once their parameter types are fixed
//!   ([`lambda`])
//! - **Ranking**: candidates are ordered by [`applicability`] tier, then by
//!   [`specificity`] within the best tier
//!
//! Everything a session records (types, chosen declarations, diagnostics)
//! goes into a [`trace::BindingTrace`]. Type tables are shared read-only;
//! each session owns its own state, so independent calls resolve in
//! parallel.

pub mod applicability;
pub mod arguments;
pub mod candidate;
pub mod declarations;
pub mod error;
pub mod expression;
pub mod lambda;
pub mod options;
pub mod resolver;
pub mod sequence;
pub mod specificity;
pub mod tower;
pub mod trace;
pub mod visibility;

pub use applicability::{CandidateApplicability, ResolutionDiagnostic};
pub use candidate::{Candidate, ReceiverValue};
pub use declarations::{
    ContainerId, DeclId, Declaration, DeclarationKind, DeclarationOrigin, DeclarationStore,
    Modifiers, ModuleId, ValueParameter, Visibility,
};
pub use error::AnalysisAbort;
pub use expression::{
    AnalysisScope, BinaryOp, CallArgument, CallExpr, CallForm, ContextDependency, Expr,
    ExpressionAnalyzer, LambdaExpr, LambdaParam, SimpleExpressionAnalyzer, Statement,
};
pub use lambda::{BodyReanalyzer, ExpectedLambdaType, LambdaAnalyzer, SyntheticArgument};
pub use options::ResolutionOptions;
pub use resolver::{CallRequest, CallResolver, ResolutionOutcome, ResolvedCall, render_signature};
pub use tower::{
    DeclarationLevel, DynamicScopeLevel, ImplicitScopeTower, LookupKind, MemberIndex,
    MemberScopeLevel, ScopeTowerLevel, SyntheticScopeLevel,
};
pub use trace::BindingTrace;
pub use visibility::{ContainerTree, MoveConflictChecker, Reference, VisibilityPredictor};
