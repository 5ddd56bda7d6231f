//! Diagnostic types and message lookup for call resolution.
//!
//! Messages are stored as templates with `{0}`-style placeholders and only
//! formatted when a diagnostic is actually reported. Overload resolution
//! evaluates many candidates that are later discarded, so the resolver keeps
//! structured data on candidates and renders text at the very end.

use crate::span::Span;
use serde::Serialize;

// =============================================================================
// Diagnostic Types
// =============================================================================

/// Diagnostic category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticCategory {
    Warning = 0,
    Error = 1,
    Suggestion = 2,
    Message = 3,
}

/// A static message template.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DiagnosticMessage {
    pub code: u32,
    pub category: DiagnosticCategory,
    pub message: &'static str,
}

/// Related information for a diagnostic (e.g. the candidates of an ambiguity).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DiagnosticRelatedInformation {
    pub span: Span,
    pub message_text: String,
    pub category: DiagnosticCategory,
}

/// A rendered diagnostic keyed by the span of the responsible expression.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub span: Span,
    pub message_text: String,
    pub category: DiagnosticCategory,
    pub code: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related_information: Vec<DiagnosticRelatedInformation>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    #[must_use]
    pub const fn error(span: Span, message: String, code: u32) -> Self {
        Self {
            span,
            message_text: message,
            category: DiagnosticCategory::Error,
            code,
            related_information: Vec::new(),
        }
    }

    /// Render a diagnostic from the message table.
    ///
    /// Unknown codes fall back to the raw arguments joined by spaces so a
    /// missing table entry never drops a diagnostic.
    #[must_use]
    pub fn from_code(span: Span, code: u32, args: &[&str]) -> Self {
        let (category, text) = match lookup_message(code) {
            Some(msg) => (msg.category, format_message(msg.message, args)),
            None => (DiagnosticCategory::Error, args.join(" ")),
        };
        Self {
            span,
            message_text: text,
            category,
            code,
            related_information: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_related(mut self, span: Span, message: impl Into<String>) -> Self {
        self.related_information.push(DiagnosticRelatedInformation {
            span,
            message_text: message.into(),
            category: DiagnosticCategory::Message,
        });
        self
    }

    pub fn is_error(&self) -> bool {
        self.category == DiagnosticCategory::Error
    }
}

pub fn lookup_message(code: u32) -> Option<&'static DiagnosticMessage> {
    DIAGNOSTIC_MESSAGES.iter().find(|m| m.code == code)
}

pub fn get_message_template(code: u32) -> Option<&'static str> {
    lookup_message(code).map(|m| m.message)
}

pub fn format_message(message: &str, args: &[&str]) -> String {
    let mut result = message.to_string();
    for (i, arg) in args.iter().enumerate() {
        result = result.replace(&format!("{{{i}}}"), arg);
    }
    result
}

// =============================================================================
// Message Table
// =============================================================================

pub mod diagnostic_codes {
    pub const UNRESOLVED_REFERENCE: u32 = 1001;
    pub const NONE_APPLICABLE: u32 = 1002;
    pub const OVERLOAD_RESOLUTION_AMBIGUITY: u32 = 1003;

    pub const INVISIBLE_MEMBER: u32 = 1010;
    pub const INFIX_MODIFIER_REQUIRED: u32 = 1011;
    pub const OPERATOR_MODIFIER_REQUIRED: u32 = 1012;
    pub const DEPRECATED_UNARY_PLUS_AS_PLUS: u32 = 1013;

    pub const TOO_MANY_ARGUMENTS: u32 = 1020;
    pub const NO_VALUE_FOR_PARAMETER: u32 = 1021;
    pub const NAMED_PARAMETER_NOT_FOUND: u32 = 1022;
    pub const ARGUMENT_PASSED_TWICE: u32 = 1023;
    pub const MIXING_NAMED_AND_POSITIONED_ARGUMENTS: u32 = 1024;
    pub const WRONG_NUMBER_OF_TYPE_ARGUMENTS: u32 = 1025;

    pub const TYPE_MISMATCH: u32 = 1030;
    pub const RECEIVER_TYPE_MISMATCH: u32 = 1031;
    pub const TYPE_INFERENCE_FAILED: u32 = 1032;
    pub const CONSTRAINT_UNSATISFIABLE: u32 = 1033;

    pub const UNSAFE_CALL: u32 = 1040;
    pub const SMART_CAST_IMPOSSIBLE: u32 = 1041;

    pub const NESTED_CLASS_VIA_INSTANCE_REFERENCE: u32 = 1050;
    pub const INNER_CLASS_VIA_STATIC_REFERENCE: u32 = 1051;
    pub const UNSUPPORTED_INNER_CLASS_CALL: u32 = 1052;

    pub const HIDDEN_DECLARATION: u32 = 1060;
    pub const LOW_PRIORITY_DECLARATION: u32 = 1061;
    pub const SYNTHESIZED_DECLARATION: u32 = 1062;
    pub const DYNAMIC_DECLARATION: u32 = 1063;
    pub const SMART_CAST_USED: u32 = 1064;
    pub const ERROR_DECLARATION: u32 = 1065;

    pub const MOVE_MAKES_INACCESSIBLE: u32 = 1070;
    pub const MOVE_MAKES_INTERNAL_INACCESSIBLE: u32 = 1071;
    pub const MOVE_LEAVES_MODULE: u32 = 1072;
}

pub mod diagnostic_messages {
    pub const UNRESOLVED_REFERENCE: &str = "Unresolved reference: {0}.";
    pub const NONE_APPLICABLE: &str = "None of the following candidates is applicable: {0}.";
    pub const OVERLOAD_RESOLUTION_AMBIGUITY: &str =
        "Overload resolution ambiguity between candidates: {0}.";
    pub const INVISIBLE_MEMBER: &str = "Cannot access '{0}': it is {1} in '{2}'.";
    pub const INFIX_MODIFIER_REQUIRED: &str = "'infix' modifier is required on '{0}'.";
    pub const OPERATOR_MODIFIER_REQUIRED: &str = "'operator' modifier is required on '{0}'.";
    pub const DEPRECATED_UNARY_PLUS_AS_PLUS: &str =
        "Resolving unary plus to '{0}' is deprecated, declare 'unaryPlus' instead.";
    pub const TOO_MANY_ARGUMENTS: &str = "Too many arguments for '{0}'.";
    pub const NO_VALUE_FOR_PARAMETER: &str = "No value passed for parameter '{0}'.";
    pub const NAMED_PARAMETER_NOT_FOUND: &str = "Cannot find a parameter with this name: {0}.";
    pub const ARGUMENT_PASSED_TWICE: &str = "An argument is already passed for parameter '{0}'.";
    pub const MIXING_NAMED_AND_POSITIONED_ARGUMENTS: &str =
        "Mixing named and positioned arguments is not allowed.";
    pub const WRONG_NUMBER_OF_TYPE_ARGUMENTS: &str = "{0} type arguments expected for '{1}'.";
    pub const TYPE_MISMATCH: &str = "Type mismatch: inferred type is {0} but {1} was expected.";
    pub const RECEIVER_TYPE_MISMATCH: &str =
        "Receiver type mismatch: {0} is not a subtype of {1}.";
    pub const TYPE_INFERENCE_FAILED: &str = "Not enough information to infer type variable {0}.";
    pub const CONSTRAINT_UNSATISFIABLE: &str = "Type {0} does not satisfy the bound {1} ({2}).";
    pub const UNSAFE_CALL: &str =
        "Only safe (?.) calls are allowed on a nullable receiver of type {0}.";
    pub const SMART_CAST_IMPOSSIBLE: &str =
        "Smart cast to '{0}' is impossible, because the receiver could have changed.";
    pub const NESTED_CLASS_VIA_INSTANCE_REFERENCE: &str =
        "Nested class '{0}' accessed via instance reference.";
    pub const INNER_CLASS_VIA_STATIC_REFERENCE: &str =
        "Constructor of inner class '{0}' can be called only with a receiver of the containing class.";
    pub const UNSUPPORTED_INNER_CLASS_CALL: &str = "{0}";
    pub const HIDDEN_DECLARATION: &str = "'{0}' is hidden from resolution.";
    pub const LOW_PRIORITY_DECLARATION: &str = "'{0}' resolves only to a low-priority declaration.";
    pub const SYNTHESIZED_DECLARATION: &str = "'{0}' resolves only to a synthesized accessor.";
    pub const DYNAMIC_DECLARATION: &str = "'{0}' resolves only through dynamic member access.";
    pub const SMART_CAST_USED: &str = "Smart cast to '{0}' was used for the receiver.";
    pub const ERROR_DECLARATION: &str = "'{0}' refers to an erroneous declaration.";
    pub const MOVE_MAKES_INACCESSIBLE: &str =
        "{0} uses {1} which will be inaccessible after move.";
    pub const MOVE_MAKES_INTERNAL_INACCESSIBLE: &str =
        "{0} uses internal {1} which will be inaccessible after move.";
    pub const MOVE_LEAVES_MODULE: &str =
        "{0} referenced in {1} will not be accessible in module {2}.";
}

macro_rules! message_table {
    ($($name:ident => $category:ident),* $(,)?) => {
        pub static DIAGNOSTIC_MESSAGES: &[DiagnosticMessage] = &[
            $(DiagnosticMessage {
                code: diagnostic_codes::$name,
                category: DiagnosticCategory::$category,
                message: diagnostic_messages::$name,
            },)*
        ];
    };
}

message_table! {
    UNRESOLVED_REFERENCE => Error,
    NONE_APPLICABLE => Error,
    OVERLOAD_RESOLUTION_AMBIGUITY => Error,
    INVISIBLE_MEMBER => Error,
    INFIX_MODIFIER_REQUIRED => Error,
    OPERATOR_MODIFIER_REQUIRED => Error,
    DEPRECATED_UNARY_PLUS_AS_PLUS => Warning,
    TOO_MANY_ARGUMENTS => Error,
    NO_VALUE_FOR_PARAMETER => Error,
    NAMED_PARAMETER_NOT_FOUND => Error,
    ARGUMENT_PASSED_TWICE => Error,
    MIXING_NAMED_AND_POSITIONED_ARGUMENTS => Error,
    WRONG_NUMBER_OF_TYPE_ARGUMENTS => Error,
    TYPE_MISMATCH => Error,
    RECEIVER_TYPE_MISMATCH => Error,
    TYPE_INFERENCE_FAILED => Error,
    CONSTRAINT_UNSATISFIABLE => Error,
    UNSAFE_CALL => Error,
    SMART_CAST_IMPOSSIBLE => Error,
    NESTED_CLASS_VIA_INSTANCE_REFERENCE => Error,
    INNER_CLASS_VIA_STATIC_REFERENCE => Error,
    UNSUPPORTED_INNER_CLASS_CALL => Error,
    HIDDEN_DECLARATION => Error,
    LOW_PRIORITY_DECLARATION => Error,
    SYNTHESIZED_DECLARATION => Error,
    DYNAMIC_DECLARATION => Error,
    SMART_CAST_USED => Message,
    ERROR_DECLARATION => Error,
    MOVE_MAKES_INACCESSIBLE => Error,
    MOVE_MAKES_INTERNAL_INACCESSIBLE => Error,
    MOVE_LEAVES_MODULE => Error,
}

#[cfg(test)]
#[path = "../tests/diagnostics_tests.rs"]
mod diagnostics_tests;
