//! Structured diagnostics.
//!
//! The analyzer never stops at the first problem: every sub-analyzer pushes
//! into a shared [`Handler`] and keeps going, so a single pass reports every
//! error it can find (spec §7, "collect, don't stop"). Rendering a
//! diagnostic into text with a source snippet is left to an external
//! collaborator — this module only carries the structured data.

use crate::span::Span;

/// The taxonomy of errors the analyzer can produce, grouped by what part of
/// analysis they come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    // --- Structural ---
    UnknownNode,
    MissingChild,
    YieldOutsideExpressionBlock,
    ReturnValueInVoidFunction,
    BareReturnInExpressionBlock,
    BreakOutsideLoop,
    ContinueOutsideLoop,

    // --- Scope ---
    UndefinedIdentifier,
    UndefinedFunction,
    DuplicateDeclaration,
    DuplicateParameter,
    DuplicateLabel,
    UnresolvedLabel,

    // --- Mutability ---
    AssignImmutableVariable,
    AssignImmutableParameter,
    AssignLoopVariable,

    // --- Type ---
    TypeMismatch,
    MixedConcreteTypes,
    DisallowedConversion,
    ComptimeArraySizeMismatch,
    ComptimeArrayDimensionMismatch,
    ArrayElementTypeMismatch,
    MissingExplicitCopy,

    // --- Contract ---
    VoidFunctionModifiesMutParameter,
    RuntimeBlockNeedsAnnotation,
    UnboundedRangeInExpressionLoop,
    NonBoolCondition,

    // --- Internal ---
    Internal,
}

impl DiagnosticKind {
    /// The category this kind belongs to, for grouping in reports.
    pub fn category(self) -> &'static str {
        use DiagnosticKind::*;
        match self {
            UnknownNode | MissingChild | YieldOutsideExpressionBlock
            | ReturnValueInVoidFunction | BareReturnInExpressionBlock | BreakOutsideLoop
            | ContinueOutsideLoop => "structural",
            UndefinedIdentifier | UndefinedFunction | DuplicateDeclaration
            | DuplicateParameter | DuplicateLabel | UnresolvedLabel => "scope",
            AssignImmutableVariable | AssignImmutableParameter | AssignLoopVariable => {
                "mutability"
            }
            TypeMismatch | MixedConcreteTypes | DisallowedConversion
            | ComptimeArraySizeMismatch | ComptimeArrayDimensionMismatch
            | ArrayElementTypeMismatch | MissingExplicitCopy => "type",
            VoidFunctionModifiesMutParameter | RuntimeBlockNeedsAnnotation
            | UnboundedRangeInExpressionLoop | NonBoolCondition => "contract",
            Internal => "internal",
        }
    }
}

/// A single reported problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub span: Span,
    pub help: Option<String>,
}

/// Fluent construction of a [`Diagnostic`], mirroring the shape of a
/// diagnostic builder so call sites read as a short sentence.
pub struct DiagnosticBuilder {
    kind: DiagnosticKind,
    message: String,
    span: Span,
    help: Option<String>,
}

impl DiagnosticBuilder {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            span: Span::DUMMY,
            help: None,
        }
    }

    pub fn span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn build(self) -> Diagnostic {
        Diagnostic {
            kind: self.kind,
            message: self.message,
            span: self.span,
            help: self.help,
        }
    }

    pub fn emit(self, handler: &mut Handler) {
        handler.report(self.build());
    }
}

/// The error sink every sub-analyzer writes into. Owned exclusively by the
/// analyzer instance that created it; sub-analyzers only ever see `&mut
/// Handler` (spec §5: no globals).
#[derive(Debug, Default)]
pub struct Handler {
    diagnostics: Vec<Diagnostic>,
}

impl Handler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Merge another handler's diagnostics into this one, preserving none of
    /// `other`'s internal order (callers that need deterministic output
    /// across merges should sort by span afterwards, see
    /// `hexen_sem::analyze_program`).
    pub fn absorb(&mut self, other: Handler) {
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn sort_by_span(&mut self) {
        self.diagnostics.sort_by_key(|d| d.span);
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}
