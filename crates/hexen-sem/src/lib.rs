//! Hexen's semantic analyzer.
//!
//! Consumes a [`hexen_ast::Program`] and produces the diagnostics a
//! compiler's later stages would act on. This crate performs no lexing,
//! parsing, code generation, or diagnostic rendering — it owns exactly the
//! symbol table, the comptime/concrete type lattice, and the rules that
//! connect the two.
//!
//! Analysis runs in two passes: a single-threaded signature collection pass
//! (so functions may reference each other regardless of declaration order),
//! followed by analysis of each top-level function body. Function bodies
//! share no mutable state — each gets its own scope tree and diagnostic
//! sink — so the second pass runs across a [`rayon`] thread pool.

pub mod analyzer;
pub mod ast_support;
pub mod func_table;
pub mod symtab;
pub mod types;

use std::panic::{self, AssertUnwindSafe};

use hexen_ast::Program;
use hexen_util::{Diagnostic, DiagnosticBuilder, DiagnosticKind, Handler, Span};
use rayon::prelude::*;

use analyzer::SemanticAnalyzer;
use func_table::collect_functions;

/// Analyze an entire program and return every diagnostic produced, sorted
/// by source span. Never panics: an analyzer bug that would otherwise
/// unwind is caught and reported as a single [`DiagnosticKind::Internal`]
/// diagnostic instead of taking the whole pass down.
pub fn analyze_program(program: &Program) -> Vec<Diagnostic> {
    let mut handler = Handler::new();

    let functions = collect_functions(program, &mut handler);

    let body_results: Vec<Handler> = program
        .functions
        .par_iter()
        .map(|func| {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                let mut analyzer = SemanticAnalyzer::new(&functions);
                analyzer.analyze_function(func);
                analyzer.into_handler()
            }));
            outcome.unwrap_or_else(|_| internal_error_handler(func.span))
        })
        .collect();

    for body_handler in body_results {
        handler.absorb(body_handler);
    }

    let top_level = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut analyzer = SemanticAnalyzer::new(&functions);
        analyzer.analyze_top_level(&program.statements);
        analyzer.into_handler()
    }))
    .unwrap_or_else(|_| internal_error_handler(program.span));
    handler.absorb(top_level);

    handler.sort_by_span();
    handler.into_diagnostics()
}

fn internal_error_handler(span: Span) -> Handler {
    let mut handler = Handler::new();
    DiagnosticBuilder::new(
        DiagnosticKind::Internal,
        "the analyzer panicked while processing this item; this is a bug",
    )
    .span(span)
    .emit(&mut handler);
    handler
}
