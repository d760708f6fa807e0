//! The function signature table built by the collection pre-pass (spec §3,
//! "Functions are collected in a pre-pass so that mutual reference within a
//! program is permitted"). Read-only once built, so it can be shared across
//! the parallel per-function analysis passes (spec §5).

use std::collections::HashMap;

use hexen_ast::{Program, TypeAnnotation};
use hexen_util::{Diagnostic, DiagnosticBuilder, DiagnosticKind, Handler, Span, Symbol};

use crate::ast_support::resolve_type;
use crate::types::Type;

#[derive(Debug, Clone)]
pub struct FnParam {
    pub name: Symbol,
    pub ty: Type,
    /// The annotation as written, kept alongside `ty` so array arguments can
    /// still see `[_]` positions when being matched against a call site.
    pub ann: TypeAnnotation,
    pub mutable: bool,
}

#[derive(Debug, Clone)]
pub struct FnSig {
    pub params: Vec<FnParam>,
    pub return_type: Type,
    pub return_ann: TypeAnnotation,
    pub span: Span,
}

#[derive(Debug, Default)]
pub struct FunctionTable {
    sigs: HashMap<Symbol, FnSig>,
}

impl FunctionTable {
    pub fn get(&self, name: Symbol) -> Option<&FnSig> {
        self.sigs.get(&name)
    }
}

/// Register every top-level function's signature, checking for duplicate
/// parameter names and `void` parameters along the way (spec §4.6). Does
/// not look inside any function body.
pub fn collect_functions(program: &Program, handler: &mut Handler) -> FunctionTable {
    let mut table = FunctionTable::default();
    for func in &program.functions {
        if table.sigs.contains_key(&func.name) {
            DiagnosticBuilder::new(
                DiagnosticKind::DuplicateDeclaration,
                format!("function `{}` is declared more than once", func.name),
            )
            .span(func.span)
            .emit(handler);
            continue;
        }

        let mut seen_params = std::collections::HashSet::new();
        let mut params = Vec::with_capacity(func.params.len());
        for param in &func.params {
            if !seen_params.insert(param.name) {
                DiagnosticBuilder::new(
                    DiagnosticKind::DuplicateParameter,
                    format!("parameter `{}` is declared more than once", param.name),
                )
                .span(param.span)
                .emit(handler);
                continue;
            }
            let ty = resolve_type(&param.ty);
            if ty == Type::Void {
                DiagnosticBuilder::new(
                    DiagnosticKind::TypeMismatch,
                    format!("parameter `{}` may not have type `void`", param.name),
                )
                .span(param.span)
                .emit(handler);
            }
            params.push(FnParam {
                name: param.name,
                ty,
                ann: param.ty.clone(),
                mutable: param.mutable,
            });
        }

        let return_type = resolve_type(&func.return_type);
        table.sigs.insert(
            func.name,
            FnSig { params, return_type, return_ann: func.return_type.clone(), span: func.span },
        );
    }
    table
}

pub fn undefined_function(name: Symbol, span: Span) -> Diagnostic {
    DiagnosticBuilder::new(DiagnosticKind::UndefinedFunction, format!("call to undefined function `{name}`"))
        .span(span)
        .build()
}
