//! The `SemanticAnalyzer`: one instance per top-level function body, each
//! with its own scope stack and diagnostic sink so bodies can be analyzed
//! in parallel (spec §5) against the shared, read-only `FunctionTable`.

use hexen_ast::{BinOp, Block, ElseClause, Expr, Stmt, TopLevelFn, TypeAnnotation, UnOp};
use hexen_util::{DiagnosticBuilder, DiagnosticKind, Handler, Span, Symbol};

use crate::ast_support::{flatten_array_annotation, resolve_type};
use crate::func_table::FunctionTable;
use crate::symtab::{DeclareError, LabelError, RibKind, ScopeTree};
use crate::types::{
    coerce, conversion_allowed, materialize_array, unify_comptime, ArrayLen, CoerceError,
    MaterializeError, Type,
};

/// What a statement sequence is allowed to do with `-> expr`.
enum StmtCtx {
    /// Function/statement-class block: `yield` is always illegal here.
    Plain,
    /// The body of a `for-in` used in expression position: `-> expr`
    /// contributes one array element and may appear anywhere, not only as
    /// the last statement.
    LoopExprBody { elem_ty: Type },
}

pub struct SemanticAnalyzer<'f> {
    scope: ScopeTree,
    functions: &'f FunctionTable,
    handler: Handler,
    current_ret_type: Option<Type>,
}

impl<'f> SemanticAnalyzer<'f> {
    pub fn new(functions: &'f FunctionTable) -> Self {
        Self {
            scope: ScopeTree::new(),
            functions,
            handler: Handler::new(),
            current_ret_type: None,
        }
    }

    pub fn into_handler(self) -> Handler {
        self.handler
    }

    pub fn handler_mut(&mut self) -> &mut Handler {
        &mut self.handler
    }

    /// Analyze a single top-level function body. This is the unit of work
    /// the driver parallelizes over (spec §5).
    pub fn analyze_function(&mut self, func: &TopLevelFn) {
        debug_assert_eq!(self.scope.depth(), 1);
        self.scope.enter_scope(RibKind::Function);
        let ret_ty = resolve_type(&func.return_type);
        self.current_ret_type = Some(ret_ty.clone());

        for param in &func.params {
            let ty = resolve_type(&param.ty);
            // Duplicates were already reported during signature collection.
            let _ = self.scope.declare_parameter(param.name, ty, param.mutable);
        }

        self.scope.enter_scope(RibKind::Block);
        self.analyze_stmts(&func.body.stmts, &StmtCtx::Plain);
        self.scope.exit_scope();

        if ret_ty == Type::Void {
            let modified = self.scope.modified_parameters();
            if !modified.is_empty() {
                let names =
                    modified.iter().map(Symbol::to_string).collect::<Vec<_>>().join(", ");
                DiagnosticBuilder::new(
                    DiagnosticKind::VoidFunctionModifiesMutParameter,
                    format!(
                        "function `{}` returns void but modifies parameter(s) {names}; \
                         return the value instead of mutating the parameter",
                        func.name
                    ),
                )
                .span(func.span)
                .help("change the return type to match and `return` the value")
                .emit(&mut self.handler);
            }
        }

        self.current_ret_type = None;
        self.scope.exit_scope();
        debug_assert_eq!(self.scope.depth(), 1);
    }

    /// Statements at program scope, outside any function. There is no
    /// enclosing return type, so a bare `return` is accepted but a `return
    /// expr` is not; `yield` is illegal exactly as in any other
    /// statement-class block.
    pub fn analyze_top_level(&mut self, statements: &[Stmt]) {
        debug_assert_eq!(self.scope.depth(), 1);
        self.scope.enter_scope(RibKind::Block);
        self.analyze_stmts(statements, &StmtCtx::Plain);
        self.scope.exit_scope();
    }

    // ---- statements -----------------------------------------------------

    fn analyze_stmts(&mut self, stmts: &[Stmt], ctx: &StmtCtx) {
        for stmt in stmts {
            self.analyze_stmt(stmt, ctx);
        }
    }

    fn analyze_stmt(&mut self, stmt: &Stmt, ctx: &StmtCtx) {
        match stmt {
            Stmt::Let { name, mutable, ty, init, span } => {
                self.analyze_let(*name, *mutable, ty.as_ref(), init, *span);
            }
            Stmt::Return { value, span } => self.analyze_return(value.as_ref(), *span),
            Stmt::Yield { value, span } => self.analyze_yield(value, *span, ctx),
            Stmt::Assign { target, value, span } => self.analyze_assign(*target, value, *span),
            Stmt::Expr { expr, .. } => {
                self.analyze_expr(expr, None);
            }
            Stmt::Block { block, .. } => self.analyze_branch(block, ctx),
            Stmt::If { condition, then_branch, else_clauses, span } => {
                self.analyze_if(condition, then_branch, else_clauses, *span, ctx);
            }
            Stmt::ForIn { label, var, iter, body, span } => {
                self.analyze_for_in_stmt(*label, *var, iter, body, *span);
            }
            Stmt::While { label, condition, body, span } => {
                self.analyze_while(*label, condition, body, *span);
            }
            Stmt::Break { label, span } => self.analyze_break(*label, *span),
            Stmt::Continue { label, span } => self.analyze_continue(*label, *span),
        }
    }

    /// Binds `name` from `init`, optionally under an explicit annotation,
    /// and declares it in the current scope. Returns the bound type so
    /// callers inside an expression block can fold it into evaluability
    /// classification.
    fn analyze_let(
        &mut self,
        name: Symbol,
        mutable: bool,
        ann: Option<&TypeAnnotation>,
        init: &Expr,
        span: Span,
    ) -> Type {
        let target = ann.map(resolve_type);
        let init_ty = self.analyze_expr(init, target.as_ref());

        let bound_ty = match ann {
            None => init_ty,
            Some(ann) => self.coerce_into_annotation(&init_ty, ann, init, span),
        };

        if let Err(DeclareError::Duplicate) = self.scope.declare_variable(name, bound_ty.clone(), mutable) {
            DiagnosticBuilder::new(
                DiagnosticKind::DuplicateDeclaration,
                format!("`{name}` is already declared in this scope"),
            )
            .span(span)
            .emit(&mut self.handler);
        }
        bound_ty
    }

    fn analyze_return(&mut self, value: Option<&Expr>, span: Span) {
        let ret_ty = self.current_ret_type.clone().unwrap_or(Type::Void);
        match value {
            None => {
                if ret_ty != Type::Void {
                    DiagnosticBuilder::new(
                        DiagnosticKind::TypeMismatch,
                        format!("bare `return` requires a `void` return type, function returns `{ret_ty}`"),
                    )
                    .span(span)
                    .emit(&mut self.handler);
                }
            }
            Some(expr) => {
                if ret_ty == Type::Void {
                    self.analyze_expr(expr, None);
                    DiagnosticBuilder::new(
                        DiagnosticKind::ReturnValueInVoidFunction,
                        "returning a value from a function declared `void`",
                    )
                    .span(span)
                    .emit(&mut self.handler);
                    return;
                }
                let value_ty = self.analyze_expr(expr, Some(&ret_ty));
                self.check_coerces(&value_ty, &ret_ty, span);
            }
        }
    }

    fn analyze_yield(&mut self, value: &Expr, span: Span, ctx: &StmtCtx) {
        match ctx {
            StmtCtx::Plain => {
                self.analyze_expr(value, None);
                DiagnosticBuilder::new(
                    DiagnosticKind::YieldOutsideExpressionBlock,
                    "`-> expr` is only legal as the last statement of an expression block",
                )
                .span(span)
                .emit(&mut self.handler);
            }
            StmtCtx::LoopExprBody { elem_ty } => {
                let elem_ty = elem_ty.clone();
                let value_ty = self.analyze_expr(value, Some(&elem_ty));
                self.check_coerces(&value_ty, &elem_ty, span);
            }
        }
    }

    fn analyze_assign(&mut self, target: Symbol, value: &Expr, span: Span) {
        let Some(def_id) = self.scope.resolve(target) else {
            self.analyze_expr(value, None);
            DiagnosticBuilder::new(
                DiagnosticKind::UndefinedIdentifier,
                format!("assignment to undefined identifier `{target}`"),
            )
            .span(span)
            .emit(&mut self.handler);
            return;
        };

        let binding = self.scope.binding(def_id).clone();
        if binding.kind == crate::symtab::BindingKind::LoopVariable {
            DiagnosticBuilder::new(
                DiagnosticKind::AssignLoopVariable,
                format!("cannot assign to loop variable `{target}`"),
            )
            .span(span)
            .help("loop variables are bound fresh each iteration and can never be declared `mut`")
            .emit(&mut self.handler);
        } else if !binding.mutable {
            let kind = if binding.kind == crate::symtab::BindingKind::Parameter {
                DiagnosticKind::AssignImmutableParameter
            } else {
                DiagnosticKind::AssignImmutableVariable
            };
            let suggestion = if binding.kind == crate::symtab::BindingKind::Parameter {
                format!("declare the parameter as `mut {target}: {}`", binding.ty)
            } else {
                format!("declare `{target}` with `mut` instead of `val`")
            };
            DiagnosticBuilder::new(kind, format!("cannot assign to immutable `{target}`"))
                .span(span)
                .help(suggestion)
                .emit(&mut self.handler);
        }

        let value_ty = self.analyze_expr(value, Some(&binding.ty));
        self.check_coerces(&value_ty, &binding.ty, span);

        if binding.mutable && self.scope.is_parameter(def_id) {
            self.scope.set_parameter_modified(def_id);
        }
    }

    fn analyze_if(
        &mut self,
        condition: &Expr,
        then_branch: &Block,
        else_clauses: &[ElseClause],
        _span: Span,
        ctx: &StmtCtx,
    ) {
        self.check_bool_condition(condition);
        self.analyze_branch(then_branch, ctx);
        for clause in else_clauses {
            if let Some(cond) = &clause.condition {
                self.check_bool_condition(cond);
            }
            self.analyze_branch(&clause.branch, ctx);
        }
    }

    fn analyze_branch(&mut self, branch: &Block, ctx: &StmtCtx) {
        self.scope.enter_scope(RibKind::Block);
        self.analyze_stmts(&branch.stmts, ctx);
        self.scope.exit_scope();
    }

    fn check_bool_condition(&mut self, condition: &Expr) {
        let ty = self.analyze_expr(condition, Some(&Type::Bool));
        if ty != Type::Bool && !ty.is_error() {
            DiagnosticBuilder::new(
                DiagnosticKind::NonBoolCondition,
                format!("condition must be `bool`, found `{ty}`"),
            )
            .span(condition.span())
            .emit(&mut self.handler);
        }
    }

    fn analyze_for_in_stmt(
        &mut self,
        label: Option<Symbol>,
        var: Symbol,
        iter: &Expr,
        body: &Block,
        span: Span,
    ) {
        self.enter_for_in_loop(label, var, iter, span, /*expr_mode=*/ false);
        self.analyze_stmts(&body.stmts, &StmtCtx::Plain);
        self.scope.exit_scope();
    }

    fn analyze_while(&mut self, label: Option<Symbol>, condition: &Expr, body: &Block, span: Span) {
        if let Err(LabelError::Duplicate) = label.map(|l| self.scope.check_label(l)).unwrap_or(Ok(())) {
            self.duplicate_label(label.unwrap(), span);
        }
        self.check_bool_condition(condition);
        self.scope.enter_scope(RibKind::Loop(label));
        self.analyze_stmts(&body.stmts, &StmtCtx::Plain);
        self.scope.exit_scope();
    }

    fn analyze_break(&mut self, label: Option<Symbol>, span: Span) {
        self.resolve_loop_target(label, span, DiagnosticKind::BreakOutsideLoop);
    }

    fn analyze_continue(&mut self, label: Option<Symbol>, span: Span) {
        self.resolve_loop_target(label, span, DiagnosticKind::ContinueOutsideLoop);
    }

    fn resolve_loop_target(&mut self, label: Option<Symbol>, span: Span, outside_kind: DiagnosticKind) {
        match label {
            Some(l) => {
                if self.scope.loop_with_label(l).is_none() {
                    if self.scope.any_loop_open() {
                        DiagnosticBuilder::new(
                            DiagnosticKind::UnresolvedLabel,
                            format!("no enclosing loop is labeled `{l}`"),
                        )
                        .span(span)
                        .emit(&mut self.handler);
                    } else {
                        DiagnosticBuilder::new(outside_kind, "not inside any loop").span(span).emit(&mut self.handler);
                    }
                }
            }
            None => {
                if self.scope.innermost_loop().is_none() {
                    DiagnosticBuilder::new(outside_kind, "not inside any loop").span(span).emit(&mut self.handler);
                }
            }
        }
    }

    fn duplicate_label(&mut self, label: Symbol, span: Span) {
        DiagnosticBuilder::new(
            DiagnosticKind::DuplicateLabel,
            format!("label `{label}` is already open on an enclosing loop"),
        )
        .span(span)
        .emit(&mut self.handler);
    }

    /// Shared setup for both for-in forms: checks the label, analyzes the
    /// iterator, enters the loop rib, and declares the loop variable. The
    /// caller is responsible for exiting the scope.
    fn enter_for_in_loop(
        &mut self,
        label: Option<Symbol>,
        var: Symbol,
        iter: &Expr,
        span: Span,
        expr_mode: bool,
    ) -> Type {
        if let Some(l) = label {
            if let Err(LabelError::Duplicate) = self.scope.check_label(l) {
                self.duplicate_label(l, span);
            }
        }

        let iter_ty = self.analyze_expr(iter, None);
        let (elem_ty, unbounded) = match &iter_ty {
            Type::Range(elem) => {
                let unbounded = matches!(iter, Expr::Range { hi: None, .. });
                ((**elem).clone(), unbounded)
            }
            Type::Array(elem, _) => ((**elem).clone(), false),
            Type::ComptimeArray(elem, dims) if dims.len() == 1 => ((**elem).clone(), false),
            Type::ComptimeArray(elem, dims) => (Type::ComptimeArray(elem.clone(), dims[1..].to_vec()), false),
            Type::Error => (Type::Error, false),
            other => {
                DiagnosticBuilder::new(
                    DiagnosticKind::TypeMismatch,
                    format!("`for-in` requires a range or array, found `{other}`"),
                )
                .span(iter.span())
                .emit(&mut self.handler);
                (Type::Error, false)
            }
        };

        if unbounded && expr_mode {
            DiagnosticBuilder::new(
                DiagnosticKind::UnboundedRangeInExpressionLoop,
                "an unbounded range may only be used as a `for-in` iterator in statement position",
            )
            .span(iter.span())
            .emit(&mut self.handler);
        }

        self.scope.enter_scope(RibKind::Loop(label));
        let _ = self.scope.declare_loop_variable(var, elem_ty.clone());
        elem_ty
    }

    /// `for x in iter { ... -> elem ... }` used in value position (spec
    /// §4.10's loop expression). The element type is the non-negotiable
    /// target pushed inward from the binding's annotation, not inferred.
    fn analyze_for_in_expr(
        &mut self,
        label: Option<Symbol>,
        var: Symbol,
        iter: &Expr,
        body: &Block,
        span: Span,
        target: Option<&Type>,
    ) -> Type {
        let Some(target) = target else {
            DiagnosticBuilder::new(
                DiagnosticKind::RuntimeBlockNeedsAnnotation,
                "a loop expression requires an explicit type annotation on its binding",
            )
            .span(span)
            .emit(&mut self.handler);
            self.enter_for_in_loop(label, var, iter, span, true);
            self.analyze_stmts(&body.stmts, &StmtCtx::Plain);
            self.scope.exit_scope();
            return Type::Error;
        };

        let elem_ty = match target {
            Type::Array(elem, _) => (**elem).clone(),
            other => other.clone(),
        };

        self.enter_for_in_loop(label, var, iter, span, true);
        self.analyze_stmts(&body.stmts, &StmtCtx::LoopExprBody { elem_ty: elem_ty.clone() });
        self.scope.exit_scope();

        Type::Array(Box::new(elem_ty), ArrayLen::Unknown)
    }

    // ---- expressions ------------------------------------------------------

    fn analyze_expr(&mut self, expr: &Expr, target: Option<&Type>) -> Type {
        match expr {
            Expr::Identifier { name, span } => match self.scope.resolve(*name) {
                Some(def_id) => self.scope.binding(def_id).ty.clone(),
                None => {
                    DiagnosticBuilder::new(
                        DiagnosticKind::UndefinedIdentifier,
                        format!("undefined identifier `{name}`"),
                    )
                    .span(*span)
                    .emit(&mut self.handler);
                    Type::Error
                }
            },
            Expr::IntLiteral { .. } => Type::ComptimeInt,
            Expr::FloatLiteral { .. } => Type::ComptimeFloat,
            Expr::StringLiteral { .. } => Type::String,
            Expr::BoolLiteral { .. } => Type::Bool,
            Expr::ArrayLiteral { elements, span } => self.analyze_array_literal(elements, *span),
            Expr::Index { base, index, span } => self.analyze_index(base, index, *span),
            Expr::SliceCopy { base, lo, hi, span } => {
                self.analyze_slice_copy(base, lo.as_deref(), hi.as_deref(), *span)
            }
            Expr::Range { lo, hi, span } => self.analyze_range(lo.as_deref(), hi.as_deref(), *span),
            Expr::Binary { op, lhs, rhs, span } => self.analyze_binary(*op, lhs, rhs, *span),
            Expr::Unary { op, operand, span } => self.analyze_unary(*op, operand, *span),
            Expr::Conversion { expr, ty, span } => self.analyze_conversion(expr, ty, *span),
            Expr::Call { callee, args, span } => self.analyze_call(*callee, args, *span),
            Expr::Block { block, .. } => self.analyze_expr_block(block, target),
            Expr::ForIn { label, var, iter, body, span } => {
                self.analyze_for_in_expr(*label, *var, iter, body, *span, target)
            }
        }
    }

    fn analyze_array_literal(&mut self, elements: &[Expr], span: Span) -> Type {
        if elements.is_empty() {
            return Type::ComptimeArray(Box::new(Type::ComptimeInt), vec![0]);
        }

        let elem_types: Vec<Type> = elements.iter().map(|e| self.analyze_expr(e, None)).collect();

        if elem_types.iter().all(Type::is_comptime) {
            if let Type::ComptimeArray(inner_elem, inner_dims) = &elem_types[0] {
                let mut unified = (**inner_elem).clone();
                let mut consistent = true;
                for t in &elem_types[1..] {
                    match t {
                        Type::ComptimeArray(e2, d2) if d2 == inner_dims => {
                            unified = unify_comptime(&unified, e2);
                        }
                        _ => consistent = false,
                    }
                }
                if !consistent {
                    DiagnosticBuilder::new(
                        DiagnosticKind::ComptimeArrayDimensionMismatch,
                        "array literal elements have inconsistent dimensions",
                    )
                    .span(span)
                    .emit(&mut self.handler);
                    return Type::Error;
                }
                let mut dims = vec![elem_types.len() as u64];
                dims.extend(inner_dims.iter().copied());
                Type::ComptimeArray(Box::new(unified), dims)
            } else {
                let mut unified = elem_types[0].clone();
                for t in &elem_types[1..] {
                    unified = unify_comptime(&unified, t);
                }
                Type::ComptimeArray(Box::new(unified), vec![elem_types.len() as u64])
            }
        } else {
            let first_concrete =
                elem_types.iter().find(|t| !t.is_comptime()).cloned().unwrap_or(Type::Error);
            for (t, elem) in elem_types.iter().zip(elements.iter()) {
                if t == &first_concrete {
                    continue;
                }
                if coerce(t, &first_concrete).is_err() {
                    DiagnosticBuilder::new(
                        DiagnosticKind::ArrayElementTypeMismatch,
                        format!("array element has type `{t}`, expected `{first_concrete}`"),
                    )
                    .span(elem.span())
                    .emit(&mut self.handler);
                }
            }
            Type::Array(Box::new(first_concrete), ArrayLen::Known(elem_types.len() as u64))
        }
    }

    fn analyze_index(&mut self, base: &Expr, index: &Expr, span: Span) -> Type {
        let base_ty = self.analyze_expr(base, None);
        let index_ty = self.analyze_expr(index, Some(&Type::Usize));
        if !index_ty.is_error() && coerce(&index_ty, &Type::Usize).is_err() && index_ty != Type::Usize {
            DiagnosticBuilder::new(
                DiagnosticKind::TypeMismatch,
                format!("array index must be `usize`-representable, found `{index_ty}`"),
            )
            .span(index.span())
            .emit(&mut self.handler);
        }
        match &base_ty {
            Type::Array(elem, _) => (**elem).clone(),
            Type::ComptimeArray(elem, dims) if dims.len() == 1 => (**elem).clone(),
            Type::ComptimeArray(elem, dims) => Type::ComptimeArray(elem.clone(), dims[1..].to_vec()),
            Type::Error => Type::Error,
            other => {
                DiagnosticBuilder::new(
                    DiagnosticKind::TypeMismatch,
                    format!("cannot index into `{other}`"),
                )
                .span(span)
                .emit(&mut self.handler);
                Type::Error
            }
        }
    }

    fn analyze_slice_copy(
        &mut self,
        base: &Expr,
        lo: Option<&Expr>,
        hi: Option<&Expr>,
        span: Span,
    ) -> Type {
        let base_ty = self.analyze_expr(base, None);
        for bound in [lo, hi].into_iter().flatten() {
            let ty = self.analyze_expr(bound, Some(&Type::Usize));
            if !ty.is_error() && coerce(&ty, &Type::Usize).is_err() && ty != Type::Usize {
                DiagnosticBuilder::new(
                    DiagnosticKind::TypeMismatch,
                    format!("slice bound must be `usize`-representable, found `{ty}`"),
                )
                .span(bound.span())
                .emit(&mut self.handler);
            }
        }
        match &base_ty {
            Type::Array(..) | Type::ComptimeArray(..) => base_ty,
            Type::Error => Type::Error,
            other => {
                DiagnosticBuilder::new(DiagnosticKind::TypeMismatch, format!("cannot slice `{other}`"))
                    .span(span)
                    .emit(&mut self.handler);
                Type::Error
            }
        }
    }

    fn analyze_range(&mut self, lo: Option<&Expr>, hi: Option<&Expr>, span: Span) -> Type {
        let lo_ty = lo.map(|e| self.analyze_expr(e, None));
        let hi_ty = hi.map(|e| self.analyze_expr(e, None));
        let elem = match (&lo_ty, &hi_ty) {
            (Some(a), Some(b)) => self.combine_numeric(a, b, span),
            (Some(a), None) | (None, Some(a)) => a.clone(),
            (None, None) => Type::ComptimeInt,
        };
        Type::Range(Box::new(elem))
    }

    fn analyze_binary(&mut self, op: BinOp, lhs: &Expr, rhs: &Expr, span: Span) -> Type {
        let lt = self.analyze_expr(lhs, None);
        let rt = self.analyze_expr(rhs, None);
        if lt.is_error() || rt.is_error() {
            return Type::Error;
        }
        match op {
            BinOp::Add | BinOp::Sub | BinOp::Mul => self.combine_numeric(&lt, &rt, span),
            BinOp::Div => {
                if lt.is_comptime() && rt.is_comptime() {
                    Type::ComptimeFloat
                } else {
                    let combined = self.combine_numeric(&lt, &rt, span);
                    if !combined.is_concrete_float() && !combined.is_comptime() && !combined.is_error() {
                        DiagnosticBuilder::new(
                            DiagnosticKind::TypeMismatch,
                            "`/` (true division) requires a floating-point result; use `\\` for integer division",
                        )
                        .span(span)
                        .emit(&mut self.handler);
                    }
                    combined
                }
            }
            BinOp::IntDiv => {
                let combined = self.combine_numeric(&lt, &rt, span);
                if combined.is_concrete_float() || matches!(combined, Type::ComptimeFloat) {
                    DiagnosticBuilder::new(
                        DiagnosticKind::TypeMismatch,
                        "`\\` (integer division) requires an integer operand",
                    )
                    .span(span)
                    .emit(&mut self.handler);
                }
                combined
            }
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                self.combine_numeric(&lt, &rt, span);
                Type::Bool
            }
            BinOp::And | BinOp::Or => {
                if !lt.is_bool() || !rt.is_bool() {
                    DiagnosticBuilder::new(
                        DiagnosticKind::TypeMismatch,
                        "logical operators require `bool` operands",
                    )
                    .span(span)
                    .emit(&mut self.handler);
                }
                Type::Bool
            }
        }
    }

    fn analyze_unary(&mut self, op: UnOp, operand: &Expr, span: Span) -> Type {
        let ty = self.analyze_expr(operand, None);
        match op {
            UnOp::Neg => {
                if !ty.is_numeric() && !ty.is_error() {
                    DiagnosticBuilder::new(
                        DiagnosticKind::TypeMismatch,
                        format!("unary `-` requires a numeric operand, found `{ty}`"),
                    )
                    .span(span)
                    .emit(&mut self.handler);
                }
                ty
            }
            UnOp::Not => {
                if !ty.is_bool() && !ty.is_error() {
                    DiagnosticBuilder::new(
                        DiagnosticKind::TypeMismatch,
                        format!("unary `!` requires a `bool` operand, found `{ty}`"),
                    )
                    .span(span)
                    .emit(&mut self.handler);
                }
                Type::Bool
            }
        }
    }

    fn analyze_conversion(&mut self, expr: &Expr, ty: &TypeAnnotation, span: Span) -> Type {
        let inner = self.analyze_expr(expr, None);
        let target = resolve_type(ty);
        if inner.is_error() {
            return target;
        }
        if !conversion_allowed(&inner, &target) {
            DiagnosticBuilder::new(
                DiagnosticKind::DisallowedConversion,
                format!("cannot convert `{inner}` to `{target}`"),
            )
            .span(span)
            .emit(&mut self.handler);
        }
        target
    }

    fn analyze_call(&mut self, callee: Symbol, args: &[Expr], span: Span) -> Type {
        let Some(sig) = self.functions.get(callee).cloned() else {
            for arg in args {
                self.analyze_expr(arg, None);
            }
            self.handler.report(crate::func_table::undefined_function(callee, span));
            return Type::Error;
        };

        if args.len() != sig.params.len() {
            for arg in args {
                self.analyze_expr(arg, None);
            }
            DiagnosticBuilder::new(
                DiagnosticKind::TypeMismatch,
                format!(
                    "function `{callee}` expects {} argument(s), found {}",
                    sig.params.len(),
                    args.len()
                ),
            )
            .span(span)
            .emit(&mut self.handler);
            return sig.return_type;
        }

        for (arg, param) in args.iter().zip(sig.params.iter()) {
            let arg_ty = self.analyze_expr(arg, Some(&param.ty));
            let _ = self.coerce_into_annotation(&arg_ty, &param.ann, arg, arg.span());
        }

        sig.return_type
    }

    // ---- the block analyzer -----------------------------------------------

    /// An expression block: classifies it compile-time-evaluable or
    /// runtime (spec §4.4) and returns its type accordingly.
    fn analyze_expr_block(&mut self, block: &Block, target: Option<&Type>) -> Type {
        self.scope.enter_scope(RibKind::Block);

        let mut disqualified = false;
        let mut all_bindings_comptime = true;
        let mut final_ty = Type::Void;
        let mut yielded = false;
        let mut returned = false;
        let last = block.stmts.len().saturating_sub(1);

        for (i, stmt) in block.stmts.iter().enumerate() {
            match stmt {
                Stmt::Let { name, mutable, ty, init, span } => {
                    if expr_contains_disqualifying_node(init) {
                        disqualified = true;
                    }
                    let bound = self.analyze_let(*name, *mutable, ty.as_ref(), init, *span);
                    if !bound.is_comptime() {
                        all_bindings_comptime = false;
                    }
                }
                Stmt::Yield { value, span } => {
                    if i != last {
                        DiagnosticBuilder::new(
                            DiagnosticKind::YieldOutsideExpressionBlock,
                            "`-> expr` must be the last statement of its expression block",
                        )
                        .span(*span)
                        .emit(&mut self.handler);
                    }
                    if expr_contains_disqualifying_node(value) {
                        disqualified = true;
                    }
                    final_ty = self.analyze_expr(value, target);
                    yielded = true;
                }
                Stmt::Return { value: None, span } => {
                    DiagnosticBuilder::new(
                        DiagnosticKind::BareReturnInExpressionBlock,
                        "bare `return` is not allowed inside an expression block; the block must produce a value with `-> expr`",
                    )
                    .span(*span)
                    .emit(&mut self.handler);
                    returned = true;
                }
                Stmt::Return { value, span } => {
                    self.analyze_return(value.as_ref(), *span);
                    returned = true;
                }
                Stmt::If { .. } | Stmt::Block { .. } => {
                    disqualified = true;
                    self.analyze_stmt(stmt, &StmtCtx::Plain);
                }
                _ => self.analyze_stmt(stmt, &StmtCtx::Plain),
            }
        }

        if !yielded && !returned {
            DiagnosticBuilder::new(
                DiagnosticKind::MissingChild,
                "expression block must end in `-> expr` or `return`",
            )
            .span(block.span)
            .emit(&mut self.handler);
        }

        self.scope.exit_scope();

        if !yielded {
            // A block that exits via `return` never reaches its binding, and
            // one with neither `-> expr` nor `return` has already been
            // diagnosed above; either way there is no value to coerce
            // against the binding's annotation.
            return Type::Error;
        }

        let evaluable =
            !disqualified && all_bindings_comptime && final_ty.is_comptime() && !final_ty.is_error();
        if evaluable {
            return final_ty;
        }
        match target {
            Some(t) => t.clone(),
            None => {
                DiagnosticBuilder::new(
                    DiagnosticKind::RuntimeBlockNeedsAnnotation,
                    "this block performs runtime operations and needs an explicit type annotation at its binding",
                )
                .span(block.span)
                .emit(&mut self.handler);
                Type::Error
            }
        }
    }

    // ---- shared lattice glue ------------------------------------------------

    /// The §4.5 arithmetic combination rule, shared by binary operators and
    /// range endpoints.
    fn combine_numeric(&mut self, left: &Type, right: &Type, span: Span) -> Type {
        if left.is_error() || right.is_error() {
            return Type::Error;
        }
        match (left.is_comptime(), right.is_comptime()) {
            (true, true) => unify_comptime(left, right),
            (true, false) => right.clone(),
            (false, true) => left.clone(),
            (false, false) => {
                if left == right {
                    left.clone()
                } else {
                    DiagnosticBuilder::new(
                        DiagnosticKind::MixedConcreteTypes,
                        format!(
                            "mixed concrete types `{left}` and `{right}`; convert one side explicitly, e.g. `value:{right}`"
                        ),
                    )
                    .span(span)
                    .help(format!("write `value:{right}` on the `{left}`-typed side"))
                    .emit(&mut self.handler);
                    left.clone()
                }
            }
        }
    }

    /// `coerce`, reported as a diagnostic on failure (used for return
    /// values, assignments and scalar bindings, where no array
    /// materialization is in play).
    fn check_coerces(&mut self, source: &Type, target: &Type, span: Span) {
        if source.is_error() || target.is_error() {
            return;
        }
        match coerce(source, target) {
            Ok(()) => {}
            Err(CoerceError::MixedConcrete) => {
                DiagnosticBuilder::new(
                    DiagnosticKind::MixedConcreteTypes,
                    format!(
                        "mixed concrete types `{source}` and `{target}`; convert explicitly, e.g. `value:{target}`"
                    ),
                )
                .span(span)
                .help(format!("write `value:{target}`"))
                .emit(&mut self.handler);
            }
            Err(CoerceError::NotRepresentable) => {
                DiagnosticBuilder::new(
                    DiagnosticKind::TypeMismatch,
                    format!("expected `{target}`, found `{source}`"),
                )
                .span(span)
                .emit(&mut self.handler);
            }
        }
    }

    /// Binds a value of type `init_ty` (produced by `source_expr`) into an
    /// explicit annotation: scalar coercion, comptime-array materialization,
    /// or concrete-array flattening via the explicit `[..]` copy operator
    /// (spec §4.2, §4.6, §4.7). Shared between `val`/`mut` bindings and
    /// call-argument passing.
    fn coerce_into_annotation(
        &mut self,
        init_ty: &Type,
        ann: &TypeAnnotation,
        source_expr: &Expr,
        span: Span,
    ) -> Type {
        let (target_sizes, target_elem) = flatten_array_annotation(ann).expect("always Some");

        if target_sizes.is_empty() {
            if init_ty.is_error() {
                return target_elem;
            }
            self.check_coerces(init_ty, &target_elem, span);
            return target_elem;
        }

        match init_ty {
            Type::ComptimeArray(elem, dims) => {
                match materialize_array(dims, elem, &target_sizes, &target_elem) {
                    Ok(ty) => ty,
                    Err(MaterializeError::SizeMismatch { expected, found }) => {
                        DiagnosticBuilder::new(
                            DiagnosticKind::ComptimeArraySizeMismatch,
                            format!("expected array of size {expected}, found size {found}"),
                        )
                        .span(span)
                        .emit(&mut self.handler);
                        Type::Error
                    }
                    Err(MaterializeError::DimMismatch { expected, found }) => {
                        DiagnosticBuilder::new(
                            DiagnosticKind::ComptimeArrayDimensionMismatch,
                            format!("expected {expected} array dimension(s), found {found}"),
                        )
                        .span(span)
                        .emit(&mut self.handler);
                        Type::Error
                    }
                    Err(MaterializeError::ElementMismatch) => {
                        DiagnosticBuilder::new(
                            DiagnosticKind::ArrayElementTypeMismatch,
                            format!("array element type does not match `{target_elem}`"),
                        )
                        .span(span)
                        .emit(&mut self.handler);
                        Type::Error
                    }
                }
            }
            Type::Array(..) => {
                let is_full_copy = matches!(source_expr, Expr::SliceCopy { lo: None, hi: None, .. });
                if !is_full_copy {
                    DiagnosticBuilder::new(
                        DiagnosticKind::MissingExplicitCopy,
                        "flattening a concrete array requires the explicit copy operator `[..]`",
                    )
                    .span(span)
                    .help("write the source as `name[..]`")
                    .emit(&mut self.handler);
                    return Type::Error;
                }

                let (src_total, src_base) = flatten_concrete_dims(init_ty);
                if src_base != target_elem {
                    DiagnosticBuilder::new(
                        DiagnosticKind::ArrayElementTypeMismatch,
                        format!("array element type `{src_base}` does not match `{target_elem}`"),
                    )
                    .span(span)
                    .emit(&mut self.handler);
                    return Type::Error;
                }

                let inferred_positions = target_sizes
                    .iter()
                    .filter(|s| matches!(s, crate::ast_support::ResolvedArraySize::Inferred))
                    .count();
                if inferred_positions > 1 {
                    DiagnosticBuilder::new(
                        DiagnosticKind::ComptimeArrayDimensionMismatch,
                        "at most one `[_]` dimension is supported when flattening via `[..]`",
                    )
                    .span(span)
                    .emit(&mut self.handler);
                    return Type::Error;
                }

                let fixed_product: u64 = target_sizes
                    .iter()
                    .filter_map(|s| match s {
                        crate::ast_support::ResolvedArraySize::Fixed(n) => Some(*n),
                        crate::ast_support::ResolvedArraySize::Inferred => None,
                    })
                    .product::<u64>()
                    .max(1);

                let resolved_sizes: Vec<u64> = if inferred_positions == 1 {
                    if fixed_product == 0 || src_total % fixed_product != 0 {
                        DiagnosticBuilder::new(
                            DiagnosticKind::ComptimeArraySizeMismatch,
                            format!("source array of {src_total} elements does not evenly fill this shape"),
                        )
                        .span(span)
                        .emit(&mut self.handler);
                        return Type::Error;
                    }
                    let inferred = src_total / fixed_product;
                    target_sizes
                        .iter()
                        .map(|s| match s {
                            crate::ast_support::ResolvedArraySize::Fixed(n) => *n,
                            crate::ast_support::ResolvedArraySize::Inferred => inferred,
                        })
                        .collect()
                } else {
                    let declared_total: u64 = target_sizes
                        .iter()
                        .map(|s| match s {
                            crate::ast_support::ResolvedArraySize::Fixed(n) => *n,
                            crate::ast_support::ResolvedArraySize::Inferred => unreachable!(),
                        })
                        .product();
                    if declared_total != src_total {
                        DiagnosticBuilder::new(
                            DiagnosticKind::ComptimeArraySizeMismatch,
                            format!("expected array of {declared_total} total elements, found {src_total}"),
                        )
                        .span(span)
                        .emit(&mut self.handler);
                        return Type::Error;
                    }
                    target_sizes
                        .iter()
                        .map(|s| match s {
                            crate::ast_support::ResolvedArraySize::Fixed(n) => *n,
                            crate::ast_support::ResolvedArraySize::Inferred => unreachable!(),
                        })
                        .collect()
                };

                let mut ty = target_elem;
                for &n in resolved_sizes.iter().rev() {
                    ty = Type::Array(Box::new(ty), ArrayLen::Known(n));
                }
                ty
            }
            Type::Error => Type::Error,
            other => {
                DiagnosticBuilder::new(
                    DiagnosticKind::TypeMismatch,
                    format!("expected an array, found `{other}`"),
                )
                .span(span)
                .emit(&mut self.handler);
                Type::Error
            }
        }
    }
}

/// Total element count and base scalar type of a (possibly nested)
/// concrete array type, e.g. `[2][3]i32` -> `(6, i32)`.
fn flatten_concrete_dims(ty: &Type) -> (u64, Type) {
    match ty {
        Type::Array(elem, len) => {
            let (inner_total, base) = flatten_concrete_dims(elem);
            let n = match len {
                ArrayLen::Known(n) => *n,
                ArrayLen::Unknown => 0,
            };
            (n * inner_total.max(1), base)
        }
        other => (1, other.clone()),
    }
}

/// Structural check for spec §4.4's compile-time-evaluable rule: "no
/// statement contains a function call or a conditional". `Expr::Block` is
/// treated as opaque — its own evaluability is classified independently.
fn expr_contains_disqualifying_node(expr: &Expr) -> bool {
    match expr {
        Expr::Call { .. } | Expr::ForIn { .. } => true,
        Expr::Identifier { .. }
        | Expr::IntLiteral { .. }
        | Expr::FloatLiteral { .. }
        | Expr::StringLiteral { .. }
        | Expr::BoolLiteral { .. }
        | Expr::Block { .. } => false,
        Expr::ArrayLiteral { elements, .. } => elements.iter().any(expr_contains_disqualifying_node),
        Expr::Index { base, index, .. } => {
            expr_contains_disqualifying_node(base) || expr_contains_disqualifying_node(index)
        }
        Expr::SliceCopy { base, lo, hi, .. } => {
            expr_contains_disqualifying_node(base)
                || lo.as_deref().is_some_and(expr_contains_disqualifying_node)
                || hi.as_deref().is_some_and(expr_contains_disqualifying_node)
        }
        Expr::Range { lo, hi, .. } => {
            lo.as_deref().is_some_and(expr_contains_disqualifying_node)
                || hi.as_deref().is_some_and(expr_contains_disqualifying_node)
        }
        Expr::Binary { lhs, rhs, .. } => {
            expr_contains_disqualifying_node(lhs) || expr_contains_disqualifying_node(rhs)
        }
        Expr::Unary { operand, .. } => expr_contains_disqualifying_node(operand),
        Expr::Conversion { expr, .. } => expr_contains_disqualifying_node(expr),
    }
}
