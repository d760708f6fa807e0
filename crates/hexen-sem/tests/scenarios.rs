//! End-to-end scenarios against hand-built ASTs (there is no parser in this
//! workspace, so each test assembles the tree a parser would have produced).

use hexen_ast::{
    ArraySize, BinOp, Block, Expr, Param, Program, Stmt, TopLevelFn, TypeAnnotation,
};
use hexen_util::{DiagnosticKind, Span, Symbol};

fn sp(n: u32) -> Span {
    Span::new(n, n + 1)
}

fn named(name: &str) -> TypeAnnotation {
    TypeAnnotation::Named(Symbol::intern(name))
}

fn array(size: ArraySize, elem: TypeAnnotation) -> TypeAnnotation {
    TypeAnnotation::Array { size, elem: Box::new(elem) }
}

fn int(value: i64, span: u32) -> Expr {
    Expr::IntLiteral { value, span: sp(span) }
}

fn ident(name: &str, span: u32) -> Expr {
    Expr::Identifier { name: Symbol::intern(name), span: sp(span) }
}

fn block(stmts: Vec<Stmt>, span: u32) -> Block {
    Block { stmts, span: sp(span) }
}

fn program(functions: Vec<TopLevelFn>, statements: Vec<Stmt>) -> Program {
    Program { functions, statements, span: sp(0) }
}

/// `val c = 42 + 100; val a : i32 = c; val b : f64 = c;` — no errors; `c`'s
/// comptime type materializes twice, once per concrete target.
#[test]
fn comptime_binding_materializes_into_multiple_concrete_targets() {
    let stmts = vec![
        Stmt::Let {
            name: Symbol::intern("c"),
            mutable: false,
            ty: None,
            init: Expr::Binary {
                op: BinOp::Add,
                lhs: Box::new(int(42, 1)),
                rhs: Box::new(int(100, 2)),
                span: sp(3),
            },
            span: sp(4),
        },
        Stmt::Let {
            name: Symbol::intern("a"),
            mutable: false,
            ty: Some(named("i32")),
            init: ident("c", 5),
            span: sp(6),
        },
        Stmt::Let {
            name: Symbol::intern("b"),
            mutable: false,
            ty: Some(named("f64")),
            init: ident("c", 7),
            span: sp(8),
        },
    ];
    let diags = hexen_sem::analyze_program(&program(vec![], stmts));
    assert!(diags.is_empty(), "expected no diagnostics, got {diags:?}");
}

/// `val a : i32 = 10; val b : i64 = 20; val r : i64 = a + b;` — one error:
/// mixed concrete types.
#[test]
fn mixed_concrete_addition_is_rejected() {
    let stmts = vec![
        Stmt::Let {
            name: Symbol::intern("a"),
            mutable: false,
            ty: Some(named("i32")),
            init: int(10, 1),
            span: sp(2),
        },
        Stmt::Let {
            name: Symbol::intern("b"),
            mutable: false,
            ty: Some(named("i64")),
            init: int(20, 3),
            span: sp(4),
        },
        Stmt::Let {
            name: Symbol::intern("r"),
            mutable: false,
            ty: Some(named("i64")),
            init: Expr::Binary {
                op: BinOp::Add,
                lhs: Box::new(ident("a", 5)),
                rhs: Box::new(ident("b", 6)),
                span: sp(7),
            },
            span: sp(8),
        },
    ];
    let diags = hexen_sem::analyze_program(&program(vec![], stmts));
    assert_eq!(diags.len(), 1, "{diags:?}");
    assert_eq!(diags[0].kind, DiagnosticKind::MixedConcreteTypes);
}

/// `func f(d: [3]i32) : i32 = { return d[0] }` called with a 5-element
/// comptime array — one error naming the size mismatch.
#[test]
fn comptime_array_size_mismatch_is_reported() {
    let f = TopLevelFn {
        name: Symbol::intern("f"),
        params: vec![Param {
            name: Symbol::intern("d"),
            ty: array(ArraySize::Fixed(3), named("i32")),
            mutable: false,
            span: sp(1),
        }],
        return_type: named("i32"),
        body: block(
            vec![Stmt::Return {
                value: Some(Expr::Index {
                    base: Box::new(ident("d", 2)),
                    index: Box::new(int(0, 3)),
                    span: sp(4),
                }),
                span: sp(5),
            }],
            6,
        ),
        span: sp(7),
    };

    let stmts = vec![
        Stmt::Let {
            name: Symbol::intern("x"),
            mutable: false,
            ty: None,
            init: Expr::ArrayLiteral {
                elements: (1..=5).map(|n| int(n, 8 + n as u32)).collect(),
                span: sp(20),
            },
            span: sp(21),
        },
        Stmt::Expr {
            expr: Expr::Call {
                callee: Symbol::intern("f"),
                args: vec![ident("x", 22)],
                span: sp(23),
            },
            span: sp(24),
        },
    ];

    let diags = hexen_sem::analyze_program(&program(vec![f], stmts));
    assert_eq!(diags.len(), 1, "{diags:?}");
    assert_eq!(diags[0].kind, DiagnosticKind::ComptimeArraySizeMismatch);
}

/// `val m : [2][3]i32 = [[1,2,3],[4,5,6]]; val flat : [6]i32 = m;` — one
/// error requiring `m[..]`; switching the RHS to `m[..]` clears it.
#[test]
fn flattening_a_concrete_array_requires_explicit_copy() {
    let literal = |offset: u32, values: [i64; 3]| Expr::ArrayLiteral {
        elements: values.iter().enumerate().map(|(i, v)| int(*v, offset + i as u32)).collect(),
        span: sp(offset + 10),
    };

    let m_init = Expr::ArrayLiteral {
        elements: vec![literal(1, [1, 2, 3]), literal(5, [4, 5, 6])],
        span: sp(9),
    };

    let make_stmts = |flatten_source: Expr| {
        vec![
            Stmt::Let {
                name: Symbol::intern("m"),
                mutable: false,
                ty: Some(array(
                    ArraySize::Fixed(2),
                    array(ArraySize::Fixed(3), named("i32")),
                )),
                init: m_init.clone(),
                span: sp(30),
            },
            Stmt::Let {
                name: Symbol::intern("flat"),
                mutable: false,
                ty: Some(array(ArraySize::Fixed(6), named("i32"))),
                init: flatten_source,
                span: sp(31),
            },
        ]
    };

    let bare = hexen_sem::analyze_program(&program(vec![], make_stmts(ident("m", 32))));
    assert_eq!(bare.len(), 1, "{bare:?}");
    assert_eq!(bare[0].kind, DiagnosticKind::MissingExplicitCopy);

    let copied = hexen_sem::analyze_program(&program(
        vec![],
        make_stmts(Expr::SliceCopy {
            base: Box::new(ident("m", 33)),
            lo: None,
            hi: None,
            span: sp(34),
        }),
    ));
    assert!(copied.is_empty(), "{copied:?}");
}

/// `func g(mut x: i32) : void = { x = x + 1; return }` — one error naming
/// parameter `x`; returning the value instead clears it.
#[test]
fn void_function_may_not_modify_a_mut_parameter() {
    let make_fn = |return_type: TypeAnnotation, tail: Stmt| TopLevelFn {
        name: Symbol::intern("g"),
        params: vec![Param {
            name: Symbol::intern("x"),
            ty: named("i32"),
            mutable: true,
            span: sp(1),
        }],
        return_type,
        body: block(
            vec![
                Stmt::Assign {
                    target: Symbol::intern("x"),
                    value: Expr::Binary {
                        op: BinOp::Add,
                        lhs: Box::new(ident("x", 2)),
                        rhs: Box::new(int(1, 3)),
                        span: sp(4),
                    },
                    span: sp(5),
                },
                tail,
            ],
            6,
        ),
        span: sp(7),
    };

    let offending = make_fn(named("void"), Stmt::Return { value: None, span: sp(8) });
    let diags = hexen_sem::analyze_program(&program(vec![offending], vec![]));
    assert_eq!(diags.len(), 1, "{diags:?}");
    assert_eq!(diags[0].kind, DiagnosticKind::VoidFunctionModifiesMutParameter);

    let fixed = make_fn(
        named("i32"),
        Stmt::Return { value: Some(ident("x", 9)), span: sp(10) },
    );
    let diags = hexen_sem::analyze_program(&program(vec![fixed], vec![]));
    assert!(diags.is_empty(), "{diags:?}");
}

/// A block containing a function call needs an explicit annotation on its
/// binding; adding one clears the error.
#[test]
fn runtime_block_without_annotation_is_rejected() {
    let h = TopLevelFn {
        name: Symbol::intern("h"),
        params: vec![],
        return_type: named("i32"),
        body: block(vec![Stmt::Return { value: Some(int(42, 1)), span: sp(2) }], 3),
        span: sp(4),
    };

    let make_k = |ty: Option<TypeAnnotation>| TopLevelFn {
        name: Symbol::intern("k"),
        params: vec![],
        return_type: named("i32"),
        body: block(
            vec![
                Stmt::Let {
                    name: Symbol::intern("r"),
                    mutable: false,
                    ty,
                    init: Expr::Block {
                        block: Box::new(block(
                            vec![
                                Stmt::Let {
                                    name: Symbol::intern("v"),
                                    mutable: false,
                                    ty: None,
                                    init: Expr::Call {
                                        callee: Symbol::intern("h"),
                                        args: vec![],
                                        span: sp(5),
                                    },
                                    span: sp(6),
                                },
                                Stmt::Yield { value: ident("v", 7), span: sp(8) },
                            ],
                            9,
                        )),
                        span: sp(10),
                    },
                    span: sp(11),
                },
                Stmt::Return { value: Some(ident("r", 12)), span: sp(13) },
            ],
            14,
        ),
        span: sp(15),
    };

    let without = hexen_sem::analyze_program(&program(vec![h.clone(), make_k(None)], vec![]));
    assert_eq!(without.len(), 1, "{without:?}");
    assert_eq!(without[0].kind, DiagnosticKind::RuntimeBlockNeedsAnnotation);

    let with = hexen_sem::analyze_program(&program(vec![h, make_k(Some(named("i32")))], vec![]));
    assert!(with.is_empty(), "{with:?}");
}

/// Analyzing the same program twice produces identical diagnostics — no
/// hidden state survives a pass (spec §8's round-trip property).
#[test]
fn analysis_is_deterministic_across_repeated_runs() {
    let stmts = vec![Stmt::Let {
        name: Symbol::intern("a"),
        mutable: false,
        ty: Some(named("i32")),
        init: int(10, 1),
        span: sp(2),
    }];
    let p = program(vec![], stmts);
    let first = hexen_sem::analyze_program(&p);
    let second = hexen_sem::analyze_program(&p);
    assert_eq!(first, second);
}
