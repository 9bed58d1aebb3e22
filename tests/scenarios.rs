//! End-to-end scenarios S1–S6 (spec §8), built directly against
//! `Tree`/`Template` fixtures rather than parsed source text, since the
//! real typed-tree producer is an external collaborator (§1).

use std::collections::HashMap;

use indexmap::IndexSet;

use init_checker::host::{Db, Span, SymFlags, SymbolId};
use init_checker::tree::{Stat, Template, Tree, TreeKind};
use init_checker::{check_and_report, check_class, Effect};

#[derive(Default)]
struct FixtureDb {
    names: HashMap<u32, &'static str>,
    flags: HashMap<u32, SymFlags>,
    partial: IndexSet<u32>,
    unchecked: IndexSet<u32>,
    init: IndexSet<u32>,
    accessors: HashMap<u32, Vec<u32>>,
    decls: HashMap<u32, Vec<u32>>,
}

impl FixtureDb {
    fn name(mut self, sym: u32, name: &'static str) -> Self {
        self.names.insert(sym, name);
        self
    }

    fn flag(mut self, sym: u32, flags: SymFlags) -> Self {
        *self.flags.entry(sym).or_default() |= flags;
        self
    }

    fn partial(mut self, sym: u32) -> Self {
        self.partial.insert(sym);
        self
    }

    fn init(mut self, sym: u32) -> Self {
        self.init.insert(sym);
        self
    }

    fn accessors(mut self, class: u32, syms: Vec<u32>) -> Self {
        self.accessors.insert(class, syms);
        self
    }

    fn decls(mut self, class: u32, syms: Vec<u32>) -> Self {
        self.decls.insert(class, syms);
        self
    }
}

impl Db<u32> for FixtureDb {
    fn name(&self, sym: u32) -> &str {
        self.names.get(&sym).copied().unwrap_or("<sym>")
    }
    fn owner(&self, _sym: u32) -> Option<u32> {
        None
    }
    fn flags(&self, sym: u32) -> SymFlags {
        self.flags.get(&sym).copied().unwrap_or_default()
    }
    fn position(&self, sym: u32) -> Span {
        Span::point(sym)
    }
    fn has_init(&self, sym: u32) -> bool {
        self.init.contains(&sym)
    }
    fn has_partial(&self, sym: u32) -> bool {
        self.partial.contains(&sym)
    }
    fn has_unchecked(&self, sym: u32) -> bool {
        self.unchecked.contains(&sym)
    }
    fn is_constructor_param_setter(&self, _sym: u32) -> bool {
        false
    }
    fn is_effectively_final(&self, _sym: u32) -> bool {
        false
    }
    fn is_default_getter(&self, _sym: u32) -> bool {
        false
    }
    fn is_subclass(&self, sub: u32, sup: u32) -> bool {
        sub == sup
    }
    fn is_contained_in(&self, _inner: u32, _outer_class: u32) -> bool {
        false
    }
    fn param_accessors(&self, class: u32) -> Vec<u32> {
        self.accessors.get(&class).cloned().unwrap_or_default()
    }
    fn base_classes(&self, _class: u32) -> Vec<u32> {
        Vec::new()
    }
    fn decls(&self, class: u32) -> Vec<u32> {
        self.decls.get(&class).cloned().unwrap_or_default()
    }
    fn self_type_classes(&self, _class: u32) -> Vec<u32> {
        Vec::new()
    }
}

const CLASS: u32 = 0;

fn ident(sym: u32) -> Tree<u32> {
    Tree::new(Span::point(sym), TreeKind::Ident(sym))
}

fn lit<Sym: SymbolId>() -> Tree<Sym> {
    Tree::new(Span::default(), TreeKind::Literal)
}

fn render(db: &FixtureDb, class: u32, template: &Template<u32>) -> String {
    check_and_report(db, class, template).printer().render()
}

/// S1 — use-before-init: `class A { val x = y; val y = 1 }`.
#[test]
fn s1_use_before_init() {
    const X: u32 = 1;
    const Y: u32 = 2;
    let db = FixtureDb::default()
        .name(Y, "y")
        .decls(CLASS, vec![X, Y]);
    let template = Template {
        class: Some(CLASS),
        stats: vec![
            Stat::ValDef { sym: X, rhs: ident(Y) },
            Stat::ValDef { sym: Y, rhs: lit() },
        ],
        tail: lit(),
    };

    let effects = check_class(&db, CLASS, &template);
    assert_eq!(effects.len(), 1);
    assert!(matches!(effects[0], Effect::Uninit { sym: Y, .. }));

    insta::assert_snapshot!(render(&db, CLASS, &template), @"warning at 2..2: `y` is read before it has been initialized");
}

/// S2 — partial leak via overridable method: `foo()` called eagerly,
/// `def foo() = println(x)`, `val x = 1` declared after.
#[test]
fn s2_partial_leak_via_overridable_method() {
    const FOO: u32 = 1;
    const X: u32 = 2;
    let db = FixtureDb::default()
        .name(FOO, "foo")
        .name(X, "x")
        .flag(FOO, SymFlags::METHOD)
        .decls(CLASS, vec![FOO, X]);
    let template = Template {
        class: Some(CLASS),
        stats: vec![
            Stat::Expr(ident(FOO)),
            Stat::DefDef { sym: FOO, params: vec![], body: ident(X) },
            Stat::ValDef { sym: X, rhs: lit() },
        ],
        tail: lit(),
    };

    let effects = check_class(&db, CLASS, &template);
    assert!(effects.iter().any(|e| matches!(e, Effect::OverrideRisk { sym: FOO, .. })));
    let call_sub = effects
        .iter()
        .find_map(|e| match e {
            Effect::Call { sym: FOO, sub, .. } => Some(sub),
            _ => None,
        })
        .expect("expected a Call(foo, ..) effect");
    assert!(matches!(call_sub[0], Effect::Uninit { sym: X, .. }));
}

/// S3 — an `@init` method is always safe to call eagerly, even though
/// nothing in its body has finished initializing yet.
#[test]
fn s3_init_annotated_method_is_safe() {
    const FOO: u32 = 1;
    let db = FixtureDb::default()
        .name(FOO, "foo")
        .flag(FOO, SymFlags::METHOD)
        .init(FOO)
        .decls(CLASS, vec![FOO]);
    let template = Template {
        class: Some(CLASS),
        stats: vec![
            Stat::Expr(ident(FOO)),
            Stat::DefDef { sym: FOO, params: vec![], body: lit() },
        ],
        tail: lit(),
    };

    let effects = check_class(&db, CLASS, &template);
    assert!(effects.is_empty());
    assert_eq!(render(&db, CLASS, &template), "");
}

/// S4 — partial argument: `class A(@partial p: P) { sink(p) }` where
/// `sink`'s parameter is not `@partial`.
#[test]
fn s4_partial_argument_to_non_partial_param() {
    const P: u32 = 1;
    const SINK: u32 = 2;
    const Q: u32 = 3;
    let db = FixtureDb::default()
        .name(SINK, "sink")
        .flag(SINK, SymFlags::METHOD)
        .accessors(CLASS, vec![P])
        .partial(P);
    let template = Template {
        class: Some(CLASS),
        stats: vec![
            Stat::Expr(Tree::new(
                Span::default(),
                TreeKind::Apply(Box::new(ident(SINK)), vec![ident(P)]),
            )),
            Stat::DefDef { sym: SINK, params: vec![Q], body: lit() },
        ],
        tail: lit(),
    };

    let effects = check_class(&db, CLASS, &template);
    assert!(effects
        .iter()
        .any(|e| matches!(e, Effect::Argument { func: SINK, .. })));
}

/// S4 continued: if `sink`'s parameter were `@partial`, no warning fires.
#[test]
fn s4_partial_argument_to_partial_param_is_not_reported() {
    const P: u32 = 1;
    const SINK: u32 = 2;
    const Q: u32 = 3;
    let db = FixtureDb::default()
        .name(SINK, "sink")
        .flag(SINK, SymFlags::METHOD)
        .accessors(CLASS, vec![P])
        .partial(P)
        .partial(Q);
    let template = Template {
        class: Some(CLASS),
        stats: vec![
            Stat::Expr(Tree::new(
                Span::default(),
                TreeKind::Apply(Box::new(ident(SINK)), vec![ident(P)]),
            )),
            Stat::DefDef { sym: SINK, params: vec![Q], body: lit() },
        ],
        tail: lit(),
    };

    let effects = check_class(&db, CLASS, &template);
    assert!(!effects
        .iter()
        .any(|e| matches!(e, Effect::Argument { .. })));
}

/// S5 — recursive new: `class A { new A }`.
#[test]
fn s5_recursive_new() {
    let db = FixtureDb::default().name(CLASS, "A");
    let new_self = Tree::new(
        Span::default(),
        TreeKind::New {
            class: CLASS,
            ctor: CLASS,
            argss: vec![],
        },
    );
    let template = Template {
        class: Some(CLASS),
        stats: vec![Stat::Expr(new_self)],
        tail: lit(),
    };

    let effects = check_class(&db, CLASS, &template);
    assert_eq!(effects.len(), 1);
    assert!(matches!(effects[0], Effect::RecCreate { class: CLASS, .. }));
    insta::assert_snapshot!(render(&db, CLASS, &template), @"warning at 0..0: `A` is constructed recursively from within its own initialization");
}

/// S6 — partial-to-total assignment: `var q: P = null; q = p`.
#[test]
fn s6_partial_to_total_assignment() {
    const P: u32 = 1;
    const Q: u32 = 2;
    let db = FixtureDb::default()
        .name(Q, "q")
        .accessors(CLASS, vec![P])
        .partial(P)
        .decls(CLASS, vec![Q]);
    let template = Template {
        class: Some(CLASS),
        stats: vec![
            Stat::ValDef { sym: Q, rhs: lit() },
            Stat::Expr(Tree::new(
                Span::default(),
                TreeKind::Assign(Box::new(ident(Q)), Box::new(ident(P))),
            )),
        ],
        tail: lit(),
    };

    let effects = check_class(&db, CLASS, &template);
    assert!(effects.iter().any(|e| matches!(e, Effect::CrossAssign { lhs: Q, .. })));
}

/// `@unchecked` classes are skipped entirely (§4.1).
#[test]
fn unchecked_class_skips_analysis_even_with_obvious_violations() {
    let mut db = FixtureDb::default().decls(CLASS, vec![1, 2]);
    db.unchecked.insert(CLASS);
    let template = Template {
        class: Some(CLASS),
        stats: vec![
            Stat::ValDef { sym: 1, rhs: ident(2u32) },
            Stat::ValDef { sym: 2, rhs: lit() },
        ],
        tail: lit(),
    };
    assert!(check_class(&db, CLASS, &template).is_empty());
}
