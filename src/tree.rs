//! Shape of the host-supplied typed tree (spec §4.4's dispatcher cases).
//!
//! The real typed-tree producer is out of scope (§1); this module only
//! fixes the shapes the checker's dispatcher needs to match on.

use crate::host::{Span, SymbolId};

/// A single node of the host's typed tree, carrying its source position.
#[derive(Clone, Debug)]
pub struct Tree<Sym: SymbolId> {
    pub span: Span,
    pub kind: TreeKind<Sym>,
}

impl<Sym: SymbolId> Tree<Sym> {
    pub fn new(span: Span, kind: TreeKind<Sym>) -> Self {
        Self { span, kind }
    }
}

#[derive(Clone, Debug)]
pub enum TreeKind<Sym: SymbolId> {
    /// A literal constant; carries no symbol and no effect.
    Literal,
    /// An ignored definition (e.g. an import) — empty `Res`.
    Skip,
    /// A closure literal referring to an indexed method symbol.
    Closure(Sym),
    This,
    /// `super[qual]`; `qual` is the statically known super-prefix class.
    Super(Sym),
    /// A bare identifier resolving to a term, lexical by construction.
    Ident(Sym),
    /// `prefix.sym`.
    Select(Box<Tree<Sym>>, Sym),
    Apply(Box<Tree<Sym>>, Vec<Tree<Sym>>),
    /// `new class(argss...)`, constructed via `ctor`.
    New {
        class: Sym,
        ctor: Sym,
        argss: Vec<Vec<Tree<Sym>>>,
    },
    If(Box<Tree<Sym>>, Box<Tree<Sym>>, Box<Tree<Sym>>),
    Assign(Box<Tree<Sym>>, Box<Tree<Sym>>),
    Typed(Box<Tree<Sym>>),
    Block(Box<Template<Sym>>),
}

/// A sequence of statements followed by a tail expression: a class
/// template body, a nested class body, or a block expression's body.
#[derive(Clone, Debug)]
pub struct Template<Sym: SymbolId> {
    /// `Some(class)` at the root of a class template (seeded via
    /// [`crate::seed::seed_class`]); `None` for a plain block, which is
    /// never re-seeded, only pushed as a fresh frame (§4.3).
    pub class: Option<Sym>,
    pub stats: Vec<Stat<Sym>>,
    pub tail: Tree<Sym>,
}

/// One member definition or statement inside a [`Template`] (§4.2, §4.3).
#[derive(Clone, Debug)]
pub enum Stat<Sym: SymbolId> {
    ValDef { sym: Sym, rhs: Tree<Sym> },
    LazyValDef { sym: Sym, rhs: Tree<Sym> },
    /// A method definition. Only the final parameter list is modeled
    /// (§4.2's stated limitation); earlier lists are simply not
    /// represented here.
    DefDef {
        sym: Sym,
        params: Vec<Sym>,
        body: Tree<Sym>,
    },
    ClassDef { sym: Sym, template: Template<Sym> },
    /// Any other member definition: registered as a local, nothing more.
    Other(Sym),
    Expr(Tree<Sym>),
}
