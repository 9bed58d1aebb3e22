//! Value/effect model: `ValueInfo`, `LatentInfo`, `Res`, `Effect` (§3).

use crate::env::Env;
use crate::host::{Span, SymbolId};
use crate::tree::{Template, Tree};

/// What the checker knows about an evaluated subexpression: whether it
/// is partial, and a latent continuation if it denotes a deferred
/// computation (method, lazy thunk, or class body).
#[derive(Clone, Debug, Default)]
pub struct ValueInfo<Sym: SymbolId> {
    pub partial: bool,
    pub latent: Option<LatentInfo<Sym>>,
}

impl<Sym: SymbolId> ValueInfo<Sym> {
    pub fn simple(partial: bool) -> Self {
        Self {
            partial,
            latent: None,
        }
    }

    /// Absent/neutral value info, used when a caller has no knowledge of
    /// an argument (e.g. forcing a latent with no real call site).
    pub fn neutral() -> Self {
        Self::default()
    }
}

/// A stored, deferred analysis: a method body, a lazy-val thunk, or a
/// class body, captured together with the environment snapshot it
/// closes over (§3, §9 "Latent values as closures").
#[derive(Clone, Debug)]
pub enum LatentInfo<Sym: SymbolId> {
    Method {
        sym: Sym,
        env: Env<Sym>,
        /// Final parameter list only (§4.2).
        params: Vec<Sym>,
        body: Tree<Sym>,
    },
    Lazy {
        sym: Sym,
        env: Env<Sym>,
        rhs: Tree<Sym>,
    },
    Class {
        sym: Sym,
        env: Env<Sym>,
        template: Template<Sym>,
    },
    /// The join of two latents (from [`Res::join`]): forcing it forces
    /// both and joins their results.
    Joined(Box<LatentInfo<Sym>>, Box<LatentInfo<Sym>>),
}

impl<Sym: SymbolId> LatentInfo<Sym> {
    /// The symbol this latent is ultimately named for, for diagnostic
    /// messages. `Joined` reports the left side's symbol.
    pub fn primary_sym(&self) -> Sym {
        match self {
            LatentInfo::Method { sym, .. } | LatentInfo::Lazy { sym, .. } | LatentInfo::Class { sym, .. } => *sym,
            LatentInfo::Joined(a, _) => a.primary_sym(),
        }
    }
}

/// Effects accumulated analyzing one class template (§3).
///
/// Sub-effect-carrying variants (`Call`, `Force`, `Latent`,
/// `Instantiate`) form a tree; rendering walks it child-before-parent
/// (§7).
#[derive(Clone, Debug)]
pub enum Effect<Sym: SymbolId> {
    /// Read of a not-yet-initialized field.
    Uninit { sym: Sym, at: Span },
    /// Call to an overridable non-`@init` method.
    OverrideRisk { sym: Sym, at: Span },
    /// Use of an abstract declaration not marked `@init`.
    UseAbstractDef { sym: Sym, at: Span },
    /// Selection on a partial value not known safe.
    Member { sym: Sym, obj_at: Span },
    /// Assigning a partial rhs into a non-partial lhs.
    CrossAssign { lhs: Sym, rhs_at: Span },
    /// Passing a partial value where a non-partial is expected.
    Argument { func: Sym, arg_at: Span },
    /// Constructing an inner class whose outer is partial.
    PartialNew { outer_at: Span, class: Sym },
    /// A method call whose body produces effects.
    Call {
        sym: Sym,
        at: Span,
        sub: Vec<Effect<Sym>>,
    },
    /// Forcing a lazy val whose thunk produces effects.
    Force {
        sym: Sym,
        at: Span,
        sub: Vec<Effect<Sym>>,
    },
    /// A latent value (closure/method result) evaluated to an unsafe
    /// body.
    Latent { at: Span, sub: Vec<Effect<Sym>> },
    /// Constructing an in-scope inner class whose body is unsafe.
    Instantiate {
        class: Sym,
        at: Span,
        sub: Vec<Effect<Sym>>,
    },
    /// Recursive construction of the currently-constructing class.
    RecCreate { class: Sym, at: Span },
}

impl<Sym: SymbolId> Effect<Sym> {
    /// The position to attach the summary diagnostic to.
    pub fn at(&self) -> Span {
        match self {
            Effect::Uninit { at, .. }
            | Effect::OverrideRisk { at, .. }
            | Effect::UseAbstractDef { at, .. }
            | Effect::Call { at, .. }
            | Effect::Force { at, .. }
            | Effect::Latent { at, .. }
            | Effect::Instantiate { at, .. }
            | Effect::RecCreate { at, .. } => *at,
            Effect::Member { obj_at, .. } => *obj_at,
            Effect::CrossAssign { rhs_at, .. } => *rhs_at,
            Effect::Argument { arg_at, .. } => *arg_at,
            Effect::PartialNew { outer_at, .. } => *outer_at,
        }
    }
}

/// Accumulated effects plus the value info of the expression they came
/// from. Monoidally composable via [`Res::join`].
#[derive(Clone, Debug)]
pub struct Res<Sym: SymbolId> {
    pub effects: Vec<Effect<Sym>>,
    pub value: ValueInfo<Sym>,
}

impl<Sym: SymbolId> Res<Sym> {
    pub fn new(effects: Vec<Effect<Sym>>, value: ValueInfo<Sym>) -> Self {
        Self { effects, value }
    }

    pub fn empty() -> Self {
        Self {
            effects: Vec::new(),
            value: ValueInfo::neutral(),
        }
    }

    /// Concatenate effects and take the elementwise disjunction of
    /// partial-ness; the joined latent re-forces both sides and joins
    /// the results (§3).
    pub fn join(mut self, mut other: Self) -> Self {
        self.effects.append(&mut other.effects);
        let partial = self.value.partial || other.value.partial;
        let latent = match (self.value.latent.take(), other.value.latent.take()) {
            (Some(a), Some(b)) => Some(LatentInfo::Joined(Box::new(a), Box::new(b))),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        };
        Self {
            effects: self.effects,
            value: ValueInfo { partial, latent },
        }
    }
}
