//! Environment stack (§3, §9 "Environment as linked frames vs. flat
//! map").
//!
//! A linked list of frames terminated by a `TopEnv` sentinel holding the
//! class currently being checked. Each frame owns a set of locals and
//! tracks, for those locals only, which are uninitialized, partial,
//! forced (lazy vals), and which carry a latent continuation. Lookups
//! for a symbol not owned by the innermost frame walk outward; the
//! sentinel answers `false`/`None` for queries and panics for mutators,
//! since every real symbol is owned by some non-top frame.

use indexmap::{IndexMap, IndexSet};

use crate::host::SymbolId;
use crate::value::LatentInfo;

#[derive(Clone, Debug, Default)]
struct Frame<Sym: SymbolId> {
    locals: IndexSet<Sym>,
    non_init: IndexSet<Sym>,
    partial_syms: IndexSet<Sym>,
    lazy_forced: IndexSet<Sym>,
    latent_syms: IndexMap<Sym, LatentInfo<Sym>>,
}

#[derive(Clone, Debug)]
enum Link<Sym: SymbolId> {
    Top(Sym),
    Frame(Box<Frame<Sym>>, Box<Env<Sym>>),
}

/// One frame of the environment stack, including everything outward of
/// it. Cloning an `Env` deep-clones every frame up through the sentinel
/// (the sentinel itself is a plain symbol value, so cloning it is
/// already "sharing by identity" in the sense that matters: equality).
#[derive(Clone, Debug)]
pub struct Env<Sym: SymbolId>(Link<Sym>);

impl<Sym: SymbolId> Env<Sym> {
    /// A bare `TopEnv` for `class`, with no frames pushed.
    pub fn top(class: Sym) -> Self {
        Env(Link::Top(class))
    }

    /// Push a fresh, empty frame.
    pub fn push_frame(self) -> Self {
        Env(Link::Frame(Box::new(Frame::default()), Box::new(self)))
    }

    /// Pop the innermost frame, returning the (possibly-mutated) parent.
    /// Panics on `TopEnv` — callers only pop frames they pushed.
    pub fn pop_frame(self) -> Self {
        match self.0 {
            Link::Frame(_, parent) => *parent,
            Link::Top(_) => panic!("pop_frame called on TopEnv"),
        }
    }

    pub fn current_class(&self) -> Sym {
        match &self.0 {
            Link::Top(class) => *class,
            Link::Frame(_, parent) => parent.current_class(),
        }
    }

    /// Register `sym` as owned by the innermost frame. Panics on
    /// `TopEnv` (a contract violation: every checked symbol belongs to
    /// some pushed frame).
    pub fn declare_local(&mut self, sym: Sym) {
        match &mut self.0 {
            Link::Frame(frame, _) => {
                frame.locals.insert(sym);
            }
            Link::Top(_) => panic!("declare_local called on TopEnv"),
        }
    }

    pub fn mark_not_init(&mut self, sym: Sym) {
        match &mut self.0 {
            Link::Frame(frame, _) => {
                frame.non_init.insert(sym);
            }
            Link::Top(_) => panic!("mark_not_init called on TopEnv"),
        }
    }

    pub fn is_not_init(&self, sym: Sym) -> bool {
        match &self.0 {
            Link::Top(_) => false,
            Link::Frame(frame, parent) => {
                if frame.locals.contains(&sym) {
                    frame.non_init.contains(&sym)
                } else {
                    parent.is_not_init(sym)
                }
            }
        }
    }

    /// Clear `sym` from `nonInit` in its owning frame. Contract: `sym`
    /// must be owned by some non-top frame (an internal-assertion
    /// violation otherwise, per §7).
    pub fn mark_init(&mut self, sym: Sym) {
        match &mut self.0 {
            Link::Frame(frame, parent) => {
                if frame.locals.contains(&sym) {
                    frame.non_init.shift_remove(&sym);
                } else {
                    parent.mark_init(sym);
                }
            }
            Link::Top(_) => panic!("mark_init: {sym:?} is not owned by any frame"),
        }
    }

    pub fn is_partial(&self, sym: Sym) -> bool {
        match &self.0 {
            Link::Top(_) => false,
            Link::Frame(frame, parent) => {
                if frame.locals.contains(&sym) {
                    frame.partial_syms.contains(&sym)
                } else {
                    parent.is_partial(sym)
                }
            }
        }
    }

    pub fn mark_partial(&mut self, sym: Sym) {
        match &mut self.0 {
            Link::Frame(frame, parent) => {
                if frame.locals.contains(&sym) {
                    frame.partial_syms.insert(sym);
                } else {
                    parent.mark_partial(sym);
                }
            }
            Link::Top(_) => panic!("mark_partial: {sym:?} is not owned by any frame"),
        }
    }

    pub fn remove_partial(&mut self, sym: Sym) {
        match &mut self.0 {
            Link::Frame(frame, parent) => {
                if frame.locals.contains(&sym) {
                    frame.partial_syms.shift_remove(&sym);
                } else {
                    parent.remove_partial(sym);
                }
            }
            Link::Top(_) => panic!("remove_partial: {sym:?} is not owned by any frame"),
        }
    }

    pub fn is_forced(&self, sym: Sym) -> bool {
        match &self.0 {
            Link::Top(_) => false,
            Link::Frame(frame, parent) => {
                if frame.locals.contains(&sym) {
                    frame.lazy_forced.contains(&sym)
                } else {
                    parent.is_forced(sym)
                }
            }
        }
    }

    pub fn mark_forced(&mut self, sym: Sym) {
        match &mut self.0 {
            Link::Frame(frame, parent) => {
                if frame.locals.contains(&sym) {
                    frame.lazy_forced.insert(sym);
                } else {
                    parent.mark_forced(sym);
                }
            }
            Link::Top(_) => panic!("mark_forced: {sym:?} is not owned by any frame"),
        }
    }

    pub fn latent_info(&self, sym: Sym) -> Option<&LatentInfo<Sym>> {
        match &self.0 {
            Link::Top(_) => None,
            Link::Frame(frame, parent) => {
                if frame.locals.contains(&sym) {
                    frame.latent_syms.get(&sym)
                } else {
                    parent.latent_info(sym)
                }
            }
        }
    }

    pub fn set_latent(&mut self, sym: Sym, latent: LatentInfo<Sym>) {
        match &mut self.0 {
            Link::Frame(frame, parent) => {
                if frame.locals.contains(&sym) {
                    frame.latent_syms.insert(sym, latent);
                } else {
                    parent.set_latent(sym, latent);
                }
            }
            Link::Top(_) => panic!("set_latent: {sym:?} is not owned by any frame"),
        }
    }

    /// Every frame's `nonInit` is empty and `partialSyms` is either
    /// empty or the singleton `{currentClass}` (§3 invariant 3).
    pub fn initialized(&self) -> bool {
        let class = self.current_class();
        self.frames_satisfy(|frame| {
            frame.non_init.is_empty() && frame.partial_syms.iter().all(|s| *s == class)
        })
    }

    fn frames_satisfy(&self, pred: impl Fn(&Frame<Sym>) -> bool + Copy) -> bool {
        match &self.0 {
            Link::Top(_) => true,
            Link::Frame(frame, parent) => pred(frame) && parent.frames_satisfy(pred),
        }
    }

    /// Clear every frame's `partialSyms`, now that the still-constructing
    /// self is the only thing that could have been partial. Only valid
    /// once [`Env::initialized`] already holds (§3).
    pub fn mark_initialized(&mut self) {
        assert!(
            self.initialized(),
            "mark_initialized called before invariants hold"
        );
        self.clear_all_partial();
    }

    fn clear_all_partial(&mut self) {
        if let Link::Frame(frame, parent) = &mut self.0 {
            frame.partial_syms.clear();
            parent.clear_all_partial();
        }
    }

    /// Merge `other`'s `nonInit`, `lazyForced`, `partialSyms` into self
    /// via set union, recursively on outers. Both environments must
    /// share the same top sentinel (§3).
    pub fn join(&mut self, other: &Env<Sym>) {
        match (&mut self.0, &other.0) {
            (Link::Frame(frame, parent), Link::Frame(other_frame, other_parent)) => {
                frame.non_init.extend(other_frame.non_init.iter().copied());
                frame
                    .lazy_forced
                    .extend(other_frame.lazy_forced.iter().copied());
                frame
                    .partial_syms
                    .extend(other_frame.partial_syms.iter().copied());
                parent.join(other_parent);
            }
            (Link::Top(a), Link::Top(b)) => {
                assert!(*a == *b, "join of environments with different top sentinels");
            }
            _ => panic!("join of environments with mismatched frame shape"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_symbol_is_not_init_until_seeded() {
        let env = Env::top(0u32).push_frame();
        assert!(!env.is_not_init(1));
    }

    #[test]
    fn mark_init_clears_non_init_in_owning_frame() {
        let mut env = Env::top(0u32).push_frame();
        env.declare_local(1);
        env.mark_not_init(1);
        assert!(env.is_not_init(1));
        env.mark_init(1);
        assert!(!env.is_not_init(1));
    }

    #[test]
    fn nested_frame_lookup_walks_outward() {
        let mut outer = Env::top(0u32).push_frame();
        outer.declare_local(1);
        outer.mark_partial(1);
        let inner = outer.push_frame();
        assert!(inner.is_partial(1));
    }

    #[test]
    fn initialized_holds_when_non_init_empty_and_partial_is_self_only() {
        let class = 0u32;
        let mut env = Env::top(class).push_frame();
        env.declare_local(class);
        env.mark_partial(class);
        assert!(env.initialized());
        env.declare_local(99);
        env.mark_not_init(99);
        assert!(!env.initialized());
    }

    #[test]
    fn mark_initialized_clears_partial() {
        let class = 0u32;
        let mut env = Env::top(class).push_frame();
        env.declare_local(class);
        env.mark_partial(class);
        env.mark_initialized();
        assert!(!env.is_partial(class));
    }

    #[test]
    #[should_panic(expected = "mark_initialized called before invariants hold")]
    fn mark_initialized_panics_when_not_ready() {
        let mut env = Env::top(0u32).push_frame();
        env.declare_local(1);
        env.mark_not_init(1);
        env.mark_initialized();
    }

    #[test]
    fn join_unions_non_init_and_partial() {
        let mut a = Env::top(0u32).push_frame();
        a.declare_local(1);
        a.declare_local(2);
        a.mark_not_init(1);

        let mut b = a.clone();
        b.mark_not_init(2);
        b.mark_partial(1);

        a.join(&b);
        assert!(a.is_not_init(1));
        assert!(a.is_not_init(2));
        assert!(a.is_partial(1));
    }

    #[test]
    #[should_panic(expected = "declare_local called on TopEnv")]
    fn declare_local_on_top_env_panics() {
        let mut env = Env::top(0u32);
        env.declare_local(1);
    }

    #[test]
    fn pop_frame_restores_mutated_parent() {
        let mut outer = Env::top(0u32).push_frame();
        outer.declare_local(1);
        outer.mark_not_init(1);
        let mut inner = outer.push_frame();
        inner.mark_init(1);
        let restored = inner.pop_frame();
        assert!(!restored.is_not_init(1));
    }
}
