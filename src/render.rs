//! Effect → diagnostic rendering (§7: "nested effects are reported
//! before their wrapping summary so the root cause appears adjacent to
//! its consequence").
//!
//! Effect trees have no sharing between siblings (§9 "Effect trees"), so
//! rendering is a plain recursive walk: for a sub-effect-carrying
//! variant, render every child first, then push the parent's own
//! summary message.

use crate::diagnostics::Diagnostics;
use crate::host::{Db, SymbolId};
use crate::value::Effect;

/// Render `effects` (as returned by [`crate::checker::check_class`]) into
/// `diagnostics`, in discovery order (§5).
pub fn report<Sym: SymbolId, D: Db<Sym>>(db: &D, diagnostics: &mut Diagnostics, effects: &[Effect<Sym>]) {
    for effect in effects {
        render_one(db, diagnostics, effect);
    }
}

fn render_one<Sym: SymbolId, D: Db<Sym>>(db: &D, diagnostics: &mut Diagnostics, effect: &Effect<Sym>) {
    let at = effect.at();
    match effect {
        Effect::Uninit { sym, .. } => {
            diagnostics.warn(
                at,
                format!("`{}` is read before it has been initialized", db.name(*sym)),
            );
        }
        Effect::OverrideRisk { sym, .. } => {
            diagnostics.warn(
                at,
                format!(
                    "call to overridable method `{}` may be overridden to observe a partially initialized `this`",
                    db.name(*sym)
                ),
            );
        }
        Effect::UseAbstractDef { sym, .. } => {
            diagnostics.warn(
                at,
                format!(
                    "use of abstract member `{}` is not known safe during initialization; mark it `@init`",
                    db.name(*sym)
                ),
            );
        }
        Effect::Member { sym, .. } => {
            diagnostics.warn(
                at,
                format!(
                    "selecting `{}` on a value whose construction has not finished",
                    db.name(*sym)
                ),
            );
        }
        Effect::CrossAssign { lhs, .. } => {
            diagnostics.warn(
                at,
                format!(
                    "assigning a partially initialized value into `{}`, which is not `@partial`",
                    db.name(*lhs)
                ),
            );
        }
        Effect::Argument { func, .. } => {
            diagnostics.warn(
                at,
                format!(
                    "passing a partially initialized value to `{}`, whose parameter is not `@partial`",
                    db.name(*func)
                ),
            );
        }
        Effect::PartialNew { class, .. } => {
            diagnostics.warn(
                at,
                format!(
                    "constructing `{}` while its enclosing instance is still being initialized",
                    db.name(*class)
                ),
            );
        }
        Effect::Call { sym, sub, .. } => {
            report(db, diagnostics, sub);
            diagnostics.warn(
                at,
                format!(
                    "call to `{}` during initialization may observe the effects above",
                    db.name(*sym)
                ),
            );
        }
        Effect::Force { sym, sub, .. } => {
            report(db, diagnostics, sub);
            diagnostics.warn(
                at,
                format!(
                    "forcing lazy value `{}` during initialization may observe the effects above",
                    db.name(*sym)
                ),
            );
        }
        Effect::Latent { sub, .. } => {
            report(db, diagnostics, sub);
            diagnostics.warn(
                at,
                "evaluating this closure during initialization may observe the effects above",
            );
        }
        Effect::Instantiate { class, sub, .. } => {
            report(db, diagnostics, sub);
            diagnostics.warn(
                at,
                format!(
                    "constructing `{}` during initialization may observe the effects above",
                    db.name(*class)
                ),
            );
        }
        Effect::RecCreate { class, .. } => {
            diagnostics.warn(
                at,
                format!(
                    "`{}` is constructed recursively from within its own initialization",
                    db.name(*class)
                ),
            );
        }
    }
}
