//! Class-seed construction and indexing (§4.1, §4.2).

use indexmap::IndexSet;

use crate::env::Env;
use crate::host::{Db, SymbolId};
use crate::tree::Stat;
use crate::value::LatentInfo;

/// Build the seeded environment for checking `class`'s template:
/// `TopEnv(class)` with one frame owning `nonInit ∪ partial`, those two
/// sets pre-marked. Returns `None` if `class` is `@unchecked` (§4.1: its
/// template is not checked at all).
pub fn seed_class<Sym: SymbolId, D: Db<Sym>>(db: &D, class: Sym) -> Option<Env<Sym>> {
    if db.has_unchecked(class) {
        return None;
    }

    let accessors: Vec<Sym> = db
        .param_accessors(class)
        .into_iter()
        .filter(|a| !db.is_constructor_param_setter(*a))
        .collect();

    let mut partial: IndexSet<Sym> = accessors
        .iter()
        .copied()
        .filter(|a| db.has_partial(*a))
        .collect();
    for base in db.base_classes(class) {
        for decl in db.decls(base) {
            if !db.is_deferred(decl) && db.has_partial(decl) {
                partial.insert(decl);
            }
        }
    }
    partial.insert(class);

    let accessor_set: IndexSet<Sym> = accessors.into_iter().collect();
    let non_init: IndexSet<Sym> = db
        .decls(class)
        .into_iter()
        .filter(|d| {
            !db.is_lazy(*d)
                && !db.is_deferred(*d)
                && !accessor_set.contains(d)
                && !db.is_method(*d)
        })
        .collect();

    let mut env = Env::top(class).push_frame();
    for sym in non_init.iter().chain(partial.iter()) {
        env.declare_local(*sym);
    }
    for sym in &non_init {
        env.mark_not_init(*sym);
    }
    for sym in &partial {
        env.mark_partial(*sym);
    }
    Some(env)
}

/// Register every member definition in `stats` with the given frame
/// (already pushed onto `env`), binding a [`LatentInfo`] for methods,
/// lazy vals, and nested classes (§4.2). Plain statements (`Other`,
/// `Expr`) contribute no latent.
pub fn index_stats<Sym: SymbolId>(env: &mut Env<Sym>, stats: &[Stat<Sym>]) {
    for stat in stats {
        match stat {
            Stat::ValDef { sym, .. } | Stat::LazyValDef { sym, .. } | Stat::Other(sym) => {
                env.declare_local(*sym);
            }
            Stat::DefDef { sym, .. } | Stat::ClassDef { sym, .. } => {
                env.declare_local(*sym);
            }
            Stat::Expr(_) => {}
        }
        match stat {
            Stat::ValDef { sym, .. } => {
                env.mark_not_init(*sym);
            }
            Stat::LazyValDef { sym, rhs } => {
                env.set_latent(
                    *sym,
                    LatentInfo::Lazy {
                        sym: *sym,
                        env: env.clone(),
                        rhs: rhs.clone(),
                    },
                );
            }
            Stat::DefDef { sym, params, body } => {
                env.set_latent(
                    *sym,
                    LatentInfo::Method {
                        sym: *sym,
                        env: env.clone(),
                        params: params.clone(),
                        body: body.clone(),
                    },
                );
            }
            Stat::ClassDef { sym, template } => {
                env.set_latent(
                    *sym,
                    LatentInfo::Class {
                        sym: *sym,
                        env: env.clone(),
                        template: template.clone(),
                    },
                );
            }
            Stat::Other(_) | Stat::Expr(_) => {}
        }
    }
}
