//! Tree dispatcher and per-construct checks (§4.3–§4.6).

use indexmap::IndexSet;

use crate::env::Env;
use crate::host::{Db, Span, SymbolId};
use crate::seed::{index_stats, seed_class};
use crate::tree::{Stat, Template, Tree, TreeKind};
use crate::value::{Effect, LatentInfo, Res, ValueInfo};

/// Check one class template from scratch: seed its environment, index
/// its members, walk the body, and return the effects discovered (empty
/// if the class is `@unchecked`).
pub fn check_class<Sym: SymbolId, D: Db<Sym>>(
    db: &D,
    class: Sym,
    template: &Template<Sym>,
) -> Vec<Effect<Sym>> {
    let Some(mut env) = seed_class(db, class) else {
        return Vec::new();
    };
    index_stats(&mut env, &template.stats);
    let mut checking = IndexSet::new();
    let (_, res) = check_template(db, &mut checking, env, template);
    res.effects
}

/// Guards a latent invocation against re-entry: if `sym` is already
/// being forced on this path, short-circuits to a neutral result
/// instead of recursing (§4.6). The set is pushed/popped strictly
/// around `f`'s call.
fn guarded<Sym, F>(checking: &mut IndexSet<Sym>, sym: Sym, f: F) -> Res<Sym>
where
    Sym: SymbolId,
    F: FnOnce(&mut IndexSet<Sym>) -> Res<Sym>,
{
    if !checking.insert(sym) {
        return Res::empty();
    }
    let res = f(checking);
    checking.shift_remove(&sym);
    res
}

/// Invoke a stored continuation (§9 "Latent values as closures"). The
/// captured environment snapshot is used and discarded; only the
/// resulting `Res` escapes.
fn force<Sym: SymbolId, D: Db<Sym>>(
    db: &D,
    checking: &mut IndexSet<Sym>,
    latent: &LatentInfo<Sym>,
    args: &[ValueInfo<Sym>],
) -> Res<Sym> {
    match latent {
        LatentInfo::Method {
            sym,
            env,
            params,
            body,
        } => guarded(checking, *sym, |checking| {
            let mut call_env = env.clone().push_frame();
            for (i, param) in params.iter().enumerate() {
                call_env.declare_local(*param);
                if let Some(info) = args.get(i) {
                    if info.partial {
                        call_env.mark_partial(*param);
                    }
                    if let Some(l) = &info.latent {
                        call_env.set_latent(*param, l.clone());
                    }
                }
            }
            check_expr(db, checking, call_env, body).1
        }),
        LatentInfo::Lazy { sym, env, rhs } => guarded(checking, *sym, |checking| {
            check_expr(db, checking, env.clone(), rhs).1
        }),
        LatentInfo::Class {
            sym,
            env,
            template,
        } => guarded(checking, *sym, |checking| {
            check_block(db, checking, env.clone(), template).1
        }),
        LatentInfo::Joined(a, b) => {
            let ra = force(db, checking, a, args);
            let rb = force(db, checking, b, args);
            ra.join(rb)
        }
    }
}

fn check_template<Sym: SymbolId, D: Db<Sym>>(
    db: &D,
    checking: &mut IndexSet<Sym>,
    env: Env<Sym>,
    template: &Template<Sym>,
) -> (Env<Sym>, Res<Sym>) {
    let (env, stats_effects) = check_stats(db, checking, env, &template.stats);
    let (env, tail_res) = check_expr(db, checking, env, &template.tail);
    let mut effects = stats_effects;
    effects.extend(tail_res.effects);
    (env, Res::new(effects, tail_res.value))
}

/// `checkBlock` (§4.3): push a fresh frame, index the block's own
/// members into it, walk it, and pop before returning.
fn check_block<Sym: SymbolId, D: Db<Sym>>(
    db: &D,
    checking: &mut IndexSet<Sym>,
    env: Env<Sym>,
    template: &Template<Sym>,
) -> (Env<Sym>, Res<Sym>) {
    let mut inner = env.push_frame();
    index_stats(&mut inner, &template.stats);
    let (inner, res) = check_template(db, checking, inner, template);
    (inner.pop_frame(), res)
}

/// `checkStats` (§4.3): fold left, accumulating effects and discarding
/// per-statement value info.
fn check_stats<Sym: SymbolId, D: Db<Sym>>(
    db: &D,
    checking: &mut IndexSet<Sym>,
    mut env: Env<Sym>,
    stats: &[Stat<Sym>],
) -> (Env<Sym>, Vec<Effect<Sym>>) {
    let mut effects = Vec::new();
    for stat in stats {
        let (next_env, stat_effects) = check_stat(db, checking, env, stat);
        env = next_env;
        effects.extend(stat_effects);
    }
    (env, effects)
}

fn check_stat<Sym: SymbolId, D: Db<Sym>>(
    db: &D,
    checking: &mut IndexSet<Sym>,
    env: Env<Sym>,
    stat: &Stat<Sym>,
) -> (Env<Sym>, Vec<Effect<Sym>>) {
    match stat {
        Stat::ValDef { sym, rhs } => {
            let (env, res) = check_val_def(db, checking, env, *sym, rhs);
            (env, res.effects)
        }
        Stat::Expr(tree) => {
            let (env, res) = check_expr(db, checking, env, tree);
            (env, res.effects)
        }
        // Lazy vals, methods, and nested classes were already bound to a
        // latent continuation by the indexing pass; walking them as a
        // statement does nothing until something forces them.
        Stat::LazyValDef { .. } | Stat::DefDef { .. } | Stat::ClassDef { .. } | Stat::Other(_) => {
            (env, Vec::new())
        }
    }
}

fn callee_sym<Sym: SymbolId>(tree: &Tree<Sym>) -> Option<Sym> {
    match &tree.kind {
        TreeKind::Ident(sym) | TreeKind::Select(_, sym) | TreeKind::Closure(sym) => Some(*sym),
        _ => None,
    }
}

fn is_lexical_prefix<Sym: SymbolId>(kind: &TreeKind<Sym>) -> bool {
    matches!(kind, TreeKind::This | TreeKind::Super(_))
}

/// Expression dispatcher (§4.4).
fn check_expr<Sym: SymbolId, D: Db<Sym>>(
    db: &D,
    checking: &mut IndexSet<Sym>,
    env: Env<Sym>,
    tree: &Tree<Sym>,
) -> (Env<Sym>, Res<Sym>) {
    match &tree.kind {
        TreeKind::Literal | TreeKind::Skip => (env, Res::empty()),
        TreeKind::Closure(sym) => {
            let latent = env.latent_info(*sym).cloned();
            (
                env,
                Res::new(Vec::new(), ValueInfo { partial: false, latent }),
            )
        }
        TreeKind::This => {
            let partial = env.is_partial(env.current_class()) && !env.initialized();
            (env, Res::new(Vec::new(), ValueInfo::simple(partial)))
        }
        TreeKind::Super(qual) => {
            let partial = env.is_partial(*qual) && !env.initialized();
            (env, Res::new(Vec::new(), ValueInfo::simple(partial)))
        }
        TreeKind::Ident(sym) => check_term_ref(db, checking, env, *sym, tree.span),
        TreeKind::Select(prefix, sym) => {
            if is_lexical_prefix(&prefix.kind) {
                check_term_ref(db, checking, env, *sym, tree.span)
            } else {
                check_select(db, checking, env, prefix, *sym)
            }
        }
        TreeKind::Apply(fun, args) => check_apply(db, checking, env, fun, args, tree.span),
        TreeKind::New { class, ctor, argss } => {
            check_new(db, checking, env, *class, *ctor, argss, tree.span)
        }
        TreeKind::If(cond, thenp, elsep) => check_if(db, checking, env, cond, thenp, elsep),
        TreeKind::Assign(lhs, rhs) => check_assign(db, checking, env, lhs, rhs),
        TreeKind::Typed(inner) => check_expr(db, checking, env, inner),
        TreeKind::Block(template) => check_block(db, checking, env, template),
    }
}

/// Whether a method's latent carries no term parameters in its final
/// parameter list, i.e. it can be invoked with no argument info at all.
fn is_parameterless_method<Sym: SymbolId>(latent: &LatentInfo<Sym>) -> bool {
    matches!(latent, LatentInfo::Method { params, .. } if params.is_empty())
}

/// `checkTermRef` for a lexical reference (§4.5). Our dispatcher only
/// reaches this for `Ident` and `this.x`/`super[q].x` selects — see
/// `is_lexical_prefix` — so the non-lexical branch from the distilled
/// source is not reproduced here; its guard survives as
/// `is_safe_on_partial_prefix`, used directly by `check_new`.
fn check_term_ref<Sym: SymbolId, D: Db<Sym>>(
    db: &D,
    checking: &mut IndexSet<Sym>,
    env: Env<Sym>,
    sym: Sym,
    at: Span,
) -> (Env<Sym>, Res<Sym>) {
    let mut effects = Vec::new();
    if env.is_not_init(sym) {
        effects.push(Effect::Uninit { sym, at });
    }

    if db.is_lazy(sym) {
        let (env, mut res) = check_force(db, checking, env, sym, at);
        res.effects.splice(0..0, effects);
        return (env, res);
    }

    if db.is_method(sym) {
        if !db.has_init(sym) && !db.is_effectively_final(sym) && !db.is_default_getter(sym) {
            effects.push(Effect::OverrideRisk { sym, at });
        }
        if let Some(latent) = env.latent_info(sym).cloned() {
            if is_parameterless_method(&latent) {
                let inner = force(db, checking, &latent, &[]);
                if !inner.effects.is_empty() {
                    effects.push(Effect::Call {
                        sym,
                        at,
                        sub: inner.effects,
                    });
                }
                return (env, Res::new(effects, inner.value));
            }
            let value = ValueInfo {
                partial: false,
                latent: Some(latent),
            };
            return (env, Res::new(effects, value));
        }
    }

    if db.is_deferred(sym) && !db.has_init(sym) && db.owner(sym) == Some(env.current_class()) {
        effects.push(Effect::UseAbstractDef { sym, at });
    }

    let value = ValueInfo {
        partial: env.is_partial(sym),
        latent: env.latent_info(sym).cloned(),
    };
    (env, Res::new(effects, value))
}

/// `checkForce` (§4.5). Memoized via `lazyForced`: a lazy thunk's body
/// runs once per environment lineage (Testable Property 7).
fn check_force<Sym: SymbolId, D: Db<Sym>>(
    db: &D,
    checking: &mut IndexSet<Sym>,
    mut env: Env<Sym>,
    sym: Sym,
    at: Span,
) -> (Env<Sym>, Res<Sym>) {
    if env.is_forced(sym) {
        let value = ValueInfo {
            partial: env.is_partial(sym),
            latent: env.latent_info(sym).cloned(),
        };
        return (env, Res::new(Vec::new(), value));
    }

    env.mark_forced(sym);
    let latent = env
        .latent_info(sym)
        .cloned()
        .expect("lazy symbol indexed with no latent info");
    let inner = force(db, checking, &latent, &[]);

    if inner.value.partial {
        env.mark_partial(sym);
    }
    if let Some(l) = inner.value.latent.clone() {
        env.set_latent(sym, l);
    }

    let effects = if inner.effects.is_empty() {
        Vec::new()
    } else {
        vec![Effect::Force {
            sym,
            at,
            sub: inner.effects,
        }]
    };
    let value = ValueInfo {
        partial: env.is_partial(sym),
        latent: env.latent_info(sym).cloned(),
    };
    (env, Res::new(effects, value))
}

/// A selection is safe on a partial prefix (§4.5's `checkNew` guard).
fn is_safe_on_partial_prefix<Sym: SymbolId, D: Db<Sym>>(db: &D, env: &Env<Sym>, sym: Sym) -> bool {
    let Some(owner) = db.owner(sym) else {
        return false;
    };
    let current = env.current_class();
    let owner_related = db.is_subclass(current, owner)
        || db
            .self_type_classes(current)
            .into_iter()
            .any(|c| db.is_subclass(c, owner));
    if !owner_related {
        return false;
    }

    let no_partial_ctor_params = !db.is_method(sym)
        && !db.is_lazy(sym)
        && !db.is_deferred(sym)
        && db.param_accessors(owner).iter().all(|p| !db.has_partial(*p));

    no_partial_ctor_params
        || db.has_init(sym)
        || db.has_partial(sym)
        || db.is_default_getter(sym)
        || (env.initialized() && db.is_effectively_final(current))
}

/// `checkParams` (§4.5). Returns the updated env, accumulated effects, a
/// partial-summary flag, and the argument-wise value info.
#[allow(clippy::too_many_arguments)]
fn check_params<Sym: SymbolId, D: Db<Sym>>(
    db: &D,
    checking: &mut IndexSet<Sym>,
    mut env: Env<Sym>,
    func: Option<Sym>,
    params: &[Sym],
    args: &[Tree<Sym>],
    force_checks: bool,
) -> (Env<Sym>, Vec<Effect<Sym>>, bool, Vec<ValueInfo<Sym>>) {
    let mut effects = Vec::new();
    let mut values = Vec::with_capacity(args.len());
    let mut partial_summary = false;

    for (i, arg) in args.iter().enumerate() {
        let (next_env, res) = check_expr(db, checking, env, arg);
        env = next_env;
        effects.extend(res.effects);
        let param = params.get(i).copied();
        let allows_partial = param.is_some_and(|p| db.has_partial(p));

        if force_checks {
            if let Some(latent) = &res.value.latent {
                let inner = force(db, checking, latent, &[]);
                if !inner.effects.is_empty() {
                    partial_summary = true;
                    if !allows_partial {
                        effects.push(Effect::Latent {
                            at: arg.span,
                            sub: inner.effects,
                        });
                    }
                }
            }
            if res.value.partial {
                partial_summary = true;
                if !allows_partial {
                    if let Some(func) = func {
                        effects.push(Effect::Argument {
                            func,
                            arg_at: arg.span,
                        });
                    }
                }
            }
        }

        values.push(res.value);
    }

    (env, effects, partial_summary, values)
}

/// `checkApply` (§4.5). Argument safety is checked against the callee's
/// parameter annotations unconditionally — whether or not the callee
/// happens to be a known local latent — and its latent, when present,
/// is still invoked for a precise body analysis on top of that. (The
/// distilled source's `force = !fun-is-latent` gating would silently
/// drop the argument check whenever the callee was a local method,
/// contradicting its own partial-argument scenario; always checking is
/// the reading kept here.)
fn check_apply<Sym: SymbolId, D: Db<Sym>>(
    db: &D,
    checking: &mut IndexSet<Sym>,
    env: Env<Sym>,
    fun: &Tree<Sym>,
    args: &[Tree<Sym>],
    at: Span,
) -> (Env<Sym>, Res<Sym>) {
    let (env, fun_res) = check_expr(db, checking, env, fun);
    let func_sym = callee_sym(fun);
    let fun_latent = fun_res.value.latent;

    let params: Vec<Sym> = match &fun_latent {
        Some(LatentInfo::Method { params, .. }) => params.clone(),
        _ => Vec::new(),
    };

    let (env, mut effects, _partial_summary, values) =
        check_params(db, checking, env, func_sym, &params, args, true);
    effects.splice(0..0, fun_res.effects);

    let value = if let Some(latent) = fun_latent {
        let inner = force(db, checking, &latent, &values);
        if !inner.effects.is_empty() {
            effects.push(Effect::Latent {
                at,
                sub: inner.effects,
            });
        }
        inner.value
    } else {
        ValueInfo::simple(false)
    };

    (env, Res::new(effects, value))
}

/// `checkNew` (§4.5). `class`'s "prefix" (the outer instance for an
/// inner class) is approximated as `owner(class)` — see the resolved
/// Open Question on this in the design notes.
fn check_new<Sym: SymbolId, D: Db<Sym>>(
    db: &D,
    checking: &mut IndexSet<Sym>,
    env: Env<Sym>,
    class: Sym,
    ctor: Sym,
    argss: &[Vec<Tree<Sym>>],
    at: Span,
) -> (Env<Sym>, Res<Sym>) {
    let mut env = env;
    let mut effects = Vec::new();

    if let Some(final_args) = argss.last() {
        let params = db.param_accessors(class);
        let (next_env, sub_effects, _partial, _values) =
            check_params(db, checking, env, Some(ctor), &params, final_args, true);
        env = next_env;
        effects.extend(sub_effects);
    }
    for earlier_args in argss.iter().rev().skip(1) {
        for arg in earlier_args {
            let (next_env, res) = check_expr(db, checking, env, arg);
            env = next_env;
            effects.extend(res.effects);
        }
    }

    if class == env.current_class() {
        effects.push(Effect::RecCreate { class, at });
        return (env, Res::new(effects, ValueInfo::neutral()));
    }

    let prefix = db.owner(class);
    let prefix_partial = prefix.is_some_and(|p| env.is_partial(p));
    if !prefix_partial || is_safe_on_partial_prefix(db, &env, ctor) {
        return (env, Res::new(effects, ValueInfo::neutral()));
    }

    let in_scope = prefix.is_some_and(|p| db.is_contained_in(class, p));
    if !in_scope {
        effects.push(Effect::PartialNew {
            outer_at: prefix.map(|p| db.position(p)).unwrap_or(at),
            class,
        });
        return (env, Res::new(effects, ValueInfo::simple(true)));
    }

    if let Some(latent) = env.latent_info(class).cloned() {
        let inner = force(db, checking, &latent, &[]);
        if !inner.effects.is_empty() {
            effects.push(Effect::Instantiate {
                class,
                at,
                sub: inner.effects,
            });
        }
    }
    (env, Res::new(effects, ValueInfo::simple(true)))
}

/// `checkSelect` (§4.5): unconditional, unlike the guarded non-lexical
/// branch of `checkTermRef` — see `is_safe_on_partial_prefix`.
fn check_select<Sym: SymbolId, D: Db<Sym>>(
    db: &D,
    checking: &mut IndexSet<Sym>,
    env: Env<Sym>,
    prefix: &Tree<Sym>,
    sym: Sym,
) -> (Env<Sym>, Res<Sym>) {
    let (env, mut res) = check_expr(db, checking, env, prefix);
    if res.value.partial {
        res.effects.push(Effect::Member {
            sym,
            obj_at: prefix.span,
        });
    }
    (env, res)
}

/// `checkIf` (§4.5): clone for the else branch, evaluate each side
/// independently, join the resulting environments.
fn check_if<Sym: SymbolId, D: Db<Sym>>(
    db: &D,
    checking: &mut IndexSet<Sym>,
    env: Env<Sym>,
    cond: &Tree<Sym>,
    thenp: &Tree<Sym>,
    elsep: &Tree<Sym>,
) -> (Env<Sym>, Res<Sym>) {
    let (env, cond_res) = check_expr(db, checking, env, cond);
    let else_env = env.clone();
    let (then_env, then_res) = check_expr(db, checking, env, thenp);
    let (else_env, else_res) = check_expr(db, checking, else_env, elsep);

    let mut joined_env = then_env;
    joined_env.join(&else_env);

    let mut res = then_res.join(else_res);
    res.effects.splice(0..0, cond_res.effects);
    (joined_env, res)
}

/// `checkValDef` (§4.5).
fn check_val_def<Sym: SymbolId, D: Db<Sym>>(
    db: &D,
    checking: &mut IndexSet<Sym>,
    env: Env<Sym>,
    sym: Sym,
    rhs: &Tree<Sym>,
) -> (Env<Sym>, Res<Sym>) {
    let (mut env, res) = check_expr(db, checking, env, rhs);

    if !matches!(rhs.kind, TreeKind::Skip) {
        env.mark_init(sym);
    }
    if res.value.partial {
        if env.initialized() {
            env.mark_initialized();
        } else {
            env.mark_partial(sym);
        }
    }
    if let Some(latent) = res.value.latent.clone() {
        env.set_latent(sym, latent);
    }

    (env, Res::new(res.effects, ValueInfo::neutral()))
}

fn assign_local<Sym: SymbolId>(
    env: &mut Env<Sym>,
    effects: &mut Vec<Effect<Sym>>,
    sym: Sym,
    rhs_partial: bool,
    rhs_at: Span,
) {
    let was_uninit = env.is_not_init(sym);
    let was_partial = env.is_partial(sym);

    if !rhs_partial || was_partial || was_uninit {
        if was_uninit {
            env.mark_init(sym);
        }
        if rhs_partial {
            env.mark_partial(sym);
        } else {
            env.remove_partial(sym);
        }
    } else {
        effects.push(Effect::CrossAssign { lhs: sym, rhs_at });
    }
}

/// `Assign(lhs, rhs)` (§4.5).
fn check_assign<Sym: SymbolId, D: Db<Sym>>(
    db: &D,
    checking: &mut IndexSet<Sym>,
    env: Env<Sym>,
    lhs: &Tree<Sym>,
    rhs: &Tree<Sym>,
) -> (Env<Sym>, Res<Sym>) {
    let (mut env, rhs_res) = check_expr(db, checking, env, rhs);
    let mut effects = rhs_res.effects;
    let rhs_partial = rhs_res.value.partial;

    match &lhs.kind {
        TreeKind::Ident(sym) => {
            assign_local(&mut env, &mut effects, *sym, rhs_partial, rhs.span);
        }
        TreeKind::Select(prefix, sym) if matches!(prefix.kind, TreeKind::This) => {
            assign_local(&mut env, &mut effects, *sym, rhs_partial, rhs.span);
        }
        TreeKind::Select(prefix, sym) => {
            let (next_env, prefix_res) = check_expr(db, checking, env, prefix);
            env = next_env;
            effects.extend(prefix_res.effects);
            if rhs_partial && !prefix_res.value.partial {
                effects.push(Effect::CrossAssign {
                    lhs: *sym,
                    rhs_at: rhs.span,
                });
            }
        }
        _ => {}
    }

    (env, Res::new(effects, ValueInfo::neutral()))
}
