//! Static initialization-safety checker.
//!
//! Analyzes a class template as if it were being constructed: which
//! fields are definitely initialized at each program point, which values
//! are only partially initialized, and which calls may escape to code
//! that observes partially-built objects.
//!
//! This crate does not parse, type-check, or otherwise produce the tree
//! it analyzes — that is the surrounding compiler's job. See [`host`]
//! for the trait surface a host compiler implements, and [`tree`] for
//! the shape of the tree it hands us.

pub mod checker;
pub mod diagnostics;
pub mod env;
pub mod host;
pub mod render;
pub mod seed;
pub mod tree;
pub mod value;

pub use checker::check_class;
pub use diagnostics::{Diagnostics, DiagnosticsPrinter, Severity};
pub use host::{Db, Span, SymFlags, SymbolId};
pub use tree::{Stat, Template, Tree, TreeKind};
pub use value::{Effect, LatentInfo, Res, ValueInfo};

/// Errors from this crate's own surface (as opposed to diagnostics, which
/// are never errors — see §7 of the design: analysis violations are
/// reported as [`Effect`]s, not failures).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The diagnostics pretty-printer failed to format (e.g. the
    /// underlying `Write` impl errored).
    #[error("failed to render diagnostics")]
    Render(#[from] std::fmt::Error),
}

/// Run the checker on one class template and render its effects as
/// diagnostics, via [`render::report`].
///
/// Returns an empty, successful [`Diagnostics`] for classes annotated
/// `@unchecked` (checking is skipped entirely; see §4.1).
pub fn check_and_report<Sym, D>(db: &D, class: Sym, template: &Template<Sym>) -> Diagnostics
where
    Sym: SymbolId,
    D: Db<Sym>,
{
    let effects = check_class(db, class, template);
    let mut diagnostics = Diagnostics::new();
    render::report(db, &mut diagnostics, &effects);
    diagnostics
}
