//! Host-compiler interface.
//!
//! Everything this crate needs from the surrounding compiler: an opaque
//! symbol identity and a table of pure queries over it. The checker is
//! generic over both, so a host plugs in its own symbol representation
//! without this crate depending on any concrete frontend.

use std::fmt;
use std::hash::Hash;

/// Opaque identity for a term or type symbol, owned by the host compiler.
///
/// Any `Copy + Eq + Hash + Debug` type qualifies — typically a small
/// interned index, mirroring how a host frontend hands out symbol
/// handles.
pub trait SymbolId: Copy + Eq + Hash + fmt::Debug {}

impl<T: Copy + Eq + Hash + fmt::Debug> SymbolId for T {}

/// A half-open byte range in the original source, as reported by the
/// host's typed-tree producer.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Hash)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub const fn point(at: u32) -> Self {
        Self { start: at, end: at }
    }

    pub fn to_range(self) -> std::ops::Range<usize> {
        self.start as usize..self.end as usize
    }
}

/// Flags a host compiler attaches to a symbol declaration.
///
/// Modeled as a small bitset rather than a dependency on a flags crate:
/// the set is tiny and closed (§3 lists exactly these eight), and none
/// of the pack's crates pull in `bitflags` for comparable compiler-flag
/// sets.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct SymFlags(u16);

impl SymFlags {
    pub const LAZY: Self = Self(1 << 0);
    pub const METHOD: Self = Self(1 << 1);
    pub const DEFERRED: Self = Self(1 << 2);
    pub const PARAM_ACCESSOR: Self = Self(1 << 3);
    pub const ACCESSOR: Self = Self(1 << 4);
    pub const FINAL: Self = Self(1 << 5);
    pub const PRIVATE: Self = Self(1 << 6);
    pub const LOCAL: Self = Self(1 << 7);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for SymFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for SymFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Pure queries the checker needs about a symbol, relative to the class
/// template currently being checked. See spec §6, "Consumed from the
/// host compiler."
pub trait Db<Sym: SymbolId> {
    fn name(&self, sym: Sym) -> &str;
    fn owner(&self, sym: Sym) -> Option<Sym>;
    fn flags(&self, sym: Sym) -> SymFlags;
    fn position(&self, sym: Sym) -> Span;

    /// `@init`.
    fn has_init(&self, sym: Sym) -> bool;
    /// `@partial` on the symbol's declared type/field/parameter.
    fn has_partial(&self, sym: Sym) -> bool;
    /// `@unchecked` on a class.
    fn has_unchecked(&self, sym: Sym) -> bool;

    /// Primary-constructor accessor that is itself a setter (excluded
    /// from the constructor accessor set in §4.1).
    fn is_constructor_param_setter(&self, sym: Sym) -> bool;
    fn is_effectively_final(&self, sym: Sym) -> bool;
    fn is_default_getter(&self, sym: Sym) -> bool;
    fn is_subclass(&self, sub: Sym, sup: Sym) -> bool;
    /// Whether `inner` is lexically contained in `outer_class`'s scope
    /// (used to tell an in-scope inner class apart from a non-local
    /// class reference in `check_new`).
    fn is_contained_in(&self, inner: Sym, outer_class: Sym) -> bool;

    /// Primary-constructor accessors of `class`, excluding setters.
    fn param_accessors(&self, class: Sym) -> Vec<Sym>;
    /// Proper ancestors of `class` (not including `class` itself).
    fn base_classes(&self, class: Sym) -> Vec<Sym>;
    /// All term declarations owned directly by `class`.
    fn decls(&self, class: Sym) -> Vec<Sym>;
    /// Classes named in `class`'s self-type annotation, if any.
    fn self_type_classes(&self, class: Sym) -> Vec<Sym>;

    fn is_lazy(&self, sym: Sym) -> bool {
        self.flags(sym).contains(SymFlags::LAZY)
    }

    fn is_method(&self, sym: Sym) -> bool {
        self.flags(sym).contains(SymFlags::METHOD)
    }

    fn is_deferred(&self, sym: Sym) -> bool {
        self.flags(sym).contains(SymFlags::DEFERRED)
    }

    fn is_param_accessor(&self, sym: Sym) -> bool {
        self.flags(sym).contains(SymFlags::PARAM_ACCESSOR)
    }

    fn is_accessor(&self, sym: Sym) -> bool {
        self.flags(sym).contains(SymFlags::ACCESSOR)
    }
}
