use std::collections::HashMap;
use std::fmt;

/// An opaque, `Copy`, totally-ordered handle for a point variable.
///
/// Callers never construct a `Var` directly; they intern a name (a string or
/// an integer id) through a [`VarTable`] and receive the handle back. Every
/// other type in this crate (`Cluster`, `Method`, `Configuration`, ...)
/// indexes by `Var` rather than by name, which keeps comparisons, hashing,
/// and set membership checks to a single integer comparison regardless of
/// how the host named its points.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Var(u32);

impl Var {
    /// Build a `Var` directly from its raw index.
    ///
    /// This is only meant for tests and for code that already holds a valid
    /// index obtained from a `VarTable`; it performs no validation.
    pub fn from_raw(index: u32) -> Var {
        Var(index)
    }

    /// Return the raw index backing this handle.
    pub fn to_raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Var({})", self.0)
    }
}

/// An interner mapping host-supplied names to [`Var`] handles.
///
/// `VarTable` owns the only authoritative mapping between a name and its
/// `Var`; a `ClusterSolver` holds exactly one `VarTable` for its entire
/// lifetime. Interning the same name twice always returns the same `Var`.
#[derive(Clone, Debug, Default)]
pub struct VarTable {
    names: Vec<String>,
    by_name: HashMap<String, Var>,
}

impl VarTable {
    /// Create an empty table.
    pub fn new() -> VarTable {
        VarTable { names: Vec::new(), by_name: HashMap::new() }
    }

    /// Intern `name`, returning its `Var`. If `name` has already been
    /// interned, the existing `Var` is returned instead of allocating a new
    /// one.
    pub fn intern(&mut self, name: impl Into<String>) -> Var {
        let name = name.into();
        if let Some(&v) = self.by_name.get(&name) {
            return v;
        }
        let v = Var(self.names.len() as u32);
        self.names.push(name.clone());
        self.by_name.insert(name, v);
        v
    }

    /// Intern the decimal representation of `index`.
    ///
    /// A convenience for hosts that name their points with plain integers
    /// rather than strings.
    pub fn intern_index(&mut self, index: usize) -> Var {
        self.intern(index.to_string())
    }

    /// Look up the `Var` already assigned to `name`, without interning it.
    pub fn get(&self, name: &str) -> Option<Var> {
        self.by_name.get(name).copied()
    }

    /// Return the name a `Var` was interned with.
    ///
    /// Panics if `var` was not produced by this table, which would indicate
    /// a handle crossing between two distinct `ClusterSolver` instances.
    pub fn name(&self, var: Var) -> &str {
        &self.names[var.0 as usize]
    }

    /// The number of distinct variables interned so far.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no variables have been interned yet.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_idempotent() {
        let mut table = VarTable::new();
        let a = table.intern("a");
        let a_again = table.intern("a");
        assert_eq!(a, a_again);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn distinct_names_get_distinct_vars() {
        let mut table = VarTable::new();
        let a = table.intern("a");
        let b = table.intern("b");
        assert_ne!(a, b);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn name_round_trips() {
        let mut table = VarTable::new();
        let a = table.intern("point-a");
        assert_eq!(table.name(a), "point-a");
    }

    #[test]
    fn intern_index_matches_intern_of_its_string() {
        let mut table = VarTable::new();
        let a = table.intern_index(3);
        let b = table.intern("3");
        assert_eq!(a, b);
    }

    #[test]
    fn get_does_not_intern() {
        let mut table = VarTable::new();
        assert_eq!(table.get("nope"), None);
        assert!(table.is_empty());
    }

    #[test]
    fn ordering_matches_insertion_order() {
        let mut table = VarTable::new();
        let a = table.intern("a");
        let b = table.intern("b");
        let c = table.intern("c");
        assert!(a < b);
        assert!(b < c);
    }
}
