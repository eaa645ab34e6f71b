//! The closed set of cluster variants the rewriting engine operates over:
//! rigids, hedgehogs, and balloons.

use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::var::Var;

/// A rigid sub-figure: a set of variables whose pairwise distances (and
/// hence relative placement, up to a rigid motion) are fully determined.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rigid {
    /// The variables this rigid fixes relative to one another.
    pub vars: BTreeSet<Var>,
}

impl Rigid {
    /// Build a rigid over the given variables.
    pub fn new(vars: impl IntoIterator<Item = Var>) -> Rigid {
        Rigid { vars: vars.into_iter().collect() }
    }

    /// A rigid over a single variable, the base case the search engine
    /// bottoms out at (a single point always trivially has a fixed,
    /// degenerate "shape").
    pub fn singleton(var: Var) -> Rigid {
        Rigid { vars: [var].into_iter().collect() }
    }
}

/// A hedgehog: one center variable with two or more spoke variables whose
/// angles *around the center* are fully determined, but whose distances
/// from the center are not.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hedgehog {
    /// The center variable.
    pub cvar: Var,
    /// The spoke variables, always disjoint from `cvar`.
    pub xvars: BTreeSet<Var>,
}

impl Hedgehog {
    /// Build a hedgehog, validating that `cvar` is not among `xvars` and
    /// that at least two spokes are given.
    pub fn new(cvar: Var, xvars: impl IntoIterator<Item = Var>) -> Result<Hedgehog> {
        let xvars: BTreeSet<Var> = xvars.into_iter().collect();
        if xvars.contains(&cvar) {
            return Err(Error::HedgehogCenterInSpokes { cvar });
        }
        if xvars.len() < 2 {
            return Err(Error::HedgehogTooFewSpokes { cvar, spoke_count: xvars.len() });
        }
        Ok(Hedgehog { cvar, xvars })
    }

    /// All variables this hedgehog touches, center included.
    pub fn all_vars(&self) -> impl Iterator<Item = Var> + '_ {
        std::iter::once(self.cvar).chain(self.xvars.iter().copied())
    }
}

/// A balloon: like a rigid, but only determined up to a similarity
/// transform (rotation, translation, *and* uniform scale) rather than a
/// rigid motion — i.e. its shape but not its size is fixed.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Balloon {
    /// The variables this balloon fixes the shape of.
    pub vars: BTreeSet<Var>,
}

impl Balloon {
    /// Build a balloon over the given variables.
    pub fn new(vars: impl IntoIterator<Item = Var>) -> Balloon {
        Balloon { vars: vars.into_iter().collect() }
    }
}

/// The closed sum of the three cluster kinds the rewriting engine rewrites
/// over. Every rule in `search` matches exhaustively on this enum; this
/// engine deliberately does not generalize to higher-dimensional or other
/// cluster variants.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Cluster {
    /// See [`Rigid`].
    Rigid(Rigid),
    /// See [`Hedgehog`].
    Hedgehog(Hedgehog),
    /// See [`Balloon`].
    Balloon(Balloon),
}

impl Cluster {
    /// All variables this cluster touches, regardless of variant.
    pub fn vars(&self) -> BTreeSet<Var> {
        match self {
            Cluster::Rigid(r) => r.vars.clone(),
            Cluster::Hedgehog(h) => h.all_vars().collect(),
            Cluster::Balloon(b) => b.vars.clone(),
        }
    }

    /// The number of variables this cluster touches.
    pub fn len(&self) -> usize {
        match self {
            Cluster::Rigid(r) => r.vars.len(),
            Cluster::Hedgehog(h) => h.xvars.len() + 1,
            Cluster::Balloon(b) => b.vars.len(),
        }
    }

    /// Whether this cluster is a [`Rigid`] over exactly one variable — the
    /// base case `ClusterSolver::add` starts any new point from.
    pub fn is_point(&self) -> bool {
        matches!(self, Cluster::Rigid(r) if r.vars.len() == 1)
    }

    /// Project this cluster's variant as a `Rigid`, if it is one.
    pub fn as_rigid(&self) -> Option<&Rigid> {
        match self {
            Cluster::Rigid(r) => Some(r),
            _ => None,
        }
    }

    /// Project this cluster's variant as a `Hedgehog`, if it is one.
    pub fn as_hedgehog(&self) -> Option<&Hedgehog> {
        match self {
            Cluster::Hedgehog(h) => Some(h),
            _ => None,
        }
    }

    /// Project this cluster's variant as a `Balloon`, if it is one.
    pub fn as_balloon(&self) -> Option<&Balloon> {
        match self {
            Cluster::Balloon(b) => Some(b),
            _ => None,
        }
    }
}

impl From<Rigid> for Cluster {
    fn from(r: Rigid) -> Cluster {
        Cluster::Rigid(r)
    }
}

impl From<Hedgehog> for Cluster {
    fn from(h: Hedgehog) -> Cluster {
        Cluster::Hedgehog(h)
    }
}

impl From<Balloon> for Cluster {
    fn from(b: Balloon) -> Cluster {
        Cluster::Balloon(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(i: u32) -> Var {
        Var::from_raw(i)
    }

    #[test]
    fn hedgehog_rejects_center_among_spokes() {
        let err = Hedgehog::new(v(0), [v(0), v(1)]).unwrap_err();
        assert_eq!(err, Error::HedgehogCenterInSpokes { cvar: v(0) });
    }

    #[test]
    fn hedgehog_rejects_too_few_spokes() {
        let err = Hedgehog::new(v(0), [v(1)]).unwrap_err();
        assert_eq!(err, Error::HedgehogTooFewSpokes { cvar: v(0), spoke_count: 1 });
    }

    #[test]
    fn hedgehog_accepts_two_or_more_spokes() {
        assert!(Hedgehog::new(v(0), [v(1), v(2)]).is_ok());
        assert!(Hedgehog::new(v(0), [v(1), v(2), v(3)]).is_ok());
    }

    #[test]
    fn equal_clusters_compare_equal_regardless_of_insertion_order() {
        let a = Cluster::Rigid(Rigid::new([v(2), v(1), v(0)]));
        let b = Cluster::Rigid(Rigid::new([v(0), v(1), v(2)]));
        assert_eq!(a, b);
    }

    #[test]
    fn different_variants_over_same_vars_are_not_equal() {
        let rigid = Cluster::Rigid(Rigid::new([v(0), v(1)]));
        let balloon = Cluster::Balloon(Balloon::new([v(0), v(1)]));
        assert_ne!(rigid, balloon);
    }

    #[test]
    fn is_point_detects_singleton_rigids() {
        assert!(Cluster::Rigid(Rigid::singleton(v(0))).is_point());
        assert!(!Cluster::Rigid(Rigid::new([v(0), v(1)])).is_point());
    }

    #[test]
    fn vars_covers_hedgehog_center_and_spokes() {
        let h = Hedgehog::new(v(0), [v(1), v(2)]).unwrap();
        let cluster = Cluster::Hedgehog(h);
        let vars = cluster.vars();
        assert_eq!(vars.len(), 3);
        assert!(vars.contains(&v(0)));
    }
}
