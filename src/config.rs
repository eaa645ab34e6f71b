//! Numeric configurations: an assignment of 2D coordinates to a set of
//! variables, and the rigid/similarity alignment algebra methods use to
//! combine them.

use std::collections::BTreeMap;

use crate::geom::Vec2;
use crate::var::Var;

/// A numeric solution for a set of point variables.
///
/// A `Configuration` is the runtime counterpart of a [`crate::cluster::Cluster`]:
/// where a cluster says *which* variables are constrained together, a
/// configuration gives one particular numeric placement satisfying those
/// constraints. The `underconstrained` flag is set by
/// [`crate::method::solve_ada`]'s degenerate, colinear-rays branch: it means
/// this configuration is a valid witness, but the family of valid witnesses
/// is larger than a single point/rotation would suggest.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Configuration {
    points: BTreeMap<Var, Vec2>,
    /// Whether this configuration was produced by an under-constrained
    /// numeric solve (see `solve_ada`'s degenerate branch).
    pub underconstrained: bool,
}

impl Configuration {
    /// An empty configuration.
    pub fn new() -> Configuration {
        Configuration { points: BTreeMap::new(), underconstrained: false }
    }

    /// Build a configuration directly from a variable-to-point map.
    pub fn from_points(points: BTreeMap<Var, Vec2>) -> Configuration {
        Configuration { points, underconstrained: false }
    }

    /// A single-variable configuration, used to seed a root rigid.
    pub fn singleton(var: Var, p: Vec2) -> Configuration {
        let mut points = BTreeMap::new();
        points.insert(var, p);
        Configuration { points, underconstrained: false }
    }

    /// The coordinates assigned to `var`, if any.
    pub fn get(&self, var: Var) -> Option<Vec2> {
        self.points.get(&var).copied()
    }

    /// Insert or overwrite the coordinates for `var`.
    pub fn set(&mut self, var: Var, p: Vec2) {
        self.points.insert(var, p);
    }

    /// The variables this configuration assigns coordinates to.
    pub fn vars(&self) -> impl Iterator<Item = Var> + '_ {
        self.points.keys().copied()
    }

    /// The number of variables assigned.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether this configuration assigns no variables.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// A deep copy of this configuration (kept as a named method rather
    /// than relying only on `Clone`, since call sites read more clearly
    /// this way next to `merge2d`/`select`).
    pub fn copy(&self) -> Configuration {
        self.clone()
    }

    /// Restrict this configuration to just the given variables.
    ///
    /// Panics if any variable in `vars` is not assigned by this
    /// configuration; callers are expected to only select from variables
    /// known to be present.
    pub fn select<'a>(&self, vars: impl IntoIterator<Item = &'a Var>) -> Configuration {
        let mut out = Configuration::new();
        for &v in vars {
            let p = self.points[&v];
            out.points.insert(v, p);
        }
        out
    }

    /// Align `other` onto `self` by a rigid motion (rotation + translation,
    /// no scaling) fixed by two variables the two configurations share, and
    /// merge the result into a configuration over the union of both
    /// variable sets.
    ///
    /// It picks the first two shared variables (in `Var` order, for
    /// determinism), solves for the rotation/translation that carries
    /// `other`'s placement of those two points onto `self`'s placement of
    /// them, and applies that transform to every other point `other`
    /// assigns. `self`'s own points are carried over unchanged — the frame
    /// is always fixed by `self`.
    ///
    /// Returns `None` if `self` and `other` do not share at least two
    /// distinct variables.
    pub fn merge2d(&self, other: &Configuration) -> Option<Configuration> {
        let mut shared = self.points.keys().filter(|v| other.points.contains_key(v));
        let v1 = *shared.next()?;
        let v2 = *shared.find(|&&v| v != v1)?;
        self.merge2d_with_anchor(other, v1, v2)
    }

    /// As [`merge2d`][Self::merge2d], but with the two shared anchor
    /// variables chosen explicitly rather than taken from iteration order.
    ///
    /// Several rules in `search`/`method` need a *specific* anchor pair
    /// (e.g. `MergeHogs` anchors on a hedgehog's center plus one shared
    /// spoke) rather than whatever two variables happen to come first.
    pub fn merge2d_with_anchor(
        &self,
        other: &Configuration,
        anchor1: Var,
        anchor2: Var,
    ) -> Option<Configuration> {
        let self1 = self.get(anchor1)?;
        let self2 = self.get(anchor2)?;
        let other1 = other.get(anchor1)?;
        let other2 = other.get(anchor2)?;

        let self_diff = self2 - self1;
        let other_diff = other2 - other1;
        if other_diff.norm() < crate::geom::EPSILON {
            return None;
        }
        // Unit rotation that carries other_diff onto self_diff, no scale.
        let rot = self_diff.cdiv(other_diff) / self_diff.norm() * other_diff.norm();
        let unit_rot = rot / rot.norm();

        let mut out = self.clone();
        out.underconstrained = self.underconstrained || other.underconstrained;
        for (&v, &p) in &other.points {
            let transformed = unit_rot.cmul(p - other1) + self1;
            out.points.entry(v).or_insert(transformed);
        }
        Some(out)
    }

    /// As [`merge2d`][Self::merge2d], but allowing a uniform scale factor in
    /// addition to rotation and translation — the similarity-transform merge
    /// balloon clusters need, since their internal shape is fixed only up
    /// to scale.
    ///
    /// `anchor` optionally pins the two shared variables used to solve for
    /// the transform; if `None`, the first two shared variables (in `Var`
    /// order) are used, exactly as in [`merge2d`][Self::merge2d].
    pub fn merge_scale_2d(
        &self,
        other: &Configuration,
        anchor: Option<(Var, Var)>,
    ) -> Option<Configuration> {
        let (anchor1, anchor2) = match anchor {
            Some(pair) => pair,
            None => {
                let mut shared = self.points.keys().filter(|v| other.points.contains_key(v));
                let v1 = *shared.next()?;
                let v2 = *shared.find(|&&v| v != v1)?;
                (v1, v2)
            }
        };

        let self1 = self.get(anchor1)?;
        let self2 = self.get(anchor2)?;
        let other1 = other.get(anchor1)?;
        let other2 = other.get(anchor2)?;

        let other_diff = other2 - other1;
        if other_diff.norm() < crate::geom::EPSILON {
            return None;
        }
        let self_diff = self2 - self1;
        // Complex division gives us rotation and scale in one step.
        let transform = self_diff.cdiv(other_diff);

        let mut out = self.clone();
        out.underconstrained = self.underconstrained || other.underconstrained;
        for (&v, &p) in &other.points {
            let transformed = transform.cmul(p - other1) + self1;
            out.points.entry(v).or_insert(transformed);
        }
        Some(out)
    }
}
