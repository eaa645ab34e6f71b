//! The method catalog: one variant per rewrite rule this engine knows, each
//! carrying the symbolic role-variables the rule needs (resolved once, at
//! construction time, from the clusters being merged) plus a pure numeric
//! executor and, where the rule solves an ambiguous (mirror) system, the
//! [`crate::select`] constraints that disambiguate it.
//!
//! Every constructor here validates its rule's own applicability: the
//! pairwise/triple shared-variable counts are checked, `overconstrained` is
//! set when a merge is handed more information than strictly necessary, and
//! a [`crate::error::Error::UnderConstrainedMerge`] (or, for a cvar-membership
//! mismatch, [`crate::error::Error::StructuralPrecondition`]) is returned
//! when the rule's own precondition does not hold. `search` is expected to
//! only ever call these constructors after having already checked the
//! conditions that make a rule applicable, so a `Result::Err` here signals a
//! bug in `search`'s matching, not a bad problem instance.

use std::collections::BTreeSet;

use crate::cluster::Cluster;
use crate::config::Configuration;
use crate::error::{Error, Result};
use crate::geom::{self, Vec2};
use crate::select::{NotAcute, NotClockwise, NotCounterClockwise, NotObtuse, SelectionConstraint};
use crate::trace;
use crate::var::Var;

/// The symbolic description of one rewrite rule, closed over the exact
/// variant set this engine's rewriter supports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MethodKind {
    /// A singleton-rigid joins any other cluster (Merge1C).
    Merge1C,
    /// Two rigids share >=2 points (Merge2C), structurally overconstrained.
    Merge2C,
    /// Three rigids pairwise sharing one point each, solved as a triangle
    /// (Merge3C).
    Merge3C {
        /// The point shared by inputs 1 and 2 only.
        v1: Var,
        /// The point shared by inputs 1 and 3 only.
        v2: Var,
        /// The point shared by inputs 2 and 3 only.
        v3: Var,
    },
    /// A hedgehog fully contained in a rigid is absorbed by it (Absorb-hog).
    MergeCH,
    /// A hedgehog fully contained in a balloon is absorbed by it (the
    /// balloon analogue of `MergeCH`).
    MergeBH,
    /// Two rigids both containing a hedgehog's center, each contributing one
    /// spoke (Cluster-Hog-Cluster).
    MergeCHC {
        /// The spoke shared with the first cluster.
        v1: Var,
        /// The hedgehog's center.
        v2: Var,
        /// The spoke shared with the second cluster.
        v3: Var,
    },
    /// Two rigids sharing one point, with a hedgehog centered in only one of
    /// them providing an angle at that shared point (Cluster-Cluster-Hog).
    MergeCCH {
        /// The hedgehog's center, which must lie in `c1` only.
        v1: Var,
        /// The point shared by `c1` and `c2`.
        v2: Var,
        /// The remaining point, supplied by `c2`.
        v3: Var,
    },
    /// Two hedgehogs with distinct centers, sharing a spoke, determine a
    /// triangle up to similarity (BalloonFromHogs).
    BalloonFromHogs {
        /// The first hedgehog's center.
        v1: Var,
        /// The second hedgehog's center.
        v2: Var,
        /// The spoke shared by both hedgehogs.
        v3: Var,
    },
    /// Two balloons sharing >=2 points are merged by similarity transform.
    BalloonMerge,
    /// A balloon and a rigid sharing >=2 points are merged; the rigid fixes
    /// scale. Input order is always `[rigid, balloon]`.
    BalloonRigidMerge,
    /// Two hedgehogs at the same center are unioned into one.
    MergeHogs {
        /// The shared center.
        cvar: Var,
        /// One spoke shared by both inputs, used to anchor the similarity
        /// merge of their configurations.
        shared: Var,
    },
    /// Synthesize a hedgehog view of a rigid.
    Rigid2Hog,
    /// Synthesize a hedgehog view of a balloon.
    Balloon2Hog,
    /// Restrict a hedgehog to a subset of its spokes.
    SubHog,
}

/// A method: the symbolic rule plus its structural flags.
///
/// `consistent` is always `true` here since this engine never constructs a
/// method it has already found to be self-contradictory (an inconsistent
/// merge would be a structural precondition failure, reported as an `Err`
/// instead).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Method {
    /// Which rewrite rule this is, and the role-variables it resolved.
    pub kind: MethodKind,
    /// Whether the inputs jointly provided more constraints than the output
    /// strictly needed.
    pub overconstrained: bool,
    /// Whether the inputs are known to be mutually consistent. Always `true`
    /// for methods this crate constructs.
    pub consistent: bool,
}

/// Bumps `*overconstrained` and returns `Ok(())` when `shared.len() >= min`,
/// otherwise fails with [`Error::UnderConstrainedMerge`]. Every merge
/// constructor runs this once per shared-variable-set it depends on.
fn require_shared(
    shared: &BTreeSet<Var>,
    min: usize,
    overconstrained: &mut bool,
    detail: &'static str,
) -> Result<()> {
    if shared.len() < min {
        return Err(Error::UnderConstrainedMerge { detail });
    }
    if shared.len() > min {
        *overconstrained = true;
    }
    Ok(())
}

fn first_of(set: &BTreeSet<Var>, detail: &'static str) -> Result<Var> {
    set.iter().next().copied().ok_or(Error::UnderConstrainedMerge { detail })
}

impl Method {
    /// A method used only by `graph`'s unit tests, which need *a* `Method`
    /// value without caring which rule it names.
    #[cfg(test)]
    pub fn test_stub() -> Method {
        Method { kind: MethodKind::Merge2C, overconstrained: true, consistent: true }
    }

    /// Point + cluster merge (Merge1C). Never overconstrained: a single
    /// point contributes no redundant information.
    pub fn merge1c() -> Method {
        Method { kind: MethodKind::Merge1C, overconstrained: false, consistent: true }
    }

    /// Two-cluster merge (Merge2C). Always overconstrained: sharing two
    /// points between two rigids is strictly more than the merge needs.
    pub fn merge2c() -> Method {
        Method { kind: MethodKind::Merge2C, overconstrained: true, consistent: true }
    }

    /// Absorb a hedgehog fully contained in a rigid. Always overconstrained.
    pub fn merge_ch() -> Method {
        Method { kind: MethodKind::MergeCH, overconstrained: true, consistent: true }
    }

    /// Absorb a hedgehog fully contained in a balloon. Always
    /// overconstrained.
    pub fn merge_bh() -> Method {
        Method { kind: MethodKind::MergeBH, overconstrained: true, consistent: true }
    }

    /// Synthesize a hedgehog from a rigid (`Rigid2Hog`).
    pub fn rigid2hog() -> Method {
        Method { kind: MethodKind::Rigid2Hog, overconstrained: false, consistent: true }
    }

    /// Synthesize a hedgehog from a balloon (`Balloon2Hog`).
    pub fn balloon2hog() -> Method {
        Method { kind: MethodKind::Balloon2Hog, overconstrained: false, consistent: true }
    }

    /// Restrict a hedgehog to a subset of its spokes (`SubHog`).
    pub fn sub_hog() -> Method {
        Method { kind: MethodKind::SubHog, overconstrained: false, consistent: true }
    }

    /// Triangle merge of three rigids (Merge3C). `c1`/`c2`/`c3` are the
    /// variable sets of the three input rigids.
    pub fn merge3c(c1: &BTreeSet<Var>, c2: &BTreeSet<Var>, c3: &BTreeSet<Var>) -> Result<Method> {
        let shared12: BTreeSet<Var> = c1.intersection(c2).copied().collect();
        let shared13: BTreeSet<Var> = c1.intersection(c3).copied().collect();
        let shared23: BTreeSet<Var> = c2.intersection(c3).copied().collect();
        let shared1: BTreeSet<Var> = shared12.union(&shared13).copied().collect();
        let shared2: BTreeSet<Var> = shared12.union(&shared23).copied().collect();
        let shared3: BTreeSet<Var> = shared13.union(&shared23).copied().collect();

        let mut overconstrained = false;
        require_shared(&shared12, 1, &mut overconstrained, "c1 and c2 share no point")?;
        require_shared(&shared13, 1, &mut overconstrained, "c1 and c3 share no point")?;
        require_shared(&shared23, 1, &mut overconstrained, "c2 and c3 share no point")?;
        require_shared(&shared1, 2, &mut overconstrained, "c1 under-constrained by c2/c3")?;
        require_shared(&shared2, 2, &mut overconstrained, "c2 under-constrained by c1/c3")?;
        require_shared(&shared3, 2, &mut overconstrained, "c3 under-constrained by c1/c2")?;

        // The vertex shared by exactly (c1,c2), not c3, and so on.
        let v1_set: BTreeSet<Var> = shared12.iter().filter(|v| !c3.contains(v)).copied().collect();
        let v2_set: BTreeSet<Var> = shared13.iter().filter(|v| !c2.contains(v)).copied().collect();
        let v3_set: BTreeSet<Var> = shared23.iter().filter(|v| !c1.contains(v)).copied().collect();
        let v1 = first_of(&v1_set, "no vertex unique to c1 and c2")?;
        let v2 = first_of(&v2_set, "no vertex unique to c1 and c3")?;
        let v3 = first_of(&v3_set, "no vertex unique to c2 and c3")?;
        trace::trace!("merge3c v1={:?} v2={:?} v3={:?} overconstrained={}", v1, v2, v3, overconstrained);

        Ok(Method { kind: MethodKind::Merge3C { v1, v2, v3 }, overconstrained, consistent: true })
    }

    /// Cluster-Hog-Cluster merge (MergeCHC): `c1`/`c2` are rigid variable
    /// sets both containing `hog_cvar`, `hog_xvars` the hog's spokes.
    pub fn merge_chc(
        c1: &BTreeSet<Var>,
        hog_cvar: Var,
        hog_xvars: &BTreeSet<Var>,
        c2: &BTreeSet<Var>,
    ) -> Result<Method> {
        if !(c1.contains(&hog_cvar) && c2.contains(&hog_cvar)) {
            return Err(Error::StructuralPrecondition { detail: "hog center not in both c1 and c2" });
        }
        let shared12: BTreeSet<Var> = c1.intersection(c2).copied().collect();
        let shared1h: BTreeSet<Var> = c1.intersection(hog_xvars).copied().collect();
        let shared2h: BTreeSet<Var> = c2.intersection(hog_xvars).copied().collect();
        let shared1: BTreeSet<Var> = shared12.union(&shared1h).copied().collect();
        let shared2: BTreeSet<Var> = shared12.union(&shared2h).copied().collect();
        let sharedh: BTreeSet<Var> = shared1h.union(&shared2h).copied().collect();

        let mut overconstrained = false;
        require_shared(&shared12, 1, &mut overconstrained, "c1 and c2 share no point")?;
        require_shared(&shared1h, 1, &mut overconstrained, "c1 and hog share no spoke")?;
        require_shared(&shared2h, 1, &mut overconstrained, "c2 and hog share no spoke")?;
        require_shared(&shared1, 2, &mut overconstrained, "c1 under-constrained")?;
        require_shared(&shared2, 2, &mut overconstrained, "c2 under-constrained")?;
        require_shared(&sharedh, 2, &mut overconstrained, "hog under-constrained")?;

        let v1 = first_of(&shared1h, "no spoke shared with c1")?;
        let v2 = hog_cvar;
        let v3 = first_of(&shared2h, "no spoke shared with c2")?;
        trace::trace!("merge_chc v1={:?} v2={:?} v3={:?} overconstrained={}", v1, v2, v3, overconstrained);

        Ok(Method { kind: MethodKind::MergeCHC { v1, v2, v3 }, overconstrained, consistent: true })
    }

    /// Cluster-Cluster-Hog merge (MergeCCH): `c1` must contain the hog's
    /// center, `c2` must not.
    pub fn merge_cch(c1: &BTreeSet<Var>, c2: &BTreeSet<Var>, hog_cvar: Var, hog_xvars: &BTreeSet<Var>) -> Result<Method> {
        if !c1.contains(&hog_cvar) {
            return Err(Error::StructuralPrecondition { detail: "hog center not in c1" });
        }
        if c2.contains(&hog_cvar) {
            return Err(Error::StructuralPrecondition { detail: "hog center must not be in c2" });
        }
        let shared12: BTreeSet<Var> = c1.intersection(c2).copied().collect();
        let shared1h: BTreeSet<Var> = c1.intersection(hog_xvars).copied().collect();
        let shared2h: BTreeSet<Var> = c2.intersection(hog_xvars).copied().collect();
        let shared1: BTreeSet<Var> = shared12.union(&shared1h).copied().collect();
        let shared2: BTreeSet<Var> = shared12.union(&shared2h).copied().collect();
        let sharedh: BTreeSet<Var> = shared1h.union(&shared2h).copied().collect();

        let mut overconstrained = false;
        require_shared(&shared12, 1, &mut overconstrained, "c1 and c2 share no point")?;
        require_shared(&shared1h, 1, &mut overconstrained, "c1 and hog share no spoke")?;
        require_shared(&shared2h, 1, &mut overconstrained, "c2 and hog share no spoke")?;
        require_shared(&shared1, 1, &mut overconstrained, "c1 under-constrained")?;
        require_shared(&shared2, 2, &mut overconstrained, "c2 under-constrained")?;
        require_shared(&sharedh, 2, &mut overconstrained, "hog under-constrained")?;

        let v1 = hog_cvar;
        let candidates2: BTreeSet<Var> =
            hog_xvars.intersection(c1).copied().filter(|v| c2.contains(v)).collect();
        let v2 = first_of(&candidates2, "no spoke shared by c1, c2 and the hog")?;
        let candidates3: BTreeSet<Var> =
            hog_xvars.intersection(c2).copied().filter(|v| *v != v1 && *v != v2).collect();
        let v3 = first_of(&candidates3, "no remaining spoke supplied by c2")?;
        trace::trace!("merge_cch v1={:?} v2={:?} v3={:?} overconstrained={}", v1, v2, v3, overconstrained);

        Ok(Method { kind: MethodKind::MergeCCH { v1, v2, v3 }, overconstrained, consistent: true })
    }

    /// Derive a balloon from two hedgehogs sharing a spoke (BalloonFromHogs).
    pub fn balloon_from_hogs(
        hog1_cvar: Var,
        hog1_xvars: &BTreeSet<Var>,
        hog2_cvar: Var,
        hog2_xvars: &BTreeSet<Var>,
    ) -> Result<Method> {
        if hog1_cvar == hog2_cvar {
            return Err(Error::StructuralPrecondition { detail: "both hedgehogs share one center" });
        }
        let shared: BTreeSet<Var> = hog1_xvars
            .intersection(hog2_xvars)
            .copied()
            .filter(|v| *v != hog1_cvar && *v != hog2_cvar)
            .collect();
        let v3 = first_of(&shared, "hedgehogs share no spoke")?;
        Ok(Method {
            kind: MethodKind::BalloonFromHogs { v1: hog1_cvar, v2: hog2_cvar, v3 },
            overconstrained: false,
            consistent: true,
        })
    }

    /// Merge two balloons sharing >=2 points.
    pub fn balloon_merge(vars1: &BTreeSet<Var>, vars2: &BTreeSet<Var>) -> Result<Method> {
        let shared: BTreeSet<Var> = vars1.intersection(vars2).copied().collect();
        let mut overconstrained = false;
        require_shared(&shared, 2, &mut overconstrained, "balloons share fewer than 2 points")?;
        Ok(Method { kind: MethodKind::BalloonMerge, overconstrained, consistent: true })
    }

    /// Merge a rigid and a balloon sharing >=2 points; the rigid fixes
    /// scale.
    pub fn balloon_rigid_merge(rigid_vars: &BTreeSet<Var>, balloon_vars: &BTreeSet<Var>) -> Result<Method> {
        let shared: BTreeSet<Var> = rigid_vars.intersection(balloon_vars).copied().collect();
        let mut overconstrained = false;
        require_shared(&shared, 2, &mut overconstrained, "rigid and balloon share fewer than 2 points")?;
        Ok(Method { kind: MethodKind::BalloonRigidMerge, overconstrained, consistent: true })
    }

    /// Union two hedgehogs at the same center into one.
    pub fn merge_hogs(cvar1: Var, xvars1: &BTreeSet<Var>, cvar2: Var, xvars2: &BTreeSet<Var>) -> Result<Method> {
        if cvar1 != cvar2 {
            return Err(Error::StructuralPrecondition { detail: "hedgehogs have different centers" });
        }
        let shared: BTreeSet<Var> = xvars1.intersection(xvars2).copied().collect();
        let mut overconstrained = false;
        require_shared(&shared, 1, &mut overconstrained, "hedgehogs share no spoke")?;
        let spoke = first_of(&shared, "hedgehogs share no spoke")?;
        Ok(Method { kind: MethodKind::MergeHogs { cvar: cvar1, shared: spoke }, overconstrained, consistent: true })
    }

    /// The prototype/selection constraints used to disambiguate this
    /// method's candidate outputs, for the two rules whose numeric solver
    /// can return a mirror pair (`Merge3C` and `MergeCCH`). Every other
    /// method returns an empty list: either it is single-valued, or (as with
    /// `BalloonFromHogs`) the mirror ambiguity is left for the host to
    /// resolve.
    pub fn prototype_constraints(&self) -> Vec<Box<dyn SelectionConstraint>> {
        match self.kind {
            MethodKind::Merge3C { v1, v2, v3 } => vec![
                Box::new(NotCounterClockwise { a: v1, b: v2, c: v3 }),
                Box::new(NotClockwise { a: v1, b: v2, c: v3 }),
            ],
            MethodKind::MergeCCH { v1, v2, v3 } => {
                vec![Box::new(NotAcute { a: v2, b: v3, c: v1 }), Box::new(NotObtuse { a: v2, b: v3, c: v1 })]
            }
            _ => Vec::new(),
        }
    }

    /// Execute this method's numeric solver over `inputs` (configurations
    /// aligned, in order, with the method's input clusters as recorded by
    /// [`crate::graph::ClusterGraph`]), returning the candidate output
    /// configurations. `outputs` gives the symbolic output cluster(s), used
    /// only by the derive methods (`Rigid2Hog`/`Balloon2Hog`/`SubHog`) to
    /// know which variables to select.
    ///
    /// Never panics on well-formed input: a method whose inputs don't carry
    /// the variables its role-vars name returns an empty result rather than
    /// panicking, the same way a degenerate or missing numeric input yields
    /// zero candidate solutions instead of an error.
    pub fn execute(&self, inputs: &[Configuration], outputs: &[Cluster]) -> Vec<Configuration> {
        match self.kind {
            MethodKind::Merge1C => {
                trace::trace!("Merge1C::execute");
                inputs.iter().max_by_key(|c| c.len()).map(|c| vec![c.copy()]).unwrap_or_default()
            }
            MethodKind::Merge2C => {
                trace::trace!("Merge2C::execute");
                self.merge2(inputs)
            }
            MethodKind::MergeCH | MethodKind::MergeBH => {
                trace::trace!("MergeCH/MergeBH::execute");
                inputs.first().map(|c| vec![c.copy()]).unwrap_or_default()
            }
            MethodKind::Merge3C { v1, v2, v3 } => self.execute_merge3c(inputs, v1, v2, v3),
            MethodKind::MergeCHC { v1, v2, v3 } => self.execute_merge_chc(inputs, v1, v2, v3),
            MethodKind::MergeCCH { v1, v2, v3 } => self.execute_merge_cch(inputs, v1, v2, v3),
            MethodKind::BalloonFromHogs { v1, v2, v3 } => self.execute_balloon_from_hogs(inputs, v1, v2, v3),
            MethodKind::BalloonMerge => {
                trace::trace!("BalloonMerge::execute");
                match (inputs.first(), inputs.get(1)) {
                    (Some(c1), Some(c2)) => c1.merge_scale_2d(c2, None).into_iter().collect(),
                    _ => Vec::new(),
                }
            }
            MethodKind::BalloonRigidMerge => {
                trace::trace!("BalloonRigidMerge::execute");
                // Fixed input order convention (`search` always supplies
                // [rigid, balloon]): the rigid anchors scale.
                match (inputs.first(), inputs.get(1)) {
                    (Some(rigid), Some(balloon)) => rigid.merge_scale_2d(balloon, None).into_iter().collect(),
                    _ => Vec::new(),
                }
            }
            MethodKind::MergeHogs { cvar, shared } => {
                trace::trace!("MergeHogs::execute cvar={:?} shared={:?}", cvar, shared);
                match (inputs.first(), inputs.get(1)) {
                    (Some(c1), Some(c2)) => c1.merge_scale_2d(c2, Some((cvar, shared))).into_iter().collect(),
                    _ => Vec::new(),
                }
            }
            MethodKind::Rigid2Hog | MethodKind::Balloon2Hog | MethodKind::SubHog => {
                trace::trace!("derive::execute");
                match (inputs.first(), outputs.first()) {
                    (Some(conf), Some(out)) => {
                        let vars = out.vars();
                        vec![conf.select(vars.iter())]
                    }
                    _ => Vec::new(),
                }
            }
        }
    }

    fn merge2(&self, inputs: &[Configuration]) -> Vec<Configuration> {
        match (inputs.first(), inputs.get(1)) {
            (Some(c1), Some(c2)) => c1.merge2d(c2).into_iter().collect(),
            _ => Vec::new(),
        }
    }

    fn execute_merge3c(&self, inputs: &[Configuration], v1: Var, v2: Var, v3: Var) -> Vec<Configuration> {
        let (c1, c2, c3) = match (inputs.first(), inputs.get(1), inputs.get(2)) {
            (Some(a), Some(b), Some(c)) => (a, b, c),
            _ => return Vec::new(),
        };
        let (p11, p21) = match (c1.get(v1), c1.get(v2)) {
            (Some(a), Some(b)) => (a, b),
            _ => return Vec::new(),
        };
        let d12 = geom::distance_2p(p11, p21);
        let (p23, p33) = match (c3.get(v2), c3.get(v3)) {
            (Some(a), Some(b)) => (a, b),
            _ => return Vec::new(),
        };
        let d23 = geom::distance_2p(p23, p33);
        let (p32, p12) = match (c2.get(v3), c2.get(v1)) {
            (Some(a), Some(b)) => (a, b),
            _ => return Vec::new(),
        };
        let d31 = geom::distance_2p(p32, p12);

        solve_ddd(v1, v2, v3, d12, d23, d31)
            .into_iter()
            .filter_map(|s| c1.merge2d(&s).and_then(|m| m.merge2d(c2)).and_then(|m| m.merge2d(c3)))
            .collect()
    }

    fn execute_merge_chc(&self, inputs: &[Configuration], v1: Var, v2: Var, v3: Var) -> Vec<Configuration> {
        let (c1, hog, c2) = match (inputs.first(), inputs.get(1), inputs.get(2)) {
            (Some(a), Some(b), Some(c)) => (a, b, c),
            _ => return Vec::new(),
        };
        let (p1h, p2h, p3h) = match (hog.get(v1), hog.get(v2), hog.get(v3)) {
            (Some(a), Some(b), Some(c)) => (a, b, c),
            _ => return Vec::new(),
        };
        let a123 = geom::angle_3p(p1h, p2h, p3h);
        let d12 = match (c1.get(v1), c1.get(v2)) {
            (Some(a), Some(b)) => geom::distance_2p(a, b),
            _ => return Vec::new(),
        };
        let d23 = match (c2.get(v3), c2.get(v2)) {
            (Some(a), Some(b)) => geom::distance_2p(a, b),
            _ => return Vec::new(),
        };
        solve_dad(v1, v2, v3, d12, a123, d23)
            .into_iter()
            .filter_map(|s| c1.merge2d(&s).and_then(|m| m.merge2d(c2)))
            .collect()
    }

    fn execute_merge_cch(&self, inputs: &[Configuration], v1: Var, v2: Var, v3: Var) -> Vec<Configuration> {
        let (c1, c2) = match (inputs.first(), inputs.get(1)) {
            (Some(a), Some(b)) => (a, b),
            _ => return Vec::new(),
        };
        let hog = match inputs.get(2) {
            Some(h) => h,
            None => return Vec::new(),
        };
        let (p3h, p1h, p2h) = match (hog.get(v3), hog.get(v1), hog.get(v2)) {
            (Some(a), Some(b), Some(c)) => (a, b, c),
            _ => return Vec::new(),
        };
        let a312 = geom::angle_3p(p3h, p1h, p2h);
        let d12 = match (c1.get(v1), c1.get(v2)) {
            (Some(a), Some(b)) => geom::distance_2p(a, b),
            _ => return Vec::new(),
        };
        let d23 = match (c2.get(v2), c2.get(v3)) {
            (Some(a), Some(b)) => geom::distance_2p(a, b),
            _ => return Vec::new(),
        };
        solve_add(v1, v2, v3, a312, d12, d23)
            .into_iter()
            .filter_map(|s| c1.merge2d(&s).and_then(|m| m.merge2d(c2)))
            .collect()
    }

    fn execute_balloon_from_hogs(&self, inputs: &[Configuration], v1: Var, v2: Var, v3: Var) -> Vec<Configuration> {
        let (h1, h2) = match (inputs.first(), inputs.get(1)) {
            (Some(a), Some(b)) => (a, b),
            _ => return Vec::new(),
        };
        let (p31, p11, p21) = match (h1.get(v3), h1.get(v1), h1.get(v2)) {
            (Some(a), Some(b), Some(c)) => (a, b, c),
            _ => return Vec::new(),
        };
        let a312 = geom::angle_3p(p31, p11, p21);
        let (p12, p22, p32) = match (h2.get(v1), h2.get(v2), h2.get(v3)) {
            (Some(a), Some(b), Some(c)) => (a, b, c),
            _ => return Vec::new(),
        };
        let a123 = geom::angle_3p(p12, p22, p32);
        solve_ada(v1, v2, v3, a312, 1.0, a123)
    }
}

/// Triangulate `v3` from two known distances `d23`/`d31` given `v1` at the
/// origin and `v2` on the positive x-axis at distance `d12`. Up to two
/// mirror solutions.
pub fn solve_ddd(v1: Var, v2: Var, v3: Var, d12: f64, d23: f64, d31: f64) -> Vec<Configuration> {
    trace::trace!("solve_ddd {:?} {:?} {:?} {} {} {}", v1, v2, v3, d12, d23, d31);
    let p1 = Vec2::new(0.0, 0.0);
    let p2 = Vec2::new(d12, 0.0);
    geom::cc_int(p1, d31, p2, d23)
        .into_iter()
        .map(|p3| {
            let mut c = Configuration::new();
            c.set(v1, p1);
            c.set(v2, p2);
            c.set(v3, p3);
            c
        })
        .collect()
}

/// Place `v3` by polar offset from `v2`, given the angle at `v2` between
/// `v1` and `v3` and the two distances. Always exactly one solution.
pub fn solve_dad(v1: Var, v2: Var, v3: Var, d12: f64, a123: f64, d23: f64) -> Vec<Configuration> {
    trace::trace!("solve_dad {:?} {:?} {:?} {} {} {}", v1, v2, v3, d12, a123, d23);
    let p2 = Vec2::new(0.0, 0.0);
    let p1 = Vec2::new(d12, 0.0);
    let p3 = Vec2::new(d23 * a123.cos(), d23 * a123.sin());
    let mut c = Configuration::new();
    c.set(v1, p1);
    c.set(v2, p2);
    c.set(v3, p3);
    vec![c]
}

/// Place `c` by circle/ray intersection given the angle at `a` between `c`
/// and `b`, and the two distances. Zero, one, or two solutions.
pub fn solve_add(a: Var, b: Var, c: Var, a_cab: f64, d_ab: f64, d_bc: f64) -> Vec<Configuration> {
    trace::trace!("solve_add {:?} {:?} {:?} {} {} {}", a, b, c, a_cab, d_ab, d_bc);
    let p_a = Vec2::new(0.0, 0.0);
    let p_b = Vec2::new(d_ab, 0.0);
    let dir = Vec2::new((-a_cab).cos(), (-a_cab).sin());
    geom::cr_int(p_b, d_bc, p_a, dir)
        .into_iter()
        .map(|p_c| {
            let mut conf = Configuration::new();
            conf.set(a, p_a);
            conf.set(b, p_b);
            conf.set(c, p_c);
            conf
        })
        .collect()
}

/// Place `c` by ray/ray intersection given the angles at `a` and `b`. When
/// both rays are (near-)colinear, returns one degenerate configuration
/// flagged [`Configuration::underconstrained`] rather than failing.
pub fn solve_ada(a: Var, b: Var, c: Var, a_cab: f64, d_ab: f64, a_abc: f64) -> Vec<Configuration> {
    trace::trace!("solve_ada {:?} {:?} {:?} {} {} {}", a, b, c, a_cab, d_ab, a_abc);
    let p_a = Vec2::new(0.0, 0.0);
    let p_b = Vec2::new(d_ab, 0.0);
    let dir_ac = Vec2::new((-a_cab).cos(), (-a_cab).sin());
    let dir_bc = Vec2::new(-(-a_abc).cos(), (-a_abc).sin());

    if geom::tol_eq(a_cab.sin(), 0.0) && geom::tol_eq(a_abc.sin(), 0.0) {
        let m = d_ab / 2.0 + (-a_cab).cos() * d_ab - (-a_abc).cos() * d_ab;
        let p_c = Vec2::new(m, 0.0);
        let mut conf = Configuration::new();
        conf.set(a, p_a);
        conf.set(b, p_b);
        conf.set(c, p_c);
        conf.underconstrained = true;
        return vec![conf];
    }

    match geom::rr_int(p_a, dir_ac, p_b, dir_bc) {
        Some(p_c) => {
            let mut conf = Configuration::new();
            conf.set(a, p_a);
            conf.set(b, p_b);
            conf.set(c, p_c);
            vec![conf]
        }
        None => Vec::new(),
    }
}
