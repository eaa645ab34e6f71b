//! Synthesizing sub-artifacts the pattern matcher needs to apply its rules
//! uniformly: an angle-only hedgehog view of a rigid or balloon, and a
//! reduced sub-hedgehog restricted to the spokes a merge actually needs.
//!
//! Every function here both records the derived cluster in the graph and
//! wires up the `Derive` method (`Rigid2Hog`/`Balloon2Hog`/`SubHog`) that
//! justifies it.

use std::collections::BTreeSet;

use crate::cluster::{Cluster, Hedgehog};
use crate::error::{Error, Result};
use crate::graph::{ClusterGraph, ClusterId};
use crate::method::Method;
use crate::var::Var;

/// Synthesize the hedgehog centered at `cvar` whose spokes are every other
/// variable of the rigid at `rigid_id` (`Rigid2Hog`).
///
/// If that exact hedgehog already exists, its id is returned and no new
/// method is recorded — structurally identical clusters never coexist.
pub fn hog_from_rigid(graph: &mut ClusterGraph, cvar: Var, rigid_id: ClusterId) -> Result<ClusterId> {
    let rigid = graph
        .cluster(rigid_id)?
        .as_rigid()
        .ok_or(Error::StructuralPrecondition { detail: "hog_from_rigid expects a rigid input" })?
        .clone();
    if !rigid.vars.contains(&cvar) {
        return Err(Error::HogCenterNotInCluster { cvar, cluster: rigid_id });
    }
    let xvars: BTreeSet<Var> = rigid.vars.iter().copied().filter(|&v| v != cvar).collect();
    let hog = Cluster::Hedgehog(Hedgehog::new(cvar, xvars)?);
    if let Some(existing) = graph.find_cluster(&hog) {
        return Ok(existing);
    }
    let hog_id = graph.insert_cluster(hog);
    graph.insert_method(Method::rigid2hog(), vec![rigid_id], vec![hog_id])?;
    Ok(hog_id)
}

/// As [`hog_from_rigid`], but synthesizing from a balloon (`Balloon2Hog`).
pub fn hog_from_balloon(graph: &mut ClusterGraph, cvar: Var, balloon_id: ClusterId) -> Result<ClusterId> {
    let balloon = graph
        .cluster(balloon_id)?
        .as_balloon()
        .ok_or(Error::StructuralPrecondition { detail: "hog_from_balloon expects a balloon input" })?
        .clone();
    if !balloon.vars.contains(&cvar) {
        return Err(Error::HogCenterNotInCluster { cvar, cluster: balloon_id });
    }
    let xvars: BTreeSet<Var> = balloon.vars.iter().copied().filter(|&v| v != cvar).collect();
    let hog = Cluster::Hedgehog(Hedgehog::new(cvar, xvars)?);
    if let Some(existing) = graph.find_cluster(&hog) {
        return Ok(existing);
    }
    let hog_id = graph.insert_cluster(hog);
    graph.insert_method(Method::balloon2hog(), vec![balloon_id], vec![hog_id])?;
    Ok(hog_id)
}

/// Restrict the hedgehog at `hog_id` to `xvars`, a (possibly equal) subset
/// of its current spokes, recording a `SubHog` derivation. Used by
/// `MergeCHC`/`MergeCCH`/`BalloonFromHogs` whenever a merge needs only part
/// of a hog.
pub fn derive_subhog(graph: &mut ClusterGraph, hog_id: ClusterId, xvars: BTreeSet<Var>) -> Result<ClusterId> {
    let hog = graph
        .cluster(hog_id)?
        .as_hedgehog()
        .ok_or(Error::StructuralPrecondition { detail: "derive_subhog expects a hedgehog input" })?
        .clone();
    if !xvars.is_subset(&hog.xvars) {
        return Err(Error::StructuralPrecondition { detail: "sub-hog spokes are not a subset of the source hog" });
    }
    let sub = Cluster::Hedgehog(Hedgehog::new(hog.cvar, xvars)?);
    if let Some(existing) = graph.find_cluster(&sub) {
        return Ok(existing);
    }
    let sub_id = graph.insert_cluster(sub);
    graph.insert_method(Method::sub_hog(), vec![hog_id], vec![sub_id])?;
    Ok(sub_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::Rigid;

    fn v(i: u32) -> Var {
        Var::from_raw(i)
    }

    #[test]
    fn hog_from_rigid_excludes_center_from_spokes() {
        let mut g = ClusterGraph::new();
        let rigid = g.insert_cluster(Cluster::Rigid(Rigid::new([v(0), v(1), v(2)])));
        let hog_id = hog_from_rigid(&mut g, v(0), rigid).unwrap();
        let hog = g.cluster(hog_id).unwrap().as_hedgehog().unwrap();
        assert_eq!(hog.cvar, v(0));
        assert!(!hog.xvars.contains(&v(0)));
        assert_eq!(hog.xvars.len(), 2);
    }

    #[test]
    fn hog_from_rigid_rejects_center_not_in_cluster() {
        let mut g = ClusterGraph::new();
        let rigid = g.insert_cluster(Cluster::Rigid(Rigid::new([v(0), v(1), v(2)])));
        let err = hog_from_rigid(&mut g, v(9), rigid).unwrap_err();
        assert_eq!(err, Error::HogCenterNotInCluster { cvar: v(9), cluster: rigid });
    }

    #[test]
    fn hog_from_rigid_is_idempotent_by_structural_identity() {
        let mut g = ClusterGraph::new();
        let rigid = g.insert_cluster(Cluster::Rigid(Rigid::new([v(0), v(1), v(2)])));
        let first = hog_from_rigid(&mut g, v(0), rigid).unwrap();
        let second = hog_from_rigid(&mut g, v(0), rigid).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn derive_subhog_restricts_spokes() {
        let mut g = ClusterGraph::new();
        let rigid = g.insert_cluster(Cluster::Rigid(Rigid::new([v(0), v(1), v(2), v(3)])));
        let hog = hog_from_rigid(&mut g, v(0), rigid).unwrap();
        let sub = derive_subhog(&mut g, hog, [v(1), v(2)].into_iter().collect()).unwrap();
        let sub_cluster = g.cluster(sub).unwrap().as_hedgehog().unwrap();
        assert_eq!(sub_cluster.xvars, [v(1), v(2)].into_iter().collect());
        assert!(!g.is_top_level(hog));
    }

    #[test]
    fn derive_subhog_rejects_spokes_outside_source() {
        let mut g = ClusterGraph::new();
        let rigid = g.insert_cluster(Cluster::Rigid(Rigid::new([v(0), v(1), v(2)])));
        let hog = hog_from_rigid(&mut g, v(0), rigid).unwrap();
        let err = derive_subhog(&mut g, hog, [v(9)].into_iter().collect()).unwrap_err();
        assert_eq!(err, Error::StructuralPrecondition { detail: "sub-hog spokes are not a subset of the source hog" });
    }
}
