//! Pattern-matching search: given a newly top-level cluster, try the
//! rewrite rules in fixed priority order and fire the first one that
//! applies, dispatching by variant through a `search_from_rigid`/
//! `search_from_hog`/`search_from_balloon` split, with each rule's position
//! in its dispatch function being data one can point at and test.
//!
//! Every rule function here either fires — recording a [`Method`] and zero
//! or more derived clusters in the graph, and pushing any new top-level
//! output onto `queue` for its own turn at search — or returns `Ok(false)`/
//! `Ok(None)` to let the caller try the next rule. A rule only ever returns
//! `Err` for a genuine structural precondition failure; a candidate pairing
//! that simply isn't a valid instance of the rule (e.g. two clusters that
//! looked compatible from the incidence index alone) is filtered out before
//! the corresponding [`Method`] constructor is ever called, not papered over
//! by treating its `Err` as "try the next candidate".

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::cluster::{Balloon, Cluster, Hedgehog, Rigid};
use crate::derive;
use crate::error::{Error, Result};
use crate::graph::{ClusterGraph, ClusterId};
use crate::method::Method;
use crate::var::Var;

type Queue = VecDeque<ClusterId>;

/// Run the search pass for `id` against whichever variant it currently is,
/// dispatching to [`search_from_rigid`], [`search_from_hog`], or
/// [`search_from_balloon`].
pub fn search(graph: &mut ClusterGraph, id: ClusterId, root: Option<Var>, queue: &mut Queue) -> Result<()> {
    match graph.cluster(id)?.clone() {
        Cluster::Rigid(_) => search_from_rigid(graph, id, root, queue),
        Cluster::Hedgehog(_) => search_from_hog(graph, id, root, queue),
        Cluster::Balloon(_) => search_from_balloon(graph, id, root, queue),
    }
}

// ---------------------------------------------------------------------
// Rigid dispatch, in fixed priority order
// ---------------------------------------------------------------------

pub fn search_from_rigid(graph: &mut ClusterGraph, id: ClusterId, root: Option<Var>, queue: &mut Queue) -> Result<()> {
    if search_absorb_from_cluster(graph, id, queue)? {
        return Ok(());
    }
    if search_balloonclustermerge_from_cluster(graph, id, queue)? {
        return Ok(());
    }
    if search_merge_from_cluster(graph, id, root, queue)? {
        return Ok(());
    }
    search_hogs_from_cluster(graph, id, queue)?;
    Ok(())
}

// ---------------------------------------------------------------------
// Hedgehog dispatch, in fixed priority order
// ---------------------------------------------------------------------

pub fn search_from_hog(graph: &mut ClusterGraph, id: ClusterId, root: Option<Var>, queue: &mut Queue) -> Result<()> {
    if search_absorb_from_hog(graph, id, queue)? {
        return Ok(());
    }
    if search_merge_from_hog(graph, id, root, queue)? {
        return Ok(());
    }
    if search_balloon_from_hog(graph, id, queue)? {
        return Ok(());
    }
    search_hogs_from_hog(graph, id, queue)?;
    Ok(())
}

// ---------------------------------------------------------------------
// Balloon dispatch, in fixed priority order
// ---------------------------------------------------------------------

pub fn search_from_balloon(graph: &mut ClusterGraph, id: ClusterId, root: Option<Var>, queue: &mut Queue) -> Result<()> {
    if search_absorb_from_balloon(graph, id, queue)? {
        return Ok(());
    }
    if search_balloon_from_balloon(graph, id, queue)? {
        return Ok(());
    }
    if search_cluster_from_balloon(graph, id, queue)? {
        return Ok(());
    }
    search_hogs_from_balloon(graph, id, queue)?;
    let _ = root;
    Ok(())
}

// ---------------------------------------------------------------------
// Query helpers
// ---------------------------------------------------------------------

fn find_hogs_at(graph: &ClusterGraph, cvar: Var) -> Vec<ClusterId> {
    graph
        .clusters_with_var(cvar)
        .filter(|&id| {
            graph.is_top_level(id) && graph.cluster(id).ok().and_then(Cluster::as_hedgehog).map_or(false, |h| h.cvar == cvar)
        })
        .collect()
}

fn top_level_rigids_with_var(graph: &ClusterGraph, var: Var) -> Vec<ClusterId> {
    graph
        .clusters_with_var(var)
        .filter(|&id| graph.is_top_level(id) && graph.cluster(id).map_or(false, |c| c.as_rigid().is_some()))
        .collect()
}

fn top_level_balloons_with_var(graph: &ClusterGraph, var: Var) -> Vec<ClusterId> {
    graph
        .clusters_with_var(var)
        .filter(|&id| graph.is_top_level(id) && graph.cluster(id).map_or(false, |c| c.as_balloon().is_some()))
        .collect()
}

fn vars_of(graph: &ClusterGraph, id: ClusterId) -> Result<BTreeSet<Var>> {
    Ok(graph.cluster(id)?.vars())
}

fn contains_root(graph: &ClusterGraph, id: ClusterId, root: Option<Var>) -> Result<bool> {
    match root {
        None => Ok(false),
        Some(r) => Ok(vars_of(graph, id)?.contains(&r)),
    }
}

/// Order two inputs so the root-containing one, if any, comes first.
/// Errors if both contain the root — a merge can have at most one
/// root-containing input.
fn order_pair_by_root(graph: &ClusterGraph, a: ClusterId, b: ClusterId, root: Option<Var>) -> Result<(ClusterId, ClusterId)> {
    let a_has = contains_root(graph, a, root)?;
    let b_has = contains_root(graph, b, root)?;
    if a_has && b_has {
        return Err(Error::TwoRootClusters { a, b });
    }
    if b_has {
        Ok((b, a))
    } else {
        Ok((a, b))
    }
}

/// As [`order_pair_by_root`], for the three symmetric inputs of `Merge3C`.
fn order_triple_by_root(
    graph: &ClusterGraph,
    a: ClusterId,
    b: ClusterId,
    c: ClusterId,
    root: Option<Var>,
) -> Result<(ClusterId, ClusterId, ClusterId)> {
    let has = [contains_root(graph, a, root)?, contains_root(graph, b, root)?, contains_root(graph, c, root)?];
    if has.iter().filter(|&&x| x).count() > 1 {
        let ids = [a, b, c];
        let first = (0..3).find(|&i| has[i]).unwrap();
        let second = (first + 1..3).find(|&i| has[i]).unwrap();
        return Err(Error::TwoRootClusters { a: ids[first], b: ids[second] });
    }
    if has[1] {
        Ok((b, a, c))
    } else if has[2] {
        Ok((c, a, b))
    } else {
        Ok((a, b, c))
    }
}

// ---------------------------------------------------------------------
// Rule firing helpers: build the output cluster, insert the method, queue
// the output for its own search pass.
// ---------------------------------------------------------------------

fn fire_merge1c(graph: &mut ClusterGraph, point_id: ClusterId, cluster_id: ClusterId, queue: &mut Queue) -> Result<ClusterId> {
    let allvars: BTreeSet<Var> = vars_of(graph, point_id)?.union(&vars_of(graph, cluster_id)?).copied().collect();
    let output = Cluster::Rigid(Rigid::new(allvars));
    if let Some(existing) = graph.find_cluster(&output) {
        return Ok(existing);
    }
    let out_id = graph.insert_cluster(output);
    graph.insert_method(Method::merge1c(), vec![point_id, cluster_id], vec![out_id])?;
    queue.push_back(out_id);
    Ok(out_id)
}

fn fire_merge2c(graph: &mut ClusterGraph, a: ClusterId, b: ClusterId, root: Option<Var>, queue: &mut Queue) -> Result<ClusterId> {
    let (c1, c2) = order_pair_by_root(graph, a, b, root)?;
    let allvars: BTreeSet<Var> = vars_of(graph, c1)?.union(&vars_of(graph, c2)?).copied().collect();
    let output = Cluster::Rigid(Rigid::new(allvars));
    if let Some(existing) = graph.find_cluster(&output) {
        return Ok(existing);
    }
    let out_id = graph.insert_cluster(output);
    graph.insert_method(Method::merge2c(), vec![c1, c2], vec![out_id])?;
    queue.push_back(out_id);
    Ok(out_id)
}

fn fire_merge3c(
    graph: &mut ClusterGraph,
    a: ClusterId,
    b: ClusterId,
    c: ClusterId,
    root: Option<Var>,
    queue: &mut Queue,
) -> Result<ClusterId> {
    let (o1, o2, o3) = order_triple_by_root(graph, a, b, c, root)?;
    let v1 = vars_of(graph, o1)?;
    let v2 = vars_of(graph, o2)?;
    let v3 = vars_of(graph, o3)?;
    let method = Method::merge3c(&v1, &v2, &v3)?;
    let allvars: BTreeSet<Var> = v1.union(&v2).copied().collect::<BTreeSet<_>>().union(&v3).copied().collect();
    let output = Cluster::Rigid(Rigid::new(allvars));
    if let Some(existing) = graph.find_cluster(&output) {
        return Ok(existing);
    }
    let out_id = graph.insert_cluster(output);
    graph.insert_method(method, vec![o1, o2, o3], vec![out_id])?;
    queue.push_back(out_id);
    Ok(out_id)
}

/// Unlike every other `fire_*` rule, `MergeCH`'s output always has exactly
/// the same vars as its rigid input (the hog contributes no new variable,
/// only redundant angle information) — so `insert_cluster` always resolves
/// `output` straight back to `cluster_id` itself, never minting a new node.
/// The method must still be recorded (marking `hog_id` absorbed is the
/// entire point of the rule); `ClusterGraph::is_top_level` special-cases a
/// cluster that is its own consuming method's output so `cluster_id` stays
/// searchable afterwards instead of looking permanently consumed.
fn fire_merge_ch(graph: &mut ClusterGraph, cluster_id: ClusterId, hog_id: ClusterId, queue: &mut Queue) -> Result<ClusterId> {
    let vars = graph.cluster(cluster_id)?.as_rigid().ok_or(Error::StructuralPrecondition { detail: "MergeCH expects a rigid" })?.vars.clone();
    let output = Cluster::Rigid(Rigid::new(vars));
    let out_id = graph.insert_cluster(output);
    graph.insert_method(Method::merge_ch(), vec![cluster_id, hog_id], vec![out_id])?;
    queue.push_back(out_id);
    Ok(out_id)
}

/// The balloon analogue of [`fire_merge_ch`]: same "output vars always equal
/// the single cluster input's vars" shape, same reason `insert_cluster`
/// always resolves back to `balloon_id` rather than minting a new node.
fn fire_merge_bh(graph: &mut ClusterGraph, balloon_id: ClusterId, hog_id: ClusterId, queue: &mut Queue) -> Result<ClusterId> {
    let vars = graph
        .cluster(balloon_id)?
        .as_balloon()
        .ok_or(Error::StructuralPrecondition { detail: "MergeBH expects a balloon" })?
        .vars
        .clone();
    let output = Cluster::Balloon(Balloon::new(vars));
    let out_id = graph.insert_cluster(output);
    graph.insert_method(Method::merge_bh(), vec![balloon_id, hog_id], vec![out_id])?;
    queue.push_back(out_id);
    Ok(out_id)
}

fn fire_balloon_merge(graph: &mut ClusterGraph, a: ClusterId, b: ClusterId, queue: &mut Queue) -> Result<ClusterId> {
    let va = graph.cluster(a)?.as_balloon().unwrap().vars.clone();
    let vb = graph.cluster(b)?.as_balloon().unwrap().vars.clone();
    let method = Method::balloon_merge(&va, &vb)?;
    let allvars: BTreeSet<Var> = va.union(&vb).copied().collect();
    let output = Cluster::Balloon(Balloon::new(allvars));
    if let Some(existing) = graph.find_cluster(&output) {
        return Ok(existing);
    }
    let out_id = graph.insert_cluster(output);
    graph.insert_method(method, vec![a, b], vec![out_id])?;
    queue.push_back(out_id);
    Ok(out_id)
}

/// Fixed input order `[rigid, balloon]`: the rigid always anchors scale.
fn fire_balloon_rigid_merge(graph: &mut ClusterGraph, rigid_id: ClusterId, balloon_id: ClusterId, queue: &mut Queue) -> Result<ClusterId> {
    let rv = graph.cluster(rigid_id)?.as_rigid().unwrap().vars.clone();
    let bv = graph.cluster(balloon_id)?.as_balloon().unwrap().vars.clone();
    let method = Method::balloon_rigid_merge(&rv, &bv)?;
    let allvars: BTreeSet<Var> = rv.union(&bv).copied().collect();
    let output = Cluster::Rigid(Rigid::new(allvars));
    if let Some(existing) = graph.find_cluster(&output) {
        return Ok(existing);
    }
    let out_id = graph.insert_cluster(output);
    graph.insert_method(method, vec![rigid_id, balloon_id], vec![out_id])?;
    queue.push_back(out_id);
    Ok(out_id)
}

/// `c1` must hold the hog's center, `c2` must not — that role is fixed by
/// which cluster the hog-center-membership check finds it in, so (unlike
/// [`fire_merge_chc`]) root preference is never allowed to swap `c1`/`c2`
/// here: doing so would hand `c2` a center it does not contain. We still
/// surface [`Error::TwoRootClusters`] if both somehow hold the root: two
/// root-containing inputs to any merge is always fatal.
fn fire_merge_cch(
    graph: &mut ClusterGraph,
    c1: ClusterId,
    c2: ClusterId,
    hog_id: ClusterId,
    root: Option<Var>,
    queue: &mut Queue,
) -> Result<ClusterId> {
    if contains_root(graph, c1, root)? && contains_root(graph, c2, root)? {
        return Err(Error::TwoRootClusters { a: c1, b: c2 });
    }
    let cv1 = graph.cluster(c1)?.as_rigid().unwrap().vars.clone();
    let cv2 = graph.cluster(c2)?.as_rigid().unwrap().vars.clone();
    let allvars: BTreeSet<Var> = cv1.union(&cv2).copied().collect();
    let hog = graph.cluster(hog_id)?.as_hedgehog().unwrap().clone();
    let needed_x: BTreeSet<Var> = hog.xvars.iter().copied().filter(|v| allvars.contains(v)).collect();
    let hog_for_merge = if needed_x.len() < hog.xvars.len() { derive::derive_subhog(graph, hog_id, needed_x)? } else { hog_id };
    let hog2 = graph.cluster(hog_for_merge)?.as_hedgehog().unwrap().clone();
    let method = Method::merge_cch(&cv1, &cv2, hog2.cvar, &hog2.xvars)?;
    let output = Cluster::Rigid(Rigid::new(allvars));
    if let Some(existing) = graph.find_cluster(&output) {
        return Ok(existing);
    }
    let out_id = graph.insert_cluster(output);
    graph.insert_method(method, vec![c1, c2, hog_for_merge], vec![out_id])?;
    queue.push_back(out_id);
    Ok(out_id)
}

/// `c1`/`c2` are symmetric (the hog's center must lie in both), so unlike
/// [`fire_merge_cch`] it is safe to let root preference reorder them.
fn fire_merge_chc(
    graph: &mut ClusterGraph,
    c1: ClusterId,
    hog_id: ClusterId,
    c2: ClusterId,
    root: Option<Var>,
    queue: &mut Queue,
) -> Result<ClusterId> {
    let (o1, o2) = order_pair_by_root(graph, c1, c2, root)?;
    let cv1 = graph.cluster(o1)?.as_rigid().unwrap().vars.clone();
    let cv2 = graph.cluster(o2)?.as_rigid().unwrap().vars.clone();
    let allvars: BTreeSet<Var> = cv1.union(&cv2).copied().collect();
    let hog = graph.cluster(hog_id)?.as_hedgehog().unwrap().clone();
    let needed_x: BTreeSet<Var> = hog.xvars.iter().copied().filter(|v| allvars.contains(v)).collect();
    let hog_for_merge = if needed_x.len() < hog.xvars.len() { derive::derive_subhog(graph, hog_id, needed_x)? } else { hog_id };
    let hog2 = graph.cluster(hog_for_merge)?.as_hedgehog().unwrap().clone();
    let method = Method::merge_chc(&cv1, hog2.cvar, &hog2.xvars, &cv2)?;
    let output = Cluster::Rigid(Rigid::new(allvars));
    if let Some(existing) = graph.find_cluster(&output) {
        return Ok(existing);
    }
    let out_id = graph.insert_cluster(output);
    graph.insert_method(method, vec![o1, hog_for_merge, o2], vec![out_id])?;
    queue.push_back(out_id);
    Ok(out_id)
}

fn fire_merge_hogs(graph: &mut ClusterGraph, hog1: ClusterId, hog2: ClusterId, queue: &mut Queue) -> Result<ClusterId> {
    let h1 = graph.cluster(hog1)?.as_hedgehog().unwrap().clone();
    let h2 = graph.cluster(hog2)?.as_hedgehog().unwrap().clone();
    let method = Method::merge_hogs(h1.cvar, &h1.xvars, h2.cvar, &h2.xvars)?;
    let xvars: BTreeSet<Var> = h1.xvars.union(&h2.xvars).copied().collect();
    let output = Cluster::Hedgehog(Hedgehog::new(h1.cvar, xvars)?);
    if let Some(existing) = graph.find_cluster(&output) {
        return Ok(existing);
    }
    let out_id = graph.insert_cluster(output);
    graph.insert_method(method, vec![hog1, hog2], vec![out_id])?;
    queue.push_back(out_id);
    Ok(out_id)
}

fn fire_balloon_from_hogs(
    graph: &mut ClusterGraph,
    hog1: ClusterId,
    hog2: ClusterId,
    var1: Var,
    var2: Var,
    var3: Var,
    queue: &mut Queue,
) -> Result<ClusterId> {
    let h1 = graph.cluster(hog1)?.as_hedgehog().unwrap().clone();
    let sub1 = if h1.xvars.len() > 2 {
        let needed: BTreeSet<Var> = [var2, var3].into_iter().filter(|v| h1.xvars.contains(v)).collect();
        derive::derive_subhog(graph, hog1, needed)?
    } else {
        hog1
    };
    let h2 = graph.cluster(hog2)?.as_hedgehog().unwrap().clone();
    let sub2 = if h2.xvars.len() > 2 {
        let needed: BTreeSet<Var> = [var1, var3].into_iter().filter(|v| h2.xvars.contains(v)).collect();
        derive::derive_subhog(graph, hog2, needed)?
    } else {
        hog2
    };
    let hc1 = graph.cluster(sub1)?.as_hedgehog().unwrap().clone();
    let hc2 = graph.cluster(sub2)?.as_hedgehog().unwrap().clone();
    let method = Method::balloon_from_hogs(hc1.cvar, &hc1.xvars, hc2.cvar, &hc2.xvars)?;
    let output = Cluster::Balloon(Balloon::new([var1, var2, var3]));
    if let Some(existing) = graph.find_cluster(&output) {
        return Ok(existing);
    }
    let out_id = graph.insert_cluster(output);
    graph.insert_method(method, vec![sub1, sub2], vec![out_id])?;
    queue.push_back(out_id);
    Ok(out_id)
}

// ---------------------------------------------------------------------
// Absorb-hog rules
// ---------------------------------------------------------------------

fn search_absorb_from_cluster(graph: &mut ClusterGraph, cluster_id: ClusterId, queue: &mut Queue) -> Result<bool> {
    let vars = vars_of(graph, cluster_id)?;
    for &cvar in &vars {
        for hog_id in find_hogs_at(graph, cvar) {
            let xvars = graph.cluster(hog_id)?.as_hedgehog().unwrap().xvars.clone();
            if xvars.is_subset(&vars) {
                fire_merge_ch(graph, cluster_id, hog_id, queue)?;
                return Ok(true);
            }
        }
    }
    Ok(false)
}

fn search_absorb_from_balloon(graph: &mut ClusterGraph, balloon_id: ClusterId, queue: &mut Queue) -> Result<bool> {
    let vars = vars_of(graph, balloon_id)?;
    for &cvar in &vars {
        for hog_id in find_hogs_at(graph, cvar) {
            let xvars = graph.cluster(hog_id)?.as_hedgehog().unwrap().xvars.clone();
            if xvars.is_subset(&vars) {
                fire_merge_bh(graph, balloon_id, hog_id, queue)?;
                return Ok(true);
            }
        }
    }
    Ok(false)
}

fn search_absorb_from_hog(graph: &mut ClusterGraph, hog_id: ClusterId, queue: &mut Queue) -> Result<bool> {
    let hog = graph.cluster(hog_id)?.as_hedgehog().unwrap().clone();
    for balloon_id in top_level_balloons_with_var(graph, hog.cvar) {
        let bvars = graph.cluster(balloon_id)?.as_balloon().unwrap().vars.clone();
        if hog.xvars.is_subset(&bvars) {
            fire_merge_bh(graph, balloon_id, hog_id, queue)?;
            return Ok(true);
        }
    }
    for rigid_id in top_level_rigids_with_var(graph, hog.cvar) {
        let rvars = graph.cluster(rigid_id)?.as_rigid().unwrap().vars.clone();
        if hog.xvars.is_subset(&rvars) {
            fire_merge_ch(graph, rigid_id, hog_id, queue)?;
            return Ok(true);
        }
    }
    Ok(false)
}

// ---------------------------------------------------------------------
// Balloon <-> rigid/balloon merges
// ---------------------------------------------------------------------

fn search_balloon_from_balloon(graph: &mut ClusterGraph, balloon_id: ClusterId, queue: &mut Queue) -> Result<bool> {
    let vars = graph.cluster(balloon_id)?.as_balloon().unwrap().vars.clone();
    let mut shared_map: BTreeMap<ClusterId, BTreeSet<Var>> = BTreeMap::new();
    for &v in &vars {
        for other in top_level_balloons_with_var(graph, v) {
            if other == balloon_id {
                continue;
            }
            shared_map.entry(other).or_default().insert(v);
        }
    }
    for (&other, shared) in &shared_map {
        if shared.len() >= 2 {
            fire_balloon_merge(graph, balloon_id, other, queue)?;
            return Ok(true);
        }
    }
    Ok(false)
}

fn search_cluster_from_balloon(graph: &mut ClusterGraph, balloon_id: ClusterId, queue: &mut Queue) -> Result<bool> {
    let vars = graph.cluster(balloon_id)?.as_balloon().unwrap().vars.clone();
    let mut shared_map: BTreeMap<ClusterId, BTreeSet<Var>> = BTreeMap::new();
    for &v in &vars {
        for rigid_id in top_level_rigids_with_var(graph, v) {
            shared_map.entry(rigid_id).or_default().insert(v);
        }
    }
    for (&rigid_id, shared) in &shared_map {
        if shared.len() >= 2 {
            fire_balloon_rigid_merge(graph, rigid_id, balloon_id, queue)?;
            return Ok(true);
        }
    }
    Ok(false)
}

fn search_balloonclustermerge_from_cluster(graph: &mut ClusterGraph, rigid_id: ClusterId, queue: &mut Queue) -> Result<bool> {
    let vars = vars_of(graph, rigid_id)?;
    let mut shared_map: BTreeMap<ClusterId, BTreeSet<Var>> = BTreeMap::new();
    for &v in &vars {
        for balloon_id in top_level_balloons_with_var(graph, v) {
            shared_map.entry(balloon_id).or_default().insert(v);
        }
    }
    for (&balloon_id, shared) in &shared_map {
        if shared.len() >= 2 {
            fire_balloon_rigid_merge(graph, rigid_id, balloon_id, queue)?;
            return Ok(true);
        }
    }
    Ok(false)
}

// ---------------------------------------------------------------------
// Cluster-merge pattern matcher: point+cluster, two/three rigid merges,
// and the cluster/hog angle-merge variants.
// ---------------------------------------------------------------------

fn search_merge_from_cluster(graph: &mut ClusterGraph, newcluster_id: ClusterId, root: Option<Var>, queue: &mut Queue) -> Result<bool> {
    let newvars = vars_of(graph, newcluster_id)?;
    let mut overlap: BTreeMap<ClusterId, BTreeSet<Var>> = BTreeMap::new();
    for &v in &newvars {
        for other in top_level_rigids_with_var(graph, v) {
            if other == newcluster_id {
                continue;
            }
            overlap.entry(other).or_default().insert(v);
        }
    }

    // 1. Point + cluster (Merge1C).
    for (&cluster_id, shared) in &overlap {
        if shared.len() != 1 {
            continue;
        }
        let cluster_len = graph.cluster(cluster_id)?.len();
        let new_len = graph.cluster(newcluster_id)?.len();
        if cluster_len == 1 {
            fire_merge1c(graph, cluster_id, newcluster_id, queue)?;
            return Ok(true);
        } else if new_len == 1 {
            fire_merge1c(graph, newcluster_id, cluster_id, queue)?;
            return Ok(true);
        }
    }

    // 2. Two rigids sharing >=2 points (Merge2C, always overconstrained).
    for (&cluster_id, shared) in &overlap {
        if shared.len() >= 2 {
            fire_merge2c(graph, cluster_id, newcluster_id, root, queue)?;
            return Ok(true);
        }
    }

    // 3. Three rigids pairwise sharing one point each (Merge3C).
    let candidates: Vec<ClusterId> = overlap.keys().copied().collect();
    for i in 0..candidates.len() {
        for j in (i + 1)..candidates.len() {
            let c1 = candidates[i];
            let c2 = candidates[j];
            let c1vars = vars_of(graph, c1)?;
            let c2vars = vars_of(graph, c2)?;
            let shared12: BTreeSet<Var> = c1vars.intersection(&c2vars).copied().collect();
            let shared13: BTreeSet<Var> = c1vars.intersection(&newvars).copied().collect();
            let shared23: BTreeSet<Var> = c2vars.intersection(&newvars).copied().collect();
            let shared1: BTreeSet<Var> = shared12.union(&shared13).copied().collect();
            let shared2: BTreeSet<Var> = shared12.union(&shared23).copied().collect();
            let shared3: BTreeSet<Var> = shared13.union(&shared23).copied().collect();
            if !shared12.is_empty()
                && !shared13.is_empty()
                && !shared23.is_empty()
                && shared1.len() == 2
                && shared2.len() == 2
                && shared3.len() == 2
            {
                fire_merge3c(graph, c1, c2, newcluster_id, root, queue)?;
                return Ok(true);
            }
        }
    }

    // 4. Cluster-Hog-Cluster: newcluster shares one point with `cluster_id`,
    // and a hog at that point also reaches into both.
    for (&cluster_id, shared) in &overlap {
        if shared.len() != 1 {
            continue;
        }
        let cvar = *shared.iter().next().unwrap();
        let cluster_vars = vars_of(graph, cluster_id)?;
        for hog_id in find_hogs_at(graph, cvar) {
            let hog = graph.cluster(hog_id)?.as_hedgehog().unwrap().clone();
            let sharedch: BTreeSet<Var> = cluster_vars.intersection(&hog.xvars).copied().collect();
            let sharednh: BTreeSet<Var> = newvars.intersection(&hog.xvars).copied().collect();
            let sharedh: BTreeSet<Var> = sharedch.union(&sharednh).copied().collect();
            if !sharedch.is_empty() && !sharednh.is_empty() && sharedh.len() >= 2 {
                fire_merge_chc(graph, cluster_id, hog_id, newcluster_id, root, queue)?;
                return Ok(true);
            }
        }
    }

    // 5. Cluster-Cluster-Hog, hog centered in newcluster.
    for &var in &newvars {
        for hog_id in find_hogs_at(graph, var) {
            let hog = graph.cluster(hog_id)?.as_hedgehog().unwrap().clone();
            let sharednh: BTreeSet<Var> = newvars.intersection(&hog.xvars).copied().collect();
            if sharednh.is_empty() {
                continue;
            }
            for (&cluster_id, _) in &overlap {
                let cluster_vars = vars_of(graph, cluster_id)?;
                let sharednc: BTreeSet<Var> = newvars.intersection(&cluster_vars).copied().collect();
                debug_assert_eq!(sharednc.len(), 1, "merge-with-angle case 2: expected exactly one shared point");
                if cluster_vars.contains(&hog.cvar) {
                    continue;
                }
                let sharedch: BTreeSet<Var> = cluster_vars.intersection(&hog.xvars).copied().collect();
                let sharedc: BTreeSet<Var> = sharedch.union(&sharednc).copied().collect();
                if !sharedch.is_empty() && sharedc.len() >= 2 {
                    fire_merge_cch(graph, newcluster_id, cluster_id, hog_id, root, queue)?;
                    return Ok(true);
                }
            }
        }
    }

    // 6. Cluster-Cluster-Hog, hog centered in the other cluster.
    for (&cluster_id, _) in &overlap {
        let cluster_vars = vars_of(graph, cluster_id)?;
        let sharednc: BTreeSet<Var> = newvars.intersection(&cluster_vars).copied().collect();
        debug_assert_eq!(sharednc.len(), 1, "merge-with-angle case 3: expected exactly one shared point");
        for &var in &cluster_vars {
            for hog_id in find_hogs_at(graph, var) {
                let hog = graph.cluster(hog_id)?.as_hedgehog().unwrap().clone();
                if newvars.contains(&hog.cvar) {
                    continue;
                }
                let sharedhc: BTreeSet<Var> = newvars.intersection(&hog.xvars).copied().collect();
                let sharedhn: BTreeSet<Var> = cluster_vars.intersection(&hog.xvars).copied().collect();
                let sharedh: BTreeSet<Var> = sharedhn.union(&sharedhc).copied().collect();
                let sharedc: BTreeSet<Var> = sharedhc.union(&sharednc).copied().collect();
                if !sharedhc.is_empty() && !sharedhn.is_empty() && sharedh.len() >= 2 && sharedc.len() == 2 {
                    fire_merge_cch(graph, cluster_id, newcluster_id, hog_id, root, queue)?;
                    return Ok(true);
                }
            }
        }
    }

    Ok(false)
}

// ---------------------------------------------------------------------
// Hedgehog-side merge pattern matcher (CHC/CCH, hog-first framing).
// ---------------------------------------------------------------------

fn search_merge_from_hog(graph: &mut ClusterGraph, hog_id: ClusterId, root: Option<Var>, queue: &mut Queue) -> Result<bool> {
    let hog = graph.cluster(hog_id)?.as_hedgehog().unwrap().clone();

    // Rigids holding the hog's center *and* at least one spoke.
    let mut sharecx: Vec<ClusterId> = Vec::new();
    for rigid_id in top_level_rigids_with_var(graph, hog.cvar) {
        let rvars = graph.cluster(rigid_id)?.as_rigid().unwrap().vars.clone();
        if !hog.xvars.is_disjoint(&rvars) {
            sharecx.push(rigid_id);
        }
    }
    if sharecx.len() >= 2 {
        fire_merge_chc(graph, sharecx[0], hog_id, sharecx[1], root, queue)?;
        return Ok(true);
    }

    // Any rigid reachable through one of the hog's spokes.
    let mut sharex: BTreeSet<ClusterId> = BTreeSet::new();
    for &var in &hog.xvars {
        for rigid_id in top_level_rigids_with_var(graph, var) {
            sharex.insert(rigid_id);
        }
    }
    for &c1 in &sharecx {
        let c1vars = graph.cluster(c1)?.as_rigid().unwrap().vars.clone();
        for &c2 in &sharex {
            if c1 == c2 {
                continue;
            }
            let c2vars = graph.cluster(c2)?.as_rigid().unwrap().vars.clone();
            let shared12: BTreeSet<Var> = c1vars.intersection(&c2vars).copied().collect();
            let sharedh2: BTreeSet<Var> = hog.xvars.intersection(&c2vars).copied().collect();
            let shared2: BTreeSet<Var> = shared12.union(&sharedh2).copied().collect();
            if !shared12.is_empty() && !sharedh2.is_empty() && shared2.len() == 2 {
                fire_merge_cch(graph, c1, c2, hog_id, root, queue)?;
                return Ok(true);
            }
        }
    }

    Ok(false)
}

// ---------------------------------------------------------------------
// BalloonFromHogs
// ---------------------------------------------------------------------

fn search_balloon_from_hog(graph: &mut ClusterGraph, hog_id: ClusterId, queue: &mut Queue) -> Result<bool> {
    let hog = graph.cluster(hog_id)?.as_hedgehog().unwrap().clone();
    let var1 = hog.cvar;
    let mut fired = false;
    for &var2 in &hog.xvars {
        for hog2_id in find_hogs_at(graph, var2) {
            if hog2_id == hog_id {
                continue;
            }
            let hog2 = graph.cluster(hog2_id)?.as_hedgehog().unwrap().clone();
            if !hog2.xvars.contains(&var1) {
                continue;
            }
            for &var3 in &hog2.xvars {
                if var3 == var2 || !hog.xvars.contains(&var3) {
                    continue;
                }
                let candidate = Cluster::Balloon(Balloon::new([var1, var2, var3]));
                if graph.find_cluster(&candidate).is_some() {
                    continue;
                }
                fire_balloon_from_hogs(graph, hog_id, hog2_id, var1, var2, var3, queue)?;
                fired = true;
            }
        }
    }
    Ok(fired)
}

// ---------------------------------------------------------------------
// Hedgehog synthesis: fallback step tried only when nothing earlier in
// the dispatch chain fired.
// ---------------------------------------------------------------------

fn search_hogs_from_cluster(graph: &mut ClusterGraph, cluster_id: ClusterId, queue: &mut Queue) -> Result<()> {
    let vars = vars_of(graph, cluster_id)?;
    if vars.len() <= 2 {
        return Ok(());
    }
    for &cvar in &vars {
        let xvars: BTreeSet<Var> = vars.iter().copied().filter(|&v| v != cvar).collect();
        for hog_id in find_hogs_at(graph, cvar) {
            let hog_xvars = graph.cluster(hog_id)?.as_hedgehog().unwrap().xvars.clone();
            let shared: BTreeSet<Var> = hog_xvars.intersection(&xvars).copied().collect();
            if shared.is_empty() || shared.len() >= hog_xvars.len() || shared.len() >= xvars.len() {
                continue;
            }
            let candidate = Cluster::Hedgehog(Hedgehog::new(cvar, xvars.clone())?);
            if graph.find_cluster(&candidate).is_some() {
                continue;
            }
            let synthesized = derive::hog_from_rigid(graph, cvar, cluster_id)?;
            fire_merge_hogs(graph, hog_id, synthesized, queue)?;
        }
    }
    Ok(())
}

fn search_hogs_from_balloon(graph: &mut ClusterGraph, balloon_id: ClusterId, queue: &mut Queue) -> Result<()> {
    let vars = vars_of(graph, balloon_id)?;
    if vars.len() <= 2 {
        return Ok(());
    }
    for &cvar in &vars {
        let xvars: BTreeSet<Var> = vars.iter().copied().filter(|&v| v != cvar).collect();
        for hog_id in find_hogs_at(graph, cvar) {
            let hog_xvars = graph.cluster(hog_id)?.as_hedgehog().unwrap().xvars.clone();
            let shared: BTreeSet<Var> = hog_xvars.intersection(&xvars).copied().collect();
            if shared.is_empty() || shared.len() >= hog_xvars.len() || shared.len() >= xvars.len() {
                continue;
            }
            let candidate = Cluster::Hedgehog(Hedgehog::new(cvar, xvars.clone())?);
            if graph.find_cluster(&candidate).is_some() {
                continue;
            }
            let synthesized = derive::hog_from_balloon(graph, cvar, balloon_id)?;
            fire_merge_hogs(graph, hog_id, synthesized, queue)?;
        }
    }
    Ok(())
}

fn search_hogs_from_hog(graph: &mut ClusterGraph, newhog_id: ClusterId, queue: &mut Queue) -> Result<bool> {
    let newhog = graph.cluster(newhog_id)?.as_hedgehog().unwrap().clone();
    let mut tomerge: Vec<ClusterId> = Vec::new();

    for rigid_id in top_level_rigids_with_var(graph, newhog.cvar) {
        let rvars = graph.cluster(rigid_id)?.as_rigid().unwrap().vars.clone();
        if rvars.len() < 3 {
            continue;
        }
        let xvars: BTreeSet<Var> = rvars.iter().copied().filter(|&v| v != newhog.cvar).collect();
        let shared: BTreeSet<Var> = newhog.xvars.intersection(&xvars).copied().collect();
        if shared.is_empty() || shared.len() >= xvars.len() || shared.len() >= newhog.xvars.len() {
            continue;
        }
        let candidate = Cluster::Hedgehog(Hedgehog::new(newhog.cvar, xvars.clone())?);
        if graph.find_cluster(&candidate).is_some() {
            continue;
        }
        tomerge.push(derive::hog_from_rigid(graph, newhog.cvar, rigid_id)?);
    }

    for balloon_id in top_level_balloons_with_var(graph, newhog.cvar) {
        let bvars = graph.cluster(balloon_id)?.as_balloon().unwrap().vars.clone();
        if bvars.len() < 3 {
            continue;
        }
        let xvars: BTreeSet<Var> = bvars.iter().copied().filter(|&v| v != newhog.cvar).collect();
        let shared: BTreeSet<Var> = newhog.xvars.intersection(&xvars).copied().collect();
        if shared.is_empty() || shared.len() >= xvars.len() || shared.len() >= newhog.xvars.len() {
            continue;
        }
        let candidate = Cluster::Hedgehog(Hedgehog::new(newhog.cvar, xvars.clone())?);
        if graph.find_cluster(&candidate).is_some() {
            continue;
        }
        tomerge.push(derive::hog_from_balloon(graph, newhog.cvar, balloon_id)?);
    }

    for hog_id in find_hogs_at(graph, newhog.cvar) {
        if hog_id == newhog_id {
            continue;
        }
        let xvars = graph.cluster(hog_id)?.as_hedgehog().unwrap().xvars.clone();
        let shared: BTreeSet<Var> = newhog.xvars.intersection(&xvars).copied().collect();
        if shared.is_empty() || shared.len() >= xvars.len() || shared.len() >= newhog.xvars.len() {
            continue;
        }
        tomerge.push(hog_id);
    }

    if tomerge.is_empty() {
        return Ok(false);
    }
    let mut last = newhog_id;
    for hog_id in tomerge {
        if !graph.is_top_level(last) || !graph.is_top_level(hog_id) {
            continue;
        }
        last = fire_merge_hogs(graph, last, hog_id, queue)?;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::var::VarTable;

    fn vars(names: &[&str]) -> (VarTable, Vec<Var>) {
        let mut table = VarTable::new();
        let ids = names.iter().map(|n| table.intern(*n)).collect();
        (table, ids)
    }

    #[test]
    fn absorb_from_cluster_fires_before_merge_and_requeues_the_rigid() {
        let (_table, v) = vars(&["a", "b", "c"]);
        let mut graph = ClusterGraph::new();
        let rigid = graph.insert_cluster(Cluster::Rigid(Rigid::new([v[0], v[1], v[2]])));
        let hog = graph.insert_cluster(Cluster::Hedgehog(Hedgehog::new(v[0], [v[1], v[2]]).unwrap()));
        let mut queue = Queue::new();

        assert!(search_absorb_from_cluster(&mut graph, rigid, &mut queue).unwrap());
        assert!(!graph.is_top_level(hog));
        assert!(graph.is_top_level(rigid));
        assert!(graph.methods().any(|m| m.kind == crate::method::MethodKind::MergeCH));
        // The rigid goes back on the queue for another turn at search, since
        // absorbing a hog can unlock further rules against it.
        assert!(queue.contains(&rigid));
    }

    #[test]
    fn absorb_from_cluster_is_a_noop_when_no_hog_is_fully_contained() {
        let (_table, v) = vars(&["a", "b", "c", "d"]);
        let mut graph = ClusterGraph::new();
        let rigid = graph.insert_cluster(Cluster::Rigid(Rigid::new([v[0], v[1]])));
        graph.insert_cluster(Cluster::Hedgehog(Hedgehog::new(v[0], [v[2], v[3]]).unwrap()));
        let mut queue = Queue::new();

        assert!(!search_absorb_from_cluster(&mut graph, rigid, &mut queue).unwrap());
        assert!(queue.is_empty());
    }

    #[test]
    fn order_pair_by_root_moves_the_root_containing_cluster_first() {
        let (_table, v) = vars(&["a", "b", "c"]);
        let mut graph = ClusterGraph::new();
        let with_root = graph.insert_cluster(Cluster::Rigid(Rigid::new([v[0], v[1]])));
        let without_root = graph.insert_cluster(Cluster::Rigid(Rigid::new([v[1], v[2]])));

        let (first, second) = order_pair_by_root(&graph, without_root, with_root, Some(v[0])).unwrap();
        assert_eq!(first, with_root);
        assert_eq!(second, without_root);
    }

    #[test]
    fn order_pair_by_root_is_stable_with_no_root_set() {
        let (_table, v) = vars(&["a", "b", "c"]);
        let mut graph = ClusterGraph::new();
        let a = graph.insert_cluster(Cluster::Rigid(Rigid::new([v[0], v[1]])));
        let b = graph.insert_cluster(Cluster::Rigid(Rigid::new([v[1], v[2]])));

        let (first, second) = order_pair_by_root(&graph, a, b, None).unwrap();
        assert_eq!((first, second), (a, b));
    }

    #[test]
    fn order_pair_by_root_rejects_two_root_containing_clusters() {
        let (_table, v) = vars(&["a", "b", "c"]);
        let mut graph = ClusterGraph::new();
        let a = graph.insert_cluster(Cluster::Rigid(Rigid::new([v[0], v[1]])));
        let b = graph.insert_cluster(Cluster::Rigid(Rigid::new([v[0], v[2]])));

        assert!(order_pair_by_root(&graph, a, b, Some(v[0])).is_err());
    }

    #[test]
    fn merge1c_is_idempotent_on_a_structurally_identical_output() {
        let (_table, v) = vars(&["a", "b"]);
        let mut graph = ClusterGraph::new();
        let point = graph.insert_cluster(Cluster::Rigid(Rigid::singleton(v[0])));
        let cluster = graph.insert_cluster(Cluster::Rigid(Rigid::new([v[0], v[1]])));
        let mut queue = Queue::new();

        let first = fire_merge1c(&mut graph, point, cluster, &mut queue).unwrap();
        assert_eq!(first, cluster);
        assert!(graph.methods().count() == 1);
    }

    #[test]
    fn search_dispatches_on_cluster_variant() {
        let (_table, v) = vars(&["a", "b", "c"]);
        let mut graph = ClusterGraph::new();
        let rigid = graph.insert_cluster(Cluster::Rigid(Rigid::new([v[0], v[1], v[2]])));
        let hog = graph.insert_cluster(Cluster::Hedgehog(Hedgehog::new(v[0], [v[1], v[2]]).unwrap()));
        let mut queue = Queue::new();

        search(&mut graph, rigid, None, &mut queue).unwrap();
        assert!(graph.methods().any(|m| m.kind == crate::method::MethodKind::MergeCH));
        assert!(!graph.is_top_level(hog));
    }
}
