//! The arena of clusters and methods, and the dependency-graph indices over
//! them.
//!
//! Vertices for variables, clusters, and methods are never represented as
//! literal graph nodes in one big adjacency structure; instead each of the
//! three is a parallel `Vec` owned by [`ClusterGraph`] and addressed by a
//! small `Copy` index type, the same "arena-with-indices" style a linkage
//! state keeps its size/parent/chain bookkeeping in.

use std::collections::{HashMap, HashSet};

use crate::cluster::Cluster;
use crate::error::{Error, Result};
use crate::method::Method;
use crate::var::Var;

/// An index into the cluster arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClusterId(u32);

impl ClusterId {
    /// Build a `ClusterId` directly from its raw index. Only meant for
    /// tests and code that already holds a valid index.
    pub fn from_raw(index: u32) -> ClusterId {
        ClusterId(index)
    }

    /// The raw index backing this handle.
    pub fn to_raw(self) -> u32 {
        self.0
    }
}

/// An index into the method arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MethodId(u32);

impl MethodId {
    /// Build a `MethodId` directly from its raw index. Only meant for tests
    /// and code that already holds a valid index.
    pub fn from_raw(index: u32) -> MethodId {
        MethodId(index)
    }

    /// The raw index backing this handle.
    pub fn to_raw(self) -> u32 {
        self.0
    }
}

#[derive(Clone, Debug)]
struct ClusterNode {
    cluster: Cluster,
    /// The method that consumed this cluster as an input, if any. A cluster
    /// is "top-level" exactly when this is `None`: the instant any method —
    /// merge or derive — reads this cluster, it stops being eligible for
    /// further search, so a single field suffices; there is no need to track
    /// a set of consumers.
    consumed_by: Option<MethodId>,
    /// The method that produced this cluster, if it wasn't supplied
    /// directly by the host via `add`.
    produced_by: Option<MethodId>,
    /// Set by a cascading [`ClusterGraph::remove`]. A removed cluster's
    /// node stays in the arena (so its `ClusterId` is never reused or
    /// silently repointed) but is excluded from every lookup.
    removed: bool,
}

#[derive(Clone, Debug)]
struct MethodNode {
    method: Method,
    inputs: Vec<ClusterId>,
    outputs: Vec<ClusterId>,
}

/// The arena of clusters and methods, plus the incidence indices the search
/// engine and public façade need to find candidates quickly.
#[derive(Clone, Debug, Default)]
pub struct ClusterGraph {
    clusters: Vec<ClusterNode>,
    methods: Vec<MethodNode>,
    by_cluster_value: HashMap<Cluster, ClusterId>,
    /// `var -> clusters incident on var`, kept for `contains_root` and for
    /// the search engine's "clusters touching this variable" queries.
    var_incidence: HashMap<Var, HashSet<ClusterId>>,
    /// Per-variant top-level membership, tracked as incidence sets rather
    /// than literal graph vertices so the search engine can scan just one
    /// variant at a time.
    rigids: HashSet<ClusterId>,
    hogs: HashSet<ClusterId>,
    balloons: HashSet<ClusterId>,
}

impl ClusterGraph {
    /// An empty graph.
    pub fn new() -> ClusterGraph {
        ClusterGraph::default()
    }

    /// Insert `cluster`, returning its id. If an identical cluster (same
    /// variant, same variable set(s)) is already present, its existing id
    /// is returned and no new node is created: adding a cluster that is
    /// already present is a no-op.
    pub fn insert_cluster(&mut self, cluster: Cluster) -> ClusterId {
        if let Some(&id) = self.by_cluster_value.get(&cluster) {
            return id;
        }
        let id = ClusterId(self.clusters.len() as u32);
        for v in cluster.vars() {
            self.var_incidence.entry(v).or_default().insert(id);
        }
        match &cluster {
            Cluster::Rigid(_) => {
                self.rigids.insert(id);
            }
            Cluster::Hedgehog(_) => {
                self.hogs.insert(id);
            }
            Cluster::Balloon(_) => {
                self.balloons.insert(id);
            }
        }
        self.by_cluster_value.insert(cluster.clone(), id);
        self.clusters.push(ClusterNode { cluster, consumed_by: None, produced_by: None, removed: false });
        id
    }

    /// Record that `method` was derived from `inputs` and produced
    /// `outputs`, and mark every input cluster as consumed (no longer
    /// top-level).
    pub fn insert_method(
        &mut self,
        method: Method,
        inputs: Vec<ClusterId>,
        outputs: Vec<ClusterId>,
    ) -> Result<MethodId> {
        for &id in &inputs {
            self.cluster(id)?;
        }
        let method_id = MethodId(self.methods.len() as u32);
        for &input in &inputs {
            self.clusters[input.0 as usize].consumed_by = Some(method_id);
        }
        for &output in &outputs {
            self.clusters[output.0 as usize].produced_by = Some(method_id);
        }
        self.methods.push(MethodNode { method, inputs, outputs });
        Ok(method_id)
    }

    /// The cluster stored at `id`.
    pub fn cluster(&self, id: ClusterId) -> Result<&Cluster> {
        self.clusters
            .get(id.0 as usize)
            .filter(|n| !n.removed)
            .map(|n| &n.cluster)
            .ok_or(Error::UnknownCluster { cluster: id })
    }

    /// The method stored at `id`.
    pub fn method(&self, id: MethodId) -> Result<&Method> {
        self.methods.get(id.0 as usize).map(|n| &n.method).ok_or(Error::UnknownMethod { method: id })
    }

    /// The inputs a method consumed.
    pub fn method_inputs(&self, id: MethodId) -> Result<&[ClusterId]> {
        self.methods
            .get(id.0 as usize)
            .map(|n| n.inputs.as_slice())
            .ok_or(Error::UnknownMethod { method: id })
    }

    /// The outputs a method produced.
    pub fn method_outputs(&self, id: MethodId) -> Result<&[ClusterId]> {
        self.methods
            .get(id.0 as usize)
            .map(|n| n.outputs.as_slice())
            .ok_or(Error::UnknownMethod { method: id })
    }

    /// The id of an existing cluster structurally identical to `cluster`,
    /// if one has already been inserted. Used by `search`/`derive` to avoid
    /// re-deriving (and re-recording a method for) a cluster the graph
    /// already has.
    pub fn find_cluster(&self, cluster: &Cluster) -> Option<ClusterId> {
        self.by_cluster_value.get(cluster).copied()
    }

    /// The method that consumed `id` as an input, if any. Every cluster has
    /// at most one consumer: the instant it is read by a method it leaves
    /// the top-level set for good.
    pub fn consumer(&self, id: ClusterId) -> Option<MethodId> {
        self.clusters.get(id.0 as usize).filter(|n| !n.removed).and_then(|n| n.consumed_by)
    }

    /// Whether `id` names a cluster that has not yet been consumed by any
    /// method — the top-level set the search engine scans.
    ///
    /// `MergeCH`/`MergeBH` (absorb-hog) are the one pair of rules whose
    /// output always has exactly the same vars as their rigid/balloon
    /// input, so `id` can be both that method's input *and* its output:
    /// a cluster in that position is still searchable (it just absorbed a
    /// hog, nothing about its own membership changed), so it only counts as
    /// consumed when its consuming method produced something other than
    /// itself.
    pub fn is_top_level(&self, id: ClusterId) -> bool {
        let Some(node) = self.clusters.get(id.0 as usize) else { return false };
        if node.removed {
            return false;
        }
        match node.consumed_by {
            None => true,
            Some(mid) => self.methods.get(mid.0 as usize).map_or(true, |m| m.outputs.contains(&id)),
        }
    }

    /// Every cluster id currently at the top level.
    pub fn top_level(&self) -> impl Iterator<Item = ClusterId> + '_ {
        (0..self.clusters.len() as u32).map(ClusterId).filter(move |&id| self.is_top_level(id))
    }

    /// The top-level rigid clusters.
    pub fn top_level_rigids(&self) -> impl Iterator<Item = ClusterId> + '_ {
        self.rigids.iter().copied().filter(move |&id| self.is_top_level(id))
    }

    /// The top-level hedgehog clusters.
    pub fn top_level_hogs(&self) -> impl Iterator<Item = ClusterId> + '_ {
        self.hogs.iter().copied().filter(move |&id| self.is_top_level(id))
    }

    /// The top-level balloon clusters.
    pub fn top_level_balloons(&self) -> impl Iterator<Item = ClusterId> + '_ {
        self.balloons.iter().copied().filter(move |&id| self.is_top_level(id))
    }

    /// Every cluster incident on `var`.
    pub fn clusters_with_var(&self, var: Var) -> impl Iterator<Item = ClusterId> + '_ {
        self.var_incidence.get(&var).into_iter().flatten().copied()
    }

    /// Remove `id` and cascade: any method that consumed it, and any
    /// cluster that method produced, is also removed, recursively, so that
    /// no surviving method is left referencing a vanished input.
    pub fn remove(&mut self, id: ClusterId) {
        let mut to_remove_clusters = vec![id];
        let mut removed_clusters = HashSet::new();
        let mut removed_methods = HashSet::new();

        while let Some(cid) = to_remove_clusters.pop() {
            if !removed_clusters.insert(cid) {
                continue;
            }
            // Any method this cluster fed as an input must go too, along
            // with everything *that* method produced.
            for (i, node) in self.methods.iter().enumerate() {
                let mid = MethodId(i as u32);
                if removed_methods.contains(&mid) {
                    continue;
                }
                if node.inputs.contains(&cid) {
                    removed_methods.insert(mid);
                    to_remove_clusters.extend(node.outputs.iter().copied());
                }
            }
        }

        // Nodes are never compacted out of the arena, so every ClusterId /
        // MethodId already handed out elsewhere stays valid; a removed
        // cluster is simply dropped from every index that would otherwise
        // let search or `contains_root` find it again.
        for &cid in &removed_clusters {
            let idx = cid.0 as usize;
            if idx >= self.clusters.len() {
                continue;
            }
            let node = &self.clusters[idx];
            self.by_cluster_value.remove(&node.cluster);
            for v in node.cluster.vars() {
                if let Some(set) = self.var_incidence.get_mut(&v) {
                    set.remove(&cid);
                }
            }
            self.rigids.remove(&cid);
            self.hogs.remove(&cid);
            self.balloons.remove(&cid);
            self.clusters[idx].removed = true;
        }
        for &mid in &removed_methods {
            if let Some(node) = self.methods.get_mut(mid.0 as usize) {
                node.inputs.clear();
                node.outputs.clear();
            }
        }
    }

    /// All clusters still live in the arena (excludes anything dropped by
    /// a cascading [`ClusterGraph::remove`]).
    pub fn clusters(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.iter().filter(|n| !n.removed).map(|n| &n.cluster)
    }

    /// All methods currently in the arena.
    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.methods.iter().map(|n| &n.method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::Rigid;
    use crate::var::Var;

    fn v(i: u32) -> Var {
        Var::from_raw(i)
    }

    #[test]
    fn insert_cluster_dedups_structurally_equal_clusters() {
        let mut g = ClusterGraph::new();
        let a = g.insert_cluster(Cluster::Rigid(Rigid::new([v(0), v(1)])));
        let b = g.insert_cluster(Cluster::Rigid(Rigid::new([v(1), v(0)])));
        assert_eq!(a, b);
        assert_eq!(g.clusters().count(), 1);
    }

    #[test]
    fn new_cluster_is_top_level() {
        let mut g = ClusterGraph::new();
        let id = g.insert_cluster(Cluster::Rigid(Rigid::singleton(v(0))));
        assert!(g.is_top_level(id));
        assert_eq!(g.top_level().collect::<Vec<_>>(), vec![id]);
    }

    #[test]
    fn consuming_a_cluster_in_any_method_removes_it_from_top_level() {
        let mut g = ClusterGraph::new();
        let a = g.insert_cluster(Cluster::Rigid(Rigid::singleton(v(0))));
        let b = g.insert_cluster(Cluster::Rigid(Rigid::singleton(v(1))));
        let out = g.insert_cluster(Cluster::Rigid(Rigid::new([v(0), v(1)])));
        let method = Method::test_stub();
        g.insert_method(method, vec![a, b], vec![out]).unwrap();

        assert!(!g.is_top_level(a));
        assert!(!g.is_top_level(b));
        assert!(g.is_top_level(out));
    }

    #[test]
    fn remove_cascades_to_dependent_methods_and_their_outputs() {
        let mut g = ClusterGraph::new();
        let a = g.insert_cluster(Cluster::Rigid(Rigid::singleton(v(0))));
        let b = g.insert_cluster(Cluster::Rigid(Rigid::singleton(v(1))));
        let out = g.insert_cluster(Cluster::Rigid(Rigid::new([v(0), v(1)])));
        g.insert_method(Method::test_stub(), vec![a, b], vec![out]).unwrap();

        g.remove(a);
        assert!(!g.by_cluster_value.contains_key(&Cluster::Rigid(Rigid::new([v(0), v(1)]))));
    }

    #[test]
    fn clusters_with_var_finds_all_incident_clusters() {
        let mut g = ClusterGraph::new();
        let a = g.insert_cluster(Cluster::Rigid(Rigid::new([v(0), v(1)])));
        let b = g.insert_cluster(Cluster::Rigid(Rigid::new([v(1), v(2)])));
        let found: HashSet<_> = g.clusters_with_var(v(1)).collect();
        assert_eq!(found, [a, b].into_iter().collect());
    }
}
