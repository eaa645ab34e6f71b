//! The public façade: [`ClusterSolver`] ties variable interning, the
//! cluster/method graph, and numeric configurations together into the one
//! object a host actually drives.
//!
//! Two responsibilities live here that don't belong in [`crate::graph`] or
//! [`crate::search`]: the scratch/commit discipline that makes a failed
//! `add` roll back cleanly (structural errors must undo any emissions from
//! the same failed search pass), and [`propagate`], which pushes a
//! newly-set [`Configuration`] list downstream through exactly one
//! consuming method at a time — the graph's single-consumer invariant means
//! there is never more than one method to fan out to per cluster.

use std::collections::{HashMap, VecDeque};

use crate::cluster::Cluster;
use crate::config::Configuration;
use crate::error::Result;
use crate::graph::{ClusterGraph, ClusterId, MethodId};
use crate::method::Method;
use crate::search;
use crate::trace::{debug, trace};
use crate::var::{Var, VarTable};

/// The cluster-rewriting engine a host builds up incrementally: clusters and
/// their numeric witnesses are added one at a time rather than solved for
/// all at once from a single system of equations.
#[derive(Clone, Debug, Default)]
pub struct ClusterSolver {
    vars: VarTable,
    graph: ClusterGraph,
    root: Option<Var>,
    configs: HashMap<ClusterId, Vec<Configuration>>,
}

impl ClusterSolver {
    /// A solver with no variables, clusters, or root.
    pub fn new() -> ClusterSolver {
        ClusterSolver::default()
    }

    /// Intern `name`, returning its [`Var`] (creating one if this is the
    /// first time `name` has been seen).
    pub fn var(&mut self, name: impl Into<String>) -> Var {
        self.vars.intern(name)
    }

    /// Look up an already-interned variable by name.
    pub fn find_var(&self, name: &str) -> Option<Var> {
        self.vars.get(name)
    }

    /// The display name of `var`.
    pub fn var_name(&self, var: Var) -> &str {
        self.vars.name(var)
    }

    /// The designated root variable, if one has been set. Preferred as the
    /// frame-defining input whenever a merge rule needs to pick an
    /// orientation between two otherwise-symmetric inputs.
    pub fn root(&self) -> Option<Var> {
        self.root
    }

    /// Designate `var` as the root, preferring clusters that contain it as
    /// the frame-defining input of a merge.
    pub fn set_root(&mut self, var: Var) {
        self.root = Some(var);
    }

    /// Add `cluster` to the graph and run the rule-matching search to
    /// saturation from that one starting point, in FIFO order over every
    /// cluster the search derives along the way.
    ///
    /// A no-op, returning the existing id, if a structurally identical
    /// cluster is already present. On any structural error the whole pass
    /// is rolled back: nothing this call would have emitted is left behind.
    pub fn add(&mut self, cluster: Cluster) -> Result<ClusterId> {
        if let Some(existing) = self.graph.find_cluster(&cluster) {
            return Ok(existing);
        }
        let mut scratch = self.graph.clone();
        let id = scratch.insert_cluster(cluster);
        trace!("add: inserted cluster {:?}", id);

        let mut queue: VecDeque<ClusterId> = VecDeque::new();
        queue.push_back(id);
        while let Some(next) = queue.pop_front() {
            if !scratch.is_top_level(next) {
                continue;
            }
            search::search(&mut scratch, next, self.root, &mut queue)?;
        }

        debug!("add: search pass committed, {} clusters total", scratch.clusters().count());
        self.graph = scratch;
        Ok(id)
    }

    /// Remove `id` and everything that cascades from it.
    pub fn remove(&mut self, id: ClusterId) {
        self.graph.remove(id);
        self.configs.remove(&id);
    }

    /// Supply candidate numeric configurations for `id`, then propagate
    /// them through whichever method consumes `id`, and recursively through
    /// every method downstream of that.
    pub fn set(&mut self, id: ClusterId, configurations: Vec<Configuration>) -> Result<()> {
        self.graph.cluster(id)?;
        self.configs.insert(id, configurations);
        self.propagate(id)
    }

    /// The candidate configurations currently stored for `id`, if any.
    pub fn get(&self, id: ClusterId) -> &[Configuration] {
        self.configs.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Run `id`'s consuming method (if any) against the configurations
    /// currently stored for all of its sibling inputs, storing and
    /// recursively propagating whatever comes out.
    ///
    /// A no-op if `id` isn't consumed by any method (it's still top-level),
    /// or if one of the method's other inputs has no configurations yet: a
    /// method is left un-evaluated until every input has at least been
    /// attempted.
    fn propagate(&mut self, id: ClusterId) -> Result<()> {
        let Some(method_id) = self.graph.consumer(id) else {
            return Ok(());
        };
        self.propagate_method(method_id)
    }

    fn propagate_method(&mut self, method_id: MethodId) -> Result<()> {
        let inputs = self.graph.method_inputs(method_id)?.to_vec();
        let outputs = self.graph.method_outputs(method_id)?.to_vec();
        let method: Method = *self.graph.method(method_id)?;

        let mut input_configs: Vec<&[Configuration]> = Vec::with_capacity(inputs.len());
        for &input in &inputs {
            match self.configs.get(&input) {
                Some(cs) if !cs.is_empty() => input_configs.push(cs),
                _ => return Ok(()),
            }
        }

        let output_clusters: Vec<Cluster> =
            outputs.iter().map(|&o| self.graph.cluster(o).cloned()).collect::<Result<_>>()?;

        // Every candidate (including mirror-ambiguous pairs) is kept here:
        // selection among them is reserved to the host, via
        // `Method::prototype_constraints` and `select::filter_solutions` —
        // the engine itself never reduces a method's output list.
        let mut results = Vec::new();
        for combo in cartesian_product(&input_configs) {
            let produced = method.execute(&combo, &output_clusters);
            results.extend(produced);
        }
        trace!("propagate: method {:?} produced {} configurations", method_id, results.len());

        if let Some(&output_id) = outputs.first() {
            self.configs.insert(output_id, results);
            // MergeCH/MergeBH (absorb-hog) are their own output: `output_id`
            // is still consumed by `method_id` itself afterwards (it stays
            // top-level per `ClusterGraph::is_top_level`'s self-output
            // carve-out), so recursing into `propagate` again would just
            // re-run this same method forever on an unchanged result.
            if self.graph.consumer(output_id) != Some(method_id) {
                self.propagate(output_id)?;
            }
        }
        Ok(())
    }

    /// Every cluster at the top level right now.
    pub fn top_level(&self) -> impl Iterator<Item = ClusterId> + '_ {
        self.graph.top_level()
    }

    /// Whether `cluster` (by structural value, not id) contains the root
    /// variable.
    pub fn contains_root(&self, cluster: &Cluster) -> bool {
        match self.root {
            Some(root) => cluster.vars().contains(&root),
            None => false,
        }
    }

    /// Every method recorded so far.
    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.graph.methods()
    }

    /// Every cluster recorded so far (including ones no longer top-level).
    pub fn clusters(&self) -> impl Iterator<Item = &Cluster> {
        self.graph.clusters()
    }

    /// Re-run the search pass against every currently top-level cluster,
    /// repeating until a full pass fires no new method — a confluence
    /// closure, distinct from `add`'s single from-one-cluster search.
    ///
    /// `add` only ever searches starting from the cluster(s) it itself
    /// inserts, in the order they were derived; `saturate` exists for hosts
    /// that want every *already present* top-level cluster re-examined
    /// against each other, e.g. after `set_root` changes which inputs are
    /// preferred.
    pub fn saturate(&mut self) -> Result<()> {
        loop {
            let before = self.graph.methods().count();
            let mut scratch = self.graph.clone();
            let mut queue: VecDeque<ClusterId> = scratch.top_level().collect();
            while let Some(next) = queue.pop_front() {
                if !scratch.is_top_level(next) {
                    continue;
                }
                search::search(&mut scratch, next, self.root, &mut queue)?;
            }
            let after = scratch.methods().count();
            self.graph = scratch;
            if after == before {
                return Ok(());
            }
        }
    }
}

/// The cartesian product of several candidate-configuration lists, one per
/// method input, in input order — every combination of the inputs'
/// witnesses gets a turn through the method's executor.
fn cartesian_product(lists: &[&[Configuration]]) -> Vec<Vec<Configuration>> {
    let mut result: Vec<Vec<Configuration>> = vec![Vec::new()];
    for list in lists {
        let mut next = Vec::with_capacity(result.len() * list.len());
        for partial in &result {
            for item in list.iter() {
                let mut combo = partial.clone();
                combo.push(item.clone());
                next.push(combo);
            }
        }
        result = next;
    }
    result
}
