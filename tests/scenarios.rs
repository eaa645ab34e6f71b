//! Integration tests driving [`ClusterSolver`] through a handful of worked
//! scenarios, plus a round-trip and an order-independence property.

use std::collections::BTreeSet;

use geocluster::{
    select, Balloon, Cluster, ClusterSolver, Configuration, Hedgehog, Method, MethodKind, Rigid,
    SelectionConstraint, Var, Vec2,
};

fn triangle_vars(solver: &mut ClusterSolver) -> (Var, Var, Var) {
    (solver.var("a"), solver.var("b"), solver.var("c"))
}

// Scenario 1: right triangle, Merge3C.
#[test]
fn right_triangle_merges_via_merge3c() {
    let mut solver = ClusterSolver::new();
    let (a, b, c) = triangle_vars(&mut solver);

    let ab = solver.add(Cluster::Rigid(Rigid::new([a, b]))).unwrap();
    let bc = solver.add(Cluster::Rigid(Rigid::new([b, c]))).unwrap();
    let ac = solver.add(Cluster::Rigid(Rigid::new([a, c]))).unwrap();

    // Re-adding the would-be merged cluster is a no-op that hands back its
    // id, which also gives us a handle on the Merge3C output without
    // walking the graph by hand.
    let merged = solver.add(Cluster::Rigid(Rigid::new([a, b, c]))).unwrap();

    assert_eq!(solver.top_level().count(), 1);
    assert!(solver.top_level().any(|id| id == merged));
    assert!(solver.methods().any(|m| matches!(m.kind, MethodKind::Merge3C { .. })));

    // An equilateral triangle of side 2: distances, not absolute placement,
    // are all `execute_merge3c` reads out of each input configuration.
    let mut c_ab = Configuration::new();
    c_ab.set(a, Vec2::new(0.0, 0.0));
    c_ab.set(b, Vec2::new(2.0, 0.0));
    solver.set(ab, vec![c_ab]).unwrap();

    let mut c_bc = Configuration::new();
    c_bc.set(b, Vec2::new(0.0, 0.0));
    c_bc.set(c, Vec2::new(2.0, 0.0));
    solver.set(bc, vec![c_bc]).unwrap();

    let mut c_ac = Configuration::new();
    c_ac.set(a, Vec2::new(0.0, 0.0));
    c_ac.set(c, Vec2::new(2.0, 0.0));
    solver.set(ac, vec![c_ac]).unwrap();

    // The engine itself never reduces the mirror-ambiguous pair: both
    // solutions are kept until a host filters them.
    let raw = solver.get(merged);
    assert_eq!(raw.len(), 2);

    let method: &Method = solver.methods().find(|m| matches!(m.kind, MethodKind::Merge3C { .. })).unwrap();
    let constraints: Vec<Box<dyn SelectionConstraint>> = method.prototype_constraints();
    assert_eq!(constraints.len(), 2);

    // NotCounterClockwise and NotClockwise each pick out exactly one of the
    // two mirror solutions; applied one at a time (never ANDed together,
    // which would reject both for a non-degenerate triangle) each narrows
    // the pair down to a single, distinct configuration.
    let cw: Vec<Configuration> = select::filter_solutions(raw.to_vec(), &constraints[..1]);
    let ccw: Vec<Configuration> = select::filter_solutions(raw.to_vec(), &constraints[1..]);
    assert_eq!(cw.len(), 1);
    assert_eq!(ccw.len(), 1);
    assert_ne!(cw[0].get(c), ccw[0].get(c));
}

// Scenario 2: hog absorption.
#[test]
fn hog_absorption_marks_hog_non_top_level_and_adds_no_vars() {
    let mut solver = ClusterSolver::new();
    let (a, b, c) = triangle_vars(&mut solver);

    let rigid = solver.add(Cluster::Rigid(Rigid::new([a, b, c]))).unwrap();
    let hog = solver.add(Cluster::Hedgehog(Hedgehog::new(a, [b, c]).unwrap())).unwrap();

    // The rigid absorbs the hog (MergeCH); the rigid itself is still
    // searchable afterwards, the hog is not.
    assert!(solver.top_level().any(|id| id == rigid));
    assert!(!solver.top_level().any(|id| id == hog));
    assert_eq!(solver.top_level().count(), 1);

    assert!(solver.methods().any(|m| m.kind == MethodKind::MergeCH));

    let vars: BTreeSet<Var> = [a, b, c].into_iter().collect();
    assert!(solver.clusters().any(|cl| cl.vars() == vars));
    // No fourth variable was interned or introduced by the merge.
    assert_eq!(solver.clusters().flat_map(|cl| cl.vars()).collect::<BTreeSet<_>>(), vars);
}

// Scenario 3: two hedgehogs sharing a spoke determine a balloon.
#[test]
fn hog_hog_balloon_via_balloon_from_hogs() {
    let mut solver = ClusterSolver::new();
    let (a, b, c) = triangle_vars(&mut solver);

    let hog_a = solver.add(Cluster::Hedgehog(Hedgehog::new(a, [b, c]).unwrap())).unwrap();
    let hog_b = solver.add(Cluster::Hedgehog(Hedgehog::new(b, [a, c]).unwrap())).unwrap();

    let vars: BTreeSet<Var> = [a, b, c].into_iter().collect();
    assert!(solver.clusters().any(|cl| matches!(cl, Cluster::Balloon(_)) && cl.vars() == vars));
    assert!(!solver.top_level().any(|id| id == hog_a));
    assert!(!solver.top_level().any(|id| id == hog_b));
    assert_eq!(solver.top_level().count(), 1);
    assert!(solver.methods().any(|m| matches!(m.kind, MethodKind::BalloonFromHogs { .. })));
}

// Scenario 4: cluster-hog-cluster, unique solution.
#[test]
fn three_way_chc_yields_a_single_solution() {
    let mut solver = ClusterSolver::new();
    let (a, b, c) = triangle_vars(&mut solver);

    let ab = solver.add(Cluster::Rigid(Rigid::new([a, b]))).unwrap();
    let bc = solver.add(Cluster::Rigid(Rigid::new([b, c]))).unwrap();
    let hog = solver.add(Cluster::Hedgehog(Hedgehog::new(b, [a, c]).unwrap())).unwrap();

    let merged = solver.add(Cluster::Rigid(Rigid::new([a, b, c]))).unwrap();
    assert!(solver.methods().any(|m| matches!(m.kind, MethodKind::MergeCHC { .. })));

    let mut c_ab = Configuration::new();
    c_ab.set(a, Vec2::new(0.0, 0.0));
    c_ab.set(b, Vec2::new(2.0, 0.0));
    solver.set(ab, vec![c_ab]).unwrap();

    let mut c_bc = Configuration::new();
    c_bc.set(b, Vec2::new(0.0, 0.0));
    c_bc.set(c, Vec2::new(3.0, 0.0));
    solver.set(bc, vec![c_bc]).unwrap();

    // Right angle at b between a and c.
    let mut c_hog = Configuration::new();
    c_hog.set(a, Vec2::new(1.0, 0.0));
    c_hog.set(b, Vec2::new(0.0, 0.0));
    c_hog.set(c, Vec2::new(0.0, 1.0));
    solver.set(hog, vec![c_hog]).unwrap();

    let results = solver.get(merged);
    assert_eq!(results.len(), 1);
    let vars: BTreeSet<Var> = [a, b, c].into_iter().collect();
    assert_eq!(results[0].vars().collect::<BTreeSet<_>>(), vars);
}

// Scenario 5: cluster-cluster-hog, mirror pair disambiguated by NotAcute /
// NotObtuse.
#[test]
fn cch_scenario_yields_mirror_pair_disambiguated_by_angle_sign() {
    let mut solver = ClusterSolver::new();
    let (a, b, c) = triangle_vars(&mut solver);

    let ab = solver.add(Cluster::Rigid(Rigid::new([a, b]))).unwrap();
    let bc = solver.add(Cluster::Rigid(Rigid::new([b, c]))).unwrap();
    // Hog centered at `a`, which only belongs to `ab`, not `bc`.
    let hog = solver.add(Cluster::Hedgehog(Hedgehog::new(a, [b, c]).unwrap())).unwrap();

    let merged = solver.add(Cluster::Rigid(Rigid::new([a, b, c]))).unwrap();
    assert!(solver.methods().any(|m| matches!(m.kind, MethodKind::MergeCCH { .. })));

    // Chosen so the angle-distance-distance sub-solver's ray actually
    // crosses its circle twice (both intersections ahead of the ray's
    // origin) instead of just grazing it once: d(a,b)=10, d(b,c)=9, and a
    // 60 degree angle at `a` between `c` and `b`.
    let mut c_ab = Configuration::new();
    c_ab.set(a, Vec2::new(0.0, 0.0));
    c_ab.set(b, Vec2::new(10.0, 0.0));
    solver.set(ab, vec![c_ab]).unwrap();

    let mut c_bc = Configuration::new();
    c_bc.set(b, Vec2::new(0.0, 0.0));
    c_bc.set(c, Vec2::new(9.0, 0.0));
    solver.set(bc, vec![c_bc]).unwrap();

    let mut c_hog = Configuration::new();
    c_hog.set(a, Vec2::new(0.0, 0.0));
    c_hog.set(b, Vec2::new(1.0, 0.0));
    c_hog.set(c, Vec2::new(0.5, 3f64.sqrt() / 2.0));
    solver.set(hog, vec![c_hog]).unwrap();

    let raw = solver.get(merged).to_vec();
    assert_eq!(raw.len(), 2);

    let method = solver.methods().find(|m| matches!(m.kind, MethodKind::MergeCCH { .. })).unwrap();
    let constraints = method.prototype_constraints();
    assert_eq!(constraints.len(), 2);

    let not_acute = select::filter_solutions(raw.clone(), &constraints[..1]);
    let not_obtuse = select::filter_solutions(raw.clone(), &constraints[1..]);
    assert_eq!(not_acute.len(), 1);
    assert_eq!(not_obtuse.len(), 1);
    assert_ne!(not_acute[0].get(c), not_obtuse[0].get(c));
}

// Scenario 6: balloon-rigid scale merge, unique solution.
#[test]
fn balloon_rigid_merge_fixes_scale() {
    let mut solver = ClusterSolver::new();
    let (a, b, c) = triangle_vars(&mut solver);

    let rigid = solver.add(Cluster::Rigid(Rigid::new([a, b]))).unwrap();
    let balloon = solver.add(Cluster::Balloon(Balloon::new([a, b, c]))).unwrap();

    let merged = solver.add(Cluster::Rigid(Rigid::new([a, b, c]))).unwrap();
    assert!(solver.methods().any(|m| m.kind == MethodKind::BalloonRigidMerge));

    let mut c_rigid = Configuration::new();
    c_rigid.set(a, Vec2::new(0.0, 0.0));
    c_rigid.set(b, Vec2::new(2.0, 0.0));
    solver.set(rigid, vec![c_rigid]).unwrap();

    let mut c_balloon = Configuration::new();
    c_balloon.set(a, Vec2::new(0.0, 0.0));
    c_balloon.set(b, Vec2::new(1.0, 0.0));
    c_balloon.set(c, Vec2::new(0.0, 1.0));
    solver.set(balloon, vec![c_balloon]).unwrap();

    let results = solver.get(merged);
    assert_eq!(results.len(), 1);
    // The rigid's d(a,b)=2 against the balloon's d(a,b)=1 fixes the scale
    // factor at 2, so c's unit offset doubles.
    let p = results[0].get(c).unwrap();
    assert!((p.x - 0.0).abs() < 1e-9);
    assert!((p.y - 2.0).abs() < 1e-9);
}

#[test]
fn remove_then_readd_restores_the_cluster_and_researches() {
    let mut solver = ClusterSolver::new();
    let (a, b, c) = triangle_vars(&mut solver);

    let ab = solver.add(Cluster::Rigid(Rigid::new([a, b]))).unwrap();
    solver.add(Cluster::Rigid(Rigid::new([b, c]))).unwrap();
    solver.add(Cluster::Rigid(Rigid::new([a, c]))).unwrap();
    let merged_vars: BTreeSet<Var> = [a, b, c].into_iter().collect();
    assert!(solver.clusters().any(|cl| cl.vars() == merged_vars));

    // Removing one leg cascades away the Merge3C output.
    solver.remove(ab);
    assert!(!solver.clusters().any(|cl| cl.vars() == merged_vars));

    // Re-adding it restores the cluster and re-triggers the merge.
    let ab_again = solver.add(Cluster::Rigid(Rigid::new([a, b]))).unwrap();
    assert!(solver.clusters().any(|cl| cl.vars() == merged_vars));
    assert_ne!(ab_again, ab); // a fresh arena slot, not the removed one.
}

#[test]
fn hedgehog_with_fewer_than_two_spokes_is_rejected() {
    let mut solver = ClusterSolver::new();
    let a = solver.var("a");
    let b = solver.var("b");
    assert!(Hedgehog::new(a, [b]).is_err());
}

// saturate() should reach the same fixed point regardless of the order
// clusters were added in.
#[cfg(test)]
mod saturate_order_independence {
    use super::*;

    fn permutation_of_three(seed: u8) -> [usize; 3] {
        const PERMS: [[usize; 3]; 6] = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
        PERMS[(seed % 6) as usize]
    }

    quickcheck::quickcheck! {
        fn saturate_is_order_independent(seed: u8) -> bool {
            let order = permutation_of_three(seed);
            let mut solver = ClusterSolver::new();
            let a = solver.var("a");
            let b = solver.var("b");
            let c = solver.var("c");
            let rigids = [
                Cluster::Rigid(Rigid::new([a, b])),
                Cluster::Rigid(Rigid::new([b, c])),
                Cluster::Rigid(Rigid::new([a, c])),
            ];
            for &i in &order {
                solver.add(rigids[i].clone()).unwrap();
            }
            solver.saturate().unwrap();

            let merged: BTreeSet<Var> = [a, b, c].into_iter().collect();
            solver.top_level().count() == 1 && solver.clusters().any(|cl| cl.vars() == merged)
        }
    }
}
