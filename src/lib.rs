/*!
This crate provides a 2D geometric constraint solver built around
cluster rewriting: instead of solving a system of equations directly, it
repeatedly recognizes (via pattern matching) and merges clusters of
points for which the relative geometry is already fully determined,
until the whole configuration collapses into one cluster (or gets as
far as the given constraints allow).

The approach — and the terminology (`Rigid`, `Hedgehog`, `Balloon`, the
`Merge*`/`Balloon*` rewrite rules) — follows the geometric constraint
solving literature on cluster rewriting.

# Overview

The most important parts of this crate are as follows:

* [`ClusterSolver`] is the engine a host builds up incrementally: add
  clusters with [`ClusterSolver::add`], supply numeric witnesses with
  [`ClusterSolver::set`], and read back results with
  [`ClusterSolver::get`].
* [`Cluster`] (and its variants [`Rigid`], [`Hedgehog`], [`Balloon`])
  describes what has been geometrically determined about a set of
  points.
* [`Method`] records how a cluster was derived — which rewrite rule
  fired and from which inputs — and can [`Method::execute`] that
  derivation numerically given witnesses for its inputs.
* [`Configuration`] is a concrete numeric witness: an assignment of 2D
  points to variables.

# Usage

Add this to your `Cargo.toml`:

```text
[dependencies]
geocluster = "0.1"
```

# Example

A right triangle: fix two points, constrain the third by distance to
one and a right angle to the other, and watch the three points merge
into a single rigid cluster.

```
use geocluster::{ClusterSolver, Cluster, Rigid};

let mut solver = ClusterSolver::new();
let a = solver.var("a");
let b = solver.var("b");
let c = solver.var("c");

solver.add(Cluster::Rigid(Rigid::new([a, b]))).unwrap();
solver.add(Cluster::Rigid(Rigid::new([b, c]))).unwrap();
solver.add(Cluster::Rigid(Rigid::new([a, c]))).unwrap();

// All three points are now known to lie in one rigid cluster.
assert!(solver.clusters().any(|cluster| cluster.len() == 3));
```

# Testing

The testing in this crate is made up of unit tests on the individual
geometric primitives (distance/angle sub-solvers, cluster/graph
bookkeeping) and integration tests that drive the public
[`ClusterSolver`] API through the worked scenarios the rule set is
meant to handle, plus a quickcheck property checking that
[`ClusterSolver::saturate`] reaches the same fixed point regardless of
the order clusters are added in.
*/

#![deny(missing_docs)]

mod cluster;
mod config;
mod derive;
mod error;
mod geom;
mod graph;
mod method;
mod search;
pub mod select;
mod solver;
mod trace;
mod var;

pub use crate::cluster::{Balloon, Cluster, Hedgehog, Rigid};
pub use crate::config::Configuration;
pub use crate::error::{Error, Result};
pub use crate::geom::Vec2;
pub use crate::graph::{ClusterId, MethodId};
pub use crate::method::{Method, MethodKind};
pub use crate::select::{NotAcute, NotClockwise, NotCounterClockwise, NotObtuse, SelectionConstraint};
pub use crate::solver::ClusterSolver;
pub use crate::var::{Var, VarTable};
