use std::error;
use std::fmt;

use crate::graph::{ClusterId, MethodId};
use crate::var::Var;

/// The result type used throughout this crate.
pub type Result<T> = ::std::result::Result<T, Error>;

/// An error that occurs when building or rewriting a cluster graph.
///
/// Every variant corresponds to a structural precondition violation that
/// aborts the `add` call that discovered it (see `ClusterSolver::add`).
/// Numeric degeneracies (under-constrained results, overconstrained merges,
/// empty solution sets) are *not* represented here: they are recorded on the
/// `Configuration`/`Method` values themselves, since they are valid outcomes
/// of a geometric search rather than failures of the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// A hedgehog was constructed with fewer than two spokes.
    ///
    /// A hedgehog with zero or one spoke carries no angular information and
    /// cannot participate in any of the merge rules in `search`.
    HedgehogTooFewSpokes {
        /// The hedgehog's center variable.
        cvar: Var,
        /// The number of spokes it was given.
        spoke_count: usize,
    },
    /// A hedgehog's center variable was also listed among its spokes.
    HedgehogCenterInSpokes {
        /// The offending center variable.
        cvar: Var,
    },
    /// Two distinct clusters were both marked as the graph's root, which
    /// `ClusterSolver` forbids: only one cluster may anchor the frame.
    TwoRootClusters {
        /// The cluster already holding the root.
        a: ClusterId,
        /// The cluster that attempted to also claim it.
        b: ClusterId,
    },
    /// A hedgehog's center variable does not belong to the cluster it was
    /// derived from.
    HogCenterNotInCluster {
        /// The center variable that was missing.
        cvar: Var,
        /// The cluster it was expected to be a member of.
        cluster: ClusterId,
    },
    /// A merge produced a configuration that could not be fully constrained
    /// from the inputs given (distinct from the per-configuration
    /// `underconstrained` flag: this variant is for merges that cannot even
    /// attempt alignment, e.g. too few shared variables).
    UnderConstrainedMerge {
        /// A short, fixed description of which merge failed and why.
        detail: &'static str,
    },
    /// A method referenced a cluster id that is no longer present in the
    /// graph, typically because it was removed by a prior `remove` call.
    UnknownCluster {
        /// The dangling id.
        cluster: ClusterId,
    },
    /// A method id was referenced that is no longer present in the graph.
    UnknownMethod {
        /// The dangling id.
        method: MethodId,
    },
    /// A catch-all for a rule firing despite one of its own structural
    /// preconditions (e.g. a hedgehog's center expected in a cluster was
    /// absent) not holding. These indicate a bug in the rewrite rules
    /// themselves, not a bad problem instance, and abort the `add` call
    /// that triggered them.
    StructuralPrecondition {
        /// A short, fixed description of which precondition was violated.
        detail: &'static str,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::HedgehogTooFewSpokes { cvar, spoke_count } => write!(
                f,
                "hedgehog centered at {:?} has only {} spoke(s), need at least 2",
                cvar, spoke_count
            ),
            Error::HedgehogCenterInSpokes { cvar } => write!(
                f,
                "hedgehog center {:?} must not also appear among its own spokes",
                cvar
            ),
            Error::TwoRootClusters { a, b } => write!(
                f,
                "cannot mark {:?} as root, {:?} is already the root cluster",
                b, a
            ),
            Error::HogCenterNotInCluster { cvar, cluster } => write!(
                f,
                "hedgehog center {:?} is not a member of cluster {:?}",
                cvar, cluster
            ),
            Error::UnderConstrainedMerge { detail } => {
                write!(f, "merge is under-constrained: {}", detail)
            }
            Error::UnknownCluster { cluster } => {
                write!(f, "no such cluster: {:?}", cluster)
            }
            Error::UnknownMethod { method } => {
                write!(f, "no such method: {:?}", method)
            }
            Error::StructuralPrecondition { detail } => {
                write!(f, "rewriter structural precondition violated: {}", detail)
            }
        }
    }
}

impl error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_does_not_panic() {
        let errs = vec![
            Error::HedgehogTooFewSpokes { cvar: Var::from_raw(0), spoke_count: 1 },
            Error::HedgehogCenterInSpokes { cvar: Var::from_raw(0) },
            Error::TwoRootClusters { a: ClusterId::from_raw(0), b: ClusterId::from_raw(1) },
            Error::HogCenterNotInCluster { cvar: Var::from_raw(0), cluster: ClusterId::from_raw(0) },
            Error::UnderConstrainedMerge { detail: "too few anchors" },
            Error::UnknownCluster { cluster: ClusterId::from_raw(7) },
            Error::UnknownMethod { method: MethodId::from_raw(3) },
            Error::StructuralPrecondition { detail: "hog center not shared" },
        ];
        for e in &errs {
            assert!(!format!("{}", e).is_empty());
            assert!(!format!("{:?}", e).is_empty());
        }
    }
}
