//! Per-frame solving: cluster partition, known-value propagation and the
//! numeric minimization of whatever remains.

pub mod cluster;
pub mod knowns;
pub mod minimizer;
pub mod result;
pub mod solve;

#[cfg(test)]
mod tests_clusters;
#[cfg(test)]
mod tests_knowns;
#[cfg(test)]
mod tests_minimizer;

pub use cluster::{build_clusters, link_relationships, Cluster};
pub use knowns::{compute_knowns, Knowns};
pub use minimizer::{Bfgs, MinimizeStatus, Minimization, Minimizer};
pub use result::{ClusterOutcome, ClusterReport, SolveReport};
pub use solve::solve_cluster;
