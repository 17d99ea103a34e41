use serde::{Deserialize, Serialize};

/// What happened to one cluster this frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ClusterOutcome {
    /// Solution written back. Zero iterations when nothing needed minimizing.
    Converged { iterations: usize },
    /// Result discarded; the cluster keeps its previous values.
    HitIterationCap { iterations: usize },
    Diverged { reason: String },
}

impl ClusterOutcome {
    pub fn is_converged(&self) -> bool {
        matches!(self, Self::Converged { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterReport {
    pub constraint_count: usize,
    /// Number of scalars handed to the minimizer.
    pub input_count: usize,
    #[serde(flatten)]
    pub outcome: ClusterOutcome,
}

/// Result of one `solve()` frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolveReport {
    pub clusters: Vec<ClusterReport>,
}

impl SolveReport {
    pub fn all_converged(&self) -> bool {
        self.clusters.iter().all(|c| c.outcome.is_converged())
    }

    pub fn skipped(&self) -> usize {
        self.clusters
            .iter()
            .filter(|c| matches!(c.outcome, ClusterOutcome::HitIterationCap { .. }))
            .count()
    }
}
