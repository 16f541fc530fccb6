//! Error taxonomy for the autoscaler control loop.

use thiserror::Error;

/// Errors that can surface from a single tick of the control loop.
///
/// `SizingViolation` and `ShrinkVeto` from the design are deliberately not
/// variants here: both are expected, non-fatal outcomes (a warning log plus a
/// clamp), not failures. Only conditions that abort a tick are represented.
#[derive(Error, Debug)]
pub enum AutoscalerError {
    #[error("failed to read cluster snapshot from orchestrator: {0}")]
    ClusterSnapshot(#[source] anyhow::Error),

    #[error("failed to resolve ASG topology for instance ids: {0}")]
    AsgTopology(#[source] anyhow::Error),

    #[error("failed to read ASG specs from cloud provider: {0}")]
    AsgSpecs(#[source] anyhow::Error),

    #[error("failed to read scaling activities for ASG {asg}: {source}")]
    ScalingActivities {
        asg: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to set desired capacity for ASG {asg} to {desired}: {source}")]
    SetDesiredCapacity {
        asg: String,
        desired: i64,
        #[source]
        source: anyhow::Error,
    },

    #[error("could not parse resource quantity {0:?}")]
    InvalidQuantity(String),
}

pub type Result<T> = std::result::Result<T, AutoscalerError>;
