//! Orchestrator and cloud-provider boundaries (§4.9).
//!
//! The control loop depends only on these traits; `kube_cluster` and
//! `aws_asg` are the concrete implementations wired up in `main`.

mod aws_asg;
mod kube_cluster;

pub use aws_asg::AwsAsgApi;
pub use kube_cluster::KubeClusterApi;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{AsgSpec, NodeRecord, ScalingActivity, WorkloadRecord};

/// Reads the current set of nodes and workloads from the orchestrator.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn list_nodes(&self) -> Result<Vec<NodeRecord>>;
    async fn list_workloads(&self) -> Result<Vec<WorkloadRecord>>;
}

/// One cloud instance's membership in an auto scaling group, as returned by
/// `describe_auto_scaling_instances` before it's folded into a `NodeRecord`.
#[derive(Debug, Clone)]
pub struct AsgMembership {
    pub instance_id: String,
    pub asg_name: String,
    pub availability_zone: String,
    pub lifecycle_state: String,
}

/// Reads and mutates auto scaling group state in the cloud provider.
#[async_trait]
pub trait CloudAsgApi: Send + Sync {
    async fn describe_auto_scaling_instances(
        &self,
        instance_ids: &[String],
    ) -> Result<Vec<AsgMembership>>;

    async fn describe_auto_scaling_groups(&self, names: &[String]) -> Result<Vec<AsgSpec>>;

    async fn describe_scaling_activities(&self, asg: &str) -> Result<Vec<ScalingActivity>>;

    async fn set_desired_capacity(&self, asg: &str, desired: i64) -> Result<()>;
}

/// Splits `items` into chunks of at most `size`, matching the cloud API's
/// request limit for batched describe calls.
pub fn chunks<T: Clone>(items: &[T], size: usize) -> Vec<Vec<T>> {
    items.chunks(size.max(1)).map(|c| c.to_vec()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunking_splits_at_exact_boundary() {
        let ids: Vec<u32> = (0..101).collect();
        let chunked = chunks(&ids, 50);
        assert_eq!(chunked.len(), 3);
        assert_eq!(chunked[0].len(), 50);
        assert_eq!(chunked[1].len(), 50);
        assert_eq!(chunked[2].len(), 1);
    }

    #[test]
    fn chunking_single_chunk_when_under_limit() {
        let ids: Vec<u32> = (0..10).collect();
        assert_eq!(chunks(&ids, 50).len(), 1);
    }
}
