//! ASG topology reader: resolves each node's owning ASG, zone and lifecycle
//! state from the cloud provider (§4.3).

use std::collections::HashMap;

use crate::clients::CloudAsgApi;
use crate::error::Result;
use crate::model::{AsgLifecycleState, NodeRecord};

/// Resolves ASG membership for every node, in place. Nodes whose instance id
/// the cloud provider does not recognize are dropped (ghost nodes).
pub async fn resolve_asg_topology(
    nodes: Vec<NodeRecord>,
    cloud: &dyn CloudAsgApi,
) -> Result<Vec<NodeRecord>> {
    let instance_ids: Vec<String> = nodes.iter().map(|n| n.instance_id.clone()).collect();
    let memberships = cloud.describe_auto_scaling_instances(&instance_ids).await?;

    let by_instance_id: HashMap<&str, _> = memberships
        .iter()
        .map(|m| (m.instance_id.as_str(), m))
        .collect();

    Ok(nodes
        .into_iter()
        .filter_map(|mut node| {
            let membership = by_instance_id.get(node.instance_id.as_str())?;
            node.asg_name = Some(membership.asg_name.clone());
            node.asg_lifecycle_state = Some(AsgLifecycleState::from(membership.lifecycle_state.as_str()));
            if !membership.availability_zone.is_empty() {
                node.zone = membership.availability_zone.clone();
            }
            Some(node)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::AsgMembership;
    use crate::model::{AsgSpec, ResourceTriple, ScalingActivity};
    use async_trait::async_trait;

    struct FakeCloud {
        memberships: Vec<AsgMembership>,
    }

    #[async_trait]
    impl CloudAsgApi for FakeCloud {
        async fn describe_auto_scaling_instances(
            &self,
            _instance_ids: &[String],
        ) -> Result<Vec<AsgMembership>> {
            Ok(self.memberships.clone())
        }
        async fn describe_auto_scaling_groups(&self, _names: &[String]) -> Result<Vec<AsgSpec>> {
            Ok(vec![])
        }
        async fn describe_scaling_activities(&self, _asg: &str) -> Result<Vec<ScalingActivity>> {
            Ok(vec![])
        }
        async fn set_desired_capacity(&self, _asg: &str, _desired: i64) -> Result<()> {
            Ok(())
        }
    }

    fn bare_node(name: &str, instance_id: &str) -> NodeRecord {
        NodeRecord {
            name: name.to_string(),
            region: "r1".to_string(),
            zone: "label-zone".to_string(),
            instance_id: instance_id.to_string(),
            instance_type: "m5.large".to_string(),
            allocatable: ResourceTriple::zero(),
            ready: true,
            unschedulable: false,
            master: false,
            asg_name: None,
            asg_lifecycle_state: None,
        }
    }

    #[tokio::test]
    async fn resolved_node_gets_asg_and_authoritative_zone() {
        let cloud = FakeCloud {
            memberships: vec![AsgMembership {
                instance_id: "i-1".to_string(),
                asg_name: "asg1".to_string(),
                availability_zone: "cloud-zone".to_string(),
                lifecycle_state: "InService".to_string(),
            }],
        };
        let nodes = vec![bare_node("n1", "i-1")];
        let resolved = resolve_asg_topology(nodes, &cloud).await.unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].asg_name.as_deref(), Some("asg1"));
        assert_eq!(resolved[0].zone, "cloud-zone");
    }

    #[tokio::test]
    async fn unresolved_node_is_dropped_as_ghost() {
        let cloud = FakeCloud { memberships: vec![] };
        let nodes = vec![bare_node("n1", "i-unknown")];
        let resolved = resolve_asg_topology(nodes, &cloud).await.unwrap();
        assert!(resolved.is_empty());
    }
}
