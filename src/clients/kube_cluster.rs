//! `ClusterApi` implementation backed by the Kubernetes API server.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::{Api, Client};

use crate::error::{AutoscalerError, Result};
use crate::model::{ContainerRequest, NodeRecord, ResourceTriple, RestartPolicy, WorkloadPhase, WorkloadRecord};
use crate::quantity::parse_resource;

use super::ClusterApi;

const MASTER_LABEL_CANDIDATES: &[&str] = &[
    "node-role.kubernetes.io/master",
    "node-role.kubernetes.io/control-plane",
];

pub struct KubeClusterApi {
    client: Client,
    include_master_nodes: bool,
}

impl KubeClusterApi {
    pub async fn connect(kubeconfig_path: Option<&str>, include_master_nodes: bool) -> Result<Self> {
        let client = match kubeconfig_path {
            Some(path) => {
                let yaml = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| AutoscalerError::ClusterSnapshot(e.into()))?;
                let kubeconfig = kube::config::Kubeconfig::from_yaml(&yaml)
                    .map_err(|e| AutoscalerError::ClusterSnapshot(e.into()))?;
                let options = kube::config::KubeConfigOptions::default();
                let config = kube::Config::from_custom_kubeconfig(kubeconfig, &options)
                    .await
                    .map_err(|e| AutoscalerError::ClusterSnapshot(e.into()))?;
                Client::try_from(config).map_err(|e| AutoscalerError::ClusterSnapshot(e.into()))?
            }
            None => Client::try_default()
                .await
                .map_err(|e| AutoscalerError::ClusterSnapshot(e.into()))?,
        };
        Ok(Self {
            client,
            include_master_nodes,
        })
    }

    fn is_master(node: &Node) -> bool {
        let labels = node.metadata.labels.as_ref();
        labels
            .map(|l| MASTER_LABEL_CANDIDATES.iter().any(|k| l.contains_key(*k)))
            .unwrap_or(false)
    }
}

fn node_ready(node: &Node) -> bool {
    node.status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .map(|conditions| {
            conditions
                .iter()
                .any(|c| c.type_ == "Ready" && c.status == "True")
        })
        .unwrap_or(false)
}

fn node_zone(node: &Node) -> String {
    node.metadata
        .labels
        .as_ref()
        .and_then(|l| {
            l.get("topology.kubernetes.io/zone")
                .or_else(|| l.get("failure-domain.beta.kubernetes.io/zone"))
        })
        .cloned()
        .unwrap_or_else(|| "unknown".to_string())
}

fn node_region(node: &Node) -> String {
    node.metadata
        .labels
        .as_ref()
        .and_then(|l| {
            l.get("topology.kubernetes.io/region")
                .or_else(|| l.get("failure-domain.beta.kubernetes.io/region"))
        })
        .cloned()
        .unwrap_or_else(|| "unknown".to_string())
}

fn node_instance_type(node: &Node) -> String {
    node.metadata
        .labels
        .as_ref()
        .and_then(|l| l.get("node.kubernetes.io/instance-type"))
        .cloned()
        .unwrap_or_default()
}

fn node_allocatable(node: &Node) -> Result<ResourceTriple> {
    let allocatable = node
        .status
        .as_ref()
        .and_then(|s| s.allocatable.as_ref());
    let Some(allocatable) = allocatable else {
        return Ok(ResourceTriple::zero());
    };
    let cpu = allocatable
        .get("cpu")
        .map(|q| parse_resource(&q.0))
        .transpose()?
        .unwrap_or(0.0);
    let memory = allocatable
        .get("memory")
        .map(|q| parse_resource(&q.0))
        .transpose()?
        .unwrap_or(0.0);
    let pods = allocatable
        .get("pods")
        .map(|q| parse_resource(&q.0))
        .transpose()?
        .unwrap_or(0.0);
    Ok(ResourceTriple { cpu, memory, pods })
}

fn to_node_record(node: &Node) -> Result<NodeRecord> {
    Ok(NodeRecord {
        name: node.metadata.name.clone().unwrap_or_default(),
        region: node_region(node),
        zone: node_zone(node),
        instance_id: node
            .spec
            .as_ref()
            .and_then(|s| s.provider_id.clone())
            .unwrap_or_default(),
        instance_type: node_instance_type(node),
        allocatable: node_allocatable(node)?,
        ready: node_ready(node),
        unschedulable: node
            .spec
            .as_ref()
            .and_then(|s| s.unschedulable)
            .unwrap_or(false),
        master: KubeClusterApi::is_master(node),
        asg_name: None,
        asg_lifecycle_state: None,
    })
}

fn restart_policy(pod: &Pod) -> RestartPolicy {
    match pod.spec.as_ref().and_then(|s| s.restart_policy.as_deref()) {
        Some("Never") => RestartPolicy::Never,
        Some("OnFailure") => RestartPolicy::OnFailure,
        _ => RestartPolicy::Always,
    }
}

fn phase(pod: &Pod) -> WorkloadPhase {
    match pod.status.as_ref().and_then(|s| s.phase.as_deref()) {
        Some("Pending") => WorkloadPhase::Pending,
        Some("Running") => WorkloadPhase::Running,
        Some("Succeeded") => WorkloadPhase::Succeeded,
        Some("Failed") => WorkloadPhase::Failed,
        _ => WorkloadPhase::Unknown,
    }
}

fn to_workload_record(pod: &Pod) -> WorkloadRecord {
    let containers = pod
        .spec
        .as_ref()
        .map(|s| {
            s.containers
                .iter()
                .map(|c| {
                    let requests = c.resources.as_ref().and_then(|r| r.requests.as_ref());
                    let cpu = requests
                        .and_then(|r| r.get("cpu"))
                        .and_then(|q| parse_resource(&q.0).ok());
                    let memory = requests
                        .and_then(|r| r.get("memory"))
                        .and_then(|q| parse_resource(&q.0).ok());
                    ContainerRequest { cpu, memory }
                })
                .collect()
        })
        .unwrap_or_default();

    WorkloadRecord {
        name: pod.metadata.name.clone().unwrap_or_default(),
        phase: phase(pod),
        assigned_node_name: pod.spec.as_ref().and_then(|s| s.node_name.clone()),
        restart_policy: restart_policy(pod),
        containers,
    }
}

#[async_trait]
impl ClusterApi for KubeClusterApi {
    async fn list_nodes(&self) -> Result<Vec<NodeRecord>> {
        let api: Api<Node> = Api::all(self.client.clone());
        let nodes = api
            .list(&Default::default())
            .await
            .map_err(|e| AutoscalerError::ClusterSnapshot(e.into()))?;

        nodes
            .items
            .iter()
            .filter(|n| self.include_master_nodes || !KubeClusterApi::is_master(n))
            .map(to_node_record)
            .collect()
    }

    async fn list_workloads(&self) -> Result<Vec<WorkloadRecord>> {
        let api: Api<Pod> = Api::all(self.client.clone());
        let pods = api
            .list(&Default::default())
            .await
            .map_err(|e| AutoscalerError::ClusterSnapshot(e.into()))?;
        Ok(pods.items.iter().map(to_workload_record).collect())
    }
}
