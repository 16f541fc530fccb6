//! Plain-record data model for one tick: nodes, workloads, resource triples.
//!
//! Everything here is a snapshot value, constructed fresh each tick and
//! discarded at its end (§3 of the design).

use std::collections::HashMap;

/// The three canonical resources tracked by the sizing engine. Always all
/// three, never more, never fewer — a fixed-field struct rather than a map
/// in the hot path.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResourceTriple {
    /// Fractional cpu cores.
    pub cpu: f64,
    /// Bytes.
    pub memory: f64,
    /// Pod count, kept in a float slot for uniform arithmetic with cpu/memory.
    pub pods: f64,
}

impl ResourceTriple {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn add(&mut self, other: &ResourceTriple) {
        self.cpu += other.cpu;
        self.memory += other.memory;
        self.pods += other.pods;
    }

    /// `self` covers `other` component-wise.
    pub fn covers(&self, other: &ResourceTriple) -> bool {
        self.cpu >= other.cpu && self.memory >= other.memory && self.pods >= other.pods
    }

    /// Lexicographic ordering key for weakest-node selection.
    pub fn ordering_key(&self) -> (u64, u64, u64) {
        (
            self.cpu.to_bits(),
            self.memory.to_bits(),
            self.pods.to_bits(),
        )
    }
}

/// Lifecycle state of an ASG member instance, as reported by the cloud.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsgLifecycleState {
    InService,
    Pending,
    Terminating,
    Terminated,
    Other(String),
}

impl From<&str> for AsgLifecycleState {
    fn from(s: &str) -> Self {
        match s {
            "InService" => AsgLifecycleState::InService,
            "Pending" => AsgLifecycleState::Pending,
            s if s.starts_with("Terminating") => AsgLifecycleState::Terminating,
            "Terminated" => AsgLifecycleState::Terminated,
            other => AsgLifecycleState::Other(other.to_string()),
        }
    }
}

/// A snapshot of one cluster node, normalized from the orchestrator API and
/// (once resolved) the cloud ASG API.
#[derive(Debug, Clone)]
pub struct NodeRecord {
    pub name: String,
    pub region: String,
    pub zone: String,
    pub instance_id: String,
    pub instance_type: String,
    pub allocatable: ResourceTriple,
    pub ready: bool,
    pub unschedulable: bool,
    pub master: bool,
    /// Set by the ASG topology reader (§4.3). Absent means the node is a
    /// "ghost" and must be dropped from the sizing domain.
    pub asg_name: Option<String>,
    pub asg_lifecycle_state: Option<AsgLifecycleState>,
}

impl NodeRecord {
    /// The `(asg, zone)` partition key, once the ASG has been resolved.
    pub fn partition_key(&self) -> Option<(String, String)> {
        self.asg_name.clone().map(|asg| (asg, self.zone.clone()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartPolicy {
    Always,
    OnFailure,
    Never,
}

#[derive(Debug, Clone)]
pub struct ContainerRequest {
    /// `None` means the container omitted the request and the configured
    /// default must be charged instead.
    pub cpu: Option<f64>,
    pub memory: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct WorkloadRecord {
    pub name: String,
    pub phase: WorkloadPhase,
    pub assigned_node_name: Option<String>,
    pub restart_policy: RestartPolicy,
    pub containers: Vec<ContainerRequest>,
}

/// The distinguished partition holding unassigned/pending demand.
pub const UNKNOWN_ASG: &str = "unknown";
pub const UNKNOWN_ZONE: &str = "unknown";

pub type PartitionKey = (String, String);

pub fn unknown_partition() -> PartitionKey {
    (UNKNOWN_ASG.to_string(), UNKNOWN_ZONE.to_string())
}

/// Demand aggregated per partition.
pub type DemandMap = HashMap<PartitionKey, ResourceTriple>;

/// ASG state as read from the cloud provider.
#[derive(Debug, Clone)]
pub struct AsgSpec {
    pub name: String,
    pub current_desired: i64,
    pub min_size: i64,
    pub max_size: i64,
}

/// One scaling activity record, as returned by `describe_scaling_activities`.
#[derive(Debug, Clone)]
pub struct ScalingActivity {
    pub progress: u8,
}
