//! Demand aggregator: partitions workload resource requests by `(asg, zone)`
//! (§4.4).

use std::collections::HashMap;

use log::debug;

use crate::model::{
    unknown_partition, DemandMap, NodeRecord, RestartPolicy, ResourceTriple, WorkloadPhase,
    WorkloadRecord,
};

/// Default request charged to a container that omits a request for the
/// resource, expressed already-parsed (cpu cores, memory bytes).
#[derive(Debug, Clone, Copy)]
pub struct DefaultContainerRequest {
    pub cpu: f64,
    pub memory: f64,
}

impl Default for DefaultContainerRequest {
    fn default() -> Self {
        // 10m cpu, 50Mi memory.
        Self {
            cpu: 0.01,
            memory: 50.0 * 1024.0 * 1024.0,
        }
    }
}

/// Whether a workload contributes demand at all, and if so to which
/// partition, following the policy table in §4.4.
fn charge_partition(
    workload: &WorkloadRecord,
    nodes_by_name: &HashMap<&str, &NodeRecord>,
) -> Option<(String, String)> {
    if workload.phase == WorkloadPhase::Succeeded {
        return None;
    }
    if workload.phase == WorkloadPhase::Failed && workload.restart_policy == RestartPolicy::Never {
        return None;
    }

    let assigned_node = workload
        .assigned_node_name
        .as_deref()
        .and_then(|name| nodes_by_name.get(name));

    match assigned_node {
        Some(node) => node.partition_key().or(Some(unknown_partition())),
        None => {
            if matches!(workload.phase, WorkloadPhase::Running | WorkloadPhase::Unknown)
                && workload.assigned_node_name.is_some()
            {
                // Assigned to a node that no longer exists: a ghost pod.
                None
            } else {
                Some(unknown_partition())
            }
        }
    }
}

/// Aggregates workload requests into a per-partition demand map, following
/// §4.4 exactly. Partitions are always initialized with all three canonical
/// fields at zero, even if ultimately nothing is charged to them.
pub fn aggregate_demand(
    workloads: &[WorkloadRecord],
    nodes: &[NodeRecord],
    defaults: DefaultContainerRequest,
) -> DemandMap {
    let nodes_by_name: HashMap<&str, &NodeRecord> =
        nodes.iter().map(|n| (n.name.as_str(), n)).collect();

    let mut demand: DemandMap = HashMap::new();

    for workload in workloads {
        let Some(key) = charge_partition(workload, &nodes_by_name) else {
            continue;
        };

        let row = demand.entry(key).or_insert_with(ResourceTriple::zero);
        row.pods += 1.0;

        for (idx, container) in workload.containers.iter().enumerate() {
            let cpu = container.cpu.unwrap_or_else(|| {
                debug!(
                    "workload {} container #{} has no cpu request, charging default",
                    workload.name, idx
                );
                defaults.cpu
            });
            let memory = container.memory.unwrap_or_else(|| {
                debug!(
                    "workload {} container #{} has no memory request, charging default",
                    workload.name, idx
                );
                defaults.memory
            });
            row.cpu += cpu;
            row.memory += memory;
        }
    }

    demand
}
