//! Sizing engine: turns per-partition demand into a required node count per
//! ASG (§4.5).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use log::info;
use prettytable::{row, Table};

use crate::model::{
    unknown_partition, AsgLifecycleState, DemandMap, NodeRecord, PartitionKey, ResourceTriple,
};
use crate::quantity::{format_resource, ResourceKind};

/// Multiplicative/additive buffer applied per resource (§4.1, §6).
#[derive(Debug, Clone, Copy)]
pub struct Buffer {
    pub cpu_percentage: f64,
    pub memory_percentage: f64,
    pub pods_percentage: f64,
    pub cpu_fixed: f64,
    pub memory_fixed: f64,
    pub pods_fixed: f64,
}

pub fn apply_buffer(demand: &ResourceTriple, buffer: &Buffer) -> ResourceTriple {
    ResourceTriple {
        cpu: demand.cpu * (1.0 + buffer.cpu_percentage / 100.0) + buffer.cpu_fixed,
        memory: demand.memory * (1.0 + buffer.memory_percentage / 100.0) + buffer.memory_fixed,
        pods: demand.pods * (1.0 + buffer.pods_percentage / 100.0) + buffer.pods_fixed,
    }
}

/// Whether `capacity` covers `target` component-wise.
pub fn is_sufficient(target: &ResourceTriple, capacity: &ResourceTriple) -> bool {
    capacity.covers(target)
}

fn weakest_node(nodes: &[&NodeRecord]) -> &NodeRecord {
    nodes
        .iter()
        .min_by_key(|n| n.allocatable.ordering_key())
        .expect("partition must have at least one node")
}

/// Number of `weakest` copies needed to cover `target`.
fn required_node_count(target: &ResourceTriple, weakest: &ResourceTriple) -> u64 {
    if is_sufficient(target, &ResourceTriple::zero()) {
        return 0;
    }
    let mut capacity = ResourceTriple::zero();
    let mut required = 0u64;
    while !is_sufficient(target, &capacity) {
        capacity.add(weakest);
        required += 1;
    }
    required
}

/// Governs how often the detailed sizing table is logged (§4.5 observability
/// side effect): at most once every 600 seconds.
static LAST_INFO_DUMP_UNIX_SECS: AtomicU64 = AtomicU64::new(0);

const INFO_DUMP_INTERVAL_SECS: u64 = 600;

fn should_log_detail() -> bool {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let last = LAST_INFO_DUMP_UNIX_SECS.load(Ordering::Relaxed);
    if now.saturating_sub(last) >= INFO_DUMP_INTERVAL_SECS {
        LAST_INFO_DUMP_UNIX_SECS.store(now, Ordering::Relaxed);
        true
    } else {
        false
    }
}

fn log_partition_detail(
    asg: &str,
    zone: &str,
    requested: &ResourceTriple,
    with_buffer: &ResourceTriple,
    weakest: &ResourceTriple,
    current_nodes: usize,
    required: u64,
) {
    let mut table = Table::new();
    table.add_row(row!["", "CPU", "MEMORY", "PODS"]);
    table.add_row(row![
        "requested",
        format_resource(requested.cpu, ResourceKind::Cpu),
        format_resource(requested.memory, ResourceKind::Memory),
        format_resource(requested.pods, ResourceKind::Pods),
    ]);
    table.add_row(row![
        "with buffer",
        format_resource(with_buffer.cpu, ResourceKind::Cpu),
        format_resource(with_buffer.memory, ResourceKind::Memory),
        format_resource(with_buffer.pods, ResourceKind::Pods),
    ]);
    table.add_row(row![
        "weakest node",
        format_resource(weakest.cpu, ResourceKind::Cpu),
        format_resource(weakest.memory, ResourceKind::Memory),
        format_resource(weakest.pods, ResourceKind::Pods),
    ]);
    table.add_row(row![
        "current / required",
        format!("{} / {}", current_nodes, required),
        "",
        "",
    ]);
    info!("sizing detail for {}/{}:\n{}", asg, zone, table);
}

/// Per-partition sizing configuration that doesn't vary by partition.
#[derive(Debug, Clone, Copy)]
pub struct SizingPolicy {
    pub buffer: Buffer,
    pub buffer_spare_nodes: u64,
    pub disable_scale_down: bool,
}

/// Computes the required node count per ASG, summing across all zones of the
/// same ASG (§4.5, step 9).
pub fn compute_required_asg_sizes(
    nodes_by_partition: &HashMap<PartitionKey, Vec<&NodeRecord>>,
    demand: &DemandMap,
    policy: &SizingPolicy,
) -> HashMap<String, u64> {
    let mut asg_target: HashMap<String, u64> = HashMap::new();
    let pending = demand.get(&unknown_partition()).copied();
    let log_detail = should_log_detail();

    let mut partitions: Vec<_> = nodes_by_partition.iter().collect();
    partitions.sort_by(|a, b| a.0.cmp(b.0));

    for ((asg, zone), nodes) in partitions {
        if asg == &unknown_partition().0 {
            continue;
        }
        if nodes.is_empty() {
            continue;
        }

        let requested = demand.get(&(asg.clone(), zone.clone())).copied().unwrap_or_default();
        let mut total_demand = requested;
        if let Some(pending) = pending {
            total_demand.add(&pending);
        }

        let target = apply_buffer(&total_demand, &policy.buffer);
        let weakest = weakest_node(nodes);

        let mut required = required_node_count(&target, &weakest.allocatable);

        for node in nodes {
            if node.unschedulable
                && !node.master
                && node.asg_lifecycle_state == Some(AsgLifecycleState::InService)
            {
                required += 1;
            }
        }

        required += policy.buffer_spare_nodes;

        if policy.disable_scale_down {
            required = required.max(nodes.len() as u64);
        }

        if log_detail {
            log_partition_detail(
                asg,
                zone,
                &total_demand,
                &target,
                &weakest.allocatable,
                nodes.len(),
                required,
            );
        }

        *asg_target.entry(asg.clone()).or_insert(0) += required;
    }

    asg_target
}

/// Groups live (non-ghost) nodes by their `(asg, zone)` partition.
pub fn partition_nodes(nodes: &[NodeRecord]) -> HashMap<PartitionKey, Vec<&NodeRecord>> {
    let mut map: HashMap<PartitionKey, Vec<&NodeRecord>> = HashMap::new();
    for node in nodes {
        if let Some(key) = node.partition_key() {
            map.entry(key).or_default().push(node);
        }
    }
    map
}
