//! Tick orchestrator (§4.8): snapshot → topology → demand → sizing →
//! governor → reconcile, once per invocation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::error;

use crate::clients::{ClusterApi, CloudAsgApi};
use crate::config::Config;
use crate::demand::{aggregate_demand, DefaultContainerRequest};
use crate::error::Result;
use crate::model::AsgSpec;
use crate::reconcile::{apply_plans, plan_reconciliation};
use crate::sizing::{compute_required_asg_sizes, partition_nodes, SizingPolicy};
use crate::topology::resolve_asg_topology;

/// Runs one full tick. On success, flips nothing; on failure, flips
/// `healthy` to false and returns the error (the flag never recovers — see
/// the design notes on latching).
pub async fn run_tick(
    config: &Config,
    cluster: &dyn ClusterApi,
    cloud: &dyn CloudAsgApi,
    healthy: &Arc<AtomicBool>,
) -> Result<()> {
    match run_tick_inner(config, cluster, cloud).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("tick failed: {}", e);
            healthy.store(false, Ordering::Relaxed);
            Err(e)
        }
    }
}

async fn run_tick_inner(config: &Config, cluster: &dyn ClusterApi, cloud: &dyn CloudAsgApi) -> Result<()> {
    let raw_nodes = cluster.list_nodes().await?;
    let nodes: Vec<_> = raw_nodes
        .into_iter()
        .filter(|n| config.include_master_nodes || !n.master)
        .collect();
    let workloads = cluster.list_workloads().await?;

    let nodes = resolve_asg_topology(nodes, cloud).await?;

    let demand = aggregate_demand(&workloads, &nodes, DefaultContainerRequest::default());
    let by_partition = partition_nodes(&nodes);

    let asg_names: Vec<String> = by_partition.keys().map(|(asg, _)| asg.clone()).collect();
    let mut dedup_names = asg_names.clone();
    dedup_names.sort();
    dedup_names.dedup();

    let asg_specs = cloud.describe_auto_scaling_groups(&dedup_names).await?;
    let asgs: HashMap<String, AsgSpec> = asg_specs.into_iter().map(|a| (a.name.clone(), a)).collect();

    let mut live_node_count_by_asg: HashMap<String, u64> = HashMap::new();
    for ((asg, _zone), zone_nodes) in &by_partition {
        *live_node_count_by_asg.entry(asg.clone()).or_insert(0) += zone_nodes.len() as u64;
    }

    let mut ready_nodes_by_asg: HashMap<String, i64> = HashMap::new();
    for node in &nodes {
        if let Some(asg) = &node.asg_name {
            if node.ready {
                *ready_nodes_by_asg.entry(asg.clone()).or_insert(0) += 1;
            } else {
                ready_nodes_by_asg.entry(asg.clone()).or_insert(0);
            }
        }
    }

    let mut scaling_activities_by_asg = HashMap::new();
    for asg_name in &dedup_names {
        let activities = cloud.describe_scaling_activities(asg_name).await?;
        scaling_activities_by_asg.insert(asg_name.clone(), activities);
    }

    let policy = SizingPolicy {
        buffer: config.buffer,
        buffer_spare_nodes: config.buffer_spare_nodes,
        disable_scale_down: config.disable_scale_down,
    };
    let required = compute_required_asg_sizes(&by_partition, &demand, &policy);

    let plans = plan_reconciliation(
        &required,
        &asgs,
        &live_node_count_by_asg,
        &ready_nodes_by_asg,
        &scaling_activities_by_asg,
    );

    apply_plans(cloud, &plans, config.dry_run).await
}
