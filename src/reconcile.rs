//! Reconciler: turns required node counts into `SetDesiredCapacity` calls,
//! applying the downscale governor and bounds clamp first (§4.6, §4.7).

use std::collections::HashMap;

use async_trait::async_trait;
use log::{debug, info};

use crate::clients::CloudAsgApi;
use crate::error::Result;
use crate::governor::{apply_shrink_veto, clamp_to_bounds, scaling_activity_in_progress, slow_down_downscale};
use crate::model::{AsgSpec, ScalingActivity};

/// One ASG's computed plan for this tick, before or after dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcilePlan {
    pub asg: String,
    pub current_desired: i64,
    pub target_desired: i64,
}

/// Computes the final desired capacity per ASG: step-limit, bounds-clamp,
/// then shrink-veto, in that order (the order in which §4.6/§4.7 apply them).
///
/// `live_node_count_by_asg` is the actual number of nodes registered in the
/// orchestrator per ASG (§4.6: `current = Σ nodes in all its zones`) — not
/// the cloud's `current_desired`, which can diverge from it while an ASG is
/// still converging.
pub fn plan_reconciliation(
    required_node_counts: &HashMap<String, u64>,
    asgs: &HashMap<String, AsgSpec>,
    live_node_count_by_asg: &HashMap<String, u64>,
    ready_nodes_by_asg: &HashMap<String, i64>,
    scaling_activities_by_asg: &HashMap<String, Vec<ScalingActivity>>,
) -> Vec<ReconcilePlan> {
    let step_limited = slow_down_downscale(required_node_counts, live_node_count_by_asg);

    let mut plans = Vec::new();
    for (asg_name, asg) in asgs {
        let Some(&raw_target) = step_limited.get(asg_name) else {
            continue;
        };

        let clamped = clamp_to_bounds(asg, raw_target as i64);

        let activities = scaling_activities_by_asg
            .get(asg_name)
            .map(|v| v.as_slice())
            .unwrap_or(&[]);
        let final_target = apply_shrink_veto(
            asg,
            clamped,
            ready_nodes_by_asg.get(asg_name).copied(),
            scaling_activity_in_progress(activities),
        );

        plans.push(ReconcilePlan {
            asg: asg_name.clone(),
            current_desired: asg.current_desired,
            target_desired: final_target,
        });
    }
    plans.sort_by(|a, b| a.asg.cmp(&b.asg));
    plans
}

/// Dispatches `SetDesiredCapacity` for every plan whose target differs from
/// its current value. A no-op plan is skipped entirely — never re-sent.
pub async fn apply_plans(
    client: &dyn CloudAsgApi,
    plans: &[ReconcilePlan],
    dry_run: bool,
) -> Result<()> {
    for plan in plans {
        if plan.target_desired == plan.current_desired {
            debug!("ASG {} already at desired capacity {}", plan.asg, plan.current_desired);
            continue;
        }
        if dry_run {
            info!(
                "[dry-run] would set ASG {} desired capacity {} -> {}",
                plan.asg, plan.current_desired, plan.target_desired
            );
            continue;
        }
        info!(
            "setting ASG {} desired capacity {} -> {}",
            plan.asg, plan.current_desired, plan.target_desired
        );
        client.set_desired_capacity(&plan.asg, plan.target_desired).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn asg(name: &str, current: i64, min: i64, max: i64) -> AsgSpec {
        AsgSpec {
            name: name.to_string(),
            current_desired: current,
            min_size: min,
            max_size: max,
        }
    }

    #[test]
    fn no_op_when_required_matches_current() {
        let mut required = HashMap::new();
        required.insert("a1".to_string(), 2u64);
        let mut asgs = HashMap::new();
        asgs.insert("a1".to_string(), asg("a1", 2, 0, 10));
        let mut live = HashMap::new();
        live.insert("a1".to_string(), 2u64);
        let mut ready = HashMap::new();
        ready.insert("a1".to_string(), 2i64);
        let plans = plan_reconciliation(&required, &asgs, &live, &ready, &HashMap::new());
        assert_eq!(plans[0].target_desired, 2);
    }

    #[test]
    fn scales_up_past_current() {
        let mut required = HashMap::new();
        required.insert("a1".to_string(), 5u64);
        let mut asgs = HashMap::new();
        asgs.insert("a1".to_string(), asg("a1", 2, 0, 10));
        let mut live = HashMap::new();
        live.insert("a1".to_string(), 2u64);
        let mut ready = HashMap::new();
        ready.insert("a1".to_string(), 2i64);
        let plans = plan_reconciliation(&required, &asgs, &live, &ready, &HashMap::new());
        assert_eq!(plans[0].target_desired, 5);
    }

    #[test]
    fn big_shrink_is_step_limited() {
        let mut required = HashMap::new();
        required.insert("a1".to_string(), 1u64);
        let mut asgs = HashMap::new();
        asgs.insert("a1".to_string(), asg("a1", 5, 0, 10));
        let mut live = HashMap::new();
        live.insert("a1".to_string(), 5u64);
        let mut ready = HashMap::new();
        ready.insert("a1".to_string(), 5i64);
        let plans = plan_reconciliation(&required, &asgs, &live, &ready, &HashMap::new());
        assert_eq!(plans[0].target_desired, 4);
    }

    #[test]
    fn step_limit_is_based_on_live_node_count_not_cloud_desired() {
        // Cloud reports DesiredCapacity=5, but only 3 nodes are actually
        // registered in the orchestrator. The step limit must key off the
        // live count (3), not the cloud's current_desired (5).
        let mut required = HashMap::new();
        required.insert("a1".to_string(), 1u64);
        let mut asgs = HashMap::new();
        asgs.insert("a1".to_string(), asg("a1", 5, 0, 10));
        let mut live = HashMap::new();
        live.insert("a1".to_string(), 3u64);
        let mut ready = HashMap::new();
        ready.insert("a1".to_string(), 5i64);
        let plans = plan_reconciliation(&required, &asgs, &live, &ready, &HashMap::new());
        assert_eq!(plans[0].target_desired, 2);
    }

    #[test]
    fn shrink_is_vetoed_when_nodes_not_ready() {
        let mut required = HashMap::new();
        required.insert("a1".to_string(), 1u64);
        let mut asgs = HashMap::new();
        asgs.insert("a1".to_string(), asg("a1", 2, 0, 10));
        let mut live = HashMap::new();
        live.insert("a1".to_string(), 2u64);
        let mut ready = HashMap::new();
        ready.insert("a1".to_string(), 1i64);
        let plans = plan_reconciliation(&required, &asgs, &live, &ready, &HashMap::new());
        assert_eq!(plans[0].target_desired, 2);
    }

    #[test]
    fn clamps_above_max() {
        let mut required = HashMap::new();
        required.insert("a1".to_string(), 100u64);
        let mut asgs = HashMap::new();
        asgs.insert("a1".to_string(), asg("a1", 2, 0, 10));
        let mut live = HashMap::new();
        live.insert("a1".to_string(), 2u64);
        let mut ready = HashMap::new();
        ready.insert("a1".to_string(), 2i64);
        let plans = plan_reconciliation(&required, &asgs, &live, &ready, &HashMap::new());
        assert_eq!(plans[0].target_desired, 10);
    }

    struct RecordingClient {
        calls: Mutex<Vec<(String, i64)>>,
    }

    #[async_trait]
    impl CloudAsgApi for RecordingClient {
        async fn describe_auto_scaling_instances(
            &self,
            _instance_ids: &[String],
        ) -> Result<Vec<crate::clients::AsgMembership>> {
            Ok(vec![])
        }

        async fn describe_auto_scaling_groups(&self, _names: &[String]) -> Result<Vec<AsgSpec>> {
            Ok(vec![])
        }

        async fn describe_scaling_activities(&self, _asg: &str) -> Result<Vec<ScalingActivity>> {
            Ok(vec![])
        }

        async fn set_desired_capacity(&self, asg: &str, desired: i64) -> Result<()> {
            self.calls.lock().unwrap().push((asg.to_string(), desired));
            Ok(())
        }
    }

    #[tokio::test]
    async fn apply_plans_skips_no_op_and_dispatches_changes() {
        let client = RecordingClient {
            calls: Mutex::new(vec![]),
        };
        let plans = vec![
            ReconcilePlan {
                asg: "a1".to_string(),
                current_desired: 2,
                target_desired: 2,
            },
            ReconcilePlan {
                asg: "a2".to_string(),
                current_desired: 2,
                target_desired: 4,
            },
        ];
        apply_plans(&client, &plans, false).await.unwrap();
        let calls = client.calls.lock().unwrap();
        assert_eq!(calls.as_slice(), &[("a2".to_string(), 4)]);
    }

    #[tokio::test]
    async fn dry_run_never_dispatches() {
        let client = RecordingClient {
            calls: Mutex::new(vec![]),
        };
        let plans = vec![ReconcilePlan {
            asg: "a1".to_string(),
            current_desired: 2,
            target_desired: 4,
        }];
        apply_plans(&client, &plans, true).await.unwrap();
        assert!(client.calls.lock().unwrap().is_empty());
    }
}
