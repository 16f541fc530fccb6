//! Downscale governor: step-limited shrink, readiness/activity vetoes, and
//! min/max clamping (§4.6).

use std::collections::HashMap;

use log::{info, warn};

use crate::model::{AsgSpec, ScalingActivity};

/// Applies the "slow-down-downscale" step limit: a single tick never removes
/// more than one node from any ASG. Scale-up is unrestricted.
pub fn slow_down_downscale(
    asg_target: &HashMap<String, u64>,
    current_node_count: &HashMap<String, u64>,
) -> HashMap<String, u64> {
    asg_target
        .iter()
        .map(|(asg, &target)| {
            let current = current_node_count.get(asg).copied().unwrap_or(0);
            let limited = if current >= target + 2 {
                current - 1
            } else {
                target
            };
            (asg.clone(), limited)
        })
        .collect()
}

/// Whether at least one of the ASG's most-recent scaling activities (capped
/// at 20, by the caller / client implementation) is still in progress.
pub fn scaling_activity_in_progress(activities: &[ScalingActivity]) -> bool {
    activities.iter().any(|a| a.progress < 100)
}

/// Clamps `target` to `[min_size, max_size]`, logging a warning when the
/// value had to move.
pub fn clamp_to_bounds(asg: &AsgSpec, target: i64) -> i64 {
    if target > asg.max_size {
        warn!(
            "desired capacity for ASG {} is {}, but exceeds max {}",
            asg.name, target, asg.max_size
        );
        asg.max_size
    } else if target < asg.min_size {
        warn!(
            "desired capacity for ASG {} is {}, but is lower than min {}",
            asg.name, target, asg.min_size
        );
        asg.min_size
    } else {
        target
    }
}

/// Applies the shrink veto: if the (already bounds-clamped) target is below
/// `current_desired`, restore `current_desired` when nodes aren't all ready
/// or a scaling activity is in progress. Grow is never vetoed.
pub fn apply_shrink_veto(
    asg: &AsgSpec,
    target: i64,
    ready_node_count: Option<i64>,
    scaling_in_progress: bool,
) -> i64 {
    if target >= asg.current_desired {
        return target;
    }

    let ready = ready_node_count.unwrap_or(0);
    if ready < asg.current_desired {
        info!(
            "vetoing shrink of ASG {} to {}: only {} of {} desired nodes are ready",
            asg.name, target, ready, asg.current_desired
        );
        return asg.current_desired;
    }
    if scaling_in_progress {
        info!(
            "vetoing shrink of ASG {} to {}: a scaling activity is still in progress",
            asg.name, target
        );
        return asg.current_desired;
    }
    target
}
