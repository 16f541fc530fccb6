//! `CloudAsgApi` implementation backed by the AWS Auto Scaling API.

use async_trait::async_trait;

use crate::error::{AutoscalerError, Result};
use crate::model::{AsgSpec, ScalingActivity};

use super::{chunks, AsgMembership, CloudAsgApi};

/// `describe_auto_scaling_instances` accepts at most 50 instance ids per
/// call; larger batches are chunked and the results concatenated.
const INSTANCE_ID_CHUNK_SIZE: usize = 50;

/// Only the most recent activities are relevant to the in-progress check.
const SCALING_ACTIVITY_LOOKBACK: i32 = 20;

pub struct AwsAsgApi {
    client: aws_sdk_autoscaling::Client,
}

impl AwsAsgApi {
    pub async fn connect(region: Option<String>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region));
        }
        let config = loader.load().await;
        Self {
            client: aws_sdk_autoscaling::Client::new(&config),
        }
    }
}

#[async_trait]
impl CloudAsgApi for AwsAsgApi {
    async fn describe_auto_scaling_instances(
        &self,
        instance_ids: &[String],
    ) -> Result<Vec<AsgMembership>> {
        let mut memberships = Vec::with_capacity(instance_ids.len());
        for batch in chunks(instance_ids, INSTANCE_ID_CHUNK_SIZE) {
            let response = self
                .client
                .describe_auto_scaling_instances()
                .set_instance_ids(Some(batch))
                .send()
                .await
                .map_err(|e| AutoscalerError::AsgTopology(e.into()))?;
            for instance in response.auto_scaling_instances() {
                memberships.push(AsgMembership {
                    instance_id: instance.instance_id().unwrap_or_default().to_string(),
                    asg_name: instance.auto_scaling_group_name().unwrap_or_default().to_string(),
                    availability_zone: instance.availability_zone().unwrap_or_default().to_string(),
                    lifecycle_state: instance.lifecycle_state().unwrap_or_default().to_string(),
                });
            }
        }
        Ok(memberships)
    }

    async fn describe_auto_scaling_groups(&self, names: &[String]) -> Result<Vec<AsgSpec>> {
        let mut specs = Vec::with_capacity(names.len());
        for batch in chunks(names, INSTANCE_ID_CHUNK_SIZE) {
            let response = self
                .client
                .describe_auto_scaling_groups()
                .set_auto_scaling_group_names(Some(batch))
                .send()
                .await
                .map_err(|e| AutoscalerError::AsgSpecs(e.into()))?;
            for group in response.auto_scaling_groups() {
                specs.push(AsgSpec {
                    name: group.auto_scaling_group_name().to_string(),
                    current_desired: group.desired_capacity() as i64,
                    min_size: group.min_size() as i64,
                    max_size: group.max_size() as i64,
                });
            }
        }
        Ok(specs)
    }

    async fn describe_scaling_activities(&self, asg: &str) -> Result<Vec<ScalingActivity>> {
        let response = self
            .client
            .describe_scaling_activities()
            .auto_scaling_group_name(asg)
            .max_records(SCALING_ACTIVITY_LOOKBACK)
            .send()
            .await
            .map_err(|e| AutoscalerError::ScalingActivities {
                asg: asg.to_string(),
                source: e.into(),
            })?;

        Ok(response
            .activities()
            .iter()
            .map(|a| ScalingActivity {
                progress: a.progress().unwrap_or(100).clamp(0, 100) as u8,
            })
            .collect())
    }

    async fn set_desired_capacity(&self, asg: &str, desired: i64) -> Result<()> {
        self.client
            .set_desired_capacity()
            .auto_scaling_group_name(asg)
            .desired_capacity(desired as i32)
            .honor_cooldown(false)
            .send()
            .await
            .map_err(|e| AutoscalerError::SetDesiredCapacity {
                asg: asg.to_string(),
                desired,
                source: e.into(),
            })?;
        Ok(())
    }
}
