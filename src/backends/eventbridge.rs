//! # EventBridge Scheduler Backend
//!
//! Each task becomes a one-time schedule that fires at `run_after` (or now when
//! unset), delivers the payload to an SQS queue, and deletes itself afterwards.
//!
//! The target queue ARN takes two lookups (name → URL → ARN) and is cached per
//! queue name. A failed lookup means the backend points at a queue that does not
//! exist, so it propagates as a destination resolution error instead of being
//! captured into the result.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use super::destination_cache::DestinationCache;
use super::dispatch::{BackendCapabilities, CloudBackend, OutboundMessage, PublishError, Publisher};
use super::transports::{client_construction_error, Transports};
use crate::config::{BackendConfig, BackendKind, ConfigResult, DispatchConfig};
use crate::constants::{aws, MAX_SCHEDULE_NAME_LENGTH};
use crate::error::DispatchError;
use crate::messaging::{
    ActionAfterCompletion, FlexibleTimeWindow, QueueService, ScheduleRequest, ScheduleState,
    ScheduleTarget, SchedulerService, TransportResult,
};

const SCHEDULE_TIMEZONE: &str = "UTC";

pub struct EventBridgePublisher {
    scheduler: Arc<dyn SchedulerService>,
    queues: Arc<dyn QueueService>,
    role_arn: String,
    name_prefix: String,
    queue_arns: DestinationCache<String>,
}

impl EventBridgePublisher {
    pub fn new(
        scheduler: Arc<dyn SchedulerService>,
        queues: Arc<dyn QueueService>,
        role_arn: impl Into<String>,
        name_prefix: impl Into<String>,
    ) -> Self {
        Self {
            scheduler,
            queues,
            role_arn: role_arn.into(),
            name_prefix: name_prefix.into(),
            queue_arns: DestinationCache::new("scheduler_queue_arn"),
        }
    }

    pub fn cached_queue_arns(&self) -> usize {
        self.queue_arns.len()
    }

    async fn queue_arn(&self, queue_name: &str) -> Result<String, DispatchError> {
        self.queue_arns
            .get_or_try_init(queue_name, || async {
                let queue_url = self.queues.get_queue_url(queue_name).await?;
                self.queues.get_queue_arn(&queue_url).await
            })
            .await
            .map_err(|err| {
                DispatchError::destination_resolution(
                    BackendKind::EventBridgeScheduler.as_str(),
                    queue_name,
                    err.to_string(),
                )
            })
    }

    fn schedule_request(
        &self,
        name: String,
        run_at: DateTime<Utc>,
        queue_arn: String,
        payload: &str,
    ) -> ScheduleRequest {
        ScheduleRequest {
            name,
            schedule_expression: schedule_expression(run_at),
            schedule_expression_timezone: SCHEDULE_TIMEZONE.to_string(),
            state: ScheduleState::Enabled,
            action_after_completion: ActionAfterCompletion::Delete,
            flexible_time_window: FlexibleTimeWindow::Off,
            target: ScheduleTarget {
                arn: queue_arn,
                role_arn: self.role_arn.clone(),
                input: payload.to_string(),
            },
        }
    }
}

/// `at(YYYY-MM-DDTHH:MM:SS)`, evaluated in the schedule's timezone
pub fn schedule_expression(run_at: DateTime<Utc>) -> String {
    format!("at({})", run_at.format("%Y-%m-%dT%H:%M:%S"))
}

/// Unique schedule name: `{prefix}-{task}-{YYYYMMDDHHMMSS}-{8 hex}`
///
/// The timestamp is the schedule's creation time, not its fire time.
/// Characters outside `[0-9A-Za-z-_.]` become `-`. The task segment is
/// shortened so the whole name fits in 64 characters; the timestamp and random
/// suffix are always kept.
pub fn schedule_name(prefix: &str, task_name: &str, created_at: DateTime<Utc>) -> String {
    let random = uuid::Uuid::new_v4().simple().to_string();
    let suffix = format!("-{}-{}", created_at.format("%Y%m%d%H%M%S"), &random[..8]);

    let head = format!("{}-", sanitize(prefix));
    let room = MAX_SCHEDULE_NAME_LENGTH.saturating_sub(head.len() + suffix.len());
    let task: String = sanitize(task_name).chars().take(room).collect();

    let mut name = format!("{head}{task}{suffix}");
    name.truncate(MAX_SCHEDULE_NAME_LENGTH);
    name
}

fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

#[async_trait]
impl Publisher for EventBridgePublisher {
    fn kind(&self) -> BackendKind {
        BackendKind::EventBridgeScheduler
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            supports_defer: true,
            supports_get_result: true,
        }
    }

    async fn publish(&self, message: &OutboundMessage<'_>) -> Result<Option<String>, PublishError> {
        let queue_arn = self.queue_arn(message.destination).await?;

        let created_at = Utc::now();
        let run_at = message.run_after.unwrap_or(created_at);
        let name = schedule_name(&self.name_prefix, message.task_name, created_at);
        debug!(schedule = %name, run_at = %run_at, "Creating one-time schedule");

        let request = self.schedule_request(name, run_at, queue_arn, message.body);
        self.scheduler.create_schedule(&request).await?;
        Ok(Some(request.name))
    }

    async fn close(&self) -> TransportResult<()> {
        self.queue_arns.clear();
        Ok(())
    }
}

pub type EventBridgeBackend = CloudBackend<EventBridgePublisher>;

impl CloudBackend<EventBridgePublisher> {
    /// Requires `AWS_REGION`, `AWS_DEFAULT_SQS_QUEUE_NAME` and
    /// `EVENTBRIDGE_SCHEDULER_ROLE_ARN`
    pub fn from_config(
        alias: &str,
        config: &BackendConfig,
        dispatch: &DispatchConfig,
        transports: &Transports,
    ) -> ConfigResult<Self> {
        let kind = BackendKind::EventBridgeScheduler;
        let options = &config.options;
        let region = options.required_str(kind.as_str(), aws::REGION)?;
        let default_queue = options.required_str(kind.as_str(), aws::DEFAULT_SQS_QUEUE_NAME)?;
        let role_arn = options.required_str(kind.as_str(), aws::SCHEDULER_ROLE_ARN)?;

        let factory = transports.aws_factory(kind)?;
        let scheduler = factory
            .scheduler_service(&region, dispatch.publish_timeout())
            .map_err(client_construction_error(kind))?;
        let queues = factory
            .queue_service(&region, dispatch.publish_timeout())
            .map_err(client_construction_error(kind))?;

        Ok(CloudBackend::new(
            alias,
            default_queue,
            &config.queues,
            EventBridgePublisher::new(
                scheduler,
                queues,
                role_arn,
                dispatch.schedule_name_prefix.clone(),
            ),
        ))
    }
}
