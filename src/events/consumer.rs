use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::Message;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::KafkaConfig;
use crate::engine::coordinator::Dispatch;
use crate::gateway::status::StatusSource;
use crate::models::event::OrderStatusEvent;

use super::processor::EventProcessor;

#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("invalid kafka config: {0}")]
    InvalidConfig(&'static str),

    #[error(transparent)]
    Kafka(#[from] rdkafka::error::KafkaError),
}

pub struct EventConsumer {
    consumer: StreamConsumer,
    topic: String,
}

impl EventConsumer {
    pub fn new(cfg: &KafkaConfig) -> Result<Self, ConsumerError> {
        if cfg.brokers.is_empty() {
            return Err(ConsumerError::InvalidConfig("brokers are empty"));
        }
        if cfg.group_id.is_empty() {
            return Err(ConsumerError::InvalidConfig("group id is empty"));
        }
        if cfg.topic.is_empty() {
            return Err(ConsumerError::InvalidConfig("topic is empty"));
        }

        let mut client_config = ClientConfig::new();
        client_config
            .set("bootstrap.servers", cfg.brokers.join(","))
            .set("group.id", cfg.group_id.as_str())
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest");
        if !cfg.version.is_empty() {
            client_config.set("broker.version.fallback", cfg.version.as_str());
        }

        let consumer: StreamConsumer = client_config.create()?;

        Ok(Self {
            consumer,
            topic: cfg.topic.clone(),
        })
    }

    pub async fn run<S, D>(self, processor: EventProcessor<S, D>, cancel: CancellationToken)
    where
        S: StatusSource,
        D: Dispatch,
    {
        if let Err(err) = self.consumer.subscribe(&[self.topic.as_str()]) {
            error!(error = %err, topic = %self.topic, "failed to subscribe to order events");
            return;
        }

        info!(topic = %self.topic, "order event consumer started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("order event consumer stopped");
                    return;
                }
                received = self.consumer.recv() => {
                    let message = match received {
                        Ok(message) => message,
                        Err(err) => {
                            error!(error = %err, "kafka receive failed");
                            continue;
                        }
                    };

                    match serde_json::from_slice::<OrderStatusEvent>(message.payload().unwrap_or_default()) {
                        Ok(event) => {
                            if let Err(err) = processor.handle(&event).await {
                                // committed regardless: a replay re-checks the
                                // authoritative status, so repeats are no-ops
                                error!(order_id = %event.order_id, error = %err, "order event handling failed");
                            }
                        }
                        Err(err) => {
                            warn!(error = %err, "order event decode failed");
                        }
                    }

                    if let Err(err) = self.consumer.commit_message(&message, CommitMode::Async) {
                        error!(error = %err, "kafka offset commit failed");
                    }
                }
            }
        }
    }
}
