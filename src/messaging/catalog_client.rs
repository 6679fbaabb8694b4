use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::{Message, Offset, TopicPartitionList};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use uuid::Uuid;

use super::envelope::{RpcReply, RpcRequest};
use super::redpanda::{PublishError, RedpandaClient};
use crate::catalog::{CatalogClient, CatalogError, VALIDATE_PRODUCTS};
use crate::domain::order::ProductRecord;

// ============================================================================
// Catalog Client over Redpanda - request/reply correlation
// ============================================================================
//
// 1. Register a oneshot under a fresh request id
// 2. Publish {"cmd": "validate-products"} with reply_to = our reply topic
// 3. The reply listener routes each reply to its waiting request by id
// 4. Give up after `timeout`; late replies are dropped
//
// The reply consumer is assigned every partition of the reply topic at the
// end offset. It joins no consumer group, so restarts leave nothing behind
// on the broker and nothing published after startup is missed.
//
// ============================================================================

type Pending = Arc<Mutex<HashMap<Uuid, oneshot::Sender<RpcReply>>>>;

const METADATA_TIMEOUT: Duration = Duration::from_secs(10);

pub struct RedpandaCatalogClient {
    redpanda: Arc<RedpandaClient>,
    request_topic: String,
    reply_topic: String,
    timeout: Duration,
    pending: Pending,
}

impl RedpandaCatalogClient {
    pub fn new(
        redpanda: Arc<RedpandaClient>,
        request_topic: impl Into<String>,
        reply_topic: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            redpanda,
            request_topic: request_topic.into(),
            reply_topic: reply_topic.into(),
            timeout,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Attach to the reply topic and route replies to waiting requests.
    ///
    /// Returns once the partitions are assigned, so requests sent afterwards
    /// cannot have their replies skipped.
    pub fn start_reply_listener(
        &self,
        brokers: &str,
        group_id: &str,
    ) -> anyhow::Result<tokio::task::JoinHandle<()>> {
        // Offsets are never committed, the id only labels the client.
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("group.id", format!("{}-replies", group_id))
            .set("enable.auto.commit", "false")
            .create()?;

        let metadata = consumer.fetch_metadata(Some(self.reply_topic.as_str()), METADATA_TIMEOUT)?;
        let partitions: Vec<i32> = metadata
            .topics()
            .iter()
            .filter(|topic| topic.name() == self.reply_topic)
            .flat_map(|topic| topic.partitions().iter().map(|p| p.id()))
            .collect();

        consumer.assign(&reply_assignment(&self.reply_topic, &partitions)?)?;

        tracing::info!(
            topic = %self.reply_topic,
            partitions = partitions.len(),
            "Listening for catalog replies"
        );

        let pending = self.pending.clone();
        Ok(tokio::spawn(async move {
            loop {
                let reply = match consumer.recv().await {
                    Ok(message) => decode_reply(&message),
                    Err(e) => {
                        tracing::error!(error = %e, "Catalog reply consumer error");
                        continue;
                    }
                };

                if let Some(reply) = reply {
                    route_reply(&pending, reply).await;
                }
            }
        }))
    }

    async fn round_trip(&self, request: RpcRequest) -> Result<RpcReply, CatalogError> {
        let payload = serde_json::to_string(&request)
            .map_err(|e| CatalogError::Malformed(e.to_string()))?;
        let key = request.id.to_string();

        let publish = self.redpanda.publish(&self.request_topic, &key, &payload);
        await_reply(&self.pending, request.id, publish, self.timeout).await
    }
}

/// Every partition of `topic`, starting at its current end.
fn reply_assignment(topic: &str, partitions: &[i32]) -> anyhow::Result<TopicPartitionList> {
    if partitions.is_empty() {
        anyhow::bail!("Reply topic '{}' has no partitions", topic);
    }

    let mut assignment = TopicPartitionList::new();
    for &partition in partitions {
        assignment.add_partition_offset(topic, partition, Offset::End)?;
    }
    Ok(assignment)
}

/// Register `id`, run `publish`, then wait up to `timeout` for the routed
/// reply. The pending entry is gone when this returns, whatever the outcome.
async fn await_reply<P>(
    pending: &Pending,
    id: Uuid,
    publish: P,
    timeout: Duration,
) -> Result<RpcReply, CatalogError>
where
    P: Future<Output = Result<(), PublishError>>,
{
    let (tx, rx) = oneshot::channel();
    pending.lock().await.insert(id, tx);

    let result = async {
        publish
            .await
            .map_err(|e| CatalogError::Transport(e.to_string()))?;

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(CatalogError::Transport("reply channel closed".to_string())),
            Err(_) => Err(CatalogError::Timeout(timeout)),
        }
    }
    .await;

    // A routed reply already removed it.
    pending.lock().await.remove(&id);
    result
}

fn decode_reply<M: Message>(message: &M) -> Option<RpcReply> {
    let Some(payload) = message.payload() else {
        tracing::warn!("Skipping catalog reply without payload");
        return None;
    };

    match serde_json::from_slice::<RpcReply>(payload) {
        Ok(reply) => Some(reply),
        Err(e) => {
            tracing::warn!(error = %e, "Skipping undecodable catalog reply");
            None
        }
    }
}

async fn route_reply(pending: &Pending, reply: RpcReply) {
    let waiter = pending.lock().await.remove(&reply.id);
    match waiter {
        Some(tx) => {
            if tx.send(reply).is_err() {
                tracing::debug!("Catalog reply arrived after requester gave up");
            }
        }
        None => tracing::debug!(request_id = %reply.id, "No pending request for catalog reply"),
    }
}

fn decode_products(reply: RpcReply) -> Result<Vec<ProductRecord>, CatalogError> {
    let response = reply.into_result().map_err(|err| CatalogError::Rejected {
        status: err.status,
        message: err.message,
        product_ids: err.product_ids,
    })?;

    serde_json::from_value(response).map_err(|e| CatalogError::Malformed(e.to_string()))
}

#[async_trait]
impl CatalogClient for RedpandaCatalogClient {
    async fn validate_products(&self, ids: &[String]) -> Result<Vec<ProductRecord>, CatalogError> {
        let request = RpcRequest::command(
            VALIDATE_PRODUCTS,
            serde_json::json!(ids),
            self.reply_topic.clone(),
        );

        tracing::debug!(
            request_id = %request.id,
            topic = %self.request_topic,
            product_count = ids.len(),
            "Sending validate-products"
        );

        let reply = self.round_trip(request).await?;
        decode_products(reply)
    }
}
