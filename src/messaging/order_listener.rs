use actix::prelude::*;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::Message as KafkaMessage;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use validator::Validate;

use super::envelope::{RpcReply, RpcRequest};
use super::redpanda::RedpandaClient;
use crate::actors::{ChangeOrderStatus, CreateOrder, FindAllOrders, FindOneOrder, OrdersActor};
use crate::domain::order::{
    parse_order_id, ChangeOrderStatusDto, CreateOrderDto, OrderError, OrderPaginationDto, RpcError,
};

// ============================================================================
// Order Command Listener
// ============================================================================
//
// Consumes request packets from the orders command topic, validates the
// payload, hands it to the OrdersActor and publishes the reply to the
// requester's `reply_to` topic.
//
// Patterns: createOrder, findAllOrders, findOneOrder, changeOrderStatus
//
// ============================================================================

pub const CREATE_ORDER: &str = "createOrder";
pub const FIND_ALL_ORDERS: &str = "findAllOrders";
pub const FIND_ONE_ORDER: &str = "findOneOrder";
pub const CHANGE_ORDER_STATUS: &str = "changeOrderStatus";

pub struct OrderCommandListener {
    consumer: StreamConsumer,
    redpanda: Arc<RedpandaClient>,
    orders: Addr<OrdersActor>,
}

impl OrderCommandListener {
    pub fn new(
        brokers: &str,
        group_id: &str,
        topic: &str,
        redpanda: Arc<RedpandaClient>,
        orders: Addr<OrdersActor>,
    ) -> anyhow::Result<Self> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("group.id", group_id)
            .set("enable.auto.commit", "true")
            .set("auto.offset.reset", "earliest")
            .create()?;
        consumer.subscribe(&[topic])?;

        tracing::info!(topic = %topic, group_id = %group_id, "Subscribed to order commands");

        Ok(Self {
            consumer,
            redpanda,
            orders,
        })
    }

    /// Receive forever. Each request is handled on its own task.
    pub async fn run(self) {
        loop {
            let request = match self.consumer.recv().await {
                Ok(message) => decode_request(&message),
                Err(e) => {
                    tracing::error!(error = %e, "Order command consumer error");
                    continue;
                }
            };

            let Some(request) = request else { continue };

            let orders = self.orders.clone();
            let redpanda = self.redpanda.clone();
            actix::spawn(async move {
                let reply = match dispatch(&orders, &request).await {
                    Ok(response) => RpcReply::ok(request.id, response),
                    Err(error) => RpcReply::failed(request.id, error),
                };
                send_reply(&redpanda, request.reply_to.as_deref(), reply).await;
            });
        }
    }
}

fn decode_request<M: KafkaMessage>(message: &M) -> Option<RpcRequest> {
    let payload = message.payload()?;

    match serde_json::from_slice::<RpcRequest>(payload) {
        Ok(request) => Some(request),
        Err(e) => {
            tracing::warn!(
                error = %e,
                partition = message.partition(),
                offset = message.offset(),
                "Skipping undecodable order command"
            );
            None
        }
    }
}

async fn send_reply(redpanda: &RedpandaClient, reply_to: Option<&str>, reply: RpcReply) {
    let Some(topic) = reply_to else {
        tracing::debug!(request_id = %reply.id, "Request had no reply_to, dropping reply");
        return;
    };

    let payload = match serde_json::to_string(&reply) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!(error = %e, request_id = %reply.id, "Failed to encode reply");
            return;
        }
    };

    if let Err(e) = redpanda.publish(topic, &reply.id.to_string(), &payload).await {
        tracing::error!(error = %e, request_id = %reply.id, "Failed to publish reply");
    }
}

/// Validate the payload, run the matching operation and encode its result.
pub async fn dispatch(orders: &Addr<OrdersActor>, request: &RpcRequest) -> Result<Value, RpcError> {
    let pattern = request.pattern_name().unwrap_or_default();
    tracing::debug!(request_id = %request.id, pattern = %pattern, "Dispatching order command");

    match pattern {
        CREATE_ORDER => {
            let items = decode::<CreateOrderDto>(&request.data)?.into_line_items()?;
            let order = orders.send(CreateOrder { items }).await.map_err(mailbox)??;
            encode(&order)
        }
        FIND_ALL_ORDERS => {
            let query = if request.data.is_null() {
                OrderPaginationDto::default()
            } else {
                decode::<OrderPaginationDto>(&request.data)?
            };
            query.validate().map_err(OrderError::from)?;

            let page = orders
                .send(FindAllOrders {
                    status: query.status,
                    page: query.page,
                    limit: query.limit,
                })
                .await
                .map_err(mailbox)??;
            encode(&page)
        }
        FIND_ONE_ORDER => {
            let id = match &request.data {
                Value::String(raw) => parse_order_id(raw)?,
                Value::Object(fields) => match fields.get("id").and_then(Value::as_str) {
                    Some(raw) => parse_order_id(raw)?,
                    None => return Err(OrderError::Validation("id is required".to_string()).into()),
                },
                _ => return Err(OrderError::Validation("id is required".to_string()).into()),
            };
            let order = orders.send(FindOneOrder { id }).await.map_err(mailbox)??;
            encode(&order)
        }
        CHANGE_ORDER_STATUS => {
            let dto = decode::<ChangeOrderStatusDto>(&request.data)?;
            let order = orders
                .send(ChangeOrderStatus {
                    id: dto.id,
                    status: dto.status,
                })
                .await
                .map_err(mailbox)??;
            encode(&order)
        }
        other => Err(OrderError::Validation(format!("Unknown pattern '{}'", other)).into()),
    }
}

fn decode<T: DeserializeOwned>(data: &Value) -> Result<T, OrderError> {
    T::deserialize(data).map_err(|e| OrderError::Validation(e.to_string()))
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|e| RpcError {
        status: 500,
        message: format!("Failed to encode response: {}", e),
    })
}

fn mailbox(error: MailboxError) -> RpcError {
    tracing::error!(error = %error, "OrdersActor unavailable");
    RpcError {
        status: 500,
        message: "Orders actor unavailable".to_string(),
    }
}
