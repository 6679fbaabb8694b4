use actix::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::order::{LineItem, OrderError, OrderPage, OrderStatus, OrderView, OrderWorkflow};

// ============================================================================
// Actor Messages
// ============================================================================

#[derive(Message)]
#[rtype(result = "Result<OrderView, OrderError>")]
pub struct CreateOrder {
    pub items: Vec<LineItem>,
}

#[derive(Message)]
#[rtype(result = "Result<OrderPage, OrderError>")]
pub struct FindAllOrders {
    pub status: Option<OrderStatus>,
    pub page: i64,
    pub limit: i64,
}

#[derive(Message)]
#[rtype(result = "Result<OrderView, OrderError>")]
pub struct FindOneOrder {
    pub id: Uuid,
}

#[derive(Message)]
#[rtype(result = "Result<OrderView, OrderError>")]
pub struct ChangeOrderStatus {
    pub id: Uuid,
    pub status: OrderStatus,
}

// ============================================================================
// Orders Actor - entry point for inbound order commands
// ============================================================================
//
// Holds no order state of its own. Every message becomes an independent
// workflow invocation, so a slow catalog call does not block the mailbox.
//
// ============================================================================

pub struct OrdersActor {
    workflow: Arc<OrderWorkflow>,
}

impl OrdersActor {
    pub fn new(workflow: Arc<OrderWorkflow>) -> Self {
        Self { workflow }
    }
}

impl Actor for OrdersActor {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("OrdersActor started");
    }
}

// ============================================================================
// Message Handlers
// ============================================================================

impl Handler<CreateOrder> for OrdersActor {
    type Result = ResponseFuture<Result<OrderView, OrderError>>;

    fn handle(&mut self, msg: CreateOrder, _: &mut Self::Context) -> Self::Result {
        let workflow = self.workflow.clone();
        Box::pin(async move { workflow.create(msg.items).await })
    }
}

impl Handler<FindAllOrders> for OrdersActor {
    type Result = ResponseFuture<Result<OrderPage, OrderError>>;

    fn handle(&mut self, msg: FindAllOrders, _: &mut Self::Context) -> Self::Result {
        let workflow = self.workflow.clone();
        Box::pin(async move { workflow.find_all(msg.status, msg.page, msg.limit).await })
    }
}

impl Handler<FindOneOrder> for OrdersActor {
    type Result = ResponseFuture<Result<OrderView, OrderError>>;

    fn handle(&mut self, msg: FindOneOrder, _: &mut Self::Context) -> Self::Result {
        let workflow = self.workflow.clone();
        Box::pin(async move { workflow.find_one(msg.id).await })
    }
}

impl Handler<ChangeOrderStatus> for OrdersActor {
    type Result = ResponseFuture<Result<OrderView, OrderError>>;

    fn handle(&mut self, msg: ChangeOrderStatus, _: &mut Self::Context) -> Self::Result {
        let workflow = self.workflow.clone();
        Box::pin(async move { workflow.change_status(msg.id, msg.status).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ProductResolver;
    use crate::metrics::Metrics;
    use crate::testing::{ScriptedCatalog, SpyStore};
    use rust_decimal::Decimal;

    fn start_actor() -> (Addr<OrdersActor>, Arc<SpyStore>) {
        let catalog = Arc::new(ScriptedCatalog::new().with_product("A", 10, "Widget"));
        let store = Arc::new(SpyStore::new());
        let metrics = Arc::new(Metrics::new().unwrap());
        let resolver = ProductResolver::new(catalog, metrics.clone());
        let workflow = Arc::new(OrderWorkflow::new(store.clone(), resolver, metrics));

        (OrdersActor::new(workflow).start(), store)
    }

    #[actix::test]
    async fn test_create_then_find_through_mailbox() {
        let (addr, _store) = start_actor();

        let created = addr
            .send(CreateOrder {
                items: vec![LineItem {
                    product_id: "A".to_string(),
                    quantity: 3,
                }],
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(created.total_amount, Decimal::from(30));

        let found = addr
            .send(FindOneOrder { id: created.id })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.items[0].name, "Widget");
    }

    #[actix::test]
    async fn test_overflowing_order_leaves_actor_running() {
        let (addr, _store) = start_actor();

        let rejected = addr
            .send(CreateOrder {
                items: vec![
                    LineItem {
                        product_id: "A".to_string(),
                        quantity: i32::MAX,
                    },
                    LineItem {
                        product_id: "A".to_string(),
                        quantity: 1,
                    },
                ],
            })
            .await
            .unwrap();
        assert!(matches!(rejected, Err(OrderError::Validation(_))));

        let page = addr
            .send(FindAllOrders {
                status: None,
                page: 1,
                limit: 10,
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(page.meta.total, 0);
    }

    #[actix::test]
    async fn test_change_status_through_mailbox() {
        let (addr, store) = start_actor();

        let created = addr
            .send(CreateOrder {
                items: vec![LineItem {
                    product_id: "A".to_string(),
                    quantity: 1,
                }],
            })
            .await
            .unwrap()
            .unwrap();

        let same = addr
            .send(ChangeOrderStatus {
                id: created.id,
                status: OrderStatus::Pending,
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(same.status, OrderStatus::Pending);
        assert_eq!(store.updates(), 0);

        let page = addr
            .send(FindAllOrders {
                status: Some(OrderStatus::Pending),
                page: 1,
                limit: 10,
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(page.meta.total, 1);
    }
}
