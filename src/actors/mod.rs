// ============================================================================
// Actors Module
// ============================================================================
//
// The orders actor is the single entry point between the bus listener and
// the order workflow. Business rules live in domain/, not here.
//
// ============================================================================

mod orders_actor;

pub use orders_actor::{ChangeOrderStatus, CreateOrder, FindAllOrders, FindOneOrder, OrdersActor};
