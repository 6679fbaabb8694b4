// ============================================================================
// Messaging Module - Redpanda transport
// ============================================================================
//
// - redpanda:        producer wrapped in a circuit breaker
// - envelope:        request/reply packet shapes
// - catalog_client:  outbound validate-products round trips
// - order_listener:  inbound order commands
//
// ============================================================================

mod catalog_client;
mod envelope;
mod order_listener;
mod redpanda;

pub use catalog_client::RedpandaCatalogClient;
pub use order_listener::OrderCommandListener;
pub use redpanda::RedpandaClient;
