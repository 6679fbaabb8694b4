// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Orders are the only aggregate this service owns. Products live in the
// catalog service and are only ever seen as transient ProductRecords.
//
// ============================================================================

pub mod order;
