use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use super::{CatalogClient, CatalogError};
use crate::domain::order::{distinct_product_ids, OrderError, ProductRecord};
use crate::metrics::Metrics;

/// Resolves product ids to catalog records with a single remote call.
///
/// A reply that does not cover every requested id is treated as a failure:
/// totals cannot be computed with a missing price. Nothing is retried here.
#[derive(Clone)]
pub struct ProductResolver {
    client: Arc<dyn CatalogClient>,
    metrics: Arc<Metrics>,
}

impl ProductResolver {
    pub fn new(client: Arc<dyn CatalogClient>, metrics: Arc<Metrics>) -> Self {
        Self { client, metrics }
    }

    pub async fn resolve<'a, I>(&self, ids: I) -> Result<Vec<ProductRecord>, OrderError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let ids = distinct_product_ids(ids);

        tracing::debug!(product_count = ids.len(), "Resolving products against catalog");

        let started = Instant::now();
        let result = self.client.validate_products(&ids).await;
        let outcome = if result.is_ok() { "ok" } else { "error" };
        self.metrics
            .record_catalog_request(outcome, started.elapsed().as_secs_f64());

        let products = result.map_err(|e| classify(e, &ids))?;

        let returned: HashSet<&str> = products.iter().map(|p| p.id.as_str()).collect();
        let missing: Vec<String> = ids
            .iter()
            .filter(|id| !returned.contains(id.as_str()))
            .cloned()
            .collect();

        if !missing.is_empty() {
            return Err(OrderError::ProductNotFound(missing));
        }

        Ok(products)
    }
}

fn classify(error: CatalogError, requested: &[String]) -> OrderError {
    match error {
        CatalogError::Rejected {
            status,
            product_ids,
            ..
        } if (400..500).contains(&status) => {
            if product_ids.is_empty() {
                OrderError::ProductNotFound(requested.to_vec())
            } else {
                OrderError::ProductNotFound(product_ids)
            }
        }
        other => OrderError::UpstreamUnavailable(other.to_string()),
    }
}
