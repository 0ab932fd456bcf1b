//! Read-through attraction catalog cache
//!
//! The catalog is fetched from the location provider once and reused
//! for the process lifetime. A fetch failure is not cached, so the
//! next caller retries; an empty catalog is treated as a provider
//! failure rather than a silent no-op.

use crate::domain::types::Attraction;
use crate::io::gps::GpsProvider;
use anyhow::{ensure, Context, Result};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

pub struct CatalogClient {
    gps: Arc<dyn GpsProvider>,
    cache: OnceCell<Arc<Vec<Attraction>>>,
}

impl CatalogClient {
    pub fn new(gps: Arc<dyn GpsProvider>) -> Self {
        Self { gps, cache: OnceCell::new() }
    }

    /// The full catalog, fetching on first use
    pub async fn list(&self) -> Result<Arc<Vec<Attraction>>> {
        self.cache
            .get_or_try_init(|| async {
                let attractions =
                    self.gps.attractions().await.context("attraction catalog unavailable")?;
                ensure!(
                    !attractions.is_empty(),
                    "attraction catalog unavailable: provider returned an empty list"
                );
                info!(attractions = %attractions.len(), "attraction_catalog_loaded");
                Ok(Arc::new(attractions))
            })
            .await
            .cloned()
    }
}
