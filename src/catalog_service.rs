// Read side of the catalog: fetch once, serve from cache until invalidated

use bytes::Bytes;
use futures::future::{join_all, BoxFuture, Shared};
use futures::FutureExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::cache::QueryCache;
use crate::catalog::{CatalogItem, ResourceKind};
use crate::filter::{self, FilterConfiguration};
use crate::pages::{CatalogPage, PageSelection};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Malformed {kind} collection: {reason}")]
    Decode { kind: ResourceKind, reason: String },

    #[error("{0} is not a catalog collection")]
    NotCatalog(ResourceKind),
}

type InFlightFetch = Shared<BoxFuture<'static, Result<Bytes, ApiError>>>;

pub struct CatalogService {
    api: Arc<dyn ApiClient>,
    cache: Arc<dyn QueryCache>,
    ttl: Option<Duration>,
    // Concurrent cache misses for one kind join the same request
    in_flight: Mutex<HashMap<ResourceKind, InFlightFetch>>,
}

impl CatalogService {
    pub fn new(api: Arc<dyn ApiClient>, cache: Arc<dyn QueryCache>) -> Self {
        Self {
            api,
            cache,
            ttl: None,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    // Overrides the cache's default TTL for catalog collections
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub async fn collection(&self, kind: ResourceKind) -> Result<Vec<CatalogItem>, CatalogError> {
        if !kind.is_catalog() {
            return Err(CatalogError::NotCatalog(kind));
        }

        if let Some(cached) = self.cache.get(kind.cache_key()) {
            // Only decodable payloads are ever stored
            if let Ok(items) = decode(kind, &cached) {
                debug!(%kind, count = items.len(), "serving collection from cache");
                return Ok(items);
            }
        }

        let fetch = self.join_fetch(kind);
        let result = fetch.clone().await;
        let stored = result.map_err(CatalogError::from).and_then(|body| {
            let items = decode(kind, &body)?;
            self.cache.store(kind.cache_key(), body, self.ttl);
            Ok(items)
        });

        {
            let mut in_flight = self.in_flight.lock();
            if in_flight.get(&kind).map_or(false, |f| f.ptr_eq(&fetch)) {
                in_flight.remove(&kind);
            }
        }

        let items = stored?;
        info!(%kind, count = items.len(), "fetched collection");
        Ok(items)
    }

    fn join_fetch(&self, kind: ResourceKind) -> InFlightFetch {
        let mut in_flight = self.in_flight.lock();
        in_flight
            .entry(kind)
            .or_insert_with(|| {
                let api = self.api.clone();
                async move { api.fetch_collection(kind).await }
                    .boxed()
                    .shared()
            })
            .clone()
    }

    // Warms the cache ahead of navigation. Returns how many collections are now cached.
    pub async fn prefetch(&self, kinds: &[ResourceKind]) -> usize {
        let results = join_all(kinds.iter().map(|&kind| self.collection(kind))).await;
        results
            .into_iter()
            .zip(kinds)
            .filter(|(result, kind)| match result {
                Ok(_) => true,
                Err(e) => {
                    warn!(%kind, error = %e, "prefetch failed");
                    false
                }
            })
            .count()
    }

    pub async fn filtered(
        &self,
        kind: ResourceKind,
        config: &FilterConfiguration,
    ) -> Result<Vec<CatalogItem>, CatalogError> {
        let items = self.collection(kind).await?;
        Ok(filter::apply(&items, config))
    }

    pub async fn page_view(
        &self,
        page: &CatalogPage,
        selection: &PageSelection,
    ) -> Result<Vec<CatalogItem>, CatalogError> {
        let items = self.collection(page.resource).await?;
        Ok(page.view(&items, selection))
    }
}

fn decode(kind: ResourceKind, body: &[u8]) -> Result<Vec<CatalogItem>, CatalogError> {
    serde_json::from_slice(body).map_err(|e| CatalogError::Decode {
        kind,
        reason: e.to_string(),
    })
}
