//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the database pool, the runtime config, and the short-lived
//! cache of rendered index pages.

use std::sync::Arc;

use sqlx::PgPool;

use crate::cache::{self, TtlCache};
use crate::config::Config;
use crate::pagination::Paginator;
use crate::routes::posts::ListingPage;

/// Index pages keyed by resolved page number.
pub type IndexCache = TtlCache<i64, ListingPage>;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub index_cache: IndexCache,
}

impl AppState {
    #[must_use]
    pub fn new(pool: PgPool, config: Config) -> Self {
        let index_cache = TtlCache::new(config.index_cache_ttl, cache::DEFAULT_CAPACITY);
        Self { pool, config: Arc::new(config), index_cache }
    }

    #[must_use]
    pub fn paginator(&self) -> Paginator {
        Paginator::new(self.config.page_size)
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
