#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Dashboard service for collision queries.
//!
//! [`DashboardService`] is the inbound entry point: it resolves a
//! [`DashboardRequest`] into a canonical [`Filter`], consults the
//! [`ResultCache`], and on a miss runs the [`AggregationEngine`] over the
//! shared [`DatasetStore`].

pub mod cache;
pub mod engine;
pub mod questions;

pub use cache::{CacheStats, ResultCache};
pub use engine::AggregationEngine;

use std::sync::Arc;

use crash_dash_analytics_models::{DashboardRequest, DashboardResults, GridResolution};
use crash_dash_collision_models::YearRange;
use crash_dash_query::{FilterResolver, QueryError};
use crash_dash_query_models::Filter;
use crash_dash_store::{DatasetOptions, DatasetStore};
use thiserror::Error;

/// Errors that can occur while answering a dashboard request.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// The request could not be resolved into a filter.
    #[error(transparent)]
    Query(#[from] QueryError),
}

/// Tunables for a [`DashboardService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Years a dropdown or text year must fall within.
    pub window: YearRange,
    /// Maximum number of cached results. Zero disables the cache.
    pub cache_capacity: usize,
    pub grid_resolution: GridResolution,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            window: YearRange::new(2015, 2025),
            cache_capacity: 64,
            grid_resolution: GridResolution::default(),
        }
    }
}

/// Answers dashboard requests against a loaded dataset.
#[derive(Debug)]
pub struct DashboardService {
    store: Arc<DatasetStore>,
    resolver: FilterResolver,
    engine: AggregationEngine,
    cache: ResultCache,
}

impl DashboardService {
    #[must_use]
    pub fn new(store: Arc<DatasetStore>, config: ServiceConfig) -> Self {
        log::info!(
            "Dashboard service ready: window {}, cache capacity {}, grid {}°",
            config.window,
            config.cache_capacity,
            config.grid_resolution.degrees()
        );
        Self {
            store,
            resolver: FilterResolver::with_window(config.window),
            engine: AggregationEngine::new(config.grid_resolution),
            cache: ResultCache::new(config.cache_capacity),
        }
    }

    /// Resolves `request` and returns the results for the resulting filter.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Query`] if a dropdown selection is invalid.
    /// No data is touched in that case.
    pub fn query(
        &self,
        request: &DashboardRequest,
    ) -> Result<Arc<DashboardResults>, DashboardError> {
        let filter = self.resolve(request)?;
        Ok(self.results_for(&filter))
    }

    /// Resolves `request` into a filter without computing anything.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Query`] if a dropdown selection is invalid.
    pub fn resolve(&self, request: &DashboardRequest) -> Result<Filter, DashboardError> {
        let filter = self.resolver.resolve(request)?;
        if let Some(remainder) = &filter.remainder {
            log::debug!("Unrecognized search words: '{remainder}'");
        }
        Ok(filter)
    }

    /// Results for an already resolved filter.
    ///
    /// The remainder never restricts data, so it is dropped before the
    /// cache lookup and the returned results carry the filter without it.
    #[must_use]
    pub fn results_for(&self, filter: &Filter) -> Arc<DashboardResults> {
        let key = filter.clone().without_remainder();
        self.cache
            .get_or_compute(&key, || self.engine.compute(&self.store, &key))
    }

    /// Dropdown options present in the loaded data.
    #[must_use]
    pub fn options(&self) -> DatasetOptions {
        self.store.options()
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    #[must_use]
    pub fn store(&self) -> &DatasetStore {
        &self.store
    }
}
