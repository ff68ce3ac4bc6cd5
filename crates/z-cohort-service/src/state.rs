//! Application state.

use std::sync::{Arc, Mutex, PoisonError};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use z_cohort_core::{DistributionReport, DistributionRequest};
use z_cohort_store::{distribute, RocksStore, Store};

use crate::config::ServiceConfig;
use crate::error::ApiError;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<RocksStore>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Seeds a fresh RNG for each distribution.
    rng: Arc<Mutex<ChaCha8Rng>>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<RocksStore>, config: ServiceConfig) -> Self {
        let rng = match config.distribution_seed {
            Some(seed) => {
                tracing::info!(seed, "Distribution RNG seeded from configuration");
                ChaCha8Rng::seed_from_u64(seed)
            }
            None => ChaCha8Rng::from_entropy(),
        };

        Self {
            store,
            config,
            rng: Arc::new(Mutex::new(rng)),
        }
    }

    /// Run a store operation on the blocking pool.
    ///
    /// Transactions can wait on row locks held by other requests, so they
    /// never run on the async workers.
    pub async fn with_store<T, E, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&RocksStore) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Into<ApiError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .map_err(|e| ApiError::Internal(format!("store task failed: {e}")))?
            .map_err(Into::into)
    }

    /// Run a distribution in its own transaction.
    ///
    /// The shared RNG is only held long enough to seed a per-call generator.
    pub async fn distribute(
        &self,
        request: DistributionRequest,
    ) -> Result<DistributionReport, ApiError> {
        let seed: u64 = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        self.with_store(move |store| {
            store.transaction(|txn| distribute(txn, &mut rng, &request))
        })
        .await
    }
}
