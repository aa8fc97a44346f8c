use std::sync::Arc;

use crate::adapters::{AudioFetcher, MetadataFetcher};
use crate::config::Config;
use crate::index::IndexStore;
use crate::tasks::TaskLedger;

/// Dependency-injection context threaded into every handler, per spec
/// section 9: no module-level singletons, each operation receives a
/// reference to the store, config, and adapters it needs.
#[derive(Clone)]
pub struct AppContext {
    pub config: Config,
    pub store: IndexStore,
    pub tasks: TaskLedger,
    pub metadata_fetcher: Arc<dyn MetadataFetcher>,
    pub audio_fetcher: Arc<dyn AudioFetcher>,
}

impl AppContext {
    pub fn new(
        config: Config,
        store: IndexStore,
        metadata_fetcher: Arc<dyn MetadataFetcher>,
        audio_fetcher: Arc<dyn AudioFetcher>,
    ) -> Self {
        let tasks = TaskLedger::new(store.clone());
        Self {
            config,
            store,
            tasks,
            metadata_fetcher,
            audio_fetcher,
        }
    }
}
