use std::sync::atomic::AtomicBool;
use std::time::Instant;

use credmesh_store::LogStore;

use crate::config::Config;

pub struct AppState {
    pub config: Config,
    pub store: LogStore,
    pub started_at: Instant,
    pub draining: AtomicBool,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let store = LogStore::new(&config.data_dir);
        AppState {
            config,
            store,
            started_at: Instant::now(),
            draining: AtomicBool::new(false),
        }
    }
}
