use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::Config;
use crate::store::Stores;

#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    pub config: Config,
    /// Taken by every mutating operation so its checks and its write are not
    /// interleaved with another mutation.
    pub writes: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(stores: Stores, config: Config) -> Self {
        Self {
            stores,
            config,
            writes: Arc::new(Mutex::new(())),
        }
    }
}
