// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use threatwatch_db::{DbError, Store};
use threatwatch_engine::ScanRunner;
use threatwatch_types::ProbeConfig;

/// Global application state for the API server.
pub struct AppState {
    /// Persistent tenant/scan database, shared with the scan runner.
    pub store: Arc<Mutex<Store>>,
    /// Scan orchestration: quota gate, probes, lifecycle.
    pub runner: Arc<ScanRunner>,
    /// Server start time for uptime reporting.
    pub started_at: Instant,
    /// SHA-256 hash of the API key (if configured). The plaintext key is never
    /// stored — only its hash is kept in memory so that a heap dump cannot
    /// directly reveal the credential.
    pub api_key_hash: Option<[u8; 32]>,
}

/// Hash a plaintext API key to a 32-byte SHA-256 digest.
fn hash_api_key(key: &str) -> [u8; 32] {
    let digest = Sha256::digest(key.as_bytes());
    digest.into()
}

impl AppState {
    pub fn new(db_path: Option<&Path>, api_key: Option<String>) -> Result<Self, DbError> {
        let store = match db_path {
            Some(path) => Store::open(path)?,
            None => Store::open_default()?,
        };
        Ok(Self::from_store(store, api_key))
    }

    /// Create an AppState with an in-memory database (for testing).
    pub fn new_in_memory(api_key: Option<String>) -> Result<Self, DbError> {
        Ok(Self::from_store(Store::open_in_memory()?, api_key))
    }

    fn from_store(store: Store, api_key: Option<String>) -> Self {
        let store = Arc::new(Mutex::new(store));
        let runner = Arc::new(ScanRunner::new(store.clone(), ProbeConfig::default()));
        Self::with_runner(store, runner, api_key)
    }

    /// Construct with an explicit runner (tests inject fake probes here).
    pub fn with_runner(
        store: Arc<Mutex<Store>>,
        runner: Arc<ScanRunner>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            store,
            runner,
            started_at: Instant::now(),
            api_key_hash: api_key.as_deref().map(hash_api_key),
        }
    }
}
