//! Shared application state

use crate::config::Config;
use crate::store::Database;
use std::sync::Arc;

/// State handed to every handler: the connection pool and the immutable configuration
#[derive(Clone)]
pub struct AppState {
    /// Document store
    pub db: Database,
    /// Configuration loaded at startup
    pub config: Arc<Config>,
}

impl AppState {
    /// Bundle a database with its configuration
    pub fn new(db: Database, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }
}
