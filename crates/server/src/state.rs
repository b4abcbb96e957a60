use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::error::AppResult;
use crate::sources::erp::ErpClient;
use crate::storage::Storage;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub storage: Storage,
    pub config: Arc<AppConfig>,
    pub erp: Option<ErpClient>,
}

impl AppState {
    pub fn new(pool: DbPool, storage: Storage, config: AppConfig) -> AppResult<Self> {
        let erp = config.erp.clone().map(ErpClient::new).transpose()?;
        Ok(Self {
            pool,
            storage,
            config: Arc::new(config),
            erp,
        })
    }
}
