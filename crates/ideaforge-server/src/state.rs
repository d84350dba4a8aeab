use crate::config::ServerConfig;
use chrono::{DateTime, Utc};
use ideaforge_ai::IdeaAnalyzer;
use ideaforge_storage::ReportStore;
use std::sync::Arc;

/// Shared, read-only handler state. Cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ReportStore>,
    pub analyzer: Arc<dyn IdeaAnalyzer>,
    pub start_time: DateTime<Utc>,
    pub jwt_secret: Arc<String>,
    pub token_expire_secs: u64,
    pub config: Arc<ServerConfig>,
}
