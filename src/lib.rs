pub mod config;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::Result;
use crate::services::{
    admin_service::AdminService, api_client::ApiClient, auth_store::AuthStore,
    public_service::PublicService, read_cache::ReadCache, session_service::SessionService,
    storage::KeyValueStore, timer_store::TimerStore,
};
use crate::utils::time::{Clock, SystemClock};

#[derive(Clone)]
pub struct AppState {
    pub auth: AuthStore,
    pub api: ApiClient,
    pub admin: AdminService,
    pub public: PublicService<ApiClient>,
    pub sessions: SessionService<ApiClient>,
}

impl AppState {
    pub fn new(config: &Config, storage: Arc<dyn KeyValueStore>) -> Result<Self> {
        Self::with_clock(config, storage, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: &Config,
        storage: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let auth = AuthStore::load(storage.clone());
        let api = ApiClient::new(&config.api_url, config.request_timeout_secs, auth.clone())?;
        let shared_api = Arc::new(api.clone());

        let admin = AdminService::new(
            api.clone(),
            ReadCache::new(Duration::from_millis(config.cache_dedupe_ms)),
        );
        let public = PublicService::new(shared_api.clone(), config.default_quiz_id);
        let sessions = SessionService::new(
            shared_api,
            TimerStore::new(storage),
            clock,
            chrono::Duration::seconds(config.session_idle_secs.max(1)),
        );

        Ok(Self {
            auth,
            api,
            admin,
            public,
            sessions,
        })
    }
}
