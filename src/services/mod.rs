pub mod admin_service;
pub mod api_client;
pub mod auth_store;
pub mod public_service;
pub mod quiz_session;
pub mod read_cache;
pub mod session_service;
pub mod storage;
pub mod timer_store;
