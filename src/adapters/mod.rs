// Adapters layer: concrete implementations for external systems (storage, http, vendor auth).

pub mod google_auth;
pub mod http;
pub mod storage;
