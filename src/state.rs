use std::path::PathBuf;
use std::sync::Arc;

use crate::rate_limit::{RateLimitConfig, RateLimitStore};
use crate::store::LeadStore;

// app's shared state

pub struct AppState {
    pub store: Arc<dyn LeadStore>,
    pub rate_limiter: Arc<dyn RateLimitStore>,
    pub form_limit: RateLimitConfig,     // contact, leads, newsletter
    pub download_limit: RateLimitConfig, // guide download
    pub guide_path: PathBuf,
    pub public_dir: PathBuf,
}
