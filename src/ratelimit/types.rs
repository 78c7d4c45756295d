use serde::{Deserialize, Serialize};

/// Counter for one rate-limited identity (route prefix + client).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitBucket {
    pub count: u32,
    pub window_start: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Whole seconds until the current window closes. Only set when denied.
    pub retry_after_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ResetParams {
    pub prefix: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResetResponse {
    pub cleared: usize,
}
