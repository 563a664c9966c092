//! Repository reachability checks for `webjar doctor`.

use std::time::Duration;

use reqwest::blocking::Client;

use crate::error::{Result, WebjarError};
use crate::types::Repository;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub const USER_AGENT: &str = concat!("webjar/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reachability {
    /// The endpoint answered; any HTTP status counts.
    Reachable { status: u16 },
    Unreachable { reason: String },
}

impl Reachability {
    pub fn is_reachable(&self) -> bool {
        matches!(self, Self::Reachable { .. })
    }
}

#[derive(Debug, Clone)]
pub struct RepositoryProbe {
    http: Client,
}

impl RepositoryProbe {
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| WebjarError::network("-", format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }

    /// `HEAD` the repository URL. Authentication failures still count as
    /// reachable; only transport errors do not.
    pub fn check(&self, repository: &Repository) -> Reachability {
        match self.http.head(&repository.url).send() {
            Ok(resp) => Reachability::Reachable {
                status: resp.status().as_u16(),
            },
            Err(e) => Reachability::Unreachable {
                reason: e.to_string(),
            },
        }
    }
}
