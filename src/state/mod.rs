use std::sync::Arc;

use crate::credentials::CredentialSources;
use crate::upstream::UpstreamClient;

#[derive(Clone)]
pub struct AppState {
    pub credentials: Arc<CredentialSources>,
    pub upstream: UpstreamClient,
}

impl AppState {
    pub fn new(credentials: CredentialSources, upstream: UpstreamClient) -> Self {
        Self {
            credentials: Arc::new(credentials),
            upstream,
        }
    }
}
