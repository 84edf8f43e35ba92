use serde::{Deserialize, Serialize};

pub const NOT_CONFIGURED_MESSAGE: &str = "Helius API key not configured on server";

/// Body of `GET /api/helius/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HealthReport {
    pub fn healthy() -> Self {
        Self {
            ok: true,
            message: None,
        }
    }

    pub fn not_configured() -> Self {
        Self::failed(NOT_CONFIGURED_MESSAGE.to_string())
    }

    pub fn failed(message: String) -> Self {
        Self {
            ok: false,
            message: Some(message),
        }
    }
}
