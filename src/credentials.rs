use std::fmt;

use zeroize::Zeroizing;

/// Server-only variable holding the Helius API key.
pub const SERVER_KEY_VAR: &str = "HELIUS_API_KEY";
/// Public-prefixed variable, also visible to browser bundles.
pub const PUBLIC_KEY_VAR: &str = "PUBLIC_HELIUS_API_KEY";
/// Substring shipped in `.env.example`; a key containing it was never filled in.
pub const PLACEHOLDER_MARKER: &str = "YOUR_HELIUS_API_KEY";

/// Returns true when `raw` looks like a real key: non-empty after trimming
/// and not the placeholder from the example environment file.
pub fn is_usable(raw: &str) -> bool {
    let trimmed = raw.trim();
    !trimmed.is_empty() && !trimmed.contains(PLACEHOLDER_MARKER)
}

/// An API key held in memory. Zeroized on drop, redacted in `Debug`.
#[derive(Clone)]
pub struct Credential(Zeroizing<String>);

impl Credential {
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(Zeroizing::new(trimmed.to_string())))
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_usable(&self) -> bool {
        is_usable(self.expose())
    }

    /// Replaces every occurrence of the key in `message`.
    pub fn scrub(&self, message: &str) -> String {
        message.replace(self.expose(), "[REDACTED]")
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

/// Both credential sources, captured once at process start.
#[derive(Debug, Clone, Default)]
pub struct CredentialSources {
    pub server: Option<Credential>,
    pub public: Option<Credential>,
}

impl CredentialSources {
    pub fn from_env() -> Self {
        Self::from_values(
            std::env::var(SERVER_KEY_VAR).ok().as_deref(),
            std::env::var(PUBLIC_KEY_VAR).ok().as_deref(),
        )
    }

    pub fn from_values(server: Option<&str>, public: Option<&str>) -> Self {
        Self {
            server: server.and_then(Credential::new),
            public: public.and_then(Credential::new),
        }
    }

    /// Server-side lookup: the server-only key wins, the public key is the fallback.
    pub fn server_credential(&self) -> Option<&Credential> {
        self.server.as_ref().or(self.public.as_ref())
    }

    /// Health-check verdict for server code paths.
    pub fn server_configured(&self) -> bool {
        self.server_credential().is_some_and(Credential::is_usable)
    }

    /// Client-side verdict: consults the public key only.
    pub fn public_configured(&self) -> bool {
        self.public.as_ref().is_some_and(Credential::is_usable)
    }
}
