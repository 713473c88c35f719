use axum::http::HeaderMap;
use krefia::error::AppError;

/// Capability boundary to the identity layer. SAML/TMA verification happens
/// upstream; this service only consumes its outcome.
pub(crate) trait IdentityResolver: Send + Sync {
    /// Yields the verified BSN for the inbound request.
    fn resolve(&self, headers: &HeaderMap) -> Result<String, AppError>;
}

/// Trusts the header the fronting auth proxy sets on verified requests.
pub(crate) struct HeaderIdentity {
    header: String,
}

impl HeaderIdentity {
    pub(crate) fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
        }
    }
}

impl IdentityResolver for HeaderIdentity {
    fn resolve(&self, headers: &HeaderMap) -> Result<String, AppError> {
        let bsn = headers
            .get(&self.header)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .unwrap_or("");

        if bsn.is_empty() {
            return Err(AppError::Auth {
                detail: format!("missing or empty {} header", self.header),
            });
        }

        Ok(bsn.to_string())
    }
}
