//! API key authentication.
//!
//! Every protected handler takes an [`ApiClient`] argument. Extracting it
//! checks the `X-API-Key` header against the configured keys, which are held
//! only as blake3 digests.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use stackhouse_control::ControlPlane;

use crate::error::ApiError;
use crate::state::GatewayState;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// The set of accepted API keys.
#[derive(Debug, Default)]
pub struct ApiKeys {
    digests: Vec<blake3::Hash>,
}

impl ApiKeys {
    /// Build the set from plaintext keys.
    #[must_use]
    pub fn new<S: AsRef<str>>(keys: &[S]) -> Self {
        Self {
            digests: keys
                .iter()
                .map(|k| blake3::hash(k.as_ref().as_bytes()))
                .collect(),
        }
    }

    /// Number of accepted keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.digests.len()
    }

    /// Whether no key is accepted at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }

    /// Look up a presented key, returning its digest when accepted.
    ///
    /// `blake3::Hash` equality is constant-time.
    #[must_use]
    pub fn verify(&self, key: &str) -> Option<blake3::Hash> {
        let digest = blake3::hash(key.as_bytes());
        self.digests.iter().any(|d| *d == digest).then_some(digest)
    }
}

/// An authenticated API caller.
#[derive(Debug, Clone)]
pub struct ApiClient {
    /// Short, loggable fingerprint of the key used.
    pub fingerprint: String,
}

impl ApiClient {
    fn from_digest(digest: &blake3::Hash) -> Self {
        let hex = digest.to_hex();
        Self {
            fingerprint: hex.as_str()[..12].to_string(),
        }
    }
}

#[async_trait]
impl<C> FromRequestParts<Arc<GatewayState<C>>> for ApiClient
where
    C: ControlPlane + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<GatewayState<C>>,
    ) -> Result<Self, Self::Rejection> {
        let key = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or(ApiError::MissingApiKey)?;

        let digest = state.api_keys.verify(key).ok_or_else(|| {
            tracing::debug!(path = %parts.uri.path(), "Rejected request with unknown API key");
            ApiError::InvalidApiKey
        })?;

        Ok(Self::from_digest(&digest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_known_keys_only() {
        let keys = ApiKeys::new(&["alpha", "beta"]);
        assert_eq!(keys.len(), 2);
        assert!(keys.verify("alpha").is_some());
        assert!(keys.verify("beta").is_some());
        assert!(keys.verify("gamma").is_none());
        assert!(keys.verify("").is_none());
    }

    #[test]
    fn empty_set_rejects_everything() {
        let keys = ApiKeys::new::<String>(&[]);
        assert!(keys.is_empty());
        assert!(keys.verify("anything").is_none());
    }

    #[test]
    fn fingerprint_is_stable_and_short() {
        let keys = ApiKeys::new(&["alpha"]);
        let a = ApiClient::from_digest(&keys.verify("alpha").unwrap());
        let b = ApiClient::from_digest(&blake3::hash(b"alpha"));
        assert_eq!(a.fingerprint, b.fingerprint);
        assert_eq!(a.fingerprint.len(), 12);
    }
}
