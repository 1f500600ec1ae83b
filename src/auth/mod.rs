//! Tenant resolution from transport credentials.
//!
//! The selector picks a strategy from the Authorization header, extracts a
//! tenant lookup key and a credential, and converges on one routine: find
//! exactly one tenant by the configured searchable attribute and compare its
//! stored authenticatable attribute in constant time. Every failure mode
//! (malformed header, unknown tenant, wrong credential) surfaces as the same
//! [`ScimError::InvalidCredentials`], which keeps tenant enumeration blind.

use crate::error::{ScimError, ScimResult};
use crate::provider::{DirectoryProvider, DirectoryTenant};
use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use log::debug;
use serde_json::Value;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq as _;

/// How the inbound request authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStrategy {
    /// OAuth bearer token carrying a (possibly signed) tenant payload
    Bearer,
    /// HTTP Basic with the tenant lookup key as username
    Basic,
}

/// Signature algorithm for bearer-token payloads.
///
/// `None` decodes the payload without verification and falls back to the raw
/// token as the lookup key. It exists for drop-in compatibility with
/// deployments that never configured signing and is NOT safe against forged
/// tokens; production tenants should configure [`SigningAlgorithm::Hs256`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SigningAlgorithm {
    #[default]
    None,
    /// HMAC-SHA-256 verified JWT
    Hs256,
}

/// Authentication configuration for one tenant directory.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// Tenant attribute used to look the tenant up (e.g. `subdomain`)
    pub searchable_attribute: String,
    /// Tenant attribute holding the stored credential (e.g. `api_token`)
    pub authenticatable_attribute: String,
    pub algorithm: SigningAlgorithm,
    /// Shared secret; required when `algorithm` is `Hs256`
    pub signing_secret: Option<String>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            searchable_attribute: "subdomain".into(),
            authenticatable_attribute: "api_token".into(),
            algorithm: SigningAlgorithm::default(),
            signing_secret: None,
        }
    }
}

/// Resolves tenants from Authorization headers.
#[derive(Debug, Clone)]
pub struct AuthSelector {
    settings: AuthSettings,
}

impl AuthSelector {
    pub fn new(settings: AuthSettings) -> Self {
        Self { settings }
    }

    /// Bearer when the header contains the literal `Bearer`, Basic otherwise.
    pub fn strategy(authorization: Option<&str>) -> AuthStrategy {
        if authorization.is_some_and(|header| header.contains("Bearer")) {
            AuthStrategy::Bearer
        } else {
            AuthStrategy::Basic
        }
    }

    /// Authenticate a request and resolve its tenant.
    ///
    /// Returns [`ScimError::InvalidCredentials`] for every failure, with no
    /// distinction between causes.
    pub async fn authenticate<P: DirectoryProvider>(
        &self,
        provider: &P,
        authorization: Option<&str>,
    ) -> ScimResult<DirectoryTenant> {
        let (lookup_key, credential) = self
            .extract(authorization)
            .ok_or(ScimError::InvalidCredentials)?;
        if lookup_key.is_empty() || credential.is_empty() {
            return Err(ScimError::InvalidCredentials);
        }

        let tenant = provider
            .find_tenant(&self.settings.searchable_attribute, &lookup_key)
            .await
            .map_err(|_| ScimError::InvalidCredentials)?
            .ok_or(ScimError::InvalidCredentials)?;

        let stored = tenant
            .credential(&self.settings.authenticatable_attribute)
            .ok_or(ScimError::InvalidCredentials)?;

        if bool::from(stored.as_bytes().ct_eq(credential.as_bytes())) {
            debug!(
                "authenticated tenant '{}' (credential {})",
                tenant.id,
                fingerprint(&credential)
            );
            Ok(tenant)
        } else {
            debug!("credential mismatch for lookup key fingerprint {}", fingerprint(&lookup_key));
            Err(ScimError::InvalidCredentials)
        }
    }

    /// Extract `(lookup_key, credential)` from the Authorization header.
    fn extract(&self, authorization: Option<&str>) -> Option<(String, String)> {
        let header = authorization?;
        match Self::strategy(Some(header)) {
            AuthStrategy::Bearer => {
                let token = header.split_whitespace().last()?;
                let lookup_key = self.bearer_lookup_key(token)?;
                Some((lookup_key, token.to_string()))
            }
            AuthStrategy::Basic => {
                let encoded = header.split_whitespace().last()?;
                let decoded = STANDARD.decode(encoded).ok()?;
                let text = String::from_utf8(decoded).ok()?;
                let (username, password) = text.split_once(':')?;
                Some((username.to_string(), password.to_string()))
            }
        }
    }

    /// Obtain the tenant lookup key from a bearer token payload.
    fn bearer_lookup_key(&self, token: &str) -> Option<String> {
        match self.settings.algorithm {
            SigningAlgorithm::None => match self.unverified_claims(token) {
                Some(claims) => self.claim_value(&claims),
                // Pass-through: the token itself is the lookup key.
                None => Some(token.to_string()),
            },
            SigningAlgorithm::Hs256 => {
                let secret = self.settings.signing_secret.as_deref()?;
                let mut validation = jsonwebtoken::Validation::new(jsonwebtoken::Algorithm::HS256);
                validation.validate_exp = false;
                validation.required_spec_claims.clear();
                let decoded = jsonwebtoken::decode::<Value>(
                    token,
                    &jsonwebtoken::DecodingKey::from_secret(secret.as_bytes()),
                    &validation,
                )
                .ok()?;
                self.claim_value(&decoded.claims)
            }
        }
    }

    /// Unverified payload decode of a JWT-shaped token.
    fn unverified_claims(&self, token: &str) -> Option<Value> {
        let payload = token.split('.').nth(1)?;
        let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    fn claim_value(&self, claims: &Value) -> Option<String> {
        match claims.get(self.settings.searchable_attribute.as_str())? {
            Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Short SHA-256 fingerprint for audit logs; raw credentials never hit the log.
fn fingerprint(secret: &str) -> String {
    let digest = Sha256::digest(secret.as_bytes());
    let mut hex = String::with_capacity(8);
    for byte in &digest[..4] {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::InMemoryDirectory;
    use serde_json::{Map, json};

    fn tenant_attributes(token: &str) -> Map<String, Value> {
        let mut attributes = Map::new();
        attributes.insert("subdomain".into(), json!("acme"));
        attributes.insert("api_token".into(), json!(token));
        attributes
    }

    async fn directory(token: &str) -> InMemoryDirectory {
        let directory = InMemoryDirectory::new();
        directory.add_tenant("acme", tenant_attributes(token)).await;
        directory
    }

    fn basic_header(username: &str, password: &str) -> String {
        format!(
            "Basic {}",
            STANDARD.encode(format!("{username}:{password}"))
        )
    }

    #[test]
    fn strategy_selection_keys_on_the_bearer_literal() {
        assert_eq!(
            AuthSelector::strategy(Some("Bearer abc")),
            AuthStrategy::Bearer
        );
        assert_eq!(
            AuthSelector::strategy(Some("Basic abc")),
            AuthStrategy::Basic
        );
        assert_eq!(AuthSelector::strategy(None), AuthStrategy::Basic);
    }

    #[tokio::test]
    async fn basic_credentials_resolve_the_tenant() {
        let selector = AuthSelector::new(AuthSettings::default());
        let directory = directory("s3cret").await;

        let tenant = selector
            .authenticate(&directory, Some(&basic_header("acme", "s3cret")))
            .await
            .unwrap();
        assert_eq!(tenant.id, "acme");
    }

    #[tokio::test]
    async fn every_failure_mode_is_invalid_credentials() {
        let selector = AuthSelector::new(AuthSettings::default());
        let directory = directory("s3cret").await;

        let cases = [
            None,                                              // no header
            Some("Basic not-base64!".to_string()),             // malformed
            Some(basic_header("acme", "wrong")),               // bad credential
            Some(basic_header("unknown", "s3cret")),           // unknown tenant
            Some(basic_header("", "")),                        // blank
        ];
        for header in cases {
            let error = selector
                .authenticate(&directory, header.as_deref())
                .await
                .unwrap_err();
            assert!(matches!(error, ScimError::InvalidCredentials));
            assert_eq!(error.to_string(), "Invalid credentials");
        }
    }

    #[tokio::test]
    async fn unsigned_bearer_token_decodes_its_payload() {
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&json!({"subdomain": "acme"})).unwrap());
        let header_segment = URL_SAFE_NO_PAD.encode(b"{\"alg\":\"none\"}");
        let token = format!("{header_segment}.{payload}.");

        let selector = AuthSelector::new(AuthSettings::default());
        let directory = directory(&token).await;

        let tenant = selector
            .authenticate(&directory, Some(&format!("Bearer {token}")))
            .await
            .unwrap();
        assert_eq!(tenant.id, "acme");
    }

    #[tokio::test]
    async fn opaque_bearer_token_passes_through_as_lookup_key() {
        // With no signature configured the raw token doubles as lookup key
        // and credential.
        let selector = AuthSelector::new(AuthSettings {
            searchable_attribute: "api_token".into(),
            ..AuthSettings::default()
        });
        let directory = directory("opaque-token").await;

        let tenant = selector
            .authenticate(&directory, Some("Bearer opaque-token"))
            .await
            .unwrap();
        assert_eq!(tenant.id, "acme");
    }

    #[tokio::test]
    async fn hs256_bearer_token_is_verified() {
        let token = jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &json!({"subdomain": "acme"}),
            &jsonwebtoken::EncodingKey::from_secret(b"signing-key"),
        )
        .unwrap();

        let settings = AuthSettings {
            algorithm: SigningAlgorithm::Hs256,
            signing_secret: Some("signing-key".into()),
            ..AuthSettings::default()
        };
        let directory = directory(&token).await;

        let tenant = AuthSelector::new(settings.clone())
            .authenticate(&directory, Some(&format!("Bearer {token}")))
            .await
            .unwrap();
        assert_eq!(tenant.id, "acme");

        // A token signed with a different key fails uniformly.
        let forged = jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &json!({"subdomain": "acme"}),
            &jsonwebtoken::EncodingKey::from_secret(b"other-key"),
        )
        .unwrap();
        let error = AuthSelector::new(settings)
            .authenticate(&directory, Some(&format!("Bearer {forged}")))
            .await
            .unwrap_err();
        assert!(matches!(error, ScimError::InvalidCredentials));
    }
}
