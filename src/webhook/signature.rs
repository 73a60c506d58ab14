//! Webhook Signature Generation
//!
//! GOV.UK Pay signs every webhook body with HMAC-SHA256 and sends the
//! lowercase hex digest in the `Pay-Signature` header. Each operational
//! scope (front office, back office) has its own signing secret, so a body
//! has one candidate digest per configured scope.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::{SecretScope, WebhookSecrets};
use crate::error::{WebhookError, WebhookResult};

type HmacSha256 = Hmac<Sha256>;

/// Name of the header carrying the body signature
pub const SIGNATURE_HEADER: &str = "Pay-Signature";

/// One hex digest per scope, in scope order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedDigests(Vec<(SecretScope, String)>);

impl ScopedDigests {
    /// Digest computed under `scope`, if that scope was requested
    pub fn get(&self, scope: SecretScope) -> Option<&str> {
        self.0
            .iter()
            .find(|(s, _)| *s == scope)
            .map(|(_, digest)| digest.as_str())
    }

    /// Iterate over `(scope, digest)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (SecretScope, &str)> {
        self.0.iter().map(|(scope, digest)| (*scope, digest.as_str()))
    }

    /// Number of digests
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no scope was requested
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Computes HMAC-SHA256 digests of webhook bodies
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    secrets: WebhookSecrets,
    scopes: Vec<SecretScope>,
}

impl SignatureVerifier {
    /// Verifier over both front-office and back-office scopes
    pub fn new(secrets: WebhookSecrets) -> Self {
        Self::for_scopes(secrets, &SecretScope::ALL)
    }

    /// Verifier restricted to the given scopes
    pub fn for_scopes(secrets: WebhookSecrets, scopes: &[SecretScope]) -> Self {
        let mut unique = Vec::with_capacity(scopes.len());
        for scope in scopes {
            if !unique.contains(scope) {
                unique.push(*scope);
            }
        }
        Self {
            secrets,
            scopes: unique,
        }
    }

    /// Scopes this verifier digests under
    pub fn scopes(&self) -> &[SecretScope] {
        &self.scopes
    }

    /// Hex digest of `body` under a single scope
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::DigestFailure`] when the scope has no secret
    /// configured or the secret is empty.
    pub fn digest(&self, scope: SecretScope, body: impl AsRef<[u8]>) -> WebhookResult<String> {
        let secret = match self.secrets.get(scope) {
            Some(secret) if !secret.is_empty() => secret,
            _ => {
                let err = WebhookError::DigestFailure(format!("no {scope} signing secret configured"));
                tracing::error!(scope = %scope, error = %err, "Webhook digest failed");
                return Err(err);
            }
        };

        hmac_sha256_hex(secret.expose(), body.as_ref()).map_err(|e| {
            tracing::error!(scope = %scope, error = %e, "Webhook digest failed");
            e
        })
    }

    /// Hex digests of `body` under every configured scope
    ///
    /// # Errors
    ///
    /// Fails with [`WebhookError::DigestFailure`] if any scope cannot be digested.
    pub fn digests(&self, body: impl AsRef<[u8]>) -> WebhookResult<ScopedDigests> {
        let body = body.as_ref();
        if self.scopes.is_empty() {
            return Err(WebhookError::DigestFailure(
                "no signing scopes configured".to_string(),
            ));
        }

        let digests = self
            .scopes
            .iter()
            .map(|scope| Ok((*scope, self.digest(*scope, body)?)))
            .collect::<WebhookResult<Vec<_>>>()?;

        Ok(ScopedDigests(digests))
    }
}

/// Lowercase hex HMAC-SHA256 of `body` keyed with `secret`
pub fn hmac_sha256_hex(secret: &[u8], body: &[u8]) -> WebhookResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret).map_err(WebhookError::digest)?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Single-secret callback check used by older integrations
///
/// Returns `true` when `pay_signature_header` is the hex digest of
/// `request_body` under `signing_secret`. An empty secret never verifies.
pub fn verify_callback(request_body: &[u8], signing_secret: &str, pay_signature_header: &str) -> bool {
    if signing_secret.is_empty() {
        return false;
    }
    match hmac_sha256_hex(signing_secret.as_bytes(), request_body) {
        Ok(expected) => bool::from(expected.as_bytes().ct_eq(pay_signature_header.as_bytes())),
        Err(_) => false,
    }
}
