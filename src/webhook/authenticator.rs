//! Webhook body authentication
//!
//! Accepts a body iff its claimed signature equals the digest under at least
//! one configured scope. Comparison is constant-time and every scope is
//! checked, so timing reveals neither which byte differed nor which scope
//! matched.

use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::config::{SecretScope, WebhookSecrets};
use crate::error::{ValidationFailure, WebhookError, WebhookResult};
use crate::webhook::signature::SignatureVerifier;

/// Checks the `Pay-Signature` header against the body
#[derive(Debug, Clone)]
pub struct BodyAuthenticator {
    verifier: SignatureVerifier,
}

impl BodyAuthenticator {
    /// Authenticator over both scopes
    pub fn new(secrets: WebhookSecrets) -> Self {
        Self::with_verifier(SignatureVerifier::new(secrets))
    }

    /// Authenticator over a pre-built verifier
    pub fn with_verifier(verifier: SignatureVerifier) -> Self {
        Self { verifier }
    }

    /// The underlying digest computer
    pub fn verifier(&self) -> &SignatureVerifier {
        &self.verifier
    }

    /// Authenticate `body` against the claimed `signature`
    ///
    /// Returns `Ok(true)` when the claim matches any scope.
    ///
    /// # Errors
    ///
    /// - [`ValidationFailure::MissingSignature`] when the header is absent or blank
    /// - [`ValidationFailure::Mismatch`] when no scope's digest matches
    /// - [`WebhookError::DigestFailure`] when a digest cannot be computed
    pub fn authenticate(&self, body: impl AsRef<[u8]>, signature: Option<&str>) -> WebhookResult<bool> {
        self.authenticate_scope(body, signature).map(|_| true)
    }

    /// Like [`authenticate`](Self::authenticate), but reports which scope matched
    pub fn authenticate_scope(
        &self,
        body: impl AsRef<[u8]>,
        signature: Option<&str>,
    ) -> WebhookResult<SecretScope> {
        let claim = match signature {
            Some(claim) if !claim.trim().is_empty() => claim,
            _ => {
                warn!("Webhook rejected: missing signature header");
                return Err(WebhookError::ValidationFailure(
                    ValidationFailure::MissingSignature,
                ));
            }
        };

        let digests = self.verifier.digests(body)?;

        let mut matched: Option<SecretScope> = None;
        for (scope, digest) in digests.iter() {
            let eq: bool = digest.as_bytes().ct_eq(claim.as_bytes()).into();
            if eq && matched.is_none() {
                matched = Some(scope);
            }
        }

        match matched {
            Some(scope) => {
                debug!(scope = %scope, "Webhook signature verified");
                Ok(scope)
            }
            _ => {
                warn!("Webhook rejected: digest/signature header mismatch");
                Err(WebhookError::ValidationFailure(ValidationFailure::Mismatch))
            }
        }
    }
}
