//! Gateway API surface
//!
//! The crate does not talk to the gateway itself. [`GovpayApi`] is the seam
//! a transport implements; the helpers here hold the rules every transport
//! must follow: which bearer token a call uses, how parameters become a
//! request body, and what may be logged about a request.

use std::fmt;

use serde_json::Value;

use crate::config::{GovpayConfig, SecretString};
use crate::error::GovpayApiError;

/// Number of trailing token characters that may appear in logs
const TOKEN_SUFFIX_LEN: usize = 5;

/// HTTP methods used against the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

impl HttpMethod {
    /// Lowercase method name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Patch => "patch",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A client able to send authenticated requests to the gateway
///
/// Implementations pick the bearer token with
/// [`ApiCredentials::bearer_token`] and build the body with
/// [`request_payload`].
pub trait GovpayApi: Send + Sync {
    /// Send one request and return the decoded response body
    ///
    /// # Errors
    ///
    /// [`GovpayApiError`] when the request cannot be built, sent, or is
    /// answered with an error.
    fn send_request(
        &self,
        method: HttpMethod,
        path: &str,
        params: Option<&Value>,
        is_moto: bool,
    ) -> Result<Value, GovpayApiError>;
}

/// Gateway location and the tokens for each office
#[derive(Debug, Clone)]
pub struct ApiCredentials {
    govpay_url: String,
    front_office_token: SecretString,
    back_office_token: SecretString,
    host_is_back_office: bool,
}

impl ApiCredentials {
    /// Credentials from explicit values
    pub fn new(
        govpay_url: impl Into<String>,
        front_office_token: SecretString,
        back_office_token: SecretString,
        host_is_back_office: bool,
    ) -> Self {
        Self {
            govpay_url: govpay_url.into(),
            front_office_token,
            back_office_token,
            host_is_back_office,
        }
    }

    /// Credentials from loaded configuration
    pub fn from_config(config: &GovpayConfig) -> Self {
        Self::new(
            config.govpay_url.clone(),
            config.front_office_api_token.clone(),
            config.back_office_api_token.clone(),
            config.host_is_back_office,
        )
    }

    /// Whether this host serves back-office users
    pub fn host_is_back_office(&self) -> bool {
        self.host_is_back_office
    }

    /// Token for a call
    ///
    /// The back-office token is used only for MOTO calls made from a
    /// back-office host; everything else uses the front-office token.
    pub fn bearer_token(&self, is_moto: bool) -> &SecretString {
        if self.host_is_back_office && is_moto {
            &self.back_office_token
        } else {
            &self.front_office_token
        }
    }

    /// `Authorization` header value for a call
    pub fn authorization_header(&self, is_moto: bool) -> String {
        format!("Bearer {}", self.bearer_token(is_moto).expose_str())
    }

    /// Absolute URL of `path`
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.govpay_url, path)
    }

    /// Log line for an outgoing request; only the token's tail is shown
    pub fn describe_request(
        &self,
        method: HttpMethod,
        path: &str,
        params: Option<&Value>,
        is_moto: bool,
    ) -> String {
        let params = params.map(Value::to_string).unwrap_or_default();
        format!(
            "sending {} request to govpay ({}), params: {}, moto: {}, govpay API token ending \"{}\"",
            method,
            path,
            params,
            is_moto,
            token_suffix(self.bearer_token(is_moto))
        )
    }
}

fn token_suffix(token: &SecretString) -> String {
    let chars: Vec<char> = token.expose_str().chars().collect();
    if chars.len() < TOKEN_SUFFIX_LEN {
        return String::new();
    }
    chars[chars.len() - TOKEN_SUFFIX_LEN..].iter().collect()
}

/// Request body for `params`
///
/// Returns `None` when there are no parameters or the object is empty;
/// otherwise the object with `null` members removed, as JSON text.
///
/// # Errors
///
/// [`GovpayApiError::InvalidParams`] when `params` is not a JSON object.
pub fn request_payload(params: Option<&Value>) -> Result<Option<String>, GovpayApiError> {
    let params = match params {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(GovpayApiError::InvalidParams(format!(
                "expected a JSON object, got {other}"
            )))
        }
    };

    if params.is_empty() {
        return Ok(None);
    }

    let compacted: serde_json::Map<String, Value> = params
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    serde_json::to_string(&compacted)
        .map(Some)
        .map_err(|e| GovpayApiError::InvalidParams(e.to_string()))
}

/// Build and log a [`GovpayApiError::RequestFailed`]
pub fn request_failed(
    method: HttpMethod,
    path: &str,
    params: Option<&Value>,
    message: impl fmt::Display,
) -> GovpayApiError {
    let params = params.map(Value::to_string).unwrap_or_default();
    let message = format!("params: {params}, {message}");
    tracing::error!(
        method = %method,
        path = path,
        error = %message,
        "Error sending request to govpay"
    );
    GovpayApiError::RequestFailed {
        method: method.to_string(),
        path: path.to_string(),
        message,
    }
}
