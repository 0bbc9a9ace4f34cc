use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::Value as JsonValue;

use crate::error::Error;
use crate::types::{Credential, Identity};

/// Decodes the claims embedded in a JWT-shaped credential into an [`Identity`].
///
/// The signature is NOT verified. The transport is trusted and the claims are
/// only used for display; authorization stays on the server.
///
/// # Errors
///
/// Returns `Error::Decode` if the credential is not three dot-separated
/// segments, the payload is not base64url JSON, or the claims lack
/// `email`/`username`.
pub fn decode_identity(credential: &Credential) -> Result<Identity, Error> {
    let claims = decode_claims(credential.as_str())?;
    serde_json::from_value(claims).map_err(|e| Error::Decode(format!("claims: {e}")))
}

/// Decodes the payload segment of a JWT-shaped token to JSON, without verification.
pub(crate) fn decode_claims(token_str: &str) -> Result<JsonValue, Error> {
    let parts: Vec<&str> = token_str.split('.').collect();
    if parts.len() != 3 || parts[1].is_empty() {
        return Err(Error::Decode("invalid token format".into()));
    }

    // Some issuers keep the base64 padding.
    let payload_b64 = parts[1].trim_end_matches('=');
    let payload = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| Error::Decode("invalid token payload".into()))?;

    let claims: JsonValue = serde_json::from_slice(&payload)
        .map_err(|_| Error::Decode("invalid token payload".into()))?;
    if !claims.is_object() {
        return Err(Error::Decode("token payload is not an object".into()));
    }
    Ok(claims)
}
