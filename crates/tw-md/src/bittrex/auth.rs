//! Hub session authentication.
//!
//! `Authenticate(apiKey, timestamp, nonce, signature)` where the signature is
//! the uppercase hex HMAC-SHA512 of `timestamp ++ nonce` keyed by the API
//! secret.

use hmac::{Hmac, Mac};
use serde_json::{Value, json};
use sha2::Sha512;
use tw_core::error::{TwError, TwResult};

type HmacSha512 = Hmac<Sha512>;

/// Invocation id reserved for `Authenticate`; subscribe requests count from 1.
pub const AUTH_INVOCATION_ID: u64 = 0;

/// HMAC-SHA512 of `message`, uppercase hex.
pub fn hmac_sha512_sign(secret: &str, message: &str) -> TwResult<String> {
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes()).map_err(|e| TwError::Auth(e.to_string()))?;
    mac.update(message.as_bytes());
    Ok(hex::encode_upper(mac.finalize().into_bytes()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRequest {
    pub api_key: String,
    pub timestamp: i64,
    pub nonce: String,
    pub signature: String,
}

impl AuthRequest {
    pub fn new(api_key: &str, secret: &str, timestamp: i64, nonce: &str) -> TwResult<Self> {
        let signature = hmac_sha512_sign(secret, &format!("{timestamp}{nonce}"))?;
        Ok(Self { api_key: api_key.to_string(), timestamp, nonce: nonce.to_string(), signature })
    }

    /// Hub invocation arguments.
    pub fn args(&self) -> Value {
        json!([self.api_key, self.timestamp, self.nonce, self.signature])
    }
}

/// Interpret an `Authenticate` result: `{"Success": bool, "ErrorCode": ..}`.
pub fn check_result(result: &Value) -> TwResult<()> {
    if result.get("Success").and_then(Value::as_bool) == Some(true) {
        return Ok(());
    }
    let code = result.get("ErrorCode").and_then(Value::as_str).unwrap_or("UNKNOWN");
    Err(TwError::Auth(code.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hmac_sha512_known_vector() {
        // RFC 4231, test case 2.
        let sig = hmac_sha512_sign("Jefe", "what do ya want for nothing?").unwrap();
        assert_eq!(
            sig,
            "164B7A7BFCF819E2E395FBE73B56E0A387BD64222E831FD610270CD7EA2505549758BF75C05A994A6D034F65F8F0E6FDCAEAB1A34D4A6B4B636E070A38BCE737"
        );
    }

    #[test]
    fn signature_is_128_uppercase_hex_over_timestamp_and_nonce() {
        let req = AuthRequest::new("key", "secret", 1_700_000_000_000, "3b6a5f9e-0000-4000-8000-000000000000").unwrap();
        assert_eq!(req.signature.len(), 128);
        assert!(req.signature.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        assert_eq!(
            req.signature,
            hmac_sha512_sign("secret", "17000000000003b6a5f9e-0000-4000-8000-000000000000").unwrap()
        );
        assert_eq!(req.args()[0], "key");
        assert_eq!(req.args()[1], 1_700_000_000_000_i64);
    }

    #[test]
    fn result_codes() {
        assert!(check_result(&json!({"Success": true, "ErrorCode": null})).is_ok());
        let err = check_result(&json!({"Success": false, "ErrorCode": "INVALID_SIGNATURE"})).unwrap_err();
        assert!(matches!(err, TwError::Auth(ref c) if c == "INVALID_SIGNATURE"));
    }
}
