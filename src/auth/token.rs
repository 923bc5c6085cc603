//! Admin bearer tokens: `base64("username:timestamp_ms")`.
//!
//! The token is accepted when the username matches the configured admin
//! name (case-insensitive) and the timestamp is within the configured TTL.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::Utc;

pub struct TokenClaims {
    pub username: String,
    pub issued_at_ms: i64,
}

/// Decode the raw token into its claims without judging validity.
pub fn decode(token: &str) -> Result<TokenClaims, String> {
    let bytes = STANDARD
        .decode(token)
        .map_err(|_| "Invalid token format.".to_string())?;
    let decoded = String::from_utf8(bytes).map_err(|_| "Invalid token format.".to_string())?;

    let (username, timestamp) = decoded
        .split_once(':')
        .ok_or_else(|| "Invalid token format.".to_string())?;
    let issued_at_ms: i64 = timestamp
        .parse()
        .map_err(|_| "Invalid token format.".to_string())?;

    Ok(TokenClaims {
        username: username.to_string(),
        issued_at_ms,
    })
}

/// Validate claims against the expected admin username and TTL.
pub fn validate(claims: &TokenClaims, admin_username: &str, ttl_secs: i64) -> Result<(), String> {
    if !claims.username.eq_ignore_ascii_case(admin_username) {
        return Err("Invalid or expired token.".to_string());
    }

    let age_ms = Utc::now().timestamp_millis() - claims.issued_at_ms;
    if age_ms < 0 || age_ms >= ttl_secs * 1000 {
        return Err("Invalid or expired token.".to_string());
    }

    Ok(())
}

/// Issue a token for tests and tooling.
pub fn encode(username: &str, issued_at_ms: i64) -> String {
    STANDARD.encode(format!("{}:{}", username, issued_at_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let now = Utc::now().timestamp_millis();
        let token = encode("pakad", now);
        let claims = decode(&token).unwrap();
        assert_eq!(claims.username, "pakad");
        assert_eq!(claims.issued_at_ms, now);
        assert!(validate(&claims, "pakad", 3600).is_ok());
    }

    #[test]
    fn test_username_is_case_insensitive() {
        let now = Utc::now().timestamp_millis();
        let claims = decode(&encode("PAKAD", now)).unwrap();
        assert!(validate(&claims, "pakad", 3600).is_ok());
    }

    #[test]
    fn test_expired_and_wrong_user_rejected() {
        let hour_ago = Utc::now().timestamp_millis() - 2 * 3600 * 1000;
        let stale = decode(&encode("pakad", hour_ago)).unwrap();
        assert!(validate(&stale, "pakad", 3600).is_err());

        let now = Utc::now().timestamp_millis();
        let wrong = decode(&encode("intruder", now)).unwrap();
        assert!(validate(&wrong, "pakad", 3600).is_err());
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(decode("not base64 at all!").is_err());
        assert!(decode(&STANDARD.encode("no-separator")).is_err());
    }
}
