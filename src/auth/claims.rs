/// JWT Claims structures
///
/// Access and refresh tokens carry different payloads. Both share the
/// registered claims (subject, expiry, and for access tokens the issuer).
/// Refresh tokens deliberately carry nothing else.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TokenError;

/// Registered claims common to both token kinds (RFC 7519)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RegisteredClaims {
    /// Subject (numeric user id, stringified)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issuer; only access tokens carry one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

impl RegisteredClaims {
    /// Extract the numeric user id from the subject
    pub fn user_id(&self) -> Result<i64, TokenError> {
        self.sub.parse::<i64>().map_err(|_| TokenError::Malformed)
    }
}

/// Claims for access tokens
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AccessClaims {
    #[serde(flatten)]
    pub registered: RegisteredClaims,
    /// Audience (service domain)
    pub aud: String,
    /// Display name ("first last")
    pub name: String,
    pub admin: bool,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

impl AccessClaims {
    pub fn user_id(&self) -> Result<i64, TokenError> {
        self.registered.user_id()
    }
}

/// Claims for refresh tokens
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RefreshClaims {
    #[serde(flatten)]
    pub registered: RegisteredClaims,
}

impl RefreshClaims {
    pub fn user_id(&self) -> Result<i64, TokenError> {
        self.registered.user_id()
    }
}

/// Which of the two token kinds to issue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims the codec knows how to verify
pub trait VerifiableClaims: serde::de::DeserializeOwned {
    fn registered(&self) -> &RegisteredClaims;

    /// Kind-specific checks run after signature and expiry.
    fn check_audience(&self, domain: &str) -> Result<(), TokenError>;
}

impl VerifiableClaims for AccessClaims {
    fn registered(&self) -> &RegisteredClaims {
        &self.registered
    }

    fn check_audience(&self, domain: &str) -> Result<(), TokenError> {
        if self.registered.iss.as_deref() != Some(domain) || self.aud != domain {
            return Err(TokenError::WrongIssuer);
        }
        Ok(())
    }
}

impl VerifiableClaims for RefreshClaims {
    fn registered(&self) -> &RegisteredClaims {
        &self.registered
    }

    // Issuer is not checked on refresh tokens. One that carries an issuer is
    // an access token presented in the wrong place.
    fn check_audience(&self, _domain: &str) -> Result<(), TokenError> {
        if self.registered.iss.is_some() {
            return Err(TokenError::Malformed);
        }
        Ok(())
    }
}

/// Access and refresh token issued together for the same subject and instant
#[derive(Debug, Serialize, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(skip)]
    pub access_expires_at: DateTime<Utc>,
    #[serde(skip)]
    pub refresh_expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registered(iss: Option<&str>) -> RegisteredClaims {
        RegisteredClaims {
            sub: "42".to_string(),
            exp: 1_700_000_000,
            iss: iss.map(str::to_string),
        }
    }

    #[test]
    fn test_access_claims_wire_format() {
        let claims = AccessClaims {
            registered: registered(Some("example.com")),
            aud: "example.com".to_string(),
            name: "Jane Doe".to_string(),
            admin: true,
            iat: 1_699_999_100,
        };

        let value = serde_json::to_value(&claims).unwrap();
        assert_eq!(value["sub"], "42");
        assert_eq!(value["iss"], "example.com");
        assert_eq!(value["aud"], "example.com");
        assert_eq!(value["name"], "Jane Doe");
        assert_eq!(value["admin"], true);
        assert_eq!(value["exp"], 1_700_000_000);
        assert_eq!(value["iat"], 1_699_999_100);
    }

    #[test]
    fn test_refresh_claims_carry_only_sub_and_exp() {
        let claims = RefreshClaims {
            registered: registered(None),
        };

        let value = serde_json::to_value(&claims).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 2);
        assert!(object.contains_key("sub"));
        assert!(object.contains_key("exp"));
    }

    #[test]
    fn test_user_id_extraction() {
        assert_eq!(registered(None).user_id(), Ok(42));

        let mut bad = registered(None);
        bad.sub = "not-a-number".to_string();
        assert_eq!(bad.user_id(), Err(TokenError::Malformed));
    }

    #[test]
    fn test_access_issuer_and_audience_checked() {
        let mut claims = AccessClaims {
            registered: registered(Some("example.com")),
            aud: "example.com".to_string(),
            name: "Jane Doe".to_string(),
            admin: false,
            iat: 0,
        };
        assert!(claims.check_audience("example.com").is_ok());
        assert_eq!(claims.check_audience("staging.example.com"), Err(TokenError::WrongIssuer));

        claims.aud = "other.com".to_string();
        assert_eq!(claims.check_audience("example.com"), Err(TokenError::WrongIssuer));
    }

    #[test]
    fn test_refresh_rejects_access_shaped_claims() {
        let claims = RefreshClaims {
            registered: registered(Some("example.com")),
        };
        assert_eq!(claims.check_audience("example.com"), Err(TokenError::Malformed));
    }
}
