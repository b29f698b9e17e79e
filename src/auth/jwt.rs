/// JWT Token Codec
///
/// Signs and verifies access/refresh tokens with the service's shared HMAC
/// secret. Verification runs in a fixed order:
/// 1. header algorithm must be in the HMAC family (`none` and asymmetric
///    algorithms are rejected before any signature work)
/// 2. signature must validate against the shared secret
/// 3. expiry must not have been reached
/// 4. kind-specific checks (issuer/audience for access tokens)

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::{
    AccessClaims, RefreshClaims, RegisteredClaims, TokenKind, TokenPair, VerifiableClaims,
};
use crate::clock::Clock;
use crate::configuration::JwtSettings;
use crate::error::TokenError;
use crate::store::User;

const HMAC_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    domain: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    pub fn new(config: &JwtSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            domain: config.domain.clone(),
            access_ttl: ttl(config.access_token_expiry),
            refresh_ttl: ttl(config.refresh_token_expiry),
            clock,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Sign a single token of the given kind for `user`, expiring at `expiry`.
    pub fn issue(
        &self,
        user: &User,
        kind: TokenKind,
        expiry: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        self.issue_at(user, kind, self.clock.now(), expiry)
    }

    fn issue_at(
        &self,
        user: &User,
        kind: TokenKind,
        issued_at: DateTime<Utc>,
        expiry: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let header = Header::new(Algorithm::HS256);
        let signed = match kind {
            TokenKind::Access => {
                let claims = AccessClaims {
                    registered: RegisteredClaims {
                        sub: user.id.to_string(),
                        exp: expiry.timestamp(),
                        iss: Some(self.domain.clone()),
                    },
                    aud: self.domain.clone(),
                    name: user.display_name(),
                    admin: user.is_admin,
                    iat: issued_at.timestamp(),
                };
                encode(&header, &claims, &self.encoding_key)
            }
            TokenKind::Refresh => {
                let claims = RefreshClaims {
                    registered: RegisteredClaims {
                        sub: user.id.to_string(),
                        exp: expiry.timestamp(),
                        iss: None,
                    },
                };
                encode(&header, &claims, &self.encoding_key)
            }
        };

        signed.map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Issue an access token (15 min) and a refresh token (24 h) from one instant.
    ///
    /// Either both tokens are signed or an error is returned.
    pub fn issue_pair(&self, user: &User) -> Result<TokenPair, TokenError> {
        let now = self.clock.now();
        let access_expires_at = expiry_after(now, self.access_ttl)?;
        let refresh_expires_at = expiry_after(now, self.refresh_ttl)?;

        let access_token = self.issue_at(user, TokenKind::Access, now, access_expires_at)?;
        let refresh_token = self.issue_at(user, TokenKind::Refresh, now, refresh_expires_at)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            access_expires_at,
            refresh_expires_at,
        })
    }

    /// Verify an access token, including issuer and audience.
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        self.parse_and_verify::<AccessClaims>(token)
    }

    /// Verify a refresh token (signature and expiry only).
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        self.parse_and_verify::<RefreshClaims>(token)
    }

    pub fn parse_and_verify<C: VerifiableClaims>(&self, token: &str) -> Result<C, TokenError> {
        let algorithm = declared_algorithm(token)?;
        match algorithm.parse::<Algorithm>() {
            Ok(alg) if HMAC_ALGORITHMS.contains(&alg) => {}
            _ => return Err(TokenError::UnsupportedAlgorithm(algorithm)),
        }

        // Expiry is compared against the injected clock below.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = HMAC_ALGORITHMS.to_vec();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;

        let claims = decode::<C>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(TokenError::from)?;

        if claims.registered().exp <= self.clock.now().timestamp() {
            return Err(TokenError::Expired);
        }

        claims.check_audience(&self.domain)?;

        Ok(claims)
    }
}

/// Out-of-range lifetimes saturate; issuing with one fails with `Signing`.
fn ttl(seconds: i64) -> Duration {
    Duration::try_seconds(seconds).unwrap_or(Duration::MAX)
}

fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> Result<DateTime<Utc>, TokenError> {
    now.checked_add_signed(ttl).ok_or_else(|| {
        TokenError::Signing(format!(
            "token lifetime of {}s is out of range",
            ttl.num_seconds()
        ))
    })
}

/// Read the `alg` field from the token header without trusting anything else.
fn declared_algorithm(token: &str) -> Result<String, TokenError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 || segments[0].is_empty() || segments[1].is_empty() {
        return Err(TokenError::Malformed);
    }

    let header = URL_SAFE_NO_PAD
        .decode(segments[0])
        .map_err(|_| TokenError::Malformed)?;
    let header: serde_json::Value =
        serde_json::from_slice(&header).map_err(|_| TokenError::Malformed)?;

    header
        .get("alg")
        .and_then(|alg| alg.as_str())
        .map(str::to_string)
        .ok_or(TokenError::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use chrono::TimeZone;

    const SECRET: &str = "test-secret-key-at-least-32-characters-long";

    fn get_test_config() -> JwtSettings {
        JwtSettings::new(SECRET, "example.com")
    }

    fn test_user() -> User {
        User {
            id: 7,
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            email: "admin@example.com".to_string(),
            password_hash: String::new(),
            is_admin: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn codec_with_clock() -> (TokenCodec, Arc<MockClock>) {
        let clock = Arc::new(MockClock::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
        ));
        (TokenCodec::new(&get_test_config(), clock.clone()), clock)
    }

    fn forge(header: serde_json::Value, payload: serde_json::Value, signature: &str) -> String {
        format!(
            "{}.{}.{}",
            URL_SAFE_NO_PAD.encode(header.to_string()),
            URL_SAFE_NO_PAD.encode(payload.to_string()),
            signature
        )
    }

    #[test]
    fn test_issue_pair_and_verify() {
        let (codec, clock) = codec_with_clock();
        let pair = codec.issue_pair(&test_user()).expect("Failed to issue pair");

        let access = codec.verify_access(&pair.access_token).expect("Failed to verify access");
        let refresh = codec.verify_refresh(&pair.refresh_token).expect("Failed to verify refresh");

        assert_eq!(access.registered.sub, "7");
        assert_eq!(refresh.registered.sub, access.registered.sub);
        assert_eq!(access.name, "Jane Doe");
        assert!(access.admin);
        assert_eq!(access.registered.iss.as_deref(), Some("example.com"));
        assert_eq!(access.aud, "example.com");
        assert_eq!(access.iat, clock.now().timestamp());
        assert_eq!(access.registered.exp, access.iat + 15 * 60);
        assert_eq!(refresh.registered.exp, access.iat + 24 * 60 * 60);
        assert_eq!(pair.refresh_expires_at.timestamp(), refresh.registered.exp);
    }

    #[test]
    fn test_out_of_range_lifetime_fails_issuance() {
        let clock = Arc::new(MockClock::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
        ));
        for seconds in [10_000_000_000_000, i64::MAX] {
            let mut config = get_test_config();
            config.refresh_token_expiry = seconds;
            let codec = TokenCodec::new(&config, clock.clone());

            match codec.issue_pair(&test_user()) {
                Err(TokenError::Signing(_)) => (),
                other => panic!("Expected signing failure for {}s, got {:?}", seconds, other.is_ok()),
            }
        }
    }

    #[test]
    fn test_access_token_expires_at_boundary() {
        let (codec, clock) = codec_with_clock();
        let pair = codec.issue_pair(&test_user()).unwrap();

        clock.advance(Duration::minutes(15) - Duration::seconds(1));
        assert!(codec.verify_access(&pair.access_token).is_ok());

        clock.advance(Duration::seconds(1));
        assert_eq!(codec.verify_access(&pair.access_token), Err(TokenError::Expired));
    }

    #[test]
    fn test_different_secret_fails() {
        let (codec, clock) = codec_with_clock();
        let other = TokenCodec::new(
            &JwtSettings::new("a-completely-different-secret-value", "example.com"),
            clock,
        );
        let pair = other.issue_pair(&test_user()).unwrap();

        assert_eq!(codec.verify_access(&pair.access_token), Err(TokenError::SignatureInvalid));
        assert_eq!(codec.verify_refresh(&pair.refresh_token), Err(TokenError::SignatureInvalid));
    }

    #[test]
    fn test_tampered_payload_fails() {
        let (codec, _) = codec_with_clock();
        let pair = codec.issue_pair(&test_user()).unwrap();

        let parts: Vec<&str> = pair.access_token.split('.').collect();
        let mut payload: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[1]).unwrap()).unwrap();
        payload["admin"] = serde_json::Value::Bool(false);
        payload["sub"] = serde_json::Value::String("1".to_string());
        let tampered = format!(
            "{}.{}.{}",
            parts[0],
            URL_SAFE_NO_PAD.encode(payload.to_string()),
            parts[2]
        );

        assert_eq!(codec.verify_access(&tampered), Err(TokenError::SignatureInvalid));
    }

    #[test]
    fn test_none_algorithm_rejected() {
        let (codec, clock) = codec_with_clock();
        let token = forge(
            serde_json::json!({"alg": "none", "typ": "JWT"}),
            serde_json::json!({
                "sub": "7", "exp": clock.now().timestamp() + 600,
                "iss": "example.com", "aud": "example.com",
                "name": "Jane Doe", "admin": true, "iat": clock.now().timestamp()
            }),
            "",
        );

        assert_eq!(
            codec.verify_access(&token),
            Err(TokenError::UnsupportedAlgorithm("none".to_string()))
        );
    }

    #[test]
    fn test_asymmetric_algorithm_rejected() {
        let (codec, clock) = codec_with_clock();
        for alg in ["RS256", "ES256", "PS256", "EdDSA"] {
            let token = forge(
                serde_json::json!({"alg": alg, "typ": "JWT"}),
                serde_json::json!({"sub": "7", "exp": clock.now().timestamp() + 600}),
                "c2lnbmF0dXJl",
            );
            assert_eq!(
                codec.verify_refresh(&token),
                Err(TokenError::UnsupportedAlgorithm(alg.to_string())),
                "algorithm {} should be rejected",
                alg
            );
        }
    }

    #[test]
    fn test_hs512_token_accepted() {
        let (codec, clock) = codec_with_clock();
        let claims = RefreshClaims {
            registered: RegisteredClaims {
                sub: "7".to_string(),
                exp: clock.now().timestamp() + 600,
                iss: None,
            },
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(codec.verify_refresh(&token), Ok(claims));
    }

    #[test]
    fn test_malformed_tokens() {
        let (codec, _) = codec_with_clock();
        for token in ["", "invalid", "invalid.token.here", "a.b", "a.b.c.d", "..."] {
            assert_eq!(
                codec.verify_access(token),
                Err(TokenError::Malformed),
                "token {:?} should be malformed",
                token
            );
        }
    }

    #[test]
    fn test_wrong_issuer() {
        let (codec, clock) = codec_with_clock();
        let staging = TokenCodec::new(&JwtSettings::new(SECRET, "staging.example.com"), clock);
        let pair = staging.issue_pair(&test_user()).unwrap();

        assert_eq!(codec.verify_access(&pair.access_token), Err(TokenError::WrongIssuer));
        // Refresh tokens carry no issuer and are accepted across domains sharing a secret.
        assert!(codec.verify_refresh(&pair.refresh_token).is_ok());
    }

    #[test]
    fn test_token_kinds_not_interchangeable() {
        let (codec, _) = codec_with_clock();
        let pair = codec.issue_pair(&test_user()).unwrap();

        assert_eq!(codec.verify_access(&pair.refresh_token), Err(TokenError::Malformed));
        assert_eq!(codec.verify_refresh(&pair.access_token), Err(TokenError::Malformed));
    }

    #[test]
    fn test_issue_single_token_with_custom_expiry() {
        let (codec, clock) = codec_with_clock();
        let expiry = clock.now() + Duration::seconds(5);
        let token = codec.issue(&test_user(), TokenKind::Refresh, expiry).unwrap();

        let claims = codec.verify_refresh(&token).unwrap();
        assert_eq!(claims.registered.exp, expiry.timestamp());

        clock.advance(Duration::seconds(5));
        assert_eq!(codec.verify_refresh(&token), Err(TokenError::Expired));
    }
}
