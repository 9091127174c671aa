use jsonwebtoken::{
    decode, decode_header, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header,
    Validation,
};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::debug;

use super::claims::{Claims, TokenKind};
use crate::config::JwtConfig;

/// Applied when a caller passes no TTL or a zero TTL.
pub const DEFAULT_TTL: Duration = Duration::HOUR;

const ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("empty token")]
    Empty,

    #[error("token signature or algorithm is invalid")]
    Signature,

    #[error("token is malformed")]
    Malformed,

    #[error("token is expired")]
    Expired,

    #[error("unexpected token kind")]
    WrongKind,

    #[error("failed to sign token")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// Signing and verification keys plus issuing policy, built once from config.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl JwtKeys {
    pub fn new(
        secret: &[u8],
        issuer: impl Into<String>,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self::new(
            cfg.secret.as_bytes(),
            cfg.issuer.clone(),
            Duration::minutes(cfg.ttl_minutes),
            Duration::minutes(cfg.refresh_ttl_minutes),
        )
    }

    pub fn issue(
        &self,
        user_id: i64,
        kind: TokenKind,
        ttl: Option<Duration>,
    ) -> Result<String, TokenError> {
        let ttl = ttl.filter(|t| !t.is_zero()).unwrap_or(DEFAULT_TTL);
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: user_id,
            iss: self.issuer.clone(),
            iat: now.unix_timestamp(),
            exp: (now + ttl).unix_timestamp(),
            kind,
        };
        let token =
            encode(&Header::new(ALGORITHM), &claims, &self.encoding).map_err(TokenError::Signing)?;
        debug!(user_id, kind = ?kind, "jwt signed");
        Ok(token)
    }

    pub fn sign_access(&self, user_id: i64) -> Result<String, TokenError> {
        self.issue(user_id, TokenKind::Access, Some(self.access_ttl))
    }

    pub fn sign_refresh(&self, user_id: i64) -> Result<String, TokenError> {
        self.issue(user_id, TokenKind::Refresh, Some(self.refresh_ttl))
    }

    /// Checks signature, algorithm and issuer. Expiry is left to the caller.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        if token.is_empty() {
            return Err(TokenError::Empty);
        }

        // A header that is valid JSON but fails to decode names an algorithm
        // the library does not know, e.g. "none".
        let header = decode_header(token).map_err(|e| match e.kind() {
            ErrorKind::Json(_) => TokenError::Signature,
            _ => TokenError::Malformed,
        })?;
        if header.alg != ALGORITHM {
            return Err(TokenError::Signature);
        }

        let mut validation = Validation::new(ALGORITHM);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "iss"]);
        validation.set_issuer(&[&self.issuer]);

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::InvalidAlgorithmName
                | ErrorKind::MissingAlgorithm
                | ErrorKind::InvalidKeyFormat => TokenError::Signature,
                _ => TokenError::Malformed,
            }
        })?;
        debug!(user_id = data.claims.sub, kind = ?data.claims.kind, "jwt verified");
        Ok(data.claims)
    }

    /// Verification path of the refresh endpoint: must be an unexpired refresh token.
    pub fn verify_refresh(&self, token: &str, now: OffsetDateTime) -> Result<Claims, TokenError> {
        let claims = self.verify(token)?;
        if claims.is_expired_at(now) {
            return Err(TokenError::Expired);
        }
        if claims.kind() != TokenKind::Refresh {
            return Err(TokenError::WrongKind);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys(secret: &str) -> JwtKeys {
        JwtKeys::new(
            secret.as_bytes(),
            "spendlog-test",
            Duration::minutes(5),
            Duration::minutes(60),
        )
    }

    #[test]
    fn sign_and_verify_access_token() {
        let keys = make_keys("dev-secret");
        let token = keys.sign_access(42).expect("sign access");
        let claims = keys.verify(&token).expect("verify token");
        assert_eq!(claims.subject_user_id(), 42);
        assert_eq!(claims.iss, "spendlog-test");
        assert_eq!(claims.kind(), TokenKind::Access);
        assert_eq!(claims.exp - claims.iat, 5 * 60);
    }

    #[test]
    fn other_secret_is_a_signature_error() {
        let token = make_keys("secret-a").sign_access(1).unwrap();
        let err = make_keys("secret-b").verify(&token).unwrap_err();
        assert!(matches!(err, TokenError::Signature));
    }

    #[test]
    fn empty_token_is_rejected() {
        assert!(matches!(make_keys("s").verify(""), Err(TokenError::Empty)));
    }

    #[test]
    fn garbage_is_malformed() {
        let keys = make_keys("s");
        assert!(matches!(keys.verify("not-a-jwt"), Err(TokenError::Malformed)));
        assert!(matches!(keys.verify("a.b.c"), Err(TokenError::Malformed)));
    }

    #[test]
    fn alg_none_is_rejected_as_signature_error() {
        // {"alg":"none","typ":"JWT"} . {"sub":1,"iss":"spendlog-test",...,"kind":"access"} . <empty>
        let token = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0.\
            eyJzdWIiOjEsImlzcyI6InNwZW5kbG9nLXRlc3QiLCJpYXQiOjE3MDAwMDAwMDAsImV4cCI6NDEwMjQ0NDgwMCwia2luZCI6ImFjY2VzcyJ9.";
        let err = make_keys("s").verify(token).unwrap_err();
        assert!(matches!(err, TokenError::Signature));
    }

    #[test]
    fn other_hmac_algorithm_is_rejected() {
        let keys = make_keys("shared");
        let claims = Claims {
            sub: 1,
            iss: "spendlog-test".into(),
            iat: 0,
            exp: i64::from(i32::MAX),
            kind: TokenKind::Access,
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(b"shared"),
        )
        .unwrap();
        assert!(matches!(keys.verify(&token), Err(TokenError::Signature)));
    }

    #[test]
    fn tampered_payload_fails_signature() {
        let keys = make_keys("s");
        let token = keys.sign_access(2).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let forged_payload =
            "eyJzdWIiOjEsImlzcyI6InNwZW5kbG9nLXRlc3QiLCJpYXQiOjE3MDAwMDAwMDAsImV4cCI6NDEwMjQ0NDgwMCwia2luZCI6ImFjY2VzcyJ9";
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);
        assert!(matches!(keys.verify(&forged), Err(TokenError::Signature)));
    }

    #[test]
    fn wrong_issuer_is_malformed() {
        let good = make_keys("same");
        let other = JwtKeys::new(b"same", "someone-else", Duration::minutes(5), Duration::minutes(5));
        let token = other.sign_access(1).unwrap();
        assert!(matches!(good.verify(&token), Err(TokenError::Malformed)));
    }

    #[test]
    fn verify_does_not_check_expiry() {
        let keys = make_keys("s");
        let token = keys
            .issue(9, TokenKind::Access, Some(Duration::seconds(-1)))
            .unwrap();
        let claims = keys.verify(&token).expect("expired token still parses");
        assert!(claims.is_expired_at(OffsetDateTime::now_utc()));
    }

    #[test]
    fn missing_or_zero_ttl_defaults_to_one_hour() {
        let keys = make_keys("s");
        for ttl in [None, Some(Duration::ZERO)] {
            let token = keys.issue(3, TokenKind::Access, ttl).unwrap();
            let claims = keys.verify(&token).unwrap();
            assert_eq!(claims.exp - claims.iat, 3600);
        }
    }

    #[test]
    fn verify_refresh_checks_kind_and_expiry() {
        let keys = make_keys("s");
        let now = OffsetDateTime::now_utc();

        let refresh = keys.sign_refresh(5).unwrap();
        assert_eq!(keys.verify_refresh(&refresh, now).unwrap().subject_user_id(), 5);

        let access = keys.sign_access(5).unwrap();
        assert!(matches!(keys.verify_refresh(&access, now), Err(TokenError::WrongKind)));

        let stale = keys
            .issue(5, TokenKind::Refresh, Some(Duration::seconds(-1)))
            .unwrap();
        assert!(matches!(keys.verify_refresh(&stale, now), Err(TokenError::Expired)));
    }
}
