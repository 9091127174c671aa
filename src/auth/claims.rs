use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Type of JWT: access or refresh.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT payload. Validated once in `JwtKeys::verify`, then read through the
/// typed accessors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,    // user ID
    pub iss: String, // issuer
    pub iat: i64,    // issued at (unix timestamp)
    pub exp: i64,    // expires at (unix timestamp)
    pub kind: TokenKind,
}

impl Claims {
    pub fn subject_user_id(&self) -> i64 {
        self.sub
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    /// Out-of-range timestamps clamp to the unix epoch, which reads as expired.
    pub fn expires_at(&self) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(self.exp).unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }

    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.exp < now.unix_timestamp()
    }
}
