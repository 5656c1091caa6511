use std::str::FromStr;

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::debug;

use crate::config::TokenConfig;

/// JWT payload: the authenticated subject (user email) plus issue and
/// expiry instants as unix timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("malformed token")]
    Malformed,
}

/// Issues and verifies signed bearer tokens. Stateless by design: validity
/// is signature + expiry, nothing server-side to revoke.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    ttl: Duration,
}

impl TokenService {
    pub fn new(config: &TokenConfig) -> anyhow::Result<Self> {
        if config.secret.trim().is_empty() {
            anyhow::bail!("token signing secret must not be empty");
        }
        let algorithm = Algorithm::from_str(&config.algorithm)
            .map_err(|_| anyhow::anyhow!("unknown signing algorithm {:?}", config.algorithm))?;
        if !matches!(
            algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            anyhow::bail!(
                "signing algorithm {:?} is not HMAC; only symmetric secrets are supported",
                config.algorithm
            );
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            algorithm,
            ttl: Duration::minutes(config.ttl_minutes),
        })
    }

    /// Configured lifetime for issued tokens.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, subject: &str, ttl: Duration) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: subject.to_owned(),
            iat: now.unix_timestamp() as usize,
            exp: (now + ttl).unix_timestamp() as usize,
        };
        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding)?;
        debug!(subject = %subject, "token issued");
        Ok(token)
    }

    /// Validates signature and expiry. A token is rejected once `exp < now`
    /// with zero leeway, so the exact expiry second still verifies; against
    /// a minutes-scale ttl that edge is not observable.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        // Expiry is the only time-based contract; no leeway.
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            debug!(error = %e, "token verification failed");
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed,
            }
        })?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_service(secret: &str) -> TokenService {
        TokenService::new(&TokenConfig {
            secret: secret.into(),
            algorithm: "HS256".into(),
            ttl_minutes: 5,
        })
        .expect("token config should be valid")
    }

    #[test]
    fn issue_and_verify_roundtrip() {
        let service = make_service("test-secret");
        let token = service.issue("a@b.com", service.ttl()).expect("issue");
        let claims = service.verify(&token).expect("verify");
        assert_eq!(claims.sub, "a@b.com");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn verify_fails_on_expired_token() {
        let service = make_service("test-secret");
        let token = service
            .issue("a@b.com", Duration::minutes(-2))
            .expect("issue");
        let err = service.verify(&token).unwrap_err();
        assert_eq!(err, TokenError::Expired);
    }

    #[test]
    fn verify_fails_under_different_secret() {
        let issuer = make_service("secret-a");
        let verifier = make_service("secret-b");
        let token = issuer.issue("a@b.com", issuer.ttl()).expect("issue");
        let err = verifier.verify(&token).unwrap_err();
        assert_eq!(err, TokenError::InvalidSignature);
    }

    #[test]
    fn verify_fails_on_garbage_input() {
        let service = make_service("test-secret");
        let err = service.verify("definitely.not.a-jwt").unwrap_err();
        assert_eq!(err, TokenError::Malformed);
    }

    #[test]
    fn new_rejects_empty_secret() {
        // map to () first: the service holds key material without a Debug impl
        let err = TokenService::new(&TokenConfig {
            secret: "  ".into(),
            algorithm: "HS256".into(),
            ttl_minutes: 5,
        })
        .map(|_| ())
        .unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn new_rejects_asymmetric_algorithm() {
        let err = TokenService::new(&TokenConfig {
            secret: "test-secret".into(),
            algorithm: "RS256".into(),
            ttl_minutes: 5,
        })
        .map(|_| ())
        .unwrap_err();
        assert!(err.to_string().contains("not HMAC"));
    }
}
