//! Verification of the HS256 bearer tokens presented to write endpoints.
//!
//! The `web` layer extracts the raw token and calls [`decode_token`]; write
//! operations in this crate then call [`require_admin`] before touching the store.

use crate::error::Error;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use log::*;
use service::config::Config;

pub use claims::Claims;

pub(crate) mod claims;

/// Verifies `token` against the configured `JWT_SECRET` and returns its claims.
///
/// Fails with `Unauthorized` when no secret is configured, the signature does
/// not verify or the token has expired.
pub fn decode_token(config: &Config, token: &str) -> Result<Claims, Error> {
    let secret = config.jwt_secret().ok_or_else(|| {
        warn!("JWT_SECRET is not configured, rejecting bearer token");
        Error::unauthorized()
    })?;

    let validation = Validation::new(Algorithm::HS256);
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|err| {
        debug!("Bearer token rejected: {err}");
        Error::from(err)
    })?;

    Ok(data.claims)
}

pub fn require_admin(claims: &Claims) -> Result<(), Error> {
    if claims.is_admin {
        Ok(())
    } else {
        info!("User {} attempted an admin operation", claims.sub);
        Err(Error::forbidden())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DomainErrorKind, RequestErrorKind};
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token(secret: &str, is_admin: bool, exp: usize) -> String {
        let claims = Claims {
            sub: "editor-1".to_string(),
            email: Some("editor@example.org".to_string()),
            is_admin,
            exp,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn far_future() -> usize {
        (chrono::Utc::now().timestamp() + 3600) as usize
    }

    #[test]
    fn valid_tokens_decode() {
        let config = Config::default().set_jwt_secret("s3cret".to_string());
        let claims = decode_token(&config, &token("s3cret", true, far_future())).unwrap();
        assert_eq!(claims.sub, "editor-1");
        assert!(claims.is_admin);
    }

    #[test]
    fn wrong_secret_is_unauthorized() {
        let config = Config::default().set_jwt_secret("s3cret".to_string());
        let err = decode_token(&config, &token("other", true, far_future())).unwrap_err();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Request(RequestErrorKind::Unauthorized)
        );
    }

    #[test]
    fn expired_tokens_are_unauthorized() {
        let config = Config::default().set_jwt_secret("s3cret".to_string());
        let err = decode_token(&config, &token("s3cret", true, 1_000)).unwrap_err();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Request(RequestErrorKind::Unauthorized)
        );
    }

    #[test]
    fn non_admins_are_forbidden() {
        let claims = Claims {
            sub: "reader".to_string(),
            email: None,
            is_admin: false,
            exp: far_future(),
        };
        assert_eq!(
            require_admin(&claims).unwrap_err().error_kind,
            DomainErrorKind::Request(RequestErrorKind::Forbidden)
        );
    }
}
