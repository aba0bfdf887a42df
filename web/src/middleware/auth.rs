use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use domain::jwt::{self, Claims};
use log::*;

use crate::{AppState, Error};

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Authentication middleware for the write endpoints.
///
/// Verifies the bearer token and stores its [`Claims`] in the request extensions
/// for the [`AuthenticatedUser`](crate::extractors::authenticated_user::AuthenticatedUser)
/// extractor. Requests without a valid token get 401 Unauthorized.
pub async fn require_auth(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let claims: Result<Claims, domain::error::Error> = match bearer_token(&request) {
        Some(token) => jwt::decode_token(&app_state.config, token),
        None => Err(domain::error::Error::unauthorized()),
    };

    match claims {
        Ok(claims) => {
            trace!("Authenticated request from {}", claims.sub);
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(err) => {
            debug!("Rejecting unauthenticated request to {}", request.uri());
            Error::from(err).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::authenticated_user::AuthenticatedUser;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Router,
    };
    use jsonwebtoken::{encode, EncodingKey, Header};
    use sea_orm::DatabaseConnection;
    use service::config::Config;
    use std::sync::Arc;
    use tower::ServiceExt;

    const SECRET: &str = "test-secret";

    async fn test_handler(AuthenticatedUser(claims): AuthenticatedUser) -> String {
        claims.sub
    }

    fn app() -> Router {
        let config = Config::default().set_jwt_secret(SECRET.to_string());
        let db = Arc::new(DatabaseConnection::Disconnected);
        let app_state = AppState::new(config, &db);

        Router::new()
            .route("/test", get(test_handler))
            .route_layer(from_fn_with_state(app_state.clone(), require_auth))
            .with_state(app_state)
    }

    fn token(secret: &str) -> String {
        let claims = Claims {
            sub: "librarian".to_string(),
            email: None,
            is_admin: true,
            exp: 4_102_444_800,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn require_auth_returns_401_without_a_token() {
        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();
        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn require_auth_returns_401_with_a_token_signed_elsewhere() {
        let request = Request::builder()
            .uri("/test")
            .header("authorization", format!("Bearer {}", token("other-secret")))
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn require_auth_passes_claims_to_the_handler() {
        let request = Request::builder()
            .uri("/test")
            .header("authorization", format!("Bearer {}", token(SECRET)))
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"librarian");
    }
}
