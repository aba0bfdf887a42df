use crate::{middleware::auth::require_auth, AppState};
use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};

use crate::controller::{
    collection_controller, group_controller, health_check_controller, mapping_controller,
    segment_controller, term_controller, text_controller,
};

use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI document. To be a part
// of the rendered document, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Pecha API"
        ),
        paths(
            health_check_controller::health_check,
            text_controller::index,
            text_controller::create,
            text_controller::update,
            text_controller::delete,
            text_controller::contents,
            text_controller::content,
            text_controller::create_contents,
            text_controller::delete_contents,
            text_controller::details,
            text_controller::versions,
            text_controller::infos,
            segment_controller::read,
            segment_controller::create,
            segment_controller::update_content,
            segment_controller::translations,
            segment_controller::commentaries,
            segment_controller::root_mapping,
            segment_controller::info,
            mapping_controller::create,
            mapping_controller::create_batch,
            group_controller::read,
            group_controller::create,
            term_controller::index,
            term_controller::read,
            term_controller::create,
            collection_controller::index,
            collection_controller::create,
        ),
        components(
            schemas(
                domain::collections::Model,
                domain::groups::Model,
                domain::segments::Model,
                domain::table_of_contents::Model,
                domain::terms::Model,
                domain::texts::Model,
                domain::Mapping,
                domain::text::TextsCategoryResponse,
                domain::table_of_content::PaginationDirection,
                crate::error::ErrorBody,
            )
        ),
        modifiers(&SecurityAddon),
        tags(
            (name = "pecha", description = "Multilingual canonical text corpus API")
        )
    )]
struct ApiDoc;

struct SecurityAddon;

// Write endpoints take a signed JWT in the Authorization header.
impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Token issued to a librarian account"))
                        .build(),
                ),
            )
        }
    }
}

pub fn define_routes(app_state: AppState) -> Router {
    let api = Router::new()
        .merge(health_routes())
        .merge(text_routes(app_state.clone()))
        .merge(segment_routes(app_state.clone()))
        .merge(mapping_routes(app_state.clone()))
        .merge(group_routes(app_state.clone()))
        .merge(term_routes(app_state.clone()))
        .merge(collection_routes(app_state.clone()));

    let api_root = app_state.config.api_root.trim_end_matches('/');
    let router = if api_root.is_empty() {
        api
    } else {
        Router::new().nest(api_root, api)
    };

    router.merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/rapidoc"))
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

fn text_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/texts", get(text_controller::index))
        .route("/texts/{text_id}/contents", get(text_controller::contents))
        .route(
            "/texts/{text_id}/contents/{content_id}",
            get(text_controller::content),
        )
        .route("/texts/{text_id}/details", post(text_controller::details))
        .route("/texts/{text_id}/versions", get(text_controller::versions))
        .route("/texts/{text_id}/infos", get(text_controller::infos))
        .merge(
            Router::new()
                .route("/texts", post(text_controller::create))
                .route("/texts/{text_id}", put(text_controller::update))
                .route("/texts/{text_id}", delete(text_controller::delete))
                .route(
                    "/texts/{text_id}/contents",
                    post(text_controller::create_contents),
                )
                .route(
                    "/texts/{text_id}/contents/{content_id}",
                    delete(text_controller::delete_contents),
                )
                .route_layer(from_fn_with_state(app_state.clone(), require_auth)),
        )
        .with_state(app_state)
}

fn segment_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/segments/{segment_id}", get(segment_controller::read))
        .route(
            "/segments/{segment_id}/translations",
            get(segment_controller::translations),
        )
        .route(
            "/segments/{segment_id}/commentaries",
            get(segment_controller::commentaries),
        )
        .route(
            "/segments/{segment_id}/root-mapping",
            get(segment_controller::root_mapping),
        )
        .route("/segments/{segment_id}/info", get(segment_controller::info))
        .merge(
            Router::new()
                .route("/segments", post(segment_controller::create))
                .route("/segments/content", put(segment_controller::update_content))
                .route_layer(from_fn_with_state(app_state.clone(), require_auth)),
        )
        .with_state(app_state)
}

fn mapping_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/mappings", post(mapping_controller::create))
        .route("/mappings/batch", post(mapping_controller::create_batch))
        .route_layer(from_fn_with_state(app_state.clone(), require_auth))
        .with_state(app_state)
}

fn group_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/groups/{group_id}", get(group_controller::read))
        .merge(
            Router::new()
                .route("/groups", post(group_controller::create))
                .route_layer(from_fn_with_state(app_state.clone(), require_auth)),
        )
        .with_state(app_state)
}

fn term_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/terms", get(term_controller::index))
        .route("/terms/{term_id}", get(term_controller::read))
        .merge(
            Router::new()
                .route("/terms", post(term_controller::create))
                .route_layer(from_fn_with_state(app_state.clone(), require_auth)),
        )
        .with_state(app_state)
}

fn collection_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/collections", get(collection_controller::index))
        .merge(
            Router::new()
                .route("/collections", post(collection_controller::create))
                .route_layer(from_fn_with_state(app_state.clone(), require_auth)),
        )
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use sea_orm::DatabaseConnection;
    use service::config::Config;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> Router {
        let config = Config::default().set_jwt_secret("router-secret".to_string());
        let db = Arc::new(DatabaseConnection::Disconnected);
        define_routes(AppState::new(config, &db))
    }

    async fn send(request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_is_served_under_the_api_root() {
        let response = app().oneshot(get_request("/api/v1/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"healthy");
    }

    #[tokio::test]
    async fn write_endpoints_require_a_bearer_token() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/mappings")
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let (status, body) = send(request).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, serde_json::json!({ "detail": "Unauthorized" }));
    }

    #[tokio::test]
    async fn malformed_segment_ids_are_rejected_before_any_lookup() {
        let (status, body) = send(get_request("/api/v1/segments/not-an-id/translations")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().contains("not-an-id"));
    }

    #[tokio::test]
    async fn texts_index_needs_a_text_or_term_id() {
        let (status, body) = send(get_request("/api/v1/texts")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            serde_json::json!({ "detail": "either text_id or term_id is required" })
        );
    }

    #[tokio::test]
    async fn single_contents_read_rejects_a_malformed_content_id() {
        let uri = format!("/api/v1/texts/{}/contents/not-an-id", domain::Id::new_v4());
        let (status, body) = send(get_request(&uri)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().contains("not-an-id"));
    }

    #[tokio::test]
    async fn openapi_document_lists_the_segment_services() {
        let (status, body) = send(get_request("/api-docs/openapi.json")).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/segments/{segment_id}/root-mapping"].is_object());
        assert!(body["components"]["securitySchemes"]["bearer_auth"].is_object());
    }
}
