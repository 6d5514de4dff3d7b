use std::sync::Arc;

use askama::Template;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};

use crate::aggregator::{Aggregator, NewsItem};

pub struct AppState {
    pub aggregator: Arc<Aggregator>,
}

// Template structs
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate;

// Wrapper for HTML responses
struct HtmlTemplate<T>(T);

impl<T: Template> IntoResponse for HtmlTemplate<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render template: {}", err),
            )
                .into_response(),
        }
    }
}

// Route handlers
pub async fn index() -> impl IntoResponse {
    HtmlTemplate(IndexTemplate)
}

/// The aggregation endpoint. Always `200 OK` with a JSON array; sources
/// that failed simply contribute no items.
pub async fn news(State(state): State<Arc<AppState>>) -> Json<Vec<NewsItem>> {
    let aggregation = state.aggregator.aggregate().await;
    Json(aggregation.items)
}

pub async fn health() -> impl IntoResponse {
    Html("OK")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::get,
        Router,
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn create_test_app(config_toml: &str) -> Router {
        let config = Config::from_str(config_toml).unwrap();
        let state = Arc::new(AppState {
            aggregator: Arc::new(Aggregator::new(&config)),
        });

        Router::new()
            .route("/", get(index))
            .route("/api/news", get(news))
            .route("/health", get(health))
            .with_state(state)
    }

    mod health_tests {
        use super::*;

        #[tokio::test]
        async fn test_health_endpoint() {
            let app = create_test_app("sources = []");

            let response = app
                .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::OK);

            let body = response.into_body().collect().await.unwrap().to_bytes();
            assert_eq!(&body[..], b"OK");
        }
    }

    mod index_tests {
        use super::*;

        #[tokio::test]
        async fn test_index_serves_presenter_shell() {
            let app = create_test_app("sources = []");

            let response = app
                .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::OK);

            let body = response.into_body().collect().await.unwrap().to_bytes();
            let body_str = String::from_utf8(body.to_vec()).unwrap();

            assert!(body_str.contains("Latest News"));
            assert!(body_str.contains("news-feed"));
            assert!(body_str.contains("/static/app.js"));
        }
    }

    mod news_tests {
        use super::*;

        #[tokio::test]
        async fn test_news_with_no_sources_is_empty_array() {
            let app = create_test_app("sources = []");

            let response = app
                .oneshot(
                    Request::builder()
                        .uri("/api/news")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::OK);

            let body = response.into_body().collect().await.unwrap().to_bytes();
            let items: Vec<serde_json::Value> = serde_json::from_slice(&body).unwrap();
            assert!(items.is_empty());
        }

        #[tokio::test]
        async fn test_news_with_unreachable_source_is_still_ok() {
            let app = create_test_app(
                r#"
                request_timeout = 2

                [[sources]]
                publisher = "Dead Source"
                feed_url = "http://127.0.0.1:9/rss"
                "#,
            );

            let response = app
                .oneshot(
                    Request::builder()
                        .uri("/api/news")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::OK);

            let body = response.into_body().collect().await.unwrap().to_bytes();
            let items: Vec<serde_json::Value> = serde_json::from_slice(&body).unwrap();
            assert!(items.is_empty());
        }
    }
}
