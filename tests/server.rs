//! Integration tests for the HTTP API routes

use axum::{body::Body, http::Request};
use serde_json::{json, Value};
use tower::ServiceExt;
use weatherdash::data::{NewsArticle, NewsClient};
use weatherdash::server::{router, AppState};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn state_for(server: &MockServer) -> AppState {
    AppState {
        news: NewsClient::new("test-key").with_base_url(server.uri()),
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_news_returns_first_five_articles() {
    let server = MockServer::start().await;
    let articles: Vec<Value> = (0..8)
        .map(|n| {
            json!({
                "title": format!("Headline {}", n),
                "description": null,
                "url": format!("https://news.example/{}", n),
                "urlToImage": "https://news.example/img.jpg"
            })
        })
        .collect();
    Mock::given(method("GET"))
        .and(path("/v2/top-headlines"))
        .and(query_param("country", "us"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "totalResults": 8,
            "articles": articles
        })))
        .mount(&server)
        .await;

    let response = router(state_for(&server))
        .oneshot(Request::builder().uri("/api/news").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let articles: Vec<NewsArticle> = serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(articles.len(), 5);
    assert_eq!(articles[0].title, "Headline 0");
    assert_eq!(
        articles[4].url_to_image.as_deref(),
        Some("https://news.example/img.jpg")
    );
}

#[tokio::test]
async fn test_news_provider_error_maps_to_500() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/top-headlines"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "status": "error",
            "code": "apiKeyInvalid",
            "message": "Your API key is invalid"
        })))
        .mount(&server)
        .await;

    let response = router(state_for(&server))
        .oneshot(Request::builder().uri("/api/news").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    assert_eq!(body_json(response).await, json!({"error": "Failed to fetch news"}));
}

#[tokio::test]
async fn test_subscribe_acknowledges_subscription() {
    let server = MockServer::start().await;
    let subscription = json!({
        "endpoint": "https://push.example/send/abc",
        "keys": {"p256dh": "key", "auth": "secret"}
    });

    let response = router(state_for(&server))
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/subscribe")
                .header("content-type", "application/json")
                .body(Body::from(subscription.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(body_json(response).await, json!({"message": "Subscription received"}));
}

#[tokio::test]
async fn test_subscribe_rejects_get() {
    let server = MockServer::start().await;

    let response = router(state_for(&server))
        .oneshot(Request::builder().uri("/api/subscribe").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), 405);
}
