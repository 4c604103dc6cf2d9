#![allow(dead_code)]

use std::time::Duration;

use axum::{http::StatusCode, routing::post, Json, Router};
use product_reviews::{
    config::{AuthConfig, SentimentConfig},
    create_api_router, AppState, Config,
};
use reqwest::{header, Client};
use serde_json::{json, Value};
use tempfile::TempDir;

pub struct TestApp {
    pub address: String,
    pub client: Client,
    // Holds the on-disk database until the test ends.
    _data_dir: Option<TempDir>,
}

#[derive(Default)]
pub struct Options {
    pub require_auth: bool,
    pub seed_database: bool,
    /// Use a sqlite file with a multi-connection pool instead of `:memory:`.
    pub on_disk: bool,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .client
            .post(self.url("/users/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Failed to send login request");
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        let body = response
            .json::<Value>()
            .await
            .expect("Failed to parse login response JSON");
        body["token"]
            .as_str()
            .expect("Token not found in login response")
            .to_owned()
    }

    pub async fn create_product(&self, name: &str, category: &str, price: f64) -> Value {
        let response = self
            .client
            .post(self.url("/products"))
            .json(&json!({
                "name": name,
                "description": format!("About {name}"),
                "category": category,
                "price": price
            }))
            .send()
            .await
            .expect("Failed to send create product request");
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);

        response.json().await.expect("Failed to parse product JSON")
    }
}

pub fn bearer(token: &str) -> header::HeaderMap {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {}", token))
            .expect("Failed to create Authorization header"),
    );
    headers
}

/// Runs every request future on its own task and collects the results in
/// order.
pub async fn spawn_all<F, T>(futures: impl Iterator<Item = F>) -> Vec<T>
where
    F: std::future::Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let handles: Vec<_> = futures.map(tokio::spawn).collect();
    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(handle.await.expect("Request task panicked"));
    }
    results
}

pub async fn spawn_app(options: Options) -> TestApp {
    let sentiment_url = serve(mock_sentiment_router()).await;

    let (data_dir, database_url, db_max_connections) = if options.on_disk {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("reviews.db").display());
        (Some(dir), url, 5)
    } else {
        (None, "sqlite::memory:".to_owned(), 1)
    };

    let config = Config {
        port: 0,
        database_url,
        db_max_connections,
        seed_database: options.seed_database,
        auth: AuthConfig {
            jwt_secret: "integration-test-secret".into(),
            token_ttl_hours: 1,
            require_auth: options.require_auth,
        },
        sentiment: SentimentConfig {
            api_url: sentiment_url,
            api_token: Some("hf_test_token".into()),
            timeout: Duration::from_secs(2),
        },
    };

    let state = AppState::new(&config)
        .await
        .expect("Failed to build application state");
    let address = serve(create_api_router(&state)).await;

    TestApp {
        address,
        client: Client::new(),
        _data_dir: data_dir,
    }
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no address");
    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("Test server stopped");
    });
    format!("http://{addr}")
}

/// Stand-in for the hosted classifier. Comments mentioning "love" or "great"
/// score positive, "awful" negative, "garbled" gets a body of the wrong shape
/// and "outage" a 503.
fn mock_sentiment_router() -> Router {
    Router::new().route(
        "/",
        post(|Json(body): Json<Value>| async move {
            let text = body["inputs"].as_str().unwrap_or_default().to_lowercase();
            let (top, rest) = if text.contains("love") || text.contains("great") {
                ("LABEL_2", ["LABEL_0", "LABEL_1"])
            } else if text.contains("awful") {
                ("LABEL_0", ["LABEL_1", "LABEL_2"])
            } else if text.contains("garbled") {
                return (StatusCode::OK, Json(json!({ "error": "Model is loading" })));
            } else if text.contains("outage") {
                return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "error": "down" })));
            } else {
                ("LABEL_1", ["LABEL_0", "LABEL_2"])
            };

            (
                StatusCode::OK,
                Json(json!([[
                    { "label": rest[0], "score": 0.03 },
                    { "label": top, "score": 0.94 },
                    { "label": rest[1], "score": 0.03 }
                ]])),
            )
        }),
    )
}
