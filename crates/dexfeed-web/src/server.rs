//! HTTP server implementation using axum.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use dexfeed_enrich::TrendReport;
use dexfeed_telemetry::Metrics;
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::error::{WebError, WebResult};

/// Boxed future used by [`TrendSource`].
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Produces trend reports for the routes.
pub trait TrendSource: Send + Sync + 'static {
    /// Run the pipeline against the base feed URL with `suffix` appended.
    fn fetch<'a>(&'a self, suffix: &'a str) -> BoxFuture<'a, WebResult<TrendReport>>;
}

/// Shared application state for axum handlers.
struct AppState {
    source: Arc<dyn TrendSource>,
}

/// Query parameters shared by `/dex` and `/api/trends`.
#[derive(Debug, Default, Deserialize)]
struct TrendQuery {
    #[serde(default)]
    generated_text: String,
}

/// Create the axum router.
pub fn create_router(source: Arc<dyn TrendSource>) -> Router {
    let state = Arc::new(AppState { source });
    Router::new()
        .route("/", get(serve_index))
        .route("/dex", get(dex_page))
        .route("/api/trends", get(trends_api))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the index HTML page.
async fn serve_index() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

/// Run the pipeline and render the result inside an HTML page.
async fn dex_page(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TrendQuery>,
) -> Html<String> {
    let rendered = state
        .source
        .fetch(&query.generated_text)
        .await
        .and_then(|report| {
            report
                .to_pretty_json(4)
                .map_err(|e| WebError::Source(e.to_string()))
        });

    match rendered {
        Ok(json) => Html(render_result_page(&json)),
        Err(e) => {
            error!(error = %e, suffix = %query.generated_text, "Trend page failed");
            Html(render_error_page(&e.to_string()))
        }
    }
}

/// Run the pipeline and return the report as JSON.
async fn trends_api(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TrendQuery>,
) -> Response {
    match state.source.fetch(&query.generated_text).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => {
            error!(error = %e, suffix = %query.generated_text, "Trend API failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(TrendReport::failure(e.to_string())),
            )
                .into_response()
        }
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn metrics() -> Response {
    match Metrics::render() {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// Escape text for inclusion in HTML.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn render_result_page(json: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Trending pairs</title>
<style>
body {{ background-color: black; color: #33ff66; font-family: monospace; padding: 20px; }}
a {{ color: #66ccff; }}
pre {{ white-space: pre-wrap; word-break: break-all; }}
</style>
</head>
<body>
<a href="/">&larr; back</a>
<pre>{}</pre>
</body>
</html>
"#,
        escape_html(json)
    )
}

fn render_error_page(message: &str) -> String {
    format!(
        r#"<body style="background-color:black; color:red; font-family: Arial, sans-serif; text-align: center; padding: 20px;">
<h2>Error occurred</h2>
<p>{}</p>
<p>Unable to fetch trending pairs.</p>
</body>
"#,
        escape_html(message)
    )
}

/// Run the HTTP server until it fails.
pub async fn run_server(source: Arc<dyn TrendSource>, config: ServerConfig) -> WebResult<()> {
    let app = create_router(source);

    let addr = config.socket_addr()?;
    info!(%addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use dexfeed_enrich::{EnrichedEntry, NoDataRecord};
    use std::sync::Mutex;
    use tower::ServiceExt;

    /// Records suffixes and answers from a fixed result.
    struct FakeSource {
        result: Result<TrendReport, String>,
        suffixes: Mutex<Vec<String>>,
    }

    impl FakeSource {
        fn ok(report: TrendReport) -> Arc<Self> {
            Arc::new(Self {
                result: Ok(report),
                suffixes: Mutex::new(Vec::new()),
            })
        }

        fn failing(msg: &str) -> Arc<Self> {
            Arc::new(Self {
                result: Err(msg.to_string()),
                suffixes: Mutex::new(Vec::new()),
            })
        }
    }

    impl TrendSource for FakeSource {
        fn fetch<'a>(&'a self, suffix: &'a str) -> BoxFuture<'a, WebResult<TrendReport>> {
            Box::pin(async move {
                self.suffixes.lock().unwrap().push(suffix.to_string());
                self.result.clone().map_err(WebError::Source)
            })
        }
    }

    fn sample_report() -> TrendReport {
        TrendReport::new(vec![
            EnrichedEntry::Pair(serde_json::json!({"pairAddress": "p<1>"})),
            EnrichedEntry::NoData(NoDataRecord::new("abc")),
        ])
    }

    async fn send_get(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#x27;&amp;&#x27;&lt;/a&gt;"
        );
    }

    #[tokio::test]
    async fn test_index_and_health() {
        let app = create_router(FakeSource::ok(TrendReport::default()));

        let (status, body) = send_get(app.clone(), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("generated_text"));

        let (status, body) = send_get(app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn test_api_trends_passes_suffix() {
        let source = FakeSource::ok(sample_report());
        let app = create_router(source.clone());

        let (status, body) = send_get(app, "/api/trends?generated_text=%26filters%5Bchain%5D%3Dsol").await;
        assert_eq!(status, StatusCode::OK);

        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["data"][0]["pairAddress"], "p<1>");
        assert_eq!(value["data"][1]["Error"], "No data Retrieved");
        assert_eq!(
            source.suffixes.lock().unwrap().as_slice(),
            ["&filters[chain]=sol".to_string()]
        );
    }

    #[tokio::test]
    async fn test_api_trends_failure_is_500() {
        let app = create_router(FakeSource::failing("boom"));

        let (status, body) = send_get(app, "/api/trends").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value, serde_json::json!({"data": [], "error": "boom"}));
    }

    #[tokio::test]
    async fn test_dex_page_escapes_pretty_json() {
        let source = FakeSource::ok(sample_report());
        let app = create_router(source.clone());

        let (status, body) = send_get(app, "/dex").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("    &quot;data&quot;: ["));
        assert!(body.contains("p&lt;1&gt;"));
        assert_eq!(source.suffixes.lock().unwrap().as_slice(), [String::new()]);
    }

    #[tokio::test]
    async fn test_dex_page_error() {
        let app = create_router(FakeSource::failing("<script>"));

        let (status, body) = send_get(app, "/dex?generated_text=x").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Error occurred"));
        assert!(body.contains("&lt;script&gt;"));
    }

    #[tokio::test]
    async fn test_metrics_route() {
        Metrics::capture("captured");
        let app = create_router(FakeSource::ok(TrendReport::default()));

        let (status, body) = send_get(app, "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("dexfeed_captures_total"));
    }
}
