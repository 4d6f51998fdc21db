use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::net::TcpListener;
use url::Url;

use lede_core::{FetcherConfig, LedeConfig};
use lede_server::routes;
use lede_server::state::AppState;

pub const TURING_PARAGRAPH: &str = "The Turing Award is an annual prize given by the Association for Computing Machinery for contributions of lasting importance to computing.";

pub struct TestApp {
    pub router: Router,
    upstream_hits: Arc<AtomicUsize>,
}

impl TestApp {
    /// Requests that reached the stub upstream.
    pub fn upstream_hits(&self) -> usize {
        self.upstream_hits.load(Ordering::SeqCst)
    }
}

/// Build the app router against a stub document server on a local port.
pub async fn setup_test_app() -> TestApp {
    let hits = Arc::new(AtomicUsize::new(0));
    let upstream = Router::new()
        .route("/page/{id}", get(page))
        .with_state(hits.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, upstream).await.unwrap();
    });

    let config = LedeConfig {
        fetcher: FetcherConfig::new(Url::parse(&format!("http://{addr}")).unwrap())
            .with_timeout(Duration::from_secs(5)),
        cache_ttl: Duration::from_secs(3600),
    };
    let state = Arc::new(AppState::new(&config).expect("Failed to build app state"));

    TestApp {
        router: routes::router(state),
        upstream_hits: hits,
    }
}

fn article(title: &str, paragraph: &str) -> Vec<String> {
    vec![
        "<html><head><script>self.__next_f.push([1,\"".to_string(),
        format!(r"# {title}\n\n"),
        format!(r"{paragraph}\n\n"),
        r"## History\n\nThe rest of the article.".to_string(),
        "\"])</script></html>".to_string(),
    ]
}

async fn page(State(hits): State<Arc<AtomicUsize>>, Path(id): Path<String>) -> Response {
    hits.fetch_add(1, Ordering::SeqCst);

    let chunks = match id.as_str() {
        "Turing_Award" => article("Turing Award", TURING_PARAGRAPH),
        "AC/DC" => article(
            "AC/DC",
            "AC/DC are an Australian rock band formed in Sydney in 1973 by brothers Malcolm and Angus Young.",
        ),
        "Stub" => vec!["<html><body>Nothing to see here.</body></html>".to_string()],
        _ => return (StatusCode::NOT_FOUND, "no such page").into_response(),
    };

    Body::from_stream(paced(chunks)).into_response()
}

/// Emit each chunk after a short pause so concurrent requests overlap.
fn paced(
    chunks: Vec<String>,
) -> impl futures::Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    use futures::StreamExt;

    futures::stream::iter(chunks).then(|chunk| async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(Bytes::from(chunk))
    })
}
