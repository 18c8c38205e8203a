//! HTTP routes.
//!
//! - `POST /api/<method>`: solve a request body, reply with the result
//! - `GET /api/methods`: list the available methods
//!
//! Cross-origin requests are allowed from any origin.

use rootfind_core::api::{calculate, Calculation};
use rootfind_core::persistence::{CalculationRecord, CalculationStore};
use rootfind_core::solvers::Method;
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reply::{Json, WithStatus};
use warp::{Filter, Rejection, Reply};

/// Shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CalculationStore>,
    pub max_iterations: usize,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
struct MethodInfo {
    slug: &'static str,
    name: &'static str,
}

fn error_reply(status: StatusCode, message: impl Into<String>) -> WithStatus<Json> {
    warp::reply::with_status(
        warp::reply::json(&ErrorBody {
            error: message.into(),
        }),
        status,
    )
}

pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let methods = warp::path!("api" / "methods")
        .and(warp::get())
        .map(|| {
            let methods: Vec<MethodInfo> = Method::ALL
                .iter()
                .map(|method| MethodInfo {
                    slug: method.slug(),
                    name: method.name(),
                })
                .collect();
            warp::reply::json(&methods)
        });

    let solve = warp::path!("api" / String)
        .and(warp::post())
        .and(warp::body::json())
        .then(move |slug: String, body: serde_json::Value| handle_solve(state.clone(), slug, body));

    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST"])
        .allow_headers(vec!["content-type"]);

    methods.or(solve).with(cors).recover(handle_rejection)
}

/// Solves on the blocking pool so a long scan never holds a runtime worker.
async fn handle_solve(state: AppState, slug: String, body: serde_json::Value) -> WithStatus<Json> {
    let method = match slug.parse::<Method>() {
        Ok(method) => method,
        Err(err) => return error_reply(StatusCode::NOT_FOUND, err.to_string()),
    };

    let max_iterations = state.max_iterations;
    let solved = tokio::task::spawn_blocking(move || {
        let mut on_skip = |x: f64, err: &rootfind_core::RootFindingError| {
            eprintln!("{method}: skipped plot point x = {x}: {err}");
        };
        calculate(method, body, max_iterations, &mut on_skip)
    })
    .await;

    match solved {
        Err(err) => {
            eprintln!("{method}: solver task failed: {err}");
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
        Ok(Ok(Calculation { result, record })) => {
            println!(
                "{method}: root {} after {} iterations in {:.3} ms",
                result.root,
                result.iterations.len(),
                result.execution_time_ms
            );
            if let Some(warning) = &result.warning {
                println!("{method}: {warning}");
            }
            persist(Arc::clone(&state.store), record);
            warp::reply::with_status(warp::reply::json(&result), StatusCode::OK)
        }
        Ok(Err(err)) => {
            eprintln!("{method}: request failed: {err}");
            error_reply(StatusCode::BAD_REQUEST, err.to_string())
        }
    }
}

/// Saves on the blocking pool without waiting; failures are only logged.
fn persist(store: Arc<dyn CalculationStore>, record: CalculationRecord) {
    tokio::task::spawn_blocking(move || {
        if let Err(err) = store.save(&record) {
            eprintln!("Failed to save {} calculation: {err:#}", record.method);
        }
    });
}

async fn handle_rejection(rejection: Rejection) -> Result<WithStatus<Json>, Infallible> {
    let reply = if rejection.is_not_found() {
        error_reply(StatusCode::NOT_FOUND, "Not found")
    } else if let Some(err) = rejection.find::<warp::filters::body::BodyDeserializeError>() {
        error_reply(
            StatusCode::BAD_REQUEST,
            format!("Invalid request body: {err}"),
        )
    } else if let Some(err) = rejection.find::<warp::cors::CorsForbidden>() {
        error_reply(StatusCode::FORBIDDEN, err.to_string())
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        error_reply(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    } else {
        eprintln!("Unhandled rejection: {rejection:?}");
        error_reply(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    };
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use rootfind_core::persistence::MemoryStore;
    use serde_json::{json, Value};
    use std::time::Duration;

    struct FailingStore;

    impl CalculationStore for FailingStore {
        fn save(&self, _record: &CalculationRecord) -> anyhow::Result<()> {
            bail!("disk full")
        }
    }

    fn state_with(store: Arc<dyn CalculationStore>) -> AppState {
        AppState {
            store,
            max_iterations: 100,
        }
    }

    async fn post(state: AppState, path: &str, body: Value) -> (StatusCode, Value) {
        let response = warp::test::request()
            .method("POST")
            .path(path)
            .json(&body)
            .reply(&routes(state))
            .await;
        let status = response.status();
        let body = serde_json::from_slice(response.body()).expect("response should be JSON");
        (status, body)
    }

    async fn wait_for_records(store: &MemoryStore, count: usize) -> Vec<CalculationRecord> {
        for _ in 0..100 {
            let records = store.records();
            if records.len() >= count {
                return records;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        store.records()
    }

    #[tokio::test]
    async fn bisection_returns_result_and_persists() {
        let store = Arc::new(MemoryStore::new());
        let body = json!({ "equation": "x^3 - x - 2", "xl": "1", "xr": "2", "error": "0.0001" });
        let (status, reply) = post(state_with(store.clone()), "/api/bisection", body.clone()).await;

        assert_eq!(status, StatusCode::OK);
        let root = reply["root"].as_f64().expect("root should be a number");
        assert!((root - 1.52138).abs() < 1e-4);
        assert_eq!(reply["converged"], json!(true));
        assert_eq!(reply["iterations"][0]["error"], json!("N/A"));
        assert!(reply["plotData"].as_array().is_some_and(|plot| !plot.is_empty()));
        assert!(reply["executionTimeMs"].is_number());

        let records = wait_for_records(&store, 1).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].method, Method::Bisection);
        assert_eq!(records[0].input_params, body);
    }

    #[tokio::test]
    async fn every_method_has_an_endpoint() {
        let cases = [
            ("/api/false-position", json!({ "equation": "x^2 - 4", "xl": 0, "xr": 5, "error": 0.01 })),
            ("/api/newton-raphson", json!({ "equation": "x^2 - 4", "x0": 1, "error": 0.01 })),
            ("/api/secant", json!({ "equation": "x^2 - 4", "x0": 1, "x1": 3, "error": 0.01 })),
            ("/api/one-point", json!({ "gEquation": "(x + 4/x)/2", "x0": 1, "error": 0.01 })),
            ("/api/graphical", json!({ "equation": "x^2 - 4", "xl": 0, "xr": 5, "step": 0.01 })),
        ];
        for (path, body) in cases {
            let store: Arc<dyn CalculationStore> = Arc::new(MemoryStore::new());
            let (status, reply) = post(state_with(store), path, body).await;
            assert_eq!(status, StatusCode::OK, "{path}: {reply}");
            let root = reply["root"].as_f64().expect("root should be a number");
            assert!((root - 2.0).abs() < 0.01, "{path}: root {root}");
        }
    }

    #[tokio::test]
    async fn solver_errors_are_bad_requests() {
        let store: Arc<dyn CalculationStore> = Arc::new(MemoryStore::new());
        let body = json!({ "equation": "x^2 - 4", "xl": 3, "xr": 5, "error": 0.01 });
        let (status, reply) = post(state_with(store.clone()), "/api/bisection", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(reply["error"]
            .as_str()
            .is_some_and(|message| message.contains("opposite signs")));

        let body = json!({ "equation": "x^2 +", "x0": 1, "error": 0.01 });
        let (status, reply) = post(state_with(store), "/api/newton-raphson", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(reply["error"].as_str().is_some());
    }

    #[tokio::test]
    async fn failing_store_does_not_change_the_response() {
        let body = json!({ "equation": "x^3 - x - 2", "x0": 1.5, "error": 0.0001 });
        let (status, reply) = post(state_with(Arc::new(FailingStore)), "/api/newton-raphson", body.clone()).await;
        let store: Arc<dyn CalculationStore> = Arc::new(MemoryStore::new());
        let (healthy_status, healthy_reply) = post(state_with(store), "/api/newton-raphson", body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(status, healthy_status);
        assert_eq!(reply["root"], healthy_reply["root"]);
        assert_eq!(reply["iterations"], healthy_reply["iterations"]);
    }

    #[tokio::test]
    async fn unknown_method_is_not_found() {
        let store: Arc<dyn CalculationStore> = Arc::new(MemoryStore::new());
        let (status, reply) = post(state_with(store), "/api/brent", json!({})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(reply["error"]
            .as_str()
            .is_some_and(|message| message.contains("unknown method")));
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let store: Arc<dyn CalculationStore> = Arc::new(MemoryStore::new());
        let response = warp::test::request()
            .method("POST")
            .path("/api/secant")
            .header("content-type", "application/json")
            .body("{not json")
            .reply(&routes(state_with(store)))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn slow_scan_does_not_block_other_requests() {
        let store: Arc<dyn CalculationStore> = Arc::new(MemoryStore::new());
        let state = state_with(store);
        let body = json!({ "equation": "x^2 + 1", "xl": 0, "xr": 20, "step": 0.00001 });
        let slow = tokio::spawn(post(state.clone(), "/api/graphical", body));
        tokio::time::sleep(Duration::from_millis(20)).await;

        let response = warp::test::request()
            .method("GET")
            .path("/api/methods")
            .reply(&routes(state))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!slow.is_finished(), "scan should still be running");

        let (status, reply) = slow.await.expect("scan task should not panic");
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(reply["error"].as_str().is_some());
    }

    #[tokio::test]
    async fn preflight_allows_any_origin() {
        let store: Arc<dyn CalculationStore> = Arc::new(MemoryStore::new());
        let response = warp::test::request()
            .method("OPTIONS")
            .path("/api/bisection")
            .header("origin", "http://localhost:3000")
            .header("access-control-request-method", "POST")
            .header("access-control-request-headers", "content-type")
            .reply(&routes(state_with(store)))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("access-control-allow-origin"));
        let allowed = response
            .headers()
            .get("access-control-allow-methods")
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_ascii_uppercase();
        assert!(allowed.contains("POST"), "allowed methods: {allowed}");
    }

    #[tokio::test]
    async fn cross_origin_solve_carries_allow_origin() {
        let store: Arc<dyn CalculationStore> = Arc::new(MemoryStore::new());
        let response = warp::test::request()
            .method("POST")
            .path("/api/secant")
            .header("origin", "http://localhost:3000")
            .json(&json!({ "equation": "x^2 - 4", "x0": 1, "x1": 3, "error": 0.01 }))
            .reply(&routes(state_with(store)))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("access-control-allow-origin"));
    }

    #[tokio::test]
    async fn lists_methods() {
        let store: Arc<dyn CalculationStore> = Arc::new(MemoryStore::new());
        let response = warp::test::request()
            .method("GET")
            .path("/api/methods")
            .reply(&routes(state_with(store)))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let methods: Value = serde_json::from_slice(response.body()).expect("JSON body");
        let slugs: Vec<&str> = methods
            .as_array()
            .expect("array of methods")
            .iter()
            .filter_map(|method| method["slug"].as_str())
            .collect();
        assert_eq!(
            slugs,
            ["bisection", "false-position", "newton-raphson", "secant", "one-point", "graphical"]
        );
    }
}
