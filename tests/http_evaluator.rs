// tests/http_evaluator.rs
use std::time::Duration;

use actix_web::{dev::ServerHandle, web, App, HttpResponse, HttpServer};
use serde_json::json;

use liveeval::config::{CoordinatorConfig, ServiceConfig};
use liveeval::errors::EvalError;
use liveeval::models::Submission;
use liveeval::remote::{HttpEvaluator, RemoteEvaluator};
use liveeval::Coordinator;

#[derive(Clone)]
enum LastCode {
    Saved(Submission),
    Null,
    NoContent,
}

async fn evaluate(req: web::Json<Submission>) -> HttpResponse {
    let submission = req.into_inner();
    if submission.language == "cobol" {
        return HttpResponse::BadRequest().json(json!({ "detail": "Unsupported language: cobol" }));
    }
    match submission.code.as_str() {
        "garbage" => HttpResponse::Ok()
            .content_type("application/json")
            .body("{\"stdout\": "),
        "sleep" => {
            actix_rt::time::sleep(Duration::from_millis(500)).await;
            HttpResponse::Ok().json(json!({ "stdout": "", "stderr": "", "return_code": 0 }))
        }
        code => HttpResponse::Ok().json(json!({
            "stdout": format!("ran {}", code),
            "stderr": "",
            "return_code": 0,
            "code_outputs": [{ "language": "asm-intel", "content": "main:" }]
        })),
    }
}

async fn last_code(state: web::Data<LastCode>) -> HttpResponse {
    match state.get_ref() {
        LastCode::Saved(submission) => HttpResponse::Ok().json(submission),
        LastCode::Null => HttpResponse::Ok().json(serde_json::Value::Null),
        LastCode::NoContent => HttpResponse::NoContent().finish(),
    }
}

/// Starts a throwaway evaluation service and returns its API base URL.
fn serve(last: LastCode) -> std::io::Result<(String, ServerHandle)> {
    let server = HttpServer::new(move || {
        App::new().app_data(web::Data::new(last.clone())).service(
            web::scope("/api")
                .route("/evaluate", web::post().to(evaluate))
                .route("/last-code", web::get().to(last_code)),
        )
    })
    .workers(1)
    .bind(("127.0.0.1", 0))?;

    let addr = server.addrs()[0];
    let server = server.run();
    let handle = server.handle();
    actix_rt::spawn(server);
    Ok((format!("http://{}/api", addr), handle))
}

fn evaluator(api_base: &str, timeout_ms: Option<u64>) -> HttpEvaluator {
    HttpEvaluator::new(
        reqwest::Client::new(),
        ServiceConfig {
            api_base: api_base.to_string(),
            timeout_ms,
        },
    )
}

#[actix_rt::test]
async fn test_evaluate_posts_submission() {
    let (api_base, handle) = serve(LastCode::Null).unwrap();
    let evaluator = evaluator(&api_base, None);

    let response = evaluator
        .evaluate(&Submission::new("print(1)", "python"))
        .await
        .unwrap();

    assert_eq!(response.stdout, "ran print(1)");
    assert_eq!(response.return_code, 0);
    assert_eq!(response.code_outputs[0].language.as_deref(), Some("asm-intel"));

    handle.stop(true).await;
}

#[actix_rt::test]
async fn test_evaluate_error_status_keeps_body() {
    let (api_base, handle) = serve(LastCode::Null).unwrap();
    let evaluator = evaluator(&api_base, None);

    let err = evaluator
        .evaluate(&Submission::new("DISPLAY 'HI'.", "cobol"))
        .await
        .unwrap_err();

    match err {
        EvalError::ApiError { status, body } => {
            assert_eq!(status, 400);
            assert!(body.contains("Unsupported language: cobol"));
        }
        other => panic!("expected ApiError, got {:?}", other),
    }

    handle.stop(true).await;
}

#[actix_rt::test]
async fn test_malformed_response_is_a_transport_failure() {
    let (api_base, handle) = serve(LastCode::Null).unwrap();
    let evaluator = evaluator(&api_base, None);

    let err = evaluator
        .evaluate(&Submission::new("garbage", "python"))
        .await
        .unwrap_err();
    assert!(matches!(err, EvalError::UnexpectedResponse(_)));

    handle.stop(true).await;
}

#[actix_rt::test]
async fn test_timeout_is_reported_as_request_error() {
    let (api_base, handle) = serve(LastCode::Null).unwrap();
    let evaluator = evaluator(&api_base, Some(50));

    let err = evaluator
        .evaluate(&Submission::new("sleep", "python"))
        .await
        .unwrap_err();
    assert!(matches!(err, EvalError::Request(ref e) if e.is_timeout()), "{:?}", err);

    handle.stop(true).await;
}

#[actix_rt::test]
async fn test_unreachable_service_is_a_request_error() {
    let evaluator = evaluator("http://127.0.0.1:1/api", None);

    let err = evaluator
        .evaluate(&Submission::new("print(1)", "python"))
        .await
        .unwrap_err();
    assert!(matches!(err, EvalError::Request(_)));
}

#[actix_rt::test]
async fn test_last_code_variants() {
    let saved = Submission::new("fn main() {}", "rust");
    let cases = [
        (LastCode::Saved(saved.clone()), Some(saved)),
        (LastCode::Null, None),
        (LastCode::NoContent, None),
    ];

    for (served, expected) in cases {
        let (api_base, handle) = serve(served).unwrap();
        let evaluator = evaluator(&api_base, None);

        assert_eq!(evaluator.fetch_last_submission().await.unwrap(), expected);

        handle.stop(true).await;
    }
}

#[actix_rt::test]
async fn test_coordinator_over_http() {
    let (api_base, handle) = serve(LastCode::Saved(Submission::new("x", "lua"))).unwrap();
    let coordinator = Coordinator::spawn(evaluator(&api_base, None), CoordinatorConfig::default());

    assert_eq!(coordinator.fetch_last_code().await, Some(Submission::new("x", "lua")));

    let ok = coordinator.submit("print(2)", "python").await.unwrap();
    assert_eq!(ok.stdout, "ran print(2)");
    assert!(ok.is_latest);

    let rejected = coordinator.submit("DISPLAY 'HI'.", "cobol").await.unwrap();
    assert_ne!(rejected.return_code, 0);
    assert!(rejected.stderr.contains("400"));
    assert!(rejected.stderr.contains("Unsupported language"));

    coordinator.shutdown().await;
    handle.stop(true).await;
}
