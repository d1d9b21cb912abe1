use rocket::http::Status;
use rocket::routes;
use threadseek::routes::health::{HealthResponse, health_check};
use threadseek::search::{SearchConfig, SearchMode};
use threadseek::test_support::TestRocketBuilder;

fn test_config() -> SearchConfig {
    SearchConfig {
        export_path: "unused.json".into(),
        cache_dir: "unused-cache".into(),
        mode: SearchMode::Lexical,
        top_k: 3,
        semantic_threshold: 0.3,
    }
}

#[test]
fn health_endpoint_returns_ok_and_mode() {
    let client = TestRocketBuilder::new()
        .mount_routes(routes![health_check])
        .manage_config(test_config())
        .blocking_client();

    let response = client.get("/health").dispatch();
    assert_eq!(response.status(), Status::Ok);

    let payload: HealthResponse = response.into_json().expect("valid JSON payload");
    assert_eq!(payload.status, "ok");
    assert_eq!(payload.mode, "lexical");
}
