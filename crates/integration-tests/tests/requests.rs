mod harness;

use harness::config::ConfigBuilder;
use harness::mock_api::{CSRF_PROBLEM, CSRF_TOKEN, MockApi, VALID_TOKEN};
use serde_json::{Value, json};
use tether_client::ApiClient;

fn dev_client(api: &MockApi) -> ApiClient {
    let (env, config) = ConfigBuilder::new(&api.base_url()).build().unwrap();
    ApiClient::from_config(&env, &config).unwrap()
}

#[tokio::test]
async fn success_body_is_returned_unwrapped() {
    let api = MockApi::start().await.unwrap();
    let client = dev_client(&api);

    let projects: Vec<Value> = client.get("/projects").await.unwrap();

    assert_eq!(projects, vec![json!({"id": 1, "name": "tether"})]);
}

#[tokio::test]
async fn every_request_carries_accept_and_bearer_headers() {
    let api = MockApi::start().await.unwrap();
    let client = dev_client(&api);

    let _: Vec<Value> = client.get("/projects").await.unwrap();
    let () = client.delete("/projects/1").await.unwrap();

    for request in api.requests() {
        assert_eq!(
            request.accept.as_deref(),
            Some("application/problem+json, application/json"),
            "{} {}",
            request.method,
            request.path
        );
        assert_eq!(request.authorization, Some(format!("Bearer {VALID_TOKEN}")));
    }
    assert_eq!(api.requests().len(), 2);
}

#[tokio::test]
async fn csrf_cookie_is_echoed_on_mutations() {
    let api = MockApi::start().await.unwrap();
    let client = dev_client(&api);

    let () = client.get("/csrf").await.unwrap();
    let created: Value = client.post("/projects", &json!({"name": "docs"})).await.unwrap();

    assert_eq!(created, json!({"id": 2, "name": "docs"}));

    let post = api.last("/projects").unwrap();
    assert_eq!(post.method, "POST");
    assert_eq!(post.csrf.as_deref(), Some(CSRF_TOKEN));
    assert!(post.cookie.unwrap().contains(&format!("XSRF-TOKEN={CSRF_TOKEN}")));
}

#[tokio::test]
async fn mutation_without_csrf_cookie_is_rejected() {
    let api = MockApi::start().await.unwrap();
    let client = dev_client(&api);

    let err = client
        .post::<_, Value>("/projects", &json!({"name": "docs"}))
        .await
        .unwrap_err();

    assert!(err.is_status(403));
    assert!(err.is_type(CSRF_PROBLEM));
    assert_eq!(err.title(), "CSRF token mismatch");
    assert!(api.last("/projects").unwrap().csrf.is_none());
}

#[tokio::test]
async fn disabling_csrf_in_the_config_file_stops_the_header() {
    let api = MockApi::start().await.unwrap();
    let (env, config, _file) = ConfigBuilder::new(&api.base_url())
        .toml("[csrf]\nenabled = false\n")
        .build_from_file()
        .unwrap();
    let client = ApiClient::from_config(&env, &config).unwrap();

    let () = client.get("/csrf").await.unwrap();
    let err = client
        .post::<_, Value>("/projects", &json!({"name": "docs"}))
        .await
        .unwrap_err();

    assert!(err.is_type(CSRF_PROBLEM));
    let post = api.last("/projects").unwrap();
    assert!(post.cookie.is_some());
    assert!(post.csrf.is_none());
}

#[tokio::test]
async fn custom_csrf_header_name_is_used() {
    let api = MockApi::start().await.unwrap();
    let (env, config) = ConfigBuilder::new(&api.base_url())
        .toml("[csrf]\nheader_name = \"X-CSRF-TOKEN\"\n")
        .build()
        .unwrap();
    let client = ApiClient::from_config(&env, &config).unwrap();

    let () = client.get("/csrf").await.unwrap();
    let err = client
        .post::<_, Value>("/projects", &json!({"name": "docs"}))
        .await
        .unwrap_err();

    // The mock only honours the default header name
    assert!(err.is_status(403));
}

#[tokio::test]
async fn production_with_mocking_still_uses_mock_token() {
    let api = MockApi::start().await.unwrap();
    let (env, config) = ConfigBuilder::new(&api.base_url())
        .production_mocked()
        .build()
        .unwrap();
    let client = ApiClient::from_config(&env, &config).unwrap();

    let projects: Vec<Value> = client.get("/projects").await.unwrap();
    assert_eq!(projects.len(), 1);
}

#[test]
fn production_without_identity_is_rejected_at_startup() {
    let result = ConfigBuilder::new("https://api.example.com")
        .var("TETHER_ENV", "production")
        .build();

    let err = result.err().unwrap();
    assert!(err.to_string().contains("identity"), "{err}");
}
