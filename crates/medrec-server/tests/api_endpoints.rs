use axum::Router;
use medrec_db::{JsonFileBackend, MemoryBackend};
use medrec_server::{AppConfig, AppState, build_router};
use medrec_storage::PatientStore;
use reqwest::{Method, StatusCode, header};
use serde_json::{Value, json};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct TestServer {
    base: String,
    client: reqwest::Client,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    async fn start(app: Router) -> Self {
        let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
            .await
            .expect("bind");
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = rx.await;
                })
                .await;
        });
        Self {
            base: format!("http://{addr}"),
            client: reqwest::Client::new(),
            shutdown: Some(tx),
            handle: Some(handle),
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.client.request(method, format!("{}{path}", self.base))
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

async fn app() -> TestServer {
    let store = PatientStore::from_backend(MemoryBackend::new());
    TestServer::start(build_router(AppState::new(store), &AppConfig::default())).await
}

fn patient(id: &str, height: f64, weight: f64) -> Value {
    json!({
        "id": id,
        "name": "Priya Nair",
        "city": "Kochi",
        "age": 34,
        "gender": "female",
        "height": height,
        "weight": weight
    })
}

async fn send(
    app: &TestServer,
    method: Method,
    path: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = app.request(method, path);
    if let Some(body) = body {
        req = req.json(&body);
    }
    let resp = req.send().await.unwrap();
    let status = resp.status();
    let bytes = resp.bytes().await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn seed(app: &TestServer, patients: &[(&str, f64, f64)]) {
    for (id, height, weight) in patients {
        let (status, _) = send(
            app,
            Method::POST,
            "/create",
            Some(patient(id, *height, *weight)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[tokio::test]
async fn root_and_about_describe_the_service() {
    let app = app().await;

    let (status, body) = send(&app, Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Patient Management System API");

    let (status, body) = send(&app, Method::GET, "/about", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("patient records"));

    let (status, body) = send(&app, Method::GET, "/healthz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&app, Method::GET, "/readyz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn create_then_read_includes_derived_fields() {
    let app = app().await;

    let (status, body) = send(&app, Method::POST, "/create", Some(patient("P001", 1.75, 70.0))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "patient created successfully"}));

    let (status, body) = send(&app, Method::GET, "/patient/P001", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "P001");
    assert_eq!(body["city"], "Kochi");
    assert_eq!(body["bmi"], 22.86);
    assert_eq!(body["verdict"], "Normal");
}

#[tokio::test]
async fn client_supplied_derived_fields_are_ignored() {
    let app = app().await;
    let mut input = patient("P001", 1.6, 90.0);
    input["bmi"] = json!(10.0);
    input["verdict"] = json!("underweight");

    let (status, _) = send(&app, Method::POST, "/create", Some(input)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, Method::GET, "/patient/P001", None).await;
    assert_eq!(body["bmi"], 35.16);
    assert_eq!(body["verdict"], "Obese");
}

#[tokio::test]
async fn duplicate_create_is_rejected() {
    let app = app().await;
    seed(&app, &[("P001", 1.75, 70.0)]).await;

    let (status, body) = send(&app, Method::POST, "/create", Some(patient("P001", 1.5, 50.0))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "already_exists");

    let (_, stored) = send(&app, Method::GET, "/patient/P001", None).await;
    assert_eq!(stored["height"], 1.75);
}

#[tokio::test]
async fn invalid_create_lists_every_bad_field() {
    let app = app().await;
    let input = json!({
        "id": "P009",
        "city": "Pune",
        "age": 0,
        "gender": "unknown",
        "height": 1.7,
        "weight": -3
    });

    let (status, body) = send(&app, Method::POST, "/create", Some(input)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation");

    let mut fields: Vec<&str> = body["issues"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["field"].as_str().unwrap())
        .collect();
    fields.sort_unstable();
    assert_eq!(fields, vec!["age", "gender", "name", "weight"]);

    let (status, _) = send(&app, Method::GET, "/patient/P009", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let app = app().await;
    let resp = app
        .request(Method::POST, "/create")
        .header(header::CONTENT_TYPE, "application/json")
        .body("{\"id\": \"P001\",")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "bad_request");

    app.stop().await;
}

#[tokio::test]
async fn non_json_content_type_is_rejected() {
    let app = app().await;
    let resp = app
        .request(Method::POST, "/create")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(patient("P001", 1.75, 70.0).to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let resp = app
        .request(Method::GET, "/view")
        .header(header::ACCEPT, "application/xml")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let (status, _) = send(&app, Method::GET, "/patient/P001", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    app.stop().await;
}

#[tokio::test]
async fn unknown_patient_is_not_found() {
    let app = app().await;

    let (status, body) = send(&app, Method::GET, "/patient/P404", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
    assert!(body.get("issues").is_none());

    let (status, _) = send(&app, Method::PUT, "/edit/P404", Some(json!({"age": 40}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Not-found wins over a malformed patch.
    let (status, _) = send(&app, Method::PUT, "/edit/P404", Some(json!({"age": "old"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::DELETE, "/delete/P404", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn edit_merges_and_recomputes() {
    let app = app().await;
    seed(&app, &[("P001", 1.75, 70.0)]).await;

    let (status, body) = send(
        &app,
        Method::PUT,
        "/edit/P001",
        Some(json!({"weight": 100.0, "city": "Mumbai", "id": "ignored"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "patient info updated successfully");

    let (_, stored) = send(&app, Method::GET, "/patient/P001", None).await;
    assert_eq!(stored["id"], "P001");
    assert_eq!(stored["city"], "Mumbai");
    assert_eq!(stored["name"], "Priya Nair");
    assert_eq!(stored["verdict"], "Obese");

    let (status, _) = send(&app, Method::PUT, "/edit/P001", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    let (_, unchanged) = send(&app, Method::GET, "/patient/P001", None).await;
    assert_eq!(unchanged, stored);
}

#[tokio::test]
async fn invalid_edit_changes_nothing() {
    let app = app().await;
    seed(&app, &[("P001", 1.75, 70.0)]).await;

    let (status, body) = send(
        &app,
        Method::PUT,
        "/edit/P001",
        Some(json!({"age": 120, "weight": 80.0})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["issues"][0]["field"], "age");

    let (_, stored) = send(&app, Method::GET, "/patient/P001", None).await;
    assert_eq!(stored["age"], 34);
    assert_eq!(stored["weight"], 70.0);
}

#[tokio::test]
async fn delete_removes_patient() {
    let app = app().await;
    seed(&app, &[("P001", 1.75, 70.0), ("P002", 1.6, 50.0)]).await;

    let (status, body) = send(&app, Method::DELETE, "/delete/P001", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "patient deleted successfully");

    let (status, _) = send(&app, Method::GET, "/patient/P001", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, view) = send(&app, Method::GET, "/view", None).await;
    assert_eq!(view.as_object().unwrap().len(), 1);
    assert!(view.get("P002").is_some());
}

#[tokio::test]
async fn sort_orders_by_requested_field() {
    let app = app().await;
    seed(
        &app,
        &[("P001", 1.8, 90.0), ("P002", 1.6, 45.0), ("P003", 1.5, 80.0)],
    )
    .await;

    let ids = |body: &Value| -> Vec<String> {
        body.as_array()
            .unwrap()
            .iter()
            .map(|p| p["id"].as_str().unwrap().to_string())
            .collect()
    };

    let (status, body) = send(&app, Method::GET, "/sort?sort_by=bmi", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec!["P002", "P001", "P003"]);
    assert_eq!(body[0]["verdict"], "underweight");

    let (_, body) = send(&app, Method::GET, "/sort?sort_by=height&order=descending", None).await;
    assert_eq!(ids(&body), vec!["P001", "P002", "P003"]);

    let (_, body) = send(&app, Method::GET, "/sort?sort_by=weight&order=acs", None).await;
    assert_eq!(ids(&body), vec!["P002", "P003", "P001"]);
}

#[tokio::test]
async fn sort_rejects_unknown_field_and_order() {
    let app = app().await;

    let (status, body) = send(&app, Method::GET, "/sort?sort_by=color", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_field");

    let (status, _) = send(&app, Method::GET, "/sort", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, Method::GET, "/sort?sort_by=bmi&order=sideways", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_direction");
}

#[tokio::test]
async fn view_is_pretty_printed_mapping() {
    let app = app().await;
    seed(&app, &[("P001", 1.75, 70.0)]).await;

    let resp = app.request(Method::GET, "/view").send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/json");

    let text = resp.text().await.unwrap();
    assert!(text.starts_with("{\n  \"P001\": {"));

    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["P001"]["bmi"], 22.86);
    assert!(body["P001"].get("id").is_some());

    app.stop().await;
}

#[tokio::test]
async fn request_id_is_generated_or_propagated() {
    let app = app().await;

    let resp = app.request(Method::GET, "/healthz").send().await.unwrap();
    let generated = resp.headers().get("x-request-id").unwrap().to_str().unwrap();
    assert_eq!(generated.len(), 36);

    let resp = app
        .request(Method::GET, "/healthz")
        .header("x-request-id", "abc-123")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers()["x-request-id"], "abc-123");

    app.stop().await;
}

#[tokio::test]
async fn readyz_reports_unreadable_collection() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("patients.json");
    std::fs::write(&path, "not json").unwrap();

    let store = PatientStore::from_backend(JsonFileBackend::new(&path));
    let app = TestServer::start(build_router(AppState::new(store), &AppConfig::default())).await;

    let (status, body) = send(&app, Method::GET, "/readyz", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "unavailable");

    let (status, body) = send(&app, Method::GET, "/view", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "internal");

    app.stop().await;
}
