use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, app_with, db, Db, MockFmr};
use serde_json::{json, Value};
use tower::ServiceExt;

const BASIC_AUTH: &str = "Basic YWRtaW46c2VjcmV0"; // admin:secret

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(db: &Db, request: Request<String>) -> axum::response::Response {
    app_with(db.clone()).oneshot(request).await.unwrap()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

fn items_request(action: Option<&str>, auth: Option<&str>, body: Value) -> Request<String> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/ws/secure/sdmxapi/rest")
        .header(http::header::CONTENT_TYPE, "application/json");
    if let Some(action) = action {
        builder = builder.header("ACTION", action);
    }
    if let Some(auth) = auth {
        builder = builder.header(http::header::AUTHORIZATION, auth);
    }
    builder.body(body.to_string()).unwrap()
}

fn payload(items: Value) -> Value {
    json!({"Codelist": [{"id": "CL_REF_AREA", "agencyId": "WB", "version": "1.0", "items": items}]})
}

fn upload(csv: &str, data_format: Option<&str>) -> Request<String> {
    let boundary = "XBOUNDARYX";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"uploadFile\"; filename=\"data.csv\"\r\n\
         Content-Type: text/csv\r\n\r\n\
         {csv}\r\n--{boundary}--\r\n"
    );
    let mut builder = Request::builder()
        .method("POST")
        .uri("/ws/public/data/load")
        .header(
            http::header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        );
    if let Some(format) = data_format {
        builder = builder.header("Data-Format", format);
    }
    builder.body(body).unwrap()
}

// --- codelists ---

#[tokio::test]
async fn get_seeded_codelist() {
    let resp = app()
        .oneshot(get("/sdmx/v2/structure/codelist/WB/CL_REF_AREA/1.0?format=fusion-json"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    let items = body["Codelist"][0]["items"].as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["id"], "INX");
    assert_eq!(items[0]["names"][0]["value"], "Not classified");
}

#[tokio::test]
async fn get_latest_codelist_without_version() {
    let resp = app()
        .oneshot(get("/sdmx/v2/structure/codelist/WB/CL_REF_AREA"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["Codelist"][0]["version"], "1.0");
}

#[tokio::test]
async fn unknown_codelist_or_version_is_404() {
    let resp = app()
        .oneshot(get("/sdmx/v2/structure/codelist/WB/CL_NOPE"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app()
        .oneshot(get("/sdmx/v2/structure/codelist/WB/CL_REF_AREA/9.9"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- item submission ---

#[tokio::test]
async fn submit_without_auth_is_401() {
    let resp = app()
        .oneshot(items_request(Some("MERGE"), None, payload(json!([]))))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn submit_without_action_is_400() {
    let resp = app()
        .oneshot(items_request(None, Some(BASIC_AUTH), payload(json!([]))))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn merge_appends_new_items() {
    let db = db(MockFmr::seeded());
    let item = json!([{"id": "LIC", "names": [{"locale": "en", "value": "Low income"}]}]);
    let resp = send(&db, items_request(Some("MERGE"), Some(BASIC_AUTH), payload(item))).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({"Success": true}));
    let fmr = db.read().await;
    assert_eq!(fmr.item_ids("WB", "CL_REF_AREA"), vec!["INX", "HIC", "LMC", "LIC"]);
    assert_eq!(fmr.item_posts, 1);
}

#[tokio::test]
async fn replace_overwrites_items() {
    let db = db(MockFmr::seeded());
    let item = json!([{"id": "ONLY", "names": [{"value": "Only one"}]}]);
    let resp = send(&db, items_request(Some("REPLACE"), Some(BASIC_AUTH), payload(item))).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(db.read().await.item_ids("WB", "CL_REF_AREA"), vec!["ONLY"]);
}

// --- load / load status ---

#[tokio::test]
async fn load_requires_data_format() {
    let resp = app()
        .oneshot(upload("STRUCTURE,STRUCTURE_ID,ACTION\n", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_uid_reports_session_error() {
    let resp = app()
        .oneshot(get("/ws/public/data/loadStatus?uid=missing"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({"Error": "Session expired"}));
}

#[tokio::test]
async fn compliant_upload_completes_without_errors() {
    let db = db(MockFmr::seeded());
    let csv = "STRUCTURE,STRUCTURE_ID,ACTION,REF_AREA\ndataflow,WB:WDI(1.0),I,HIC\n";
    let resp = send(&db, upload(csv, Some("csv;delimiter=comma"))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let uid = body_json(resp).await["uid"].as_str().unwrap().to_string();

    let resp = send(&db, get(&format!("/ws/public/data/loadStatus?uid={uid}"))).await;
    let status = body_json(resp).await;
    assert_eq!(status["Status"], "Complete");
    assert_eq!(status["Errors"], false);
    assert_eq!(db.read().await.load_posts, 1);
}

#[tokio::test]
async fn non_compliant_upload_reports_dataset_errors() {
    let db = db(MockFmr::seeded());
    let resp = send(&db, upload("REF_AREA;OBS_VALUE\nHIC;1\n", Some("csv;delimiter=semicolon"))).await;
    let uid = body_json(resp).await["uid"].as_str().unwrap().to_string();

    let resp = send(&db, get(&format!("/ws/public/data/loadStatus?uid={uid}"))).await;
    let status = body_json(resp).await;
    assert_eq!(status["Errors"], true);
    let errors = status["Datasets"][0]["ValidationReport"][0]["Errors"].as_array().unwrap();
    assert_eq!(errors.len(), 3);
    assert_eq!(errors[0], "Missing required column STRUCTURE");
}

#[tokio::test]
async fn pending_polls_report_analysing_first() {
    let mut fmr = MockFmr::seeded();
    fmr.pending_polls = 2;
    let db = db(fmr);
    let resp = send(&db, upload("STRUCTURE,STRUCTURE_ID,ACTION\n", Some("csv;delimiter=comma"))).await;
    let uid = body_json(resp).await["uid"].as_str().unwrap().to_string();
    let status_uri = format!("/ws/public/data/loadStatus?uid={uid}");

    for _ in 0..2 {
        let status = body_json(send(&db, get(&status_uri)).await).await;
        assert_eq!(status["Status"], "Analysing");
        assert!(status.get("Errors").is_none());
    }
    let status = body_json(send(&db, get(&status_uri)).await).await;
    assert_eq!(status["Status"], "Complete");
}
