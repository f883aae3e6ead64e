//! In-memory imitation of the FMR endpoints used by `fmr-core`.
//!
//! Serves codelists in fusion-json, accepts MERGE/REPLACE item submissions,
//! and runs a small structural check over uploaded SDMX-CSV files so the
//! load / load-status cycle can be exercised end to end.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// Columns every SDMX-CSV upload must carry.
pub const REQUIRED_COLUMNS: [&str; 3] = ["STRUCTURE", "STRUCTURE_ID", "ACTION"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Name {
    #[serde(default)]
    pub locale: Option<String>,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Code {
    pub id: String,
    #[serde(default)]
    pub names: Vec<Name>,
}

impl Code {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            names: vec![Name {
                locale: Some("en".to_string()),
                value: name.to_string(),
            }],
        }
    }
}

#[derive(Clone, Debug)]
pub struct StoredCodelist {
    pub version: String,
    pub name: String,
    pub items: Vec<Code>,
}

#[derive(Clone, Debug)]
pub struct LoadRecord {
    pub errors: Vec<String>,
    pub polls_remaining: u32,
}

/// Server state. Tests hold on to the `Db` handle to inspect it.
#[derive(Clone, Debug, Default)]
pub struct MockFmr {
    /// Keyed by `(agency, codelist id)`.
    pub codelists: HashMap<(String, String), StoredCodelist>,
    pub loads: HashMap<String, LoadRecord>,
    /// Number of status polls answered with `Analysing` before the report.
    pub pending_polls: u32,
    pub item_posts: usize,
    pub load_posts: usize,
}

impl MockFmr {
    /// A registry holding `WB:CL_REF_AREA(1.0)` with three income groups.
    pub fn seeded() -> Self {
        let mut fmr = Self::default();
        fmr.insert_codelist(
            "WB",
            "CL_REF_AREA",
            "1.0",
            "Reference area",
            vec![
                Code::new("INX", "Not classified"),
                Code::new("HIC", "High income"),
                Code::new("LMC", "Lower middle income"),
            ],
        );
        fmr
    }

    pub fn insert_codelist(&mut self, agency: &str, id: &str, version: &str, name: &str, items: Vec<Code>) {
        self.codelists.insert(
            (agency.to_string(), id.to_string()),
            StoredCodelist {
                version: version.to_string(),
                name: name.to_string(),
                items,
            },
        );
    }

    pub fn item_ids(&self, agency: &str, id: &str) -> Vec<String> {
        self.codelists
            .get(&(agency.to_string(), id.to_string()))
            .map(|cl| cl.items.iter().map(|c| c.id.clone()).collect())
            .unwrap_or_default()
    }
}

pub type Db = Arc<RwLock<MockFmr>>;

pub fn db(fmr: MockFmr) -> Db {
    Arc::new(RwLock::new(fmr))
}

pub fn app() -> Router {
    app_with(db(MockFmr::seeded()))
}

pub fn app_with(db: Db) -> Router {
    Router::new()
        .route("/sdmx/v2/structure/codelist/{agency}/{id}", get(get_latest_codelist))
        .route("/sdmx/v2/structure/codelist/{agency}/{id}/{version}", get(get_codelist_version))
        .route("/ws/secure/sdmxapi/rest", post(submit_items))
        .route("/ws/public/data/load", post(load_dataset))
        .route("/ws/public/data/loadStatus", get(load_status))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with(listener, db(MockFmr::seeded())).await
}

pub async fn run_with(listener: TcpListener, db: Db) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(db)).await
}

type Reply = Result<Json<Value>, (StatusCode, Json<Value>)>;

fn reject(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "Error": message.into() })))
}

fn render_codelist(agency: &str, id: &str, codelist: &StoredCodelist) -> Value {
    json!({
        "meta": { "id": Uuid::new_v4().to_string(), "test": true },
        "Codelist": [{
            "id": id,
            "agencyId": agency,
            "version": codelist.version,
            "names": [{ "locale": "en", "value": codelist.name }],
            "items": codelist.items,
        }]
    })
}

async fn get_latest_codelist(State(db): State<Db>, Path((agency, id)): Path<(String, String)>) -> Reply {
    let fmr = db.read().await;
    let codelist = fmr
        .codelists
        .get(&(agency.clone(), id.clone()))
        .ok_or_else(|| reject(StatusCode::NOT_FOUND, format!("no codelist {agency}:{id}")))?;
    Ok(Json(render_codelist(&agency, &id, codelist)))
}

async fn get_codelist_version(
    State(db): State<Db>,
    Path((agency, id, version)): Path<(String, String, String)>,
) -> Reply {
    let fmr = db.read().await;
    let codelist = fmr
        .codelists
        .get(&(agency.clone(), id.clone()))
        .filter(|cl| cl.version == version)
        .ok_or_else(|| reject(StatusCode::NOT_FOUND, format!("no codelist {agency}:{id}({version})")))?;
    Ok(Json(render_codelist(&agency, &id, codelist)))
}

/// Accepts `Basic <base64(user:password)>` with a non-empty user.
fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))
        .and_then(|token| STANDARD.decode(token).ok())
        .and_then(|raw| String::from_utf8(raw).ok())
        .is_some_and(|pair| matches!(pair.split_once(':'), Some((user, _)) if !user.is_empty()))
}

async fn submit_items(State(db): State<Db>, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    if !authorized(&headers) {
        return Err(reject(StatusCode::UNAUTHORIZED, "Unauthorized"));
    }
    let action = headers
        .get("action")
        .and_then(|v| v.to_str().ok())
        .map(str::to_ascii_uppercase)
        .ok_or_else(|| reject(StatusCode::BAD_REQUEST, "missing ACTION header"))?;
    if action != "MERGE" && action != "REPLACE" {
        return Err(reject(StatusCode::BAD_REQUEST, format!("unknown ACTION {action}")));
    }

    let submitted = body
        .pointer("/Codelist/0")
        .ok_or_else(|| reject(StatusCode::BAD_REQUEST, "payload has no codelist"))?;
    let (Some(id), Some(agency)) = (
        submitted.get("id").and_then(Value::as_str),
        submitted.get("agencyId").and_then(Value::as_str),
    ) else {
        return Err(reject(StatusCode::BAD_REQUEST, "codelist id and agencyId are required"));
    };
    let items: Vec<Code> = serde_json::from_value(submitted.get("items").cloned().unwrap_or(json!([])))
        .map_err(|e| reject(StatusCode::BAD_REQUEST, e.to_string()))?;

    let mut fmr = db.write().await;
    fmr.item_posts += 1;
    let codelist = fmr
        .codelists
        .get_mut(&(agency.to_string(), id.to_string()))
        .ok_or_else(|| reject(StatusCode::NOT_FOUND, format!("no codelist {agency}:{id}")))?;

    if action == "REPLACE" {
        codelist.items = items;
    } else {
        for item in items {
            match codelist.items.iter_mut().find(|c| c.id == item.id) {
                Some(existing) => *existing = item,
                None => codelist.items.push(item),
            }
        }
    }
    Ok(Json(json!({ "Success": true })))
}

/// Maps the `Data-Format` header (`csv;delimiter=<name>`) to a delimiter byte.
fn delimiter_from_headers(headers: &HeaderMap) -> Option<u8> {
    let format = headers.get("data-format")?.to_str().ok()?;
    let name = format.strip_prefix("csv;delimiter=")?;
    match name {
        "comma" => Some(b','),
        "semicolon" => Some(b';'),
        "tab" => Some(b'\t'),
        "space" => Some(b' '),
        _ => None,
    }
}

/// Structural check of an SDMX-CSV file: required columns and row widths.
pub fn check_sdmx_csv(contents: &[u8], delimiter: u8) -> Vec<String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(contents);
    let headers = match reader.headers() {
        Ok(headers) => headers.clone(),
        Err(e) => return vec![format!("Unreadable CSV header: {e}")],
    };

    let mut errors: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|required| !headers.iter().any(|h| h.trim() == **required))
        .map(|required| format!("Missing required column {required}"))
        .collect();

    for (index, record) in reader.records().enumerate() {
        let line = index + 2;
        match record {
            Ok(record) if record.len() != headers.len() => errors.push(format!(
                "Row {line} has {} fields, expected {}",
                record.len(),
                headers.len()
            )),
            Ok(_) => {}
            Err(e) => errors.push(format!("Row {line}: {e}")),
        }
    }
    errors
}

async fn load_dataset(State(db): State<Db>, headers: HeaderMap, mut multipart: Multipart) -> Reply {
    let delimiter = delimiter_from_headers(&headers)
        .ok_or_else(|| reject(StatusCode::BAD_REQUEST, "missing or invalid Data-Format header"))?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| reject(StatusCode::BAD_REQUEST, e.to_string()))?
    {
        if field.name() == Some("uploadFile") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| reject(StatusCode::BAD_REQUEST, e.to_string()))?;
            upload = Some(bytes);
        }
    }
    let upload = upload.ok_or_else(|| reject(StatusCode::BAD_REQUEST, "no uploadFile part"))?;

    let errors = check_sdmx_csv(&upload, delimiter);
    let uid = Uuid::new_v4().to_string();
    let mut fmr = db.write().await;
    fmr.load_posts += 1;
    let polls_remaining = fmr.pending_polls;
    fmr.loads.insert(uid.clone(), LoadRecord { errors, polls_remaining });
    Ok(Json(json!({ "uid": uid })))
}

#[derive(Deserialize)]
pub struct StatusQuery {
    pub uid: String,
}

async fn load_status(State(db): State<Db>, Query(query): Query<StatusQuery>) -> Json<Value> {
    let mut fmr = db.write().await;
    let Some(record) = fmr.loads.get_mut(&query.uid) else {
        return Json(json!({ "Error": "Session expired" }));
    };
    if record.polls_remaining > 0 {
        record.polls_remaining -= 1;
        return Json(json!({ "uid": query.uid, "Status": "Analysing" }));
    }
    Json(json!({
        "uid": query.uid,
        "Status": "Complete",
        "Errors": !record.errors.is_empty(),
        "Datasets": [{ "ValidationReport": [{ "Errors": record.errors }] }],
    }))
}
