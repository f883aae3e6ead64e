//! Stateless HTTP request builder and response parser for the FMR API.
//!
//! # Design
//! `FmrClient` holds only the `ApiParams` it was built with and carries no
//! mutable state between calls. Each endpoint is split into a `build_*`
//! method that produces an `HttpRequest` and a `parse_*` method that consumes
//! an `HttpResponse`. `Registry` strings these together over a `Transport`;
//! everything in this module is deterministic and free of I/O.

use serde_json::Value;

use crate::auth::{auth_headers, basic_token, Credentials};
use crate::config::ApiParams;
use crate::error::ApiError;
use crate::http::{join_url, HttpMethod, HttpRequest, HttpResponse};
use crate::multipart;
use crate::types::{Action, CodelistDocument, CodelistMapping, CodelistRef, Delimiter};
use crate::validation::{
    classify_load_status, FailureKind, LoadProgress, ValidationOutcome, MSG_LOAD_REJECTED, MSG_UNREACHABLE,
};

/// Multipart field name FMR reads the uploaded dataset from.
pub const UPLOAD_FIELD: &str = "uploadFile";

/// Synchronous, stateless client for the FMR REST API.
#[derive(Debug, Clone)]
pub struct FmrClient {
    params: ApiParams,
}

impl FmrClient {
    pub fn new(params: ApiParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ApiParams {
        &self.params
    }

    /// `{base}/{structure_path}/{agency}/{id}[/{version}]{format}`
    pub fn codelist_url(&self, codelist: &CodelistRef) -> String {
        let mut url = join_url(
            &self.params.base_url,
            &[
                &self.params.structure_path,
                &codelist.agency,
                &codelist.id,
                codelist.version.as_deref().unwrap_or(""),
            ],
        );
        url.push_str(&self.params.format_suffix);
        url
    }

    pub fn build_get_codelist(&self, codelist: &CodelistRef) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: self.codelist_url(codelist),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn parse_codelist(&self, response: HttpResponse) -> Result<CodelistDocument, ApiError> {
        if response.status == 403 {
            return Err(ApiError::Blocked);
        }
        let value: Value = serde_json::from_str(&response.body).map_err(|_| ApiError::RegistryUnreachable {
            status: response.status,
            body: response.body.clone(),
        })?;
        check_status(&response, 200)?;
        serde_json::from_value(value).map_err(|e| ApiError::DeserializationError(e.to_string()))
    }

    pub fn parse_codelist_mapping(&self, response: HttpResponse) -> Result<CodelistMapping, ApiError> {
        let document = self.parse_codelist(response)?;
        Ok(document.first()?.mapping())
    }

    /// POST `document` to the item-submission endpoint with the given action.
    pub fn build_add_items(
        &self,
        document: &CodelistDocument,
        action: Action,
        credentials: &Credentials,
    ) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_vec(document).map_err(|e| ApiError::SerializationError(e.to_string()))?;
        let mut headers = auth_headers(credentials);
        headers.push(("ACTION".to_string(), action.as_str().to_string()));
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: join_url(&self.params.base_url, &[&self.params.endpoints.add_items]),
            headers,
            body: Some(body),
        })
    }

    pub fn parse_add_items(&self, response: HttpResponse) -> Result<(), ApiError> {
        if response.is_success() {
            return Ok(());
        }
        if response.status == 403 {
            return Err(ApiError::Blocked);
        }
        Err(ApiError::HttpError {
            status: response.status,
            body: response.body,
        })
    }

    /// Multipart upload of a dataset to the load endpoint.
    pub fn build_load_dataset(
        &self,
        file_name: &str,
        contents: &[u8],
        delimiter: Delimiter,
        credentials: &Credentials,
    ) -> HttpRequest {
        let upload = multipart::file_part(UPLOAD_FIELD, file_name, "text/csv", contents);
        HttpRequest {
            method: HttpMethod::Post,
            url: join_url(&self.params.base_url, &[&self.params.endpoints.load]),
            headers: vec![
                ("Authorization".to_string(), basic_token(credentials)),
                ("Content-Type".to_string(), upload.content_type),
                ("Data-Format".to_string(), delimiter.data_format()),
            ],
            body: Some(upload.body),
        }
    }

    /// Extract the load `uid`, or the outcome that ends validation early.
    pub fn parse_load(&self, response: HttpResponse) -> Result<String, ValidationOutcome> {
        if response.status != 200 {
            return Err(ValidationOutcome::failed(FailureKind::LoadRejected, MSG_LOAD_REJECTED));
        }
        let value: Value = serde_json::from_str(&response.body)
            .map_err(|_| ValidationOutcome::failed(FailureKind::Unreachable, MSG_UNREACHABLE))?;
        match value.get("uid") {
            Some(Value::String(uid)) => Ok(uid.clone()),
            Some(Value::Number(uid)) => Ok(uid.to_string()),
            _ => Err(ValidationOutcome::failed(FailureKind::Unreachable, MSG_UNREACHABLE)),
        }
    }

    pub fn build_load_status(&self, uid: &str, credentials: &Credentials) -> HttpRequest {
        let url = format!(
            "{}?uid={}",
            join_url(&self.params.base_url, &[&self.params.endpoints.load_status]),
            urlencoding::encode(uid)
        );
        HttpRequest {
            method: HttpMethod::Get,
            url,
            headers: vec![("Authorization".to_string(), basic_token(credentials))],
            body: None,
        }
    }

    pub fn parse_load_status(&self, response: HttpResponse) -> LoadProgress {
        if !response.is_success() {
            return LoadProgress::Finished(ValidationOutcome::failed(FailureKind::Unreachable, MSG_UNREACHABLE));
        }
        match serde_json::from_str::<Value>(&response.body) {
            Ok(status) => classify_load_status(&status),
            Err(_) => LoadProgress::Finished(ValidationOutcome::failed(FailureKind::Unreachable, MSG_UNREACHABLE)),
        }
    }
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse, expected: u16) -> Result<(), ApiError> {
    if response.status == expected {
        return Ok(());
    }
    if response.status == 404 {
        return Err(ApiError::NotFound);
    }
    Err(ApiError::HttpError {
        status: response.status,
        body: response.body.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Item;
    use crate::validation::ValidationReport;

    fn client() -> FmrClient {
        FmrClient::new(ApiParams::for_base_url("http://localhost:3000"))
    }

    fn creds() -> Credentials {
        Credentials::new("admin", "secret")
    }

    #[test]
    fn build_get_codelist_with_version() {
        let req = client().build_get_codelist(&CodelistRef::versioned("WB", "CL_REF_AREA", "1.0"));
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(
            req.url,
            "http://localhost:3000/sdmx/v2/structure/codelist/WB/CL_REF_AREA/1.0?format=fusion-json"
        );
        assert!(req.body.is_none());
        assert!(req.headers.is_empty());
    }

    #[test]
    fn build_get_codelist_latest_omits_version() {
        let req = client().build_get_codelist(&CodelistRef::latest("WB", "CL_UNIT"));
        assert_eq!(
            req.url,
            "http://localhost:3000/sdmx/v2/structure/codelist/WB/CL_UNIT?format=fusion-json"
        );
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let client = FmrClient::new(ApiParams::for_base_url("http://localhost:3000/"));
        let req = client.build_get_codelist(&CodelistRef::latest("WB", "CL_X"));
        assert!(req.url.starts_with("http://localhost:3000/sdmx/"));
    }

    #[test]
    fn parse_codelist_mapping_example() {
        let response = HttpResponse::new(
            200,
            r#"{"Codelist":[{"items":[{"id":"INX","names":[{"value":"Not classified"}]}]}]}"#,
        );
        let mapping = client().parse_codelist_mapping(response).unwrap();
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping["Not classified"], "INX");
    }

    #[test]
    fn parse_codelist_html_is_unreachable() {
        let response = HttpResponse::new(200, "<html>maintenance</html>");
        let err = client().parse_codelist(response).unwrap_err();
        assert!(matches!(err, ApiError::RegistryUnreachable { status: 200, .. }));
    }

    #[test]
    fn parse_codelist_forbidden_is_blocked() {
        let err = client().parse_codelist(HttpResponse::new(403, "Blocked")).unwrap_err();
        assert!(matches!(err, ApiError::Blocked));
    }

    #[test]
    fn parse_codelist_not_found() {
        let err = client()
            .parse_codelist(HttpResponse::new(404, r#"{"errors":["not found"]}"#))
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound));
    }

    #[test]
    fn parse_codelist_wrong_shape() {
        let err = client().parse_codelist(HttpResponse::new(200, r#"{"items":[]}"#)).unwrap_err();
        assert!(matches!(err, ApiError::DeserializationError(_)));
    }

    #[test]
    fn build_add_items_sets_headers_and_body() {
        let doc: CodelistDocument = serde_json::from_str(r#"{"Codelist":[{"id":"CL_X","items":[]}]}"#).unwrap();
        let doc = doc.with_single_item(Item::english("NEW", "New item")).unwrap();
        let req = client().build_add_items(&doc, Action::Replace, &creds()).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:3000/ws/secure/sdmxapi/rest");
        assert_eq!(req.header("ACTION"), Some("REPLACE"));
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert!(req.header("authorization").unwrap().starts_with("Basic "));
        let body: Value = serde_json::from_str(req.body_text().unwrap()).unwrap();
        assert_eq!(body["Codelist"][0]["items"][0]["id"], "NEW");
        assert_eq!(body["Codelist"][0]["items"][0]["names"][0]["locale"], "en");
    }

    #[test]
    fn parse_add_items_classifies_by_status() {
        assert!(client().parse_add_items(HttpResponse::new(200, r#"{"Success":true}"#)).is_ok());
        assert!(client().parse_add_items(HttpResponse::new(201, "")).is_ok());
        let err = client()
            .parse_add_items(HttpResponse::new(400, "duplicate"))
            .unwrap_err();
        assert!(matches!(err, ApiError::HttpError { status: 400, .. }));
    }

    #[test]
    fn build_load_dataset_is_multipart_with_data_format() {
        let req = client().build_load_dataset("gdp.csv", b"STRUCTURE,STRUCTURE_ID,ACTION\n", Delimiter::Semicolon, &creds());
        assert_eq!(req.url, "http://localhost:3000/ws/public/data/load");
        assert_eq!(req.header("Data-Format"), Some("csv;delimiter=semicolon"));
        assert!(req
            .header("Content-Type")
            .unwrap()
            .starts_with("multipart/form-data; boundary="));
        let body = req.body_text().unwrap();
        assert!(body.contains("name=\"uploadFile\"; filename=\"gdp.csv\""));
        assert!(body.contains("STRUCTURE,STRUCTURE_ID,ACTION"));
    }

    #[test]
    fn parse_load_extracts_uid() {
        assert_eq!(client().parse_load(HttpResponse::new(200, r#"{"uid":"123"}"#)).unwrap(), "123");
    }

    #[test]
    fn parse_load_non_200_is_rejected() {
        let outcome = client().parse_load(HttpResponse::new(500, "boom")).unwrap_err();
        assert_eq!(outcome.failure_kind(), Some(FailureKind::LoadRejected));
        assert_eq!(
            outcome.error_payload(),
            serde_json::json!({"ValidationReport": "Error with load endpoint"})
        );
    }

    #[test]
    fn parse_load_without_uid_is_unreachable() {
        let outcome = client().parse_load(HttpResponse::new(200, "{}")).unwrap_err();
        assert_eq!(outcome.failure_kind(), Some(FailureKind::Unreachable));
    }

    #[test]
    fn build_load_status_encodes_uid() {
        let req = client().build_load_status("a b/c", &creds());
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:3000/ws/public/data/loadStatus?uid=a%20b%2Fc");
    }

    #[test]
    fn parse_load_status_non_json_is_unreachable() {
        let progress = client().parse_load_status(HttpResponse::new(502, "<html>bad gateway</html>"));
        assert_eq!(
            progress,
            LoadProgress::Finished(ValidationOutcome::failed(FailureKind::Unreachable, MSG_UNREACHABLE))
        );
    }

    #[test]
    fn parse_load_status_error_status_is_unreachable() {
        for response in [
            HttpResponse::new(500, r#"{"errors":["Internal Server Error"]}"#),
            HttpResponse::new(401, r#"{"message":"Unauthorized"}"#),
        ] {
            assert_eq!(
                client().parse_load_status(response),
                LoadProgress::Finished(ValidationOutcome::failed(FailureKind::Unreachable, MSG_UNREACHABLE))
            );
        }
    }

    #[test]
    fn parse_load_status_failure_report() {
        let progress = client().parse_load_status(HttpResponse::new(
            200,
            r#"{"Errors": true, "Datasets":[{"ValidationReport":[{"Errors":["bad row"]}]}]}"#,
        ));
        let LoadProgress::Finished(ValidationOutcome::Failed(failure)) = progress else {
            panic!("expected failure");
        };
        assert_eq!(failure.kind, FailureKind::Invalid);
        assert_eq!(
            failure.report,
            ValidationReport::Datasets(vec![serde_json::json!(["bad row"])])
        );
    }
}
