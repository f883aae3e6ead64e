//! Operations against one FMR instance.
//!
//! # Design
//! `Registry` pairs an `FmrClient` with injected credentials and a
//! `Transport`. Each public method is one caller-visible operation: it builds
//! the requests it needs, executes them in sequence, and parses the answers.
//! Nothing is cached; every call reflects the registry's state at that
//! moment. Failures are returned, never turned into a process exit.

use std::fs;
use std::path::Path;
use std::thread;

use tracing::{debug, info, warn};

use crate::auth::Credentials;
use crate::client::FmrClient;
use crate::config::ApiParams;
use crate::error::ApiError;
use crate::transport::{Transport, UreqTransport};
use crate::types::{CodelistMapping, CodelistRef, Delimiter, Item, ItemBatchReport, ItemOutcome, NewItem, WriteOptions};
use crate::validation::{
    BatchValidation, FailureKind, LoadProgress, ValidationOutcome, MSG_UNFINISHED, MSG_UNREACHABLE,
};

/// A configured connection to an FMR instance.
pub struct Registry<T> {
    client: FmrClient,
    credentials: Credentials,
    transport: T,
}

impl Registry<UreqTransport> {
    /// Registry over a real HTTP transport using the configured timeout.
    pub fn connect(params: ApiParams, credentials: Credentials) -> Self {
        let transport = UreqTransport::new(params.request_timeout());
        Self::new(params, credentials, transport)
    }
}

impl<T: Transport> Registry<T> {
    pub fn new(params: ApiParams, credentials: Credentials, transport: T) -> Self {
        Self {
            client: FmrClient::new(params),
            credentials,
            transport,
        }
    }

    pub fn client(&self) -> &FmrClient {
        &self.client
    }

    pub fn params(&self) -> &ApiParams {
        self.client.params()
    }

    /// Name → id mapping of a codelist under the configured agency and version.
    pub fn codelist_mapping(&self, codelist_id: &str) -> Result<CodelistMapping, ApiError> {
        let params = self.params();
        let codelist = CodelistRef::versioned(&params.agency, codelist_id, &params.version);
        info!(codelist = codelist_id, "fetching codelist");
        let request = self.client.build_get_codelist(&codelist);
        let response = self.transport.execute(&request)?;
        self.client.parse_codelist_mapping(response)
    }

    /// Mapping of a codelist looked up by its name in the `[codelists]` table.
    pub fn named_codelist(&self, name: &str) -> Result<CodelistMapping, ApiError> {
        let id = self
            .params()
            .codelist_id(name)
            .ok_or_else(|| ApiError::UnknownCodelist(name.to_string()))?
            .to_string();
        self.codelist_mapping(&id)
    }

    pub fn ref_area_codelist(&self) -> Result<CodelistMapping, ApiError> {
        self.named_codelist("ref_area")
    }

    /// Add one item to a codelist unless an item with the same id exists.
    pub fn add_item(
        &self,
        codelist_id: &str,
        item: &NewItem,
        options: &WriteOptions,
    ) -> Result<ItemOutcome, ApiError> {
        let codelist = CodelistRef::latest(&options.agency, codelist_id);
        let request = self.client.build_get_codelist(&codelist);
        let response = self.transport.execute(&request)?;
        let document = self.client.parse_codelist(response).inspect_err(|err| {
            warn!(codelist = codelist_id, error = %err, "could not read codelist");
        })?;

        if document.first()?.contains(&item.id) {
            info!(codelist = codelist_id, item = %item.id, "item already exists in codelist");
            return Ok(ItemOutcome::AlreadyExists);
        }

        let payload = document.with_single_item(Item::english(&item.id, &item.description))?;
        let request = self.client.build_add_items(&payload, options.action, &self.credentials)?;
        let response = self.transport.execute(&request)?;
        match self.client.parse_add_items(response) {
            Ok(()) => {
                info!(codelist = codelist_id, item = %item.id, action = %options.action, "added item");
                Ok(ItemOutcome::Added)
            }
            Err(err) => {
                warn!(codelist = codelist_id, item = %item.id, error = %err, "registry rejected item");
                Err(err)
            }
        }
    }

    /// Add each item in order. A failed item does not stop the rest.
    pub fn add_items(&self, codelist_id: &str, items: &[NewItem], options: &WriteOptions) -> ItemBatchReport {
        info!(codelist = codelist_id, count = items.len(), "adding items to codelist");
        let entries = items
            .iter()
            .map(|item| {
                debug!(item = %item.id, "processing item");
                (item.id.clone(), self.add_item(codelist_id, item, options))
            })
            .collect();
        ItemBatchReport { entries }
    }

    /// Upload a dataset for validation and wait for the registry's verdict.
    pub fn validate_dataset(&self, path: &Path, delimiter: Delimiter) -> ValidationOutcome {
        let contents = match fs::read(path) {
            Ok(contents) => contents,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "cannot read dataset file");
                return ValidationOutcome::failed(
                    FailureKind::UnreadableFile,
                    format!("Cannot read dataset file: {err}"),
                );
            }
        };
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "dataset.csv".to_string());

        let request = self
            .client
            .build_load_dataset(&file_name, &contents, delimiter, &self.credentials);

        let response = match self.transport.execute(&request) {
            Ok(response) => response,
            Err(err) => {
                warn!(file = %file_name, error = %err, "load request failed");
                return ValidationOutcome::failed(FailureKind::Unreachable, MSG_UNREACHABLE);
            }
        };
        let status = response.status;
        let body = response.body.clone();
        let uid = match self.client.parse_load(response) {
            Ok(uid) => uid,
            Err(outcome) => {
                warn!(file = %file_name, status, body = %body, "load endpoint did not accept dataset");
                return outcome;
            }
        };

        debug!(file = %file_name, uid = %uid, "dataset submitted");
        let outcome = self.poll_load_status(&uid);
        match &outcome {
            ValidationOutcome::Passed => info!(file = %file_name, "dataset validation complete without errors"),
            ValidationOutcome::Failed(failure) => {
                warn!(file = %file_name, kind = ?failure.kind, "dataset validation failed")
            }
        }
        outcome
    }

    fn poll_load_status(&self, uid: &str) -> ValidationOutcome {
        let polling = self.params().polling;
        let request = self.client.build_load_status(uid, &self.credentials);

        for attempt in 1..=polling.max_attempts {
            thread::sleep(polling.interval());
            debug!(uid, attempt, "polling load status");
            let response = match self.transport.execute(&request) {
                Ok(response) => response,
                Err(err) => {
                    warn!(uid, error = %err, "load status request failed");
                    return ValidationOutcome::failed(FailureKind::Unreachable, MSG_UNREACHABLE);
                }
            };
            if let LoadProgress::Finished(outcome) = self.client.parse_load_status(response) {
                return outcome;
            }
        }
        ValidationOutcome::failed(FailureKind::Unfinished, MSG_UNFINISHED)
    }

    /// Validate every named file under `<data_dir>/<folder_name>/`, or skip
    /// entirely when `run` is false.
    pub fn validate_datasets<I, S>(
        &self,
        filenames: I,
        folder_name: &str,
        run: bool,
        delimiter: Delimiter,
    ) -> BatchValidation
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if !run {
            debug!(folder = folder_name, "dataset validation not requested");
            return BatchValidation::Skipped;
        }
        info!(folder = folder_name, "validating files against DSD");
        let folder = self.params().data_dir.join(folder_name);
        let results = filenames
            .into_iter()
            .map(|name| {
                let name = name.as_ref();
                info!(file = name, "validating file");
                (name.to_string(), self.validate_dataset(&folder.join(name), delimiter))
            })
            .collect();
        BatchValidation::Ran(results)
    }
}
