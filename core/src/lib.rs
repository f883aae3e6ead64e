//! Synchronous client for the Fusion Metadata Registry (FMR) SDMX REST API.
//!
//! # Overview
//! Reads codelists into name → id mappings, merges new items into
//! codelists, and submits SDMX-CSV datasets for structural validation
//! against their DSD, polling the registry until a verdict is available.
//!
//! # Design
//! - `FmrClient` is stateless: it builds `HttpRequest` values and parses
//!   `HttpResponse` values without touching the network.
//! - `Registry` runs the multi-request operations over a `Transport`;
//!   `UreqTransport` is the blocking network implementation.
//! - Configuration (`ApiParams`) and `Credentials` are always passed in
//!   explicitly.
//! - Validation results are data (`ValidationOutcome`), with a
//!   `FailureKind` tag on every failure.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod multipart;
pub mod registry;
pub mod transport;
pub mod types;
pub mod validation;

pub use auth::{auth_headers, basic_token, Credentials};
pub use client::FmrClient;
pub use config::{ApiParams, ConfigError, Endpoints, PollConfig};
pub use error::{ApiError, ParseEnumError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use registry::Registry;
pub use transport::{Transport, UreqTransport};
pub use types::{
    Action, Codelist, CodelistDocument, CodelistMapping, CodelistRef, Delimiter, Item, ItemBatchReport,
    ItemOutcome, LocalizedName, NewItem, WriteOptions,
};
pub use validation::{BatchValidation, FailureKind, LoadProgress, ValidationFailure, ValidationOutcome, ValidationReport};
