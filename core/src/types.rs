//! Domain DTOs for the FMR structure and submission APIs.
//!
//! # Design
//! The codelist types mirror FMR's fusion-json output but only name the
//! fields this crate reads. Everything else is kept in `extra` maps so a
//! fetched document can be posted back with nothing lost except the item
//! list that is deliberately swapped out.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ApiError, ParseEnumError};

/// Codelist name → item id, built from the first localized name of each item.
pub type CodelistMapping = BTreeMap<String, String>;

/// The fusion-json envelope returned by the codelist structure endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodelistDocument {
    #[serde(rename = "Codelist")]
    pub codelists: Vec<Codelist>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Codelist {
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    #[serde(default)]
    pub names: Vec<LocalizedName>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedName {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    pub value: String,
}

impl CodelistDocument {
    /// The first codelist in the envelope; FMR returns exactly one per id.
    pub fn first(&self) -> Result<&Codelist, ApiError> {
        self.codelists
            .first()
            .ok_or_else(|| ApiError::DeserializationError("response contains no codelist".to_string()))
    }

    /// Replace the item list of the first codelist with `item` alone.
    pub fn with_single_item(mut self, item: Item) -> Result<Self, ApiError> {
        let codelist = self
            .codelists
            .first_mut()
            .ok_or_else(|| ApiError::DeserializationError("response contains no codelist".to_string()))?;
        codelist.items = vec![item];
        Ok(self)
    }
}

impl Codelist {
    pub fn contains(&self, id: &str) -> bool {
        self.items.iter().any(|item| item.id == id)
    }

    /// Name → id view of the items. Items without a name are left out.
    pub fn mapping(&self) -> CodelistMapping {
        self.items
            .iter()
            .filter_map(|item| item.names.first().map(|name| (name.value.clone(), item.id.clone())))
            .collect()
    }
}

impl Item {
    /// An item with a single English name, as FMR expects in merge payloads.
    pub fn english(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            names: vec![LocalizedName {
                locale: Some("en".to_string()),
                value: description.into(),
            }],
            extra: Map::new(),
        }
    }
}

/// A codelist addressed by agency, id and optional version.
///
/// Without a version the registry returns the latest one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodelistRef {
    pub agency: String,
    pub id: String,
    pub version: Option<String>,
}

impl CodelistRef {
    pub fn latest(agency: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            agency: agency.into(),
            id: id.into(),
            version: None,
        }
    }

    pub fn versioned(agency: impl Into<String>, id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            agency: agency.into(),
            id: id.into(),
            version: Some(version.into()),
        }
    }
}

/// An item to add to a codelist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub id: String,
    pub description: String,
}

impl NewItem {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
        }
    }
}

/// How FMR applies submitted items: `Merge` adds to the existing set,
/// `Replace` overwrites it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    #[default]
    Merge,
    Replace,
}

impl Action {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Merge => "MERGE",
            Self::Replace => "REPLACE",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MERGE" => Ok(Self::Merge),
            "REPLACE" => Ok(Self::Replace),
            _ => Err(ParseEnumError {
                kind: "action",
                value: s.to_string(),
                expected: "merge, replace",
            }),
        }
    }
}

/// Column delimiter of an uploaded SDMX-CSV file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delimiter {
    #[default]
    Comma,
    Semicolon,
    Tab,
    Space,
}

impl Delimiter {
    /// The name FMR expects in the `Data-Format` header.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Comma => "comma",
            Self::Semicolon => "semicolon",
            Self::Tab => "tab",
            Self::Space => "space",
        }
    }

    pub const fn as_byte(&self) -> u8 {
        match self {
            Self::Comma => b',',
            Self::Semicolon => b';',
            Self::Tab => b'\t',
            Self::Space => b' ',
        }
    }

    /// Value of the `Data-Format` header for an upload with this delimiter.
    pub fn data_format(&self) -> String {
        format!("csv;delimiter={}", self.as_str())
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Delimiter {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "comma" => Ok(Self::Comma),
            "semicolon" => Ok(Self::Semicolon),
            "tab" => Ok(Self::Tab),
            "space" => Ok(Self::Space),
            _ => Err(ParseEnumError {
                kind: "delimiter",
                value: s.to_string(),
                expected: "comma, semicolon, tab, space",
            }),
        }
    }
}

/// Options shared by single and batch item writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    pub agency: String,
    pub action: Action,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            agency: "WB".to_string(),
            action: Action::Merge,
        }
    }
}

/// Result of a successful single-item write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Added,
    AlreadyExists,
}

/// Per-item results of a batch write, in input order.
#[derive(Debug, Default)]
pub struct ItemBatchReport {
    pub entries: Vec<(String, Result<ItemOutcome, ApiError>)>,
}

impl ItemBatchReport {
    pub fn all_succeeded(&self) -> bool {
        self.entries.iter().all(|(_, result)| result.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &ApiError)> {
        self.entries
            .iter()
            .filter_map(|(id, result)| result.as_ref().err().map(|err| (id.as_str(), err)))
    }

    pub fn count(&self, outcome: ItemOutcome) -> usize {
        self.entries
            .iter()
            .filter(|(_, result)| matches!(result, Ok(o) if *o == outcome))
            .count()
    }
}
