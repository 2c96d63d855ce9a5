use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agents::MigrationPlanner;
use crate::config::Config;
use crate::ingest::Table;
use crate::session::SessionStore;
use crate::types::{AppResult, PlannerError};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub planner: Arc<MigrationPlanner>,
    pub sessions: SessionStore,
}

/// A named blob received from the user. Consumed by extraction.
#[derive(Debug, Clone)]
pub struct UploadedItem {
    pub name: String,
    pub mime_hint: String,
    pub bytes: Bytes,
}

impl UploadedItem {
    pub fn new(name: impl Into<String>, mime_hint: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_hint: mime_hint.into(),
            bytes: bytes.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Csv,
    Excel,
    Json,
    Pdf,
    Image,
    Text,
}

impl ContentKind {
    pub const ALL: [ContentKind; 6] = [
        ContentKind::Csv,
        ContentKind::Excel,
        ContentKind::Json,
        ContentKind::Pdf,
        ContentKind::Image,
        ContentKind::Text,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Csv => "csv",
            ContentKind::Excel => "excel",
            ContentKind::Json => "json",
            ContentKind::Pdf => "pdf",
            ContentKind::Image => "image",
            ContentKind::Text => "text",
        }
    }

    /// Parse the input-type selector, where `auto` (or nothing) means "detect".
    pub fn parse_override(value: Option<&str>) -> AppResult<Option<ContentKind>> {
        match value.map(str::trim) {
            None | Some("") => Ok(None),
            Some(v) if v.eq_ignore_ascii_case("auto") => Ok(None),
            Some(v) => v.parse().map(Some),
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| PlannerError::InvalidRequest(format!("Unknown input type: {}", s)))
    }
}

/// Target cloud vocabulary. Ordering drives how the set is rendered in prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TargetCloud {
    #[serde(rename = "AWS")]
    Aws,
    #[serde(rename = "Azure")]
    Azure,
    #[serde(rename = "GCP")]
    Gcp,
}

impl TargetCloud {
    pub const ALL: [TargetCloud; 3] = [TargetCloud::Aws, TargetCloud::Azure, TargetCloud::Gcp];

    pub fn label(&self) -> &'static str {
        match self {
            TargetCloud::Aws => "AWS",
            TargetCloud::Azure => "Azure",
            TargetCloud::Gcp => "GCP",
        }
    }

    /// Parse repeated and/or comma-separated labels. Empty input yields the default (Azure).
    pub fn parse_set<'a>(values: impl IntoIterator<Item = &'a str>) -> AppResult<BTreeSet<TargetCloud>> {
        let mut clouds = BTreeSet::new();
        for value in values {
            for label in value.split(',').map(str::trim).filter(|l| !l.is_empty()) {
                clouds.insert(label.parse()?);
            }
        }
        if clouds.is_empty() {
            clouds.insert(TargetCloud::Azure);
        }
        Ok(clouds)
    }
}

impl fmt::Display for TargetCloud {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TargetCloud {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TargetCloud::ALL
            .into_iter()
            .find(|cloud| cloud.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| PlannerError::InvalidRequest(format!("Unknown target cloud: {}", s)))
    }
}

/// What the user sees for an item before its text goes into the prompt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Preview {
    Table(Table),
    Workbook { sheets: Vec<(String, Table)> },
    Structured { value: serde_json::Value },
    Image { width: u32, height: u32, color: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractedContent {
    pub kind: ContentKind,
    pub preview: Option<Preview>,
    pub normalized_text: String,
    /// Set when `normalized_text` is a placeholder rather than real content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

impl ExtractedContent {
    pub fn new(kind: ContentKind, normalized_text: impl Into<String>) -> Self {
        Self {
            kind,
            preview: None,
            normalized_text: normalized_text.into(),
            notice: None,
        }
    }

    pub fn with_preview(mut self, preview: Preview) -> Self {
        self.preview = Some(preview);
        self
    }

    pub fn with_notice(mut self, notice: impl Into<String>) -> Self {
        self.notice = Some(notice.into());
        self
    }
}

/// Result of extracting one uploaded item. Failures stay scoped to the item.
#[derive(Debug)]
pub struct ItemOutcome {
    pub name: String,
    pub kind: ContentKind,
    pub result: AppResult<ExtractedContent>,
}

impl ItemOutcome {
    pub fn normalized_text(&self) -> Option<&str> {
        self.result.as_ref().ok().map(|c| c.normalized_text.as_str())
    }

    pub fn view(&self) -> ItemView {
        match &self.result {
            Ok(content) => ItemView {
                name: self.name.clone(),
                kind: self.kind,
                preview: content.preview.clone(),
                text: Some(content.normalized_text.clone()),
                notice: content.notice.clone(),
                error: None,
            },
            Err(e) => ItemView {
                name: self.name.clone(),
                kind: self.kind,
                preview: None,
                text: None,
                notice: None,
                error: Some(format!("Error reading {}: {}", self.name, e)),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemView {
    pub name: String,
    pub kind: ContentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<Preview>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanRequest {
    pub combined_text: String,
    pub user_context: String,
    pub target_clouds: BTreeSet<TargetCloud>,
    pub model_name: String,
    pub system_prompt: String,
    pub user_prompt: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanResult {
    pub text: String,
    pub model: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PlanOutcome {
    Completed(PlanResult),
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanRecord {
    pub request: PlanRequest,
    pub outcome: PlanOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub ocr: bool,
    pub pdf_text: bool,
    pub export: bool,
}

/// Choices offered by the planner form.
#[derive(Debug, Clone, Serialize)]
pub struct OptionsResponse {
    pub models: Vec<String>,
    pub default_model: String,
    pub clouds: Vec<TargetCloud>,
    pub default_clouds: Vec<TargetCloud>,
    pub input_types: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub has_credential: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanResponse {
    pub items: Vec<ItemView>,
    pub plan: PlanResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_kind_parse_override() {
        assert_eq!(ContentKind::parse_override(None).unwrap(), None);
        assert_eq!(ContentKind::parse_override(Some("auto")).unwrap(), None);
        assert_eq!(ContentKind::parse_override(Some("Excel")).unwrap(), Some(ContentKind::Excel));
        assert!(ContentKind::parse_override(Some("docx")).is_err());
    }

    #[test]
    fn test_target_clouds_default_and_order() {
        let default = TargetCloud::parse_set(Vec::<&str>::new()).unwrap();
        assert_eq!(default.into_iter().collect::<Vec<_>>(), vec![TargetCloud::Azure]);

        let parsed = TargetCloud::parse_set(["gcp, aws", "Azure"]).unwrap();
        let labels: Vec<_> = parsed.iter().map(|c| c.label()).collect();
        assert_eq!(labels, vec!["AWS", "Azure", "GCP"]);
    }

    #[test]
    fn test_target_clouds_reject_unknown() {
        assert!(TargetCloud::parse_set(["OCI"]).is_err());
    }

    #[test]
    fn test_failed_outcome_view_has_message() {
        let outcome = ItemOutcome {
            name: "notes.txt".to_string(),
            kind: ContentKind::Text,
            result: Err(PlannerError::decode(ContentKind::Text, "invalid utf-8")),
        };
        let view = outcome.view();
        assert!(outcome.normalized_text().is_none());
        assert!(view.error.unwrap().contains("notes.txt"));
        assert!(view.text.is_none());
    }
}
