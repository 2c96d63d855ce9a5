//! Migration Planner
//!
//! Runs one user action (preview, generate, export) against a session.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use super::prompts;
use crate::config::{Config, LLMConfig};
use crate::ingest::{ContentExtractor, Converters};
use crate::llm::{CompletionClient, LLMAdapter, OpenAIAdapter};
use crate::models::{
    ContentKind, ItemOutcome, PlanOutcome, PlanRecord, PlanRequest, PlanResult, TargetCloud, UploadedItem,
};
use crate::report::{ExportedReport, ReportExporter};
use crate::session::{SessionId, SessionStore};
use crate::types::{AppResult, PlannerError};

/// Everything the user submits with "Generate Migration Plan".
#[derive(Debug, Clone)]
pub struct PlanInput {
    pub items: Vec<UploadedItem>,
    pub kind_override: Option<ContentKind>,
    pub context: String,
    pub clouds: BTreeSet<TargetCloud>,
    /// Falls back to the configured default model
    pub model: Option<String>,
}

pub struct Generation {
    pub items: Vec<ItemOutcome>,
    pub request: PlanRequest,
    pub result: AppResult<PlanResult>,
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct Capabilities {
    pub pdf_text: bool,
    pub ocr: bool,
    pub export: bool,
}

pub struct MigrationPlanner {
    extractor: Arc<ContentExtractor>,
    client: CompletionClient,
    exporter: ReportExporter,
    llm: LLMConfig,
    report_title: String,
}

impl MigrationPlanner {
    pub fn new(
        extractor: ContentExtractor,
        client: CompletionClient,
        exporter: ReportExporter,
        llm: LLMConfig,
        report_title: impl Into<String>,
    ) -> Self {
        Self {
            extractor: Arc::new(extractor),
            client,
            exporter,
            llm,
            report_title: report_title.into(),
        }
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        let converters = Converters::from_config(&config.ingest);
        let extractor = ContentExtractor::new(converters, config.ingest.preview_rows);
        let adapter: Arc<dyn LLMAdapter> = Arc::new(OpenAIAdapter::from_config(&config.llm)?);
        let client = CompletionClient::new(adapter, config.llm.temperature);
        let exporter = ReportExporter::from_config(&config.export);

        Ok(Self::new(extractor, client, exporter, config.llm.clone(), config.export.title.clone()))
    }

    pub fn capabilities(&self) -> Capabilities {
        let converters = self.extractor.converters();
        Capabilities {
            pdf_text: converters.pdf.is_some(),
            ocr: converters.ocr.is_some(),
            export: self.exporter.is_available(),
        }
    }

    pub fn allowed_models(&self) -> &[String] {
        &self.llm.allowed_models
    }

    pub fn default_model(&self) -> &str {
        &self.llm.default_model
    }

    /// Pick the requested model, or the default, and check it against the allow-list.
    pub fn resolve_model(&self, requested: Option<&str>) -> AppResult<String> {
        let model = requested
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(&self.llm.default_model);

        if !self.llm.is_allowed_model(model) {
            return Err(PlannerError::InvalidRequest(format!(
                "Model {} is not allowed; choose one of {}",
                model,
                self.llm.allowed_models.join(", ")
            )));
        }
        Ok(model.to_string())
    }

    /// Extract every item off the async runtime. Per-item failures are in the outcomes.
    pub async fn preview(&self, items: Vec<UploadedItem>, kind_override: Option<ContentKind>) -> AppResult<Vec<ItemOutcome>> {
        let extractor = Arc::clone(&self.extractor);
        tokio::task::spawn_blocking(move || extractor.extract_batch(&items, kind_override))
            .await
            .map_err(|e| PlannerError::Internal(format!("Extraction task failed: {}", e)))
    }

    pub async fn verify_credential(&self, sessions: &SessionStore, session: SessionId) -> AppResult<usize> {
        let credential = sessions.credential(session).await?;
        let count = self.client.verify(credential.as_ref()).await?;
        info!(session_id = %session, models = count, "API key verified");
        Ok(count)
    }

    /// Extract, assemble, complete, and remember the attempt in the session.
    /// Request-level problems (unknown session or model) are returned as `Err`;
    /// completion failures are carried in `Generation::result`.
    pub async fn generate(&self, sessions: &SessionStore, session: SessionId, input: PlanInput) -> AppResult<Generation> {
        let credential = sessions.credential(session).await?;
        let model = self.resolve_model(input.model.as_deref())?;

        info!(
            session_id = %session,
            files = input.items.len(),
            clouds = %prompts::render_clouds(&input.clouds),
            model = %model,
            "Generating migration plan"
        );

        let items = self.preview(input.items, input.kind_override).await?;
        let failed = items.iter().filter(|o| o.result.is_err()).count();
        if failed > 0 {
            warn!(session_id = %session, failed, "Some uploads were skipped");
        }

        let request = prompts::assemble(
            items.iter().filter_map(|o| o.result.as_ref().ok()),
            &input.context,
            &input.clouds,
            &model,
        );

        let result = self
            .client
            .complete(&request.system_prompt, &request.user_prompt, &model, credential.as_ref())
            .await
            .map(|text| PlanResult {
                text,
                model: model.clone(),
                generated_at: Utc::now(),
            });

        let outcome = match &result {
            Ok(plan) => PlanOutcome::Completed(plan.clone()),
            Err(e) => {
                error!(session_id = %session, error = %e, "Plan generation failed");
                PlanOutcome::Failed { reason: e.to_string() }
            }
        };
        sessions
            .record_plan(
                session,
                PlanRecord {
                    request: request.clone(),
                    outcome,
                },
            )
            .await?;

        Ok(Generation { items, request, result })
    }

    /// Render the session's last successful plan. Later failed attempts don't replace it.
    pub async fn export(&self, sessions: &SessionStore, session: SessionId) -> AppResult<ExportedReport> {
        let plan = sessions.last_success(session).await?.ok_or(PlannerError::NoPlan)?;

        let report = self.exporter.export(&self.report_title, &plan.text)?;
        info!(session_id = %session, file = %report.file_name, pages = report.page_count, "Exported report");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::provider::testing::MockAdapter;
    use crate::session::Credential;

    fn planner_with(adapter: Arc<MockAdapter>, exporter: ReportExporter) -> MigrationPlanner {
        MigrationPlanner::new(
            ContentExtractor::new(Converters::none(), 10),
            CompletionClient::new(adapter, 0.2),
            exporter,
            LLMConfig::default(),
            "Migration Plan",
        )
    }

    fn input(items: Vec<UploadedItem>) -> PlanInput {
        PlanInput {
            items,
            kind_override: None,
            context: "Retire the on-prem ERP".to_string(),
            clouds: BTreeSet::from([TargetCloud::Azure]),
            model: None,
        }
    }

    #[test]
    fn test_resolve_model() {
        let planner = planner_with(Arc::new(MockAdapter::default()), ReportExporter::pdf());
        assert_eq!(planner.resolve_model(None).unwrap(), "gpt-4o");
        assert_eq!(planner.resolve_model(Some("gpt-4")).unwrap(), "gpt-4");
        assert!(matches!(
            planner.resolve_model(Some("davinci")),
            Err(PlannerError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_generate_then_export() {
        let adapter = Arc::new(MockAdapter::default());
        let planner = planner_with(adapter.clone(), ReportExporter::pdf());
        let sessions = SessionStore::new(Credential::new("sk-test"));
        let session = sessions.create().await;

        let generation = planner
            .generate(
                &sessions,
                session,
                input(vec![
                    UploadedItem::new("apps.json", "application/json", br#"{"apps":["crm"]}"#.to_vec()),
                    UploadedItem::new("bad.txt", "text/plain", vec![0xff, 0xfe]),
                    UploadedItem::new("notes.txt", "text/plain", b"two datacenters".to_vec()),
                ]),
            )
            .await
            .unwrap();

        assert_eq!(generation.items.len(), 3);
        assert_eq!(generation.request.combined_text, "{\"apps\":[\"crm\"]}\n\n---\n\ntwo datacenters");
        assert_eq!(generation.result.as_ref().unwrap().text, "Plan for gpt-4o");
        assert_eq!(adapter.call_count(), 1);

        let report = planner.export(&sessions, session).await.unwrap();
        assert_eq!(report.file_name, "migration_report.pdf");
    }

    #[tokio::test]
    async fn test_missing_credential_is_recorded_without_calling_provider() {
        let adapter = Arc::new(MockAdapter::default());
        let planner = planner_with(adapter.clone(), ReportExporter::pdf());
        let sessions = SessionStore::default();
        let session = sessions.create().await;

        let generation = planner.generate(&sessions, session, input(Vec::new())).await.unwrap();

        assert!(matches!(generation.result, Err(PlannerError::MissingCredential)));
        assert_eq!(adapter.call_count(), 0);

        let record = sessions.last_plan(session).await.unwrap().unwrap();
        assert!(matches!(record.outcome, PlanOutcome::Failed { .. }));
        assert!(matches!(planner.export(&sessions, session).await, Err(PlannerError::NoPlan)));
    }

    #[tokio::test]
    async fn test_export_survives_a_later_failed_attempt() {
        let adapter = Arc::new(MockAdapter::default());
        let planner = planner_with(adapter.clone(), ReportExporter::pdf());
        let sessions = SessionStore::new(Credential::new("sk-test"));
        let session = sessions.create().await;

        let first = planner.generate(&sessions, session, input(Vec::new())).await.unwrap();
        assert!(first.result.is_ok());

        sessions.clear_credential(session).await.unwrap();
        let second = planner.generate(&sessions, session, input(Vec::new())).await.unwrap();
        assert!(matches!(second.result, Err(PlannerError::MissingCredential)));

        let record = sessions.last_plan(session).await.unwrap().unwrap();
        assert!(matches!(record.outcome, PlanOutcome::Failed { .. }));

        let report = planner.export(&sessions, session).await.unwrap();
        assert!(report.bytes.starts_with(b"%PDF"));
        assert_eq!(adapter.call_count(), 1);
    }

    #[tokio::test]
    async fn test_export_before_generate() {
        let planner = planner_with(Arc::new(MockAdapter::default()), ReportExporter::pdf());
        let sessions = SessionStore::default();
        let session = sessions.create().await;
        assert!(matches!(planner.export(&sessions, session).await, Err(PlannerError::NoPlan)));
    }

    #[tokio::test]
    async fn test_export_without_writer() {
        let planner = planner_with(Arc::new(MockAdapter::default()), ReportExporter::new(None));
        let sessions = SessionStore::new(Credential::new("sk-test"));
        let session = sessions.create().await;
        planner.generate(&sessions, session, input(Vec::new())).await.unwrap();

        assert!(matches!(
            planner.export(&sessions, session).await,
            Err(PlannerError::ExporterUnavailable)
        ));
    }

    #[tokio::test]
    async fn test_disallowed_model_is_rejected_before_any_work() {
        let adapter = Arc::new(MockAdapter::default());
        let planner = planner_with(adapter.clone(), ReportExporter::pdf());
        let sessions = SessionStore::new(Credential::new("sk-test"));
        let session = sessions.create().await;

        let mut request = input(Vec::new());
        request.model = Some("gpt-3.5-turbo".to_string());
        let err = planner.generate(&sessions, session, request).await.err().unwrap();

        assert!(matches!(err, PlannerError::InvalidRequest(_)));
        assert_eq!(adapter.call_count(), 0);
        assert!(sessions.last_plan(session).await.unwrap().is_none());
    }
}
