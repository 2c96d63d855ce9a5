use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{info, warn};

use migration_planner::agents::{MigrationPlanner, PlanInput};
use migration_planner::config::Config;
use migration_planner::ingest::mime_hint_for_path;
use migration_planner::models::{AppState, ContentKind, ItemOutcome, TargetCloud, UploadedItem};
use migration_planner::routes::create_router;
use migration_planner::session::{Credential, SessionStore};
use migration_planner::utils::init_logger;

#[derive(Parser)]
#[command(name = "migration-planner", version, about = "Generate cloud migration plans from business documents")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server (default)
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the text extracted from each file
    Preview {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Input type: auto, csv, excel, json, pdf, image or text
        #[arg(long, default_value = "auto")]
        kind: String,
    },
    /// Generate a migration plan with the configured API key
    Plan {
        files: Vec<PathBuf>,
        #[arg(long, default_value = "")]
        context: String,
        /// Target cloud (AWS, Azure, GCP). Repeatable; defaults to Azure
        #[arg(long = "cloud")]
        clouds: Vec<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long, default_value = "auto")]
        kind: String,
        /// Write the plan as PDF to this path
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::load()?;
    info!("Configuration loaded: {:?}", config.server);

    let planner = Arc::new(MigrationPlanner::from_config(&config)?);
    let sessions = SessionStore::with_ttl(
        config.llm.api_key.clone().and_then(Credential::new),
        chrono::Duration::minutes(config.server.session_ttl_minutes),
    );

    match cli.command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { port } => serve(config, planner, sessions, port).await,
        Command::Preview { files, kind } => preview(&planner, &files, &kind).await,
        Command::Plan {
            files,
            context,
            clouds,
            model,
            kind,
            output,
        } => {
            let kind_override = ContentKind::parse_override(Some(&kind))?;
            let clouds = TargetCloud::parse_set(clouds.iter().map(String::as_str))?;
            let input = PlanInput {
                items: read_items(&files).await?,
                kind_override,
                context,
                clouds,
                model,
            };
            plan(&planner, &sessions, input, output.as_deref()).await
        }
    }
}

async fn serve(
    config: Config,
    planner: Arc<MigrationPlanner>,
    sessions: SessionStore,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, port.unwrap_or(config.server.port))
        .parse()
        .context("Invalid server address")?;

    let sweeper = sessions.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(60));
        loop {
            ticker.tick().await;
            sweeper.purge_idle().await;
        }
    });

    let state = AppState {
        config,
        planner,
        sessions,
    };
    let app = create_router(state);

    info!("Server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}

async fn preview(planner: &MigrationPlanner, files: &[PathBuf], kind: &str) -> anyhow::Result<()> {
    let kind_override = ContentKind::parse_override(Some(kind))?;
    let outcomes = planner.preview(read_items(files).await?, kind_override).await?;
    for outcome in &outcomes {
        println!("{}", render_outcome(outcome));
    }
    Ok(())
}

async fn plan(
    planner: &MigrationPlanner,
    sessions: &SessionStore,
    input: PlanInput,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let session = sessions.create().await;
    let generation = planner.generate(sessions, session, input).await?;

    for outcome in generation.items.iter().filter(|o| o.result.is_err()) {
        eprintln!("{}", render_outcome(outcome));
    }

    let plan = generation.result?;
    println!("{}", plan.text);

    if let Some(path) = output {
        let report = planner.export(sessions, session).await?;
        tokio::fs::write(path, &report.bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), pages = report.page_count, "Report written");
    }

    sessions.remove(session).await;
    Ok(())
}

async fn read_items(paths: &[PathBuf]) -> anyhow::Result<Vec<UploadedItem>> {
    let mut items = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        if bytes.is_empty() {
            warn!(file = %name, "File is empty");
        }
        items.push(UploadedItem::new(name, mime_hint_for_path(path), bytes));
    }
    Ok(items)
}

fn render_outcome(outcome: &ItemOutcome) -> String {
    let view = outcome.view();
    match (view.error, view.text) {
        (Some(error), _) => error,
        (None, text) => {
            let mut rendered = format!("== {} ({}) ==\n{}", view.name, view.kind, text.unwrap_or_default());
            if let Some(notice) = view.notice {
                rendered.push_str(&format!("\n[{}]", notice));
            }
            rendered
        }
    }
}
