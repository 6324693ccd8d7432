use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pulse_podcast::{
    create_router, format_time, generate_and_save, AppState, Config, ControllerFactory,
    HeadlessRenderer, HttpSynthesisGateway, JsonSettings, MemorySettings, PodcastController,
    ReportContext, ReportKind, SettingsStore, SynthesisGateway,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pulse-podcast", version, about = "Narrated news report podcasts")]
struct Cli {
    /// Config file (extension optional)
    #[arg(short, long, default_value = "config/pulse-podcast")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the local control API
    Serve,

    /// Generate a report podcast and save it locally
    Generate {
        /// Report kind (daily or weekly)
        #[arg(short, long, default_value = "daily")]
        kind: ReportKind,

        /// Report date (YYYY-MM-DD); latest when omitted
        #[arg(short, long)]
        date: Option<String>,

        /// Output directory; defaults to the configured downloads dir
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("Pulse Podcast v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);
    info!("Synthesis backend: {}", cfg.backend.base_url);

    let settings = load_settings(&cfg)?;
    let gateway: Arc<dyn SynthesisGateway> =
        Arc::new(HttpSynthesisGateway::new(&cfg.backend.base_url));

    match cli.command {
        Command::Serve => serve(cfg, gateway, settings).await,
        Command::Generate { kind, date, out } => {
            let target_date = date.as_deref().map(ReportContext::parse_date).transpose()?;
            let report = ReportContext::new(kind, target_date);
            let out = out.unwrap_or_else(|| cfg.downloads.dir.clone());
            generate(cfg, gateway, settings, report, out).await
        }
    }
}

fn load_settings(cfg: &Config) -> Result<Arc<dyn SettingsStore>> {
    match &cfg.settings.path {
        Some(path) => {
            let store = JsonSettings::load(path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?;
            Ok(Arc::new(store))
        }
        None => {
            info!("No settings file configured, using empty settings");
            Ok(Arc::new(MemorySettings::new()))
        }
    }
}

async fn serve(
    cfg: Config,
    gateway: Arc<dyn SynthesisGateway>,
    settings: Arc<dyn SettingsStore>,
) -> Result<()> {
    let options = cfg.player.controller_options();
    let tick = cfg.player.tick();

    let factory: ControllerFactory = Arc::new(move |report: ReportContext| {
        PodcastController::new(
            report,
            Arc::clone(&gateway),
            Box::new(HeadlessRenderer::with_tick(tick)),
            Arc::clone(&settings),
            options.clone(),
        )
    });

    let app = create_router(AppState::new(factory));
    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP control API listening on {}", addr);
    axum::serve(listener, app).await.context("HTTP server failed")?;

    Ok(())
}

async fn generate(
    cfg: Config,
    gateway: Arc<dyn SynthesisGateway>,
    settings: Arc<dyn SettingsStore>,
    report: ReportContext,
    out: PathBuf,
) -> Result<()> {
    let saved = generate_and_save(
        gateway.as_ref(),
        settings.as_ref(),
        cfg.player.required_credential.as_deref(),
        &report,
        &out,
    )
    .await
    .with_context(|| format!("Podcast generation failed for {}", report))?;

    match saved.duration_secs {
        Some(duration) => info!("Podcast length: {}", format_time(duration)),
        None => warn!("Podcast length unknown; the audio could not be decoded"),
    }
    println!("{}", saved.path.display());

    Ok(())
}
