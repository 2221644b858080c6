use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use clap::{Args, Parser, Subcommand};
use launchpad_ai::config::AppConfig;
use launchpad_ai::error::AppError;
use launchpad_ai::telemetry;
use launchpad_ai::workflows::listing::{
    ingest, listing_router, AnswerSet, CatalogHandle, ChatCompletionsClient, GenerativeGateway,
    IntakeMode, IntakeRecord, ListingDecisionService, MemoryExportJobRepository,
    MemoryIntakeRepository,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

type AppService = ListingDecisionService<MemoryIntakeRepository, MemoryExportJobRepository>;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "Listing LaunchPad",
    about = "Turn listing questionnaires into tiered marketing plans and copy packs",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Run the decision pipeline offline and print the plan
    Decide(DecideArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Args, Debug)]
struct DecideArgs {
    /// JSON file of questionnaire answers (uses a built-in sample when omitted)
    #[arg(long)]
    answers: Option<PathBuf>,
    /// Intake mode: lighting or deep_dive
    #[arg(long, default_value = "lighting", value_parser = parse_mode)]
    mode: IntakeMode,
}

fn parse_mode(raw: &str) -> Result<IntakeMode, String> {
    IntakeMode::parse(raw).ok_or_else(|| format!("unknown intake mode '{raw}'"))
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Decide(args) => run_decide(args),
    }
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let service = build_service(&config)?;
    info!(
        offline = service.is_offline(),
        "listing decision service assembled"
    );

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .merge(listing_router(service))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "listing launchpad ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn build_service(config: &AppConfig) -> Result<Arc<AppService>, AppError> {
    let (catalog, origin) = ingest::load_catalog(&config.catalog.data_dir)?;
    info!(
        ?origin,
        services = catalog.services().len(),
        biases = catalog.biases().len(),
        "catalog loaded"
    );

    let gateway = ChatCompletionsClient::from_config(&config.generative)?
        .map(|client| Arc::new(client) as Arc<dyn GenerativeGateway>);

    let service = ListingDecisionService::new(
        Arc::new(CatalogHandle::new(catalog)),
        config.catalog.data_dir.clone(),
        Arc::new(MemoryIntakeRepository::default()),
        Arc::new(MemoryExportJobRepository::default()),
        gateway,
        config.export.export_dir.clone(),
    );

    Ok(Arc::new(service))
}

fn run_decide(args: DecideArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let answers: AnswerSet = match &args.answers {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => sample_answers(),
    };

    // Demo mode runs without a backend so the output is stable and no
    // network call is attempted.
    let (catalog, _) = ingest::load_catalog(&config.catalog.data_dir)?;
    let service = ListingDecisionService::new(
        Arc::new(CatalogHandle::new(catalog)),
        config.catalog.data_dir.clone(),
        Arc::new(MemoryIntakeRepository::default()),
        Arc::new(MemoryExportJobRepository::default()),
        None,
        config.export.export_dir.clone(),
    );

    let record = service.submit_intake(args.mode, answers)?;
    render_decision(&record);
    Ok(())
}

fn sample_answers() -> AnswerSet {
    serde_json::from_value(json!({
        "propertyType": "Condo",
        "beds": 1,
        "baths": 1.0,
        "interiorSizeSqft": 620,
        "conditionBand": "updated",
        "tightRooms": true,
        "naturalLight": "good",
        "occupancy": "occupied",
        "likelyBuyer": "remote_buyer",
        "timelinePressure": "medium"
    }))
    .expect("sample answers are a valid map")
}

fn render_decision(record: &IntakeRecord) {
    println!("Listing decision demo");
    println!("Mode: {} | Intake ID: {}", record.mode.label(), record.id.0);
    println!(
        "Signals: complexity {:.3} | clarity {:.3} | momentum {:.3} | brand {:.3} | location {:.3}",
        record.signals.complexity,
        record.signals.clarity_need,
        record.signals.momentum_pressure,
        record.signals.brand_lift,
        record.signals.location_efficiency
    );

    println!("\nStacks");
    for stack in &record.decision.stacks {
        println!("- {} ({})", stack.tier.label(), stack.rationale);
        for service in &stack.services {
            println!(
                "    {} [{}]: {}",
                service.name, service.service_id, service.rationale
            );
        }
    }

    println!("\nBias plans");
    for bias in &record.decision.biases {
        println!("- {} ({}): {}", bias.name, bias.key, bias.why);
        for bullet in &bias.execution_bullets {
            println!("    * {bullet}");
        }
    }
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
