use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use permit_flow::config::AppConfig;
use permit_flow::error::AppError;
use permit_flow::telemetry;
use permit_flow::workflows::acceptance::{
    acceptance_router, AcceptanceWorkflowService, ApplicationId, ApplicationPhase,
    InMemoryApplicationDirectory, InMemoryNotificationPublisher, InMemoryRequirementRepository,
    WorkflowConfig,
};
use permit_flow::workflows::geometry::{
    detect_overlaps, is_significant_overlap, validator, ApprovedBoundary, CoordinatePayload,
    OverlapResult,
};
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
    directory: Arc<InMemoryApplicationDirectory>,
}

#[derive(Parser, Debug)]
#[command(
    name = "Permit Flow",
    about = "Run the permit document acceptance service or check boundaries offline",
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
    /// Check a candidate lot boundary against approved boundaries from files
    Overlap(OverlapArgs),
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
struct OverlapArgs {
    /// JSON file holding the candidate boundary coordinates
    #[arg(long)]
    candidate: PathBuf,
    /// JSON file holding approved boundaries to compare against
    #[arg(long)]
    boundaries: Option<PathBuf>,
    /// Overlap percentage treated as significant
    #[arg(long)]
    threshold: Option<f64>,
}

/// One approved boundary record in the offline comparison file.
#[derive(Debug, Deserialize)]
struct BoundaryRecord {
    application_id: String,
    coordinates: CoordinatePayload,
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
        Command::Overlap(args) => run_overlap_check(args),
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

    let repository = Arc::new(InMemoryRequirementRepository::default());
    let directory = Arc::new(InMemoryApplicationDirectory::default());
    let notifications = Arc::new(InMemoryNotificationPublisher::default());
    let service = Arc::new(AcceptanceWorkflowService::new(
        repository,
        directory.clone(),
        notifications,
        config.workflow.clone(),
    ));

    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
        directory,
    };

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route(
            "/api/v1/applications/:application_id",
            post(register_application_endpoint),
        )
        .with_state(state)
        .merge(acceptance_router(service))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "permit acceptance service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn run_overlap_check(args: OverlapArgs) -> Result<(), AppError> {
    let config = WorkflowConfig::default();
    let threshold = args.threshold.unwrap_or(config.overlap_threshold_percent);

    let raw = std::fs::read_to_string(&args.candidate)?;
    let payload: CoordinatePayload = serde_json::from_str(&raw)?;
    let (candidate, warnings) =
        validator::validated_coordinate_set(payload.into_points(), config.service_area.as_ref())
            .map_err(|report| {
                AppError::Workflow(permit_flow::workflows::acceptance::WorkflowError::Validation(
                    report,
                ))
            })?;
    for warning in &warnings {
        println!("warning: {warning}");
    }

    let mut approved = Vec::new();
    if let Some(path) = args.boundaries {
        let raw = std::fs::read_to_string(path)?;
        let records: Vec<BoundaryRecord> = serde_json::from_str(&raw)?;
        for record in records {
            let (coordinates, _) =
                validator::validated_coordinate_set(record.coordinates.into_points(), None)
                    .map_err(|report| {
                        AppError::Workflow(
                            permit_flow::workflows::acceptance::WorkflowError::Validation(report),
                        )
                    })?;
            approved.push(ApprovedBoundary {
                application_id: ApplicationId(record.application_id),
                coordinates,
            });
        }
    }

    let results = detect_overlaps(&candidate, &approved, None);
    render_overlap_report(&results, approved.len(), threshold);
    Ok(())
}

fn render_overlap_report(results: &[OverlapResult], compared: usize, threshold: f64) {
    println!("Boundary overlap check");
    println!("Compared against {compared} approved boundaries");

    if results.is_empty() {
        println!("\nNo overlaps detected");
        return;
    }

    println!("\nOverlaps");
    for result in results {
        let marker = if is_significant_overlap(result.overlap_percent, threshold) {
            " [significant]"
        } else {
            ""
        };
        println!(
            "- {}: {:.2}% ({:.1} sqm){}",
            result.application_id.0, result.overlap_percent, result.overlap_area_sqm, marker
        );
    }

    let significant = results
        .iter()
        .filter(|result| is_significant_overlap(result.overlap_percent, threshold))
        .count();
    println!(
        "\n{significant} of {} overlaps at or above the {threshold}% threshold",
        results.len()
    );
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

/// Registers an application with the phase directory so its requirement
/// sets can advance phases. In production the portal's application service
/// owns this record.
async fn register_application_endpoint(
    State(state): State<AppState>,
    Path(application_id): Path<String>,
) -> impl IntoResponse {
    let id = ApplicationId(application_id);
    state
        .directory
        .register(id.clone(), ApplicationPhase::Acceptance);
    (
        StatusCode::CREATED,
        Json(json!({ "application_id": id.0, "phase": ApplicationPhase::Acceptance.label() })),
    )
}
