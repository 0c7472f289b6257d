use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use campus_placement::config::AppConfig;
use campus_placement::error::AppError;
use campus_placement::telemetry;
use campus_placement::workflows::drives::{
    drive_router, shortlist, ChannelDispatcher, MemoryDriveStore, MemoryStudentDirectory,
    Notification, PlacementDriveService,
};
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "Campus Placement Service",
    about = "Run the campus placement drive service from the command line",
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
    /// Print a CSV template for coordinator uploads
    Template {
        #[command(subcommand)]
        command: TemplateCommand,
    },
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

#[derive(Subcommand, Debug)]
enum TemplateCommand {
    /// Header-only CSV for phase shortlist uploads
    Shortlist,
    /// Header-only CSV for bulk roster imports
    Roster,
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
        Command::Template { command } => {
            match command {
                TemplateCommand::Shortlist => print!("{}", shortlist::template_csv()),
                TemplateCommand::Roster => {
                    print!(
                        "{}",
                        campus_placement::workflows::drives::roster::roster_template_csv()
                    )
                }
            }
            Ok(())
        }
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

    let drives = Arc::new(MemoryDriveStore::default());
    let directory = Arc::new(MemoryStudentDirectory::default());
    let (dispatcher, receiver) = ChannelDispatcher::new();
    tokio::spawn(drain_notifications(receiver));

    let service = Arc::new(PlacementDriveService::new(
        drives,
        directory,
        Arc::new(dispatcher),
        config.placement.dashboard_link.clone(),
    ));

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .merge(drive_router(service))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "campus placement service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Background consumer for the in-process notification feed. A real
/// deployment would hand these to an email or push adapter; here they are
/// surfaced through the log stream.
async fn drain_notifications(mut receiver: UnboundedReceiver<Notification>) {
    while let Some(notice) = receiver.recv().await {
        info!(
            student = %notice.student.0,
            drive = %notice.related_drive.0,
            severity = notice.severity.label(),
            link = %notice.link,
            "{}",
            notice.message
        );
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
