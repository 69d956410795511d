use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use clap::Parser;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use campus_admin::models::booking::BookingStatus;
use campus_admin::models::classroom::Occupancy;
use campus_admin::notification::webhook::WebhookNotifier;
use campus_admin::store::postgres::PgStore;
use campus_admin::store::DirectoryStore;
use campus_admin::workflow::{BookingWorkflow, WorkflowError};
use campus_admin::{api, config, jobs, AppState};

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    let cfg = config::load()?;
    let args = cli::Cli::parse();

    let result = match args.command {
        Some(cli::Commands::Serve { port }) => {
            let port = port.unwrap_or(cfg.port);
            run_server(cfg, port).await
        }
        Some(cli::Commands::Booking { command }) => {
            let db = PgStore::connect(&cfg.database_url).await?;
            handle_booking_command(BookingWorkflow::new(Arc::new(db)), command).await
        }
        Some(cli::Commands::Classroom { command }) => {
            let db = PgStore::connect(&cfg.database_url).await?;
            handle_classroom_command(&db, command).await
        }
        Some(cli::Commands::Repair { command }) => {
            let db = PgStore::connect(&cfg.database_url).await?;
            handle_repair_command(BookingWorkflow::new(Arc::new(db)), command).await
        }
        None => {
            let port = cfg.port;
            run_server(cfg, port).await
        }
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

/// Logs to stdout (JSON when CAMPUS_LOG_FORMAT=json) and, when
/// OTEL_EXPORTER_OTLP_ENDPOINT is set, exports spans over OTLP.
fn init_tracing() -> anyhow::Result<()> {
    use opentelemetry::KeyValue;
    use opentelemetry_sdk::{trace as sdktrace, Resource};

    let telemetry_layer = if std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok() {
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(opentelemetry_otlp::new_exporter().tonic())
            .with_trace_config(sdktrace::config().with_resource(Resource::new(vec![
                KeyValue::new("service.name", "campus-admin"),
            ])))
            .install_batch(opentelemetry_sdk::runtime::Tokio)
            .context("failed to install OpenTelemetry tracer")?;
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    let json = std::env::var("CAMPUS_LOG_FORMAT").map_or(false, |v| v == "json");

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "campus_admin=debug,tower_http=debug".into()),
        ))
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .with(telemetry_layer)
        .init();
    Ok(())
}

async fn run_server(cfg: config::Config, port: u16) -> anyhow::Result<()> {
    tracing::info!("Connecting to database...");
    let db = PgStore::connect(&cfg.database_url).await?;

    tracing::info!("Running migrations...");
    db.migrate().await?;

    let webhook = WebhookNotifier::new(cfg.webhook_urls.clone(), cfg.webhook_secret.clone())?;
    let repair_every = cfg.repair_interval_secs;
    let dashboard_origin = cfg.dashboard_origin.clone();

    let state = AppState::new(db.clone(), Arc::new(db), webhook, cfg);

    let app = axum::Router::new()
        // Health endpoints (no auth)
        .route("/healthz", axum::routing::get(|| async { "ok" }))
        .route("/readyz", axum::routing::get(readiness_check))
        .nest("/api/v1", api::api_router(state.clone()))
        .with_state(state.clone())
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer({
            use axum::http::{HeaderName, Method};
            use tower_http::cors::AllowOrigin;
            CorsLayer::new()
                .allow_origin(AllowOrigin::predicate(move |origin, _| {
                    let origin_str = origin.to_str().unwrap_or("");
                    origin_str == dashboard_origin
                        || origin_str.starts_with("http://localhost:")
                        || origin_str.starts_with("http://127.0.0.1:")
                }))
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([
                    HeaderName::from_static("content-type"),
                    HeaderName::from_static("authorization"),
                    HeaderName::from_static("x-admin-key"),
                    HeaderName::from_static("x-request-id"),
                ])
                .allow_credentials(true)
        })
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(axum::middleware::from_fn(security_headers_middleware));

    if repair_every > 0 {
        jobs::repair::spawn(state.workflow.clone(), Duration::from_secs(repair_every));
        tracing::info!("Occupancy repair job started (every {}s)", repair_every);
    } else {
        tracing::warn!("Occupancy repair job disabled (CAMPUS_REPAIR_INTERVAL_SECS=0)");
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("campus-admin listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Middleware: injects a unique X-Request-Id into every response.
async fn request_id_middleware(
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let req_id = uuid::Uuid::new_v4().to_string();
    let mut resp = next.run(req).await;
    if let Ok(val) = axum::http::HeaderValue::from_str(&req_id) {
        resp.headers_mut().insert("x-request-id", val);
    }
    resp
}

async fn readiness_check(State(state): State<Arc<AppState>>) -> (StatusCode, &'static str) {
    match state.directory.ping().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(e) => {
            tracing::warn!("readiness check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "directory unavailable")
        }
    }
}

/// Middleware: hardening headers on every response.
async fn security_headers_middleware(
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    use axum::http::HeaderValue;

    let mut resp = next.run(req).await;
    let headers = resp.headers_mut();
    headers.insert("X-Content-Type-Options", HeaderValue::from_static("nosniff"));
    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert("Cache-Control", HeaderValue::from_static("no-store"));
    headers.insert("Referrer-Policy", HeaderValue::from_static("no-referrer"));
    headers.remove("Server");
    resp
}

async fn handle_booking_command(
    workflow: BookingWorkflow,
    cmd: cli::BookingCommands,
) -> anyhow::Result<()> {
    match cmd {
        cli::BookingCommands::List { all } => {
            let bookings = if all {
                workflow.list(None).await?
            } else {
                workflow.list_pending().await?
            };

            if bookings.is_empty() {
                println!("No booking requests found.");
                return Ok(());
            }

            println!(
                "{:<38} {:<10} {:<12} {:<14} {:<10} PURPOSE",
                "ID", "ROOM", "DATE", "SLOT", "STATUS"
            );
            for b in bookings {
                let purpose = if b.purpose.chars().count() > 30 {
                    format!("{}...", b.purpose.chars().take(27).collect::<String>())
                } else {
                    b.purpose
                };
                println!(
                    "{:<38} {:<10} {:<12} {:<14} {:<10} {}",
                    b.id,
                    b.room,
                    b.date.format("%Y-%m-%d"),
                    b.time_slot,
                    b.status,
                    purpose
                );
            }
        }
        cli::BookingCommands::Approve { request_id } => {
            let id = uuid::Uuid::parse_str(&request_id).context("invalid request id")?;
            let booking = workflow.get(id).await?;
            if booking.status != BookingStatus::Pending {
                println!("Request {} is already {}.", id, booking.status);
                return Ok(());
            }

            match workflow.approve(id).await {
                Ok(approval) if approval.classroom_updated => {
                    println!("Request {} approved. Room {} marked Occupied.", id, approval.booking.room);
                }
                Ok(approval) => {
                    println!(
                        "Request {} approved. No classroom named {} exists.",
                        id, approval.booking.room
                    );
                }
                Err(WorkflowError::ClassroomUpdate {
                    room,
                    repair_queued,
                    source,
                    ..
                }) => {
                    println!("Request {} approved, but room {} was not updated: {}", id, room, source);
                    if repair_queued {
                        println!("The update was queued; run `campus-admin repair run` to retry.");
                    }
                    anyhow::bail!("classroom update failed");
                }
                Err(e) => return Err(e.into()),
            }
        }
        cli::BookingCommands::Reject { request_id } => {
            let id = uuid::Uuid::parse_str(&request_id).context("invalid request id")?;
            let booking = workflow.get(id).await?;
            if booking.status != BookingStatus::Pending {
                println!("Request {} is already {}.", id, booking.status);
                return Ok(());
            }
            workflow.reject(id).await?;
            println!("Request {} rejected.", id);
        }
    }
    Ok(())
}

async fn handle_classroom_command(db: &PgStore, cmd: cli::ClassroomCommands) -> anyhow::Result<()> {
    match cmd {
        cli::ClassroomCommands::List => {
            let rooms = db.list_classrooms().await?;
            if rooms.is_empty() {
                println!("No classrooms found.");
                return Ok(());
            }
            println!("{:<12} STATUS", "ROOM");
            for r in rooms {
                println!("{:<12} {}", r.room_no, r.status);
            }
        }
        cli::ClassroomCommands::Reset { room_no } => {
            if db.set_classroom_status(&room_no, Occupancy::Available).await? {
                println!("Room {} marked Available.", room_no);
            } else {
                println!("Room {} not found.", room_no);
            }
        }
    }
    Ok(())
}

async fn handle_repair_command(
    workflow: BookingWorkflow,
    cmd: cli::RepairCommands,
) -> anyhow::Result<()> {
    match cmd {
        cli::RepairCommands::Run { batch } => {
            let report = workflow.replay_repairs(batch).await?;
            println!(
                "Repairs attempted: {}, resolved: {}, still failing: {}",
                report.attempted, report.resolved, report.failed
            );
        }
    }
    Ok(())
}
