// src/main.rs
use aries_perf_bot::agent::{proof_request, AdminClient};
use aries_perf_bot::config::{Config, RunAction};
use aries_perf_bot::error::PerfError;
use aries_perf_bot::exchange::{CompletionDetector, ExchangeRole, TerminalStates};
use aries_perf_bot::orchestrator::{log_report, BatchOrchestrator, BatchReport};
use aries_perf_bot::utils::{self, unix_ts, LogTimer};
use aries_perf_bot::webhooks::{NotificationProcessor, WebhookServer};
use clap::Parser;
use log::{error, info, warn};
use rand::Rng;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const SCHEMA_NAME: &str = "perf schema";
const SCHEMA_ATTRIBUTES: [&str; 5] = ["name", "date", "incident_count", "risk_score", "timestamp"];

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let config = Config::parse();
    if let Err(e) = utils::setup_logging(&config.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }
    if let Err(e) = run(config).await {
        error!("❌ Run failed: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), PerfError> {
    config.validate()?;
    config.log_settings();
    let mut run_timer = LogTimer::start("Total runtime:");

    // Webhook receivers, one per agent role.
    let issuer_events = Arc::new(NotificationProcessor::new("issuer"));
    let holder_events = Arc::new(NotificationProcessor::new("holder"));
    let issuer_server = WebhookServer::new(config.issuer_webhook_port, issuer_events.clone())
        .bind()
        .await?;
    let holder_server = WebhookServer::new(config.holder_webhook_port, holder_events.clone())
        .bind()
        .await?;
    tokio::spawn(issuer_server.serve());
    tokio::spawn(holder_server.serve());

    let issuer = Arc::new(AdminClient::new(&config.issuer_admin_url, "issuer")?);
    let holder = Arc::new(AdminClient::new(&config.holder_admin_url, "holder")?);

    // Exchange an invitation and wait for the pairwise connection.
    let mut connect_timer = LogTimer::start("Connect duration:");
    let (issuer_conn_id, invitation) = issuer.create_invitation().await?;
    issuer_events.connections.prime(&issuer_conn_id).await;
    let holder_conn_id = holder.receive_invitation(&invitation).await?;
    holder_events.connections.prime(&holder_conn_id).await;
    let connection_id = issuer_events
        .connections
        .await_active(Duration::from_secs(config.connect_timeout_secs))
        .await?;
    info!("Connected (connection_id {})", connection_id);
    connect_timer.stop();

    match config.action {
        RunAction::Issue => {
            let cred_def_id = publish_definitions(&issuer, &holder).await?;
            run_credential_batch(&config, &issuer, &holder_events, &connection_id, &cred_def_id)
                .await?;
        }
        RunAction::Full => {
            let cred_def_id = publish_definitions(&issuer, &holder).await?;
            let report = run_credential_batch(
                &config,
                &issuer,
                &holder_events,
                &connection_id,
                &cred_def_id,
            )
            .await?;
            // The presentation batch proves credentials issued above, so it
            // must not start dispatching until the first batch is done.
            info!(
                "Credential batch done ({} completed); starting presentation batch",
                report.completed
            );
            run_presentation_batch(&config, &issuer, &issuer_events, &connection_id).await?;
        }
        RunAction::Ping => {
            run_ping_batch(&config, &issuer, &issuer_events, &connection_id).await?;
        }
        RunAction::Present => {
            run_presentation_batch(&config, &issuer, &issuer_events, &connection_id).await?;
        }
    }

    run_timer.stop();
    Ok(())
}

/// Publish the perf schema and credential definition on the issuer, then
/// warm the holder's credential definition cache.
async fn publish_definitions(
    issuer: &AdminClient,
    holder: &AdminClient,
) -> Result<String, PerfError> {
    let mut publish_timer = LogTimer::start("Publish duration:");
    let schema_id = issuer
        .publish_schema(SCHEMA_NAME, &schema_version(), &SCHEMA_ATTRIBUTES)
        .await?;
    info!("Schema ID: {}", schema_id);
    let cred_def_id = issuer.publish_credential_definition(&schema_id).await?;
    info!("Credential Definition ID: {}", cred_def_id);
    holder.fetch_credential_definition(&cred_def_id).await?;
    publish_timer.stop();
    Ok(cred_def_id)
}

async fn run_credential_batch(
    config: &Config,
    issuer: &Arc<AdminClient>,
    holder_events: &Arc<NotificationProcessor>,
    connection_id: &str,
    cred_def_id: &str,
) -> Result<BatchReport, PerfError> {
    let orchestrator = BatchOrchestrator::new("credentials", config.count, config.threads);
    let detector = CompletionDetector::new(
        holder_events.credentials.clone(),
        TerminalStates::for_role(ExchangeRole::Holder),
        Duration::from_secs(config.wait_timeout_secs),
    );
    let issuer = issuer.clone();
    let connection_id = connection_id.to_string();
    let cred_def_id = cred_def_id.to_string();
    let result = orchestrator
        .run(&detector, move |index| {
            let issuer = issuer.clone();
            let connection_id = connection_id.clone();
            let cred_def_id = cred_def_id.clone();
            Box::pin(async move {
                let attributes = credential_attributes(index);
                issuer
                    .send_credential(
                        &connection_id,
                        &cred_def_id,
                        &attributes,
                        &format!("issue test credential {}", index),
                    )
                    .await?;
                Ok(())
            })
        })
        .await;
    finish_batch(&orchestrator, result, &csv_path(config, "credentials")).await
}

async fn run_ping_batch(
    config: &Config,
    issuer: &Arc<AdminClient>,
    issuer_events: &Arc<NotificationProcessor>,
    connection_id: &str,
) -> Result<BatchReport, PerfError> {
    let orchestrator = BatchOrchestrator::new("pings", config.count, config.threads);
    let detector = CompletionDetector::new(
        issuer_events.pings.clone(),
        TerminalStates::for_role(ExchangeRole::PingSender),
        Duration::from_secs(config.wait_timeout_secs),
    );
    let issuer = issuer.clone();
    let events = issuer_events.clone();
    let connection_id = connection_id.to_string();
    let result = orchestrator
        .run(&detector, move |index| {
            let issuer = issuer.clone();
            let events = events.clone();
            let connection_id = connection_id.clone();
            Box::pin(async move {
                let thread_id = issuer
                    .send_ping(&connection_id, &format!("test-ping {}", index))
                    .await?;
                events.register_sent_ping(thread_id).await;
                Ok(())
            })
        })
        .await;
    finish_batch(&orchestrator, result, &csv_path(config, "pings")).await
}

async fn run_presentation_batch(
    config: &Config,
    issuer: &Arc<AdminClient>,
    issuer_events: &Arc<NotificationProcessor>,
    connection_id: &str,
) -> Result<BatchReport, PerfError> {
    let orchestrator = BatchOrchestrator::new("presentations", config.count, config.threads)
        .with_send_delay(Duration::from_millis(config.send_delay_ms));
    let detector = CompletionDetector::new(
        issuer_events.presentations.clone(),
        TerminalStates::for_role(ExchangeRole::Verifier),
        Duration::from_secs(config.present_wait_timeout_secs),
    );
    let issuer = issuer.clone();
    let connection_id = connection_id.to_string();
    let result = orchestrator
        .run(&detector, move |index| {
            let issuer = issuer.clone();
            let connection_id = connection_id.clone();
            Box::pin(async move {
                let request = proof_request(
                    &format!("Proof of Performance {}", index),
                    SCHEMA_NAME,
                    &SCHEMA_ATTRIBUTES,
                );
                issuer
                    .send_presentation_request(&connection_id, request)
                    .await?;
                Ok(())
            })
        })
        .await;
    finish_batch(&orchestrator, result, &csv_path(config, "presentations")).await
}

/// Export the batch's latency artifact and log the summary. On a failed or
/// interrupted batch the partial ledger still goes to disk before the error
/// propagates.
async fn finish_batch(
    orchestrator: &BatchOrchestrator,
    result: Result<BatchReport, PerfError>,
    path: &Path,
) -> Result<BatchReport, PerfError> {
    match result {
        Ok(report) => {
            orchestrator.export_csv(path).await?;
            log_report(&report);
            Ok(report)
        }
        Err(e) => {
            if let Err(export_err) = orchestrator.export_csv(path).await {
                warn!("Failed to export partial latency data: {}", export_err);
            }
            Err(e)
        }
    }
}

fn csv_path(config: &Config, label: &str) -> PathBuf {
    PathBuf::from(format!("{}_{}.csv", config.csv_prefix, label))
}

fn schema_version() -> String {
    let mut rng = rand::thread_rng();
    format!(
        "{}.{}.{}",
        rng.gen_range(1..=100),
        rng.gen_range(1..=100),
        rng.gen_range(1..=100)
    )
}

fn credential_attributes(index: usize) -> Vec<(String, String)> {
    let mut rng = rand::thread_rng();
    vec![
        ("name".to_string(), format!("Perf Holder {}", index)),
        ("date".to_string(), format!("2026-{:02}-15", (index % 12) + 1)),
        (
            "incident_count".to_string(),
            rng.gen_range(0..50).to_string(),
        ),
        ("risk_score".to_string(), rng.gen_range(1..=100).to_string()),
        ("timestamp".to_string(), (unix_ts() as u64).to_string()),
    ]
}
