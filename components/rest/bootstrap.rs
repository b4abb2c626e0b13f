use std::sync::Arc;

use anyhow::{Context, Result};
use phenotips_diagnosis::{DiagnosisScriptService, DiagnosisService, InformationContentRanker};
use phenotips_patient_access::{InMemoryPatientRepository, PatientAccessRuntime, PatientAccessTelemetry, UserDirectory};
use phenotips_vocabulary::{load_hpoa, load_obo, Vocabulary};
use serde_json::json;
use shared_event_bus::FileEventPublisher;
use shared_logging::{JsonLogger, LogLevel};
use tokio::{net::TcpListener, signal};

use crate::{config::ServerConfig, routes::router, seed::SeedDocument, state::AppState};

/// Builds the owner and consent runtime: seed data, consents and telemetry.
pub fn load_access_runtime(config: &ServerConfig) -> Result<PatientAccessRuntime> {
    let repository = InMemoryPatientRepository::new();
    let registry = config.consent_registry();
    let directory = match &config.seed {
        Some(path) => SeedDocument::load(path)?
            .apply(&repository, &registry)
            .with_context(|| format!("applying seed {}", path.display()))?,
        None => UserDirectory::new(),
    };

    let mut telemetry = PatientAccessTelemetry::builder("patient_access").min_level(config.log_level);
    if let Some(path) = &config.log_path {
        telemetry = telemetry.log_path(path);
    }
    if let Some(path) = &config.events_path {
        let publisher = FileEventPublisher::new(path)
            .with_context(|| format!("preparing event log {}", path.display()))?;
        telemetry = telemetry.event_publisher(Arc::new(publisher));
    }
    let telemetry = telemetry.build().context("initialising access telemetry")?;

    let runtime = PatientAccessRuntime::new(Arc::new(repository.clone()), directory, registry, config.access)
        .with_telemetry(telemetry.clone());
    let _ = telemetry.log(
        LogLevel::Info,
        "patient_access.ready",
        None,
        &json!({ "records": repository.len() }),
    );
    Ok(runtime)
}

/// Loads the vocabularies and wires the reference ranker behind the script entry point.
pub fn load_diagnosis_service(config: &ServerConfig) -> Result<DiagnosisScriptService> {
    let paths = config
        .vocabulary
        .as_ref()
        .context("diagnosis suggestion needs a [vocabulary] section")?;
    let phenotype_terms = load_obo(&paths.phenotype_obo)
        .with_context(|| format!("loading phenotypes {}", paths.phenotype_obo.display()))?;
    let disease_terms = load_hpoa(&paths.disease_annotations)
        .with_context(|| format!("loading annotations {}", paths.disease_annotations.display()))?;
    let phenotypes = Arc::new(Vocabulary::new("hpo", phenotype_terms));
    let diseases = Vocabulary::new("omim", disease_terms);
    let ranker = InformationContentRanker::new(Arc::clone(&phenotypes), &diseases);

    let mut service = DiagnosisService::new(phenotypes, Arc::new(ranker));
    if let Some(path) = &config.log_path {
        let logger = JsonLogger::with_min_level(path, config.log_level)
            .with_context(|| format!("opening log {}", path.display()))?;
        service = service.with_logger(Arc::new(logger));
    }
    Ok(DiagnosisScriptService::new(Arc::new(service)))
}

/// Serves the REST API until Ctrl+C.
pub async fn serve(config: &ServerConfig) -> Result<()> {
    let runtime = load_access_runtime(config)?;
    let telemetry = runtime.telemetry().cloned();
    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;
    if let Some(telemetry) = &telemetry {
        let _ = telemetry.log(
            LogLevel::Info,
            "server.listening",
            None,
            &json!({ "listen": config.listen.to_string() }),
        );
    }
    let app = router(AppState::new(runtime));
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal(telemetry))
        .await
        .context("server error")
}

async fn shutdown_signal(telemetry: Option<PatientAccessTelemetry>) {
    let (level, message, fields) = match signal::ctrl_c().await {
        Ok(()) => (LogLevel::Info, "server.shutdown", json!({})),
        Err(err) => (
            LogLevel::Warn,
            "server.shutdown_signal_failed",
            json!({ "error": err.to_string() }),
        ),
    };
    if let Some(telemetry) = telemetry {
        let _ = telemetry.log(level, message, None, &fields);
    }
}
