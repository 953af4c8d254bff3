use crate::config::Config;
use crate::errors::{AppError, ResultExt};
use crate::filler;
use crate::mapping;
use crate::models::{
    FillFormRequest, FillFormResponse, InstitutionListResponse, InstitutionSummary,
};
use crate::registry::Registry;
use crate::template::TemplateResolver;
use axum::{extract::State, http::StatusCode, Json};
use chrono::Local;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Shared application state injected into handlers.
///
/// Everything here is read-only after startup; requests share it through an
/// `Arc` without locking.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Institution mapping registry (static profile tables).
    pub registry: Registry,
    /// Template resolver with download cache and circuit breaker.
    pub resolver: TemplateResolver,
}

/// Health check endpoint.
///
/// Returns the service status, version, and health information.
///
/// # Returns
///
/// * `(StatusCode, Json<serde_json::Value>)` - HTTP 200 OK with health status JSON.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "kyc-pdf-api",
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}

/// GET /
///
/// Service discovery endpoint: name, version, and the configured form
/// catalog, so frontends can populate their institution picker.
pub async fn service_info(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let forms: Vec<serde_json::Value> = state
        .registry
        .profiles()
        .iter()
        .map(|p| json!({ "id": p.key(), "name": p.display_name() }))
        .collect();

    Json(json!({
        "service": "kyc-pdf-api",
        "version": env!("CARGO_PKG_VERSION"),
        "available_institutions": state.registry.keys(),
        "forms": forms,
    }))
}

/// GET /api/v1/institutions
///
/// Lists every configured institution profile with its field count.
///
/// # Arguments
///
/// * `state` - The application state.
///
/// # Returns
///
/// * `Json<InstitutionListResponse>` - One summary per registered profile.
pub async fn list_institutions(
    State(state): State<Arc<AppState>>,
) -> Json<InstitutionListResponse> {
    let institutions = state
        .registry
        .profiles()
        .iter()
        .map(|p| InstitutionSummary {
            key: p.key().to_string(),
            display_name: p.display_name().to_string(),
            field_count: p.field_count(),
        })
        .collect();

    Json(InstitutionListResponse { institutions })
}

/// POST /api/v1/fill-form
///
/// Main endpoint: maps one client record onto an institution's PDF form.
///
/// Pipeline: registry lookup (rejected before any I/O), client validation,
/// template resolution, field derivation, fill + reconciliation, output
/// write. Per-field derivation failures are logged and absorbed; everything
/// else aborts the request with a typed error.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `request` - Institution key, client record, optional template override.
///
/// # Returns
///
/// * `Result<Json<FillFormResponse>, AppError>` - Document location plus fill report.
pub async fn fill_form(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FillFormRequest>,
) -> Result<Json<FillFormResponse>, AppError> {
    tracing::info!(
        "POST /api/v1/fill-form - institution: {}",
        request.institution
    );

    // 1. Validate institution before touching the network
    let profile = state.registry.lookup(&request.institution).ok_or_else(|| {
        AppError::UnknownInstitution(format!(
            "Institution '{}' not configured. Available: {:?}",
            request.institution,
            state.registry.keys()
        ))
    })?;

    // 2. Validate client invariants
    request.client.validate()?;

    // 3. Obtain template bytes (override wins over configured default)
    let template = state
        .resolver
        .resolve(profile.key(), request.template_url.as_deref())
        .await?;

    // 4. Derive field values
    tracing::debug!("Deriving {} fields for {}", profile.field_count(), profile.key());
    let (derived, issues) = mapping::derive(profile, &request.client);
    if !issues.is_empty() {
        tracing::warn!(
            "{} of {} fields failed to derive for {}: {:?}",
            issues.len(),
            profile.field_count(),
            profile.key(),
            issues.iter().map(|i| i.field.as_str()).collect::<Vec<_>>()
        );
    }

    // 5. Fill the form and reconcile against the template's schema
    let outcome = filler::fill(&template, &derived)?;

    // 6. Write the output document
    let document_id = Uuid::new_v4();
    let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let filename = format!(
        "{}_{}_{}.pdf",
        profile.key(),
        request.client.cedula,
        timestamp
    );
    let filepath = state.config.output_dir.join(&filename);
    tokio::fs::write(&filepath, &outcome.document)
        .await
        .map_err(AppError::from)
        .context(format!("Failed to write {}", filepath.display()))?;

    tracing::info!(
        "Filled {} for {} -> {} ({}/{} fields, {:.1}%)",
        profile.key(),
        request.client.full_name,
        filepath.display(),
        outcome.report.fields_filled,
        outcome.report.fields_total,
        outcome.report.completion_pct
    );

    Ok(Json(FillFormResponse {
        success: true,
        institution: profile.key().to_string(),
        client_name: request.client.full_name.clone(),
        document_id,
        filename,
        filepath: filepath.display().to_string(),
        report: outcome.report,
        timestamp,
    }))
}
