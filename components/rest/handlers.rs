use axum::{
    extract::{FromRequest, Path, Request, State},
    http::{header::CONTENT_TYPE, HeaderMap},
    Form, Json,
};
use phenotips_patient_access::{ConsentView, OwnerSummary};
use serde::Deserialize;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Deserialize)]
struct OwnerJson {
    id: String,
}

#[derive(Debug, Deserialize)]
struct OwnerForm {
    owner: String,
}

/// `GET /patients/:patient_id/permissions/owner`
pub async fn get_owner(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<OwnerSummary>> {
    let caller = state.caller(&headers);
    let owner = state.access().get_owner(caller.as_ref(), &patient_id)?;
    Ok(Json(owner))
}

/// `PUT /patients/:patient_id/permissions/owner` with a JSON `{"id": ..}` or form `owner=..` body.
pub async fn set_owner(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
    headers: HeaderMap,
    request: Request,
) -> ApiResult<Json<OwnerSummary>> {
    let caller = state.caller(&headers);
    let username = requested_owner(&headers, request).await?;
    let owner = state
        .access()
        .set_owner(caller.as_ref(), &patient_id, &username)?;
    Ok(Json(owner))
}

async fn requested_owner(headers: &HeaderMap, request: Request) -> ApiResult<String> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();
    if content_type.starts_with("application/json") {
        let Json(body) = Json::<OwnerJson>::from_request(request, &())
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
        Ok(body.id)
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        let Form(body) = Form::<OwnerForm>::from_request(request, &())
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
        Ok(body.owner)
    } else {
        Err(ApiError::unsupported_media_type(
            "expected application/json or application/x-www-form-urlencoded",
        ))
    }
}

/// `GET /patients/:patient_id/consents`
pub async fn list_consents(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<ConsentView>>> {
    let caller = state.caller(&headers);
    let consents = state.access().list_consents(caller.as_ref(), &patient_id)?;
    Ok(Json(consents))
}

/// `PUT /patients/:patient_id/consents/grant/:id`
pub async fn grant_consent(
    State(state): State<AppState>,
    Path((patient_id, consent_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> ApiResult<Json<ConsentView>> {
    let caller = state.caller(&headers);
    let view = state
        .access()
        .grant_consent(caller.as_ref(), &patient_id, &consent_id)?;
    Ok(Json(view))
}

/// `PUT /patients/:patient_id/consents/revoke/:id`
pub async fn revoke_consent(
    State(state): State<AppState>,
    Path((patient_id, consent_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> ApiResult<Json<ConsentView>> {
    let caller = state.caller(&headers);
    let view = state
        .access()
        .revoke_consent(caller.as_ref(), &patient_id, &consent_id)?;
    Ok(Json(view))
}

/// Answers unknown paths with a JSON 404.
pub async fn not_found() -> ApiError {
    ApiError::not_found("no such resource")
}
