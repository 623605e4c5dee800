//! Probe management endpoints

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use tracing::{error, info};

use crate::api::{
    error::{ApiError, ApiResult},
    state::ApiState,
    types::BasicResponse,
};
use crate::probes::{
    DnsProbe, DnsProbeConfig, HttpProbe, HttpProbeConfig, Probe, ProbeSource, ProbeSummary,
    TcpProbe, TcpProbeConfig,
};

fn invalid_json(kind: &str, rejection: JsonRejection) -> ApiError {
    let message = format!("Fail to create the {kind} healthcheck. Invalid JSON: {rejection}");
    error!("{message}");
    ApiError::InvalidRequest(message)
}

/// Runs a one-off probe or registers a periodic one
async fn handle_check(
    state: &ApiState,
    probe: Box<dyn Probe>,
) -> ApiResult<(StatusCode, Json<BasicResponse>)> {
    let name = probe.name().to_string();
    let one_off = probe.one_off();

    if let Err(e) = state.registry.dispatch(probe, ProbeSource::Api).await {
        error!("{e}");
        return Err(e.into());
    }

    let message = if one_off {
        format!("One-off healthcheck {name} successfully executed")
    } else {
        "Healthcheck successfully added".to_string()
    };
    Ok((StatusCode::CREATED, Json(BasicResponse::new(message))))
}

/// POST /healthcheck/dns
pub async fn create_dns_check(
    State(state): State<ApiState>,
    payload: Result<Json<DnsProbeConfig>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<BasicResponse>)> {
    let Json(config) = payload.map_err(|e| invalid_json("dns", e))?;
    handle_check(&state, Box::new(DnsProbe::new(config))).await
}

/// POST /healthcheck/tcp
pub async fn create_tcp_check(
    State(state): State<ApiState>,
    payload: Result<Json<TcpProbeConfig>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<BasicResponse>)> {
    let Json(config) = payload.map_err(|e| invalid_json("TCP", e))?;
    handle_check(&state, Box::new(TcpProbe::new(config))).await
}

/// POST /healthcheck/http
pub async fn create_http_check(
    State(state): State<ApiState>,
    payload: Result<Json<HttpProbeConfig>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<BasicResponse>)> {
    let Json(config) = payload.map_err(|e| invalid_json("HTTP", e))?;
    handle_check(&state, Box::new(HttpProbe::new(config))).await
}

/// GET /healthcheck
pub async fn list_checks(State(state): State<ApiState>) -> Json<Vec<ProbeSummary>> {
    Json(state.registry.list_checks().await)
}

/// GET /healthcheck/:name
pub async fn get_check(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> ApiResult<Json<ProbeSummary>> {
    state
        .registry
        .get_check(&name)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("probe {name} not found")))
}

/// DELETE /healthcheck/:name
pub async fn remove_check(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> ApiResult<Json<BasicResponse>> {
    info!("deleting healthcheck {name}");
    state.registry.remove_check(&name).await?;
    Ok(Json(BasicResponse::new(format!(
        "Successfully deleted healthcheck {name}"
    ))))
}

/// POST /healthcheck/:name/run
pub async fn run_check(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> ApiResult<Json<BasicResponse>> {
    match state.registry.run_check(&name).await? {
        Some(Ok(())) => Ok(Json(BasicResponse::new(format!(
            "Healthcheck {name} successfully executed"
        )))),
        Some(Err(e)) => Err(ApiError::Internal(format!(
            "execution of probe {name} failed: {e}"
        ))),
        None => Err(ApiError::Conflict(format!(
            "healthcheck {name} is already running"
        ))),
    }
}
