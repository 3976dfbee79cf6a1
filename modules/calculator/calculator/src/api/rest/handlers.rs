use std::sync::Arc;

use axum::Json;
use axum::extract::{Extension, Path};
use axum::http::{StatusCode, Uri, header};
use axum::response::IntoResponse;
use calculator_sdk::{CalculationFailure, CalculatorApi, Operation, RecordId};

use super::dto::{
    CalculationDto, CalculationRequest, CalculationResponse, DeleteResponse, ReadinessResponse,
};
use super::error::{failure_to_problem, input_error_to_problem};
use super::problem::{Problem, internal_error, not_found};
use crate::domain::input::{ComputeRequest, ParsedRequest};
use crate::metrics::{CalculatorMetrics, UNKNOWN_OPERATION, status};

pub type ApiResult<T> = Result<T, Problem>;

/// Shared handle to the calculation service.
pub type SharedCalculator = Arc<dyn CalculatorApi>;

fn parse_request(
    req: CalculationRequest,
    metrics: &CalculatorMetrics,
    uri: &Uri,
) -> ApiResult<ParsedRequest> {
    let req = ComputeRequest::from(req);
    req.parse().map_err(|e| {
        let label = req
            .operation
            .parse::<Operation>()
            .map_or(UNKNOWN_OPERATION, Operation::as_str);
        metrics.record_request(label, status::INPUT_ERROR);
        input_error_to_problem(&e, uri.path())
    })
}

fn record_not_found(id: RecordId, uri: &Uri) -> Problem {
    not_found(CalculationFailure::NotFound { id }.to_string())
        .with_code("not_found")
        .with_instance(uri.path())
}

pub async fn create_calculation(
    Extension(svc): Extension<SharedCalculator>,
    Extension(metrics): Extension<Arc<CalculatorMetrics>>,
    uri: Uri,
    Json(req): Json<CalculationRequest>,
) -> ApiResult<impl IntoResponse> {
    let req = parse_request(req, &metrics, &uri)?;
    let outcome = svc
        .calculate(req.operand1, req.operand2, &req.operation)
        .await;

    if let Some(failure @ CalculationFailure::Persistence { .. }) = &outcome.failure {
        return Err(failure_to_problem(failure, uri.path()));
    }
    Ok((
        StatusCode::CREATED,
        Json(CalculationResponse::from(outcome)),
    ))
}

pub async fn list_calculations(
    Extension(svc): Extension<SharedCalculator>,
) -> ApiResult<Json<Vec<CalculationDto>>> {
    let records = svc.history().await?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}

pub async fn get_calculation(
    Extension(svc): Extension<SharedCalculator>,
    Path(id): Path<RecordId>,
    uri: Uri,
) -> ApiResult<Json<CalculationDto>> {
    let record = svc
        .get(id)
        .await?
        .ok_or_else(|| record_not_found(id, &uri))?;
    Ok(Json(record.into()))
}

pub async fn update_calculation(
    Extension(svc): Extension<SharedCalculator>,
    Extension(metrics): Extension<Arc<CalculatorMetrics>>,
    Path(id): Path<RecordId>,
    uri: Uri,
    Json(req): Json<CalculationRequest>,
) -> ApiResult<Json<CalculationResponse>> {
    let req = parse_request(req, &metrics, &uri)?;
    let outcome = svc
        .update(id, req.operand1, req.operand2, &req.operation)
        .await;

    match &outcome.failure {
        None | Some(CalculationFailure::DivisionByZero) => Ok(Json(outcome.into())),
        Some(failure) => Err(failure_to_problem(failure, uri.path())),
    }
}

/// First step of a two-step delete: show what would be removed.
pub async fn confirm_delete(
    Extension(svc): Extension<SharedCalculator>,
    Path(id): Path<RecordId>,
    uri: Uri,
) -> ApiResult<Json<CalculationDto>> {
    let record = svc
        .get(id)
        .await?
        .ok_or_else(|| record_not_found(id, &uri))?;
    Ok(Json(record.into()))
}

pub async fn delete_calculation(
    Extension(svc): Extension<SharedCalculator>,
    Path(id): Path<RecordId>,
    uri: Uri,
) -> ApiResult<Json<DeleteResponse>> {
    if svc.delete(id).await? {
        Ok(Json(DeleteResponse { id, deleted: true }))
    } else {
        Err(record_not_found(id, &uri))
    }
}

pub async fn metrics(
    Extension(metrics): Extension<Arc<CalculatorMetrics>>,
) -> ApiResult<impl IntoResponse> {
    let body = metrics.render().map_err(|e| {
        tracing::error!(error = %e, "Failed to render metrics");
        internal_error("failed to render metrics")
    })?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}

#[allow(clippy::unused_async)]
pub async fn ready() -> Json<ReadinessResponse> {
    Json(ReadinessResponse {
        status: "ready".to_owned(),
    })
}
