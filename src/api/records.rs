//! Conversion endpoints

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::record::{BatchResponse, ConversionResult, ConvertItem, ConvertQuery, ConvertRequest},
};

fn check_batch(state: &crate::AppState, request: &ConvertRequest) -> AppResult<()> {
    request.validate()?;
    let max = state.config.cataloging.max_batch;
    if request.items.len() > max {
        return Err(AppError::Validation(format!(
            "At most {} ISBNs per request, got {}",
            max,
            request.items.len()
        )));
    }
    Ok(())
}

/// Convert a batch of ISBNs
#[utoipa::path(
    post,
    path = "/records",
    tag = "records",
    request_body = ConvertRequest,
    responses(
        (status = 200, description = "Per-ISBN results in request order", body = BatchResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse)
    )
)]
pub async fn convert_batch(
    State(state): State<crate::AppState>,
    Json(request): Json<ConvertRequest>,
) -> AppResult<Json<BatchResponse>> {
    check_batch(&state, &request)?;
    let results = state
        .services
        .records
        .convert_batch(request.items, request.use_ai_940)
        .await;
    Ok(Json(BatchResponse { results }))
}

/// Convert a single ISBN
#[utoipa::path(
    get,
    path = "/records/{isbn}",
    tag = "records",
    params(
        ("isbn" = String, Path, description = "ISBN-10 or ISBN-13, hyphens allowed"),
        ConvertQuery
    ),
    responses(
        (status = 200, description = "Converted record", body = ConversionResult),
        (status = 400, description = "Malformed ISBN", body = crate::error::ErrorResponse),
        (status = 404, description = "No source knows the ISBN", body = crate::error::ErrorResponse)
    )
)]
pub async fn convert_one(
    State(state): State<crate::AppState>,
    Path(isbn): Path<String>,
    Query(query): Query<ConvertQuery>,
) -> AppResult<Json<ConversionResult>> {
    let item = ConvertItem {
        isbn,
        reg_mark: query.reg_mark.unwrap_or_default(),
        reg_no: query.reg_no.unwrap_or_default(),
        copy_symbol: query.copy_symbol.unwrap_or_default(),
    };
    let record = state.services.records.convert(&item, query.use_ai_940).await?;
    Ok(Json(record))
}

/// Convert a batch and download every record as one MRK file
#[utoipa::path(
    post,
    path = "/records/mrk",
    tag = "records",
    request_body = ConvertRequest,
    responses(
        (status = 200, description = "Records separated by blank lines", body = String, content_type = "text/plain"),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse)
    )
)]
pub async fn export_mrk(
    State(state): State<crate::AppState>,
    Json(request): Json<ConvertRequest>,
) -> AppResult<impl IntoResponse> {
    check_batch(&state, &request)?;
    let results = state
        .services
        .records
        .convert_batch(request.items, request.use_ai_940)
        .await;
    let failed = results.iter().filter(|r| !r.ok).count();
    if failed > 0 {
        tracing::warn!(failed, total = results.len(), "MRK export skips failed ISBNs");
    }
    let body = BatchResponse { results }.mrk_export();
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body))
}
