//! Publisher location and registry table endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::publisher::{
        CreateImprint, CreatePublisher, CreateRegion, ImportReport, Imprint, LocationQuery, Publisher,
        PublisherLocation, PublisherQuery, Region, RegistryImport,
    },
};

use super::AdminToken;

/// Resolve the place of publication for an ISBN or a publisher name
#[utoipa::path(
    get,
    path = "/publishers/location",
    tag = "publishers",
    params(LocationQuery),
    responses(
        (status = 200, description = "Place, country code and provenance", body = PublisherLocation),
        (status = 400, description = "Neither isbn nor publisher given", body = crate::error::ErrorResponse)
    )
)]
pub async fn locate(
    State(state): State<crate::AppState>,
    Query(query): Query<LocationQuery>,
) -> AppResult<Json<PublisherLocation>> {
    let isbn = query.isbn.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let publisher = query.publisher.as_deref().unwrap_or("").trim();
    if isbn.is_none() && publisher.is_empty() {
        return Err(AppError::BadRequest("isbn or publisher is required".to_string()));
    }
    let location = state.services.location.locate(isbn, publisher).await;
    Ok(Json(location))
}

// =============================================================================
// PUBLISHERS
// =============================================================================

/// List registered publishers
#[utoipa::path(
    get,
    path = "/publishers",
    tag = "publishers",
    params(PublisherQuery),
    responses(
        (status = 200, description = "Publishers", body = Vec<Publisher>)
    )
)]
pub async fn list_publishers(
    State(state): State<crate::AppState>,
    Query(query): Query<PublisherQuery>,
) -> AppResult<Json<Vec<Publisher>>> {
    let publishers = state
        .services
        .repository
        .publishers
        .list_publishers(query.q.as_deref())
        .await?;
    Ok(Json(publishers))
}

/// Register a publisher address
#[utoipa::path(
    post,
    path = "/publishers",
    tag = "publishers",
    security(("bearer_auth" = [])),
    request_body = CreatePublisher,
    responses(
        (status = 201, description = "Publisher created", body = Publisher)
    )
)]
pub async fn create_publisher(
    State(state): State<crate::AppState>,
    _admin: AdminToken,
    Json(data): Json<CreatePublisher>,
) -> AppResult<(StatusCode, Json<Publisher>)> {
    data.validate()?;
    let publisher = state.services.repository.publishers.create_publisher(&data).await?;
    Ok((StatusCode::CREATED, Json(publisher)))
}

/// Delete a publisher
#[utoipa::path(
    delete,
    path = "/publishers/{id}",
    tag = "publishers",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Publisher ID")),
    responses(
        (status = 204, description = "Publisher deleted"),
        (status = 404, description = "Unknown publisher", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_publisher(
    State(state): State<crate::AppState>,
    _admin: AdminToken,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    state.services.repository.publishers.delete_publisher(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// REGIONS
// =============================================================================

/// List region to country code mappings
#[utoipa::path(
    get,
    path = "/regions",
    tag = "publishers",
    responses(
        (status = 200, description = "Regions", body = Vec<Region>)
    )
)]
pub async fn list_regions(State(state): State<crate::AppState>) -> AppResult<Json<Vec<Region>>> {
    let regions = state.services.repository.publishers.list_regions().await?;
    Ok(Json(regions))
}

/// Add a region mapping
#[utoipa::path(
    post,
    path = "/regions",
    tag = "publishers",
    security(("bearer_auth" = [])),
    request_body = CreateRegion,
    responses(
        (status = 201, description = "Region created", body = Region),
        (status = 409, description = "Region already mapped", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_region(
    State(state): State<crate::AppState>,
    _admin: AdminToken,
    Json(data): Json<CreateRegion>,
) -> AppResult<(StatusCode, Json<Region>)> {
    data.validate()?;
    let region = state.services.repository.publishers.create_region(&data).await?;
    Ok((StatusCode::CREATED, Json(region)))
}

/// Delete a region mapping
#[utoipa::path(
    delete,
    path = "/regions/{id}",
    tag = "publishers",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Region ID")),
    responses(
        (status = 204, description = "Region deleted")
    )
)]
pub async fn delete_region(
    State(state): State<crate::AppState>,
    _admin: AdminToken,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    state.services.repository.publishers.delete_region(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// IMPRINTS
// =============================================================================

/// List imprints with their parent publisher
#[utoipa::path(
    get,
    path = "/imprints",
    tag = "publishers",
    responses(
        (status = 200, description = "Imprints", body = Vec<Imprint>)
    )
)]
pub async fn list_imprints(State(state): State<crate::AppState>) -> AppResult<Json<Vec<Imprint>>> {
    let imprints = state.services.repository.publishers.list_imprints().await?;
    Ok(Json(imprints))
}

/// Register an imprint
#[utoipa::path(
    post,
    path = "/imprints",
    tag = "publishers",
    security(("bearer_auth" = [])),
    request_body = CreateImprint,
    responses(
        (status = 201, description = "Imprint created", body = Imprint)
    )
)]
pub async fn create_imprint(
    State(state): State<crate::AppState>,
    _admin: AdminToken,
    Json(data): Json<CreateImprint>,
) -> AppResult<(StatusCode, Json<Imprint>)> {
    let imprint = state.services.repository.publishers.create_imprint(&data).await?;
    Ok((StatusCode::CREATED, Json(imprint)))
}

/// Delete an imprint
#[utoipa::path(
    delete,
    path = "/imprints/{id}",
    tag = "publishers",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Imprint ID")),
    responses(
        (status = 204, description = "Imprint deleted")
    )
)]
pub async fn delete_imprint(
    State(state): State<crate::AppState>,
    _admin: AdminToken,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    state.services.repository.publishers.delete_imprint(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Bulk load publishers, regions and imprints in one transaction
#[utoipa::path(
    post,
    path = "/registry/import",
    tag = "publishers",
    security(("bearer_auth" = [])),
    request_body = RegistryImport,
    responses(
        (status = 200, description = "Rows written", body = ImportReport)
    )
)]
pub async fn import_registry(
    State(state): State<crate::AppState>,
    _admin: AdminToken,
    Json(bundle): Json<RegistryImport>,
) -> AppResult<Json<ImportReport>> {
    for publisher in &bundle.publishers {
        publisher.validate()?;
    }
    for region in &bundle.regions {
        region.validate()?;
    }
    let report = state.services.repository.publishers.import(&bundle).await?;
    tracing::info!(
        publishers = report.publishers,
        regions = report.regions,
        imprints = report.imprints,
        "Registry import finished"
    );
    Ok(Json(report))
}
