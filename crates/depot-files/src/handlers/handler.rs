//! HTTP handlers for the file service
//!
//! Thin plumbing over [`FileService`]: multipart decoding, header
//! shaping, and status mapping. All policy and ordering decisions live
//! in the service, not here.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{AppendHeaders, IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use depot_core::problemdetails::{self, Problem, ProblemDetails};
use depot_core::AllowedType;
use tracing::{debug, warn};
use utoipa::OpenApi;

use super::types::*;
use crate::policy::UploadedFile;

/// OpenAPI documentation for the file API
#[derive(OpenApi)]
#[openapi(
    paths(
        upload_files,
        download_file,
        delete_file,
        list_file_metadata,
        get_file_metadata,
        file_count,
        allowed_types,
    ),
    components(
        schemas(
            UploadResponse,
            FileMetadataResponse,
            MetadataQuery,
            CountResponse,
            DeleteFileResponse,
            AllowedType,
            ProblemDetails,
        )
    ),
    tags(
        (name = "Files", description = "File upload, download, and metadata operations")
    )
)]
pub struct FilesApiDoc;

/// Configure file routes
pub fn configure_routes() -> Router<Arc<FilesAppState>> {
    Router::new()
        .route("/files/upload", post(upload_files))
        .route("/files", get(list_file_metadata))
        .route("/files/metadata", get(get_file_metadata))
        .route("/files/count", get(file_count))
        .route("/files/types", get(allowed_types))
        .route("/files/{id}", get(download_file))
        .route("/files/{id}", delete(delete_file))
}

/// Upload one or more files
#[utoipa::path(
    tag = "Files",
    post,
    path = "/files/upload",
    request_body(content = String, content_type = "multipart/form-data", description = "Files to upload"),
    responses(
        (status = 200, description = "Files stored, ids returned in upload order", body = UploadResponse),
        (status = 204, description = "No files in the request"),
        (status = 406, description = "Upload quota exceeded", body = ProblemDetails),
        (status = 413, description = "A file exceeds the size limit", body = ProblemDetails),
        (status = 415, description = "A file type is not whitelisted", body = ProblemDetails),
        (status = 500, description = "Internal server error", body = ProblemDetails)
    )
)]
async fn upload_files(
    State(state): State<Arc<FilesAppState>>,
    mut multipart: Multipart,
) -> Result<Response, Problem> {
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        problemdetails::new(StatusCode::BAD_REQUEST)
            .with_title("Malformed Multipart Body")
            .with_detail(e.to_string())
    })? {
        let name = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_default();
        let content_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let bytes = field.bytes().await.map_err(|e| {
            problemdetails::new(StatusCode::BAD_REQUEST)
                .with_title("Malformed Multipart Body")
                .with_detail(e.to_string())
        })?;

        files.push(UploadedFile {
            name,
            content_type,
            bytes,
        });
    }

    if files.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    debug!("received upload batch of {} file(s)", files.len());

    let ids = state.file_service.store_files(files).await?;

    Ok(Json(UploadResponse { ids }).into_response())
}

/// Download a file under its original name
#[utoipa::path(
    tag = "Files",
    get,
    path = "/files/{id}",
    params(
        ("id" = String, Path, description = "File identifier"),
    ),
    responses(
        (status = 200, description = "File content"),
        (status = 404, description = "File not found", body = ProblemDetails),
        (status = 500, description = "Internal server error", body = ProblemDetails)
    )
)]
async fn download_file(
    State(state): State<Arc<FilesAppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, Problem> {
    let download = state.file_service.get_file(&id).await?;

    // Metadata restores the original name and type. A metadata outage
    // must not block the download itself, so failures degrade to the
    // blob's own hints.
    let record = match state.file_service.get_metadata(&[id.clone()]).await {
        Ok(mut records) => records.pop(),
        Err(e) => {
            warn!("metadata lookup for {} failed, serving without it: {}", id, e);
            None
        }
    };

    let content_type = record
        .as_ref()
        .map(|r| r.content_type.clone())
        .or_else(|| download.content_type.clone())
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let mut headers = vec![(header::CONTENT_TYPE, content_type)];

    if let Some(record) = &record {
        headers.push((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", record.original_name),
        ));
    }

    if let Some(size) = download.size {
        headers.push((header::CONTENT_LENGTH, size.to_string()));
    }

    Ok((
        StatusCode::OK,
        AppendHeaders(headers),
        Body::from_stream(download.stream),
    ))
}

/// Delete a file
#[utoipa::path(
    tag = "Files",
    delete,
    path = "/files/{id}",
    params(
        ("id" = String, Path, description = "File identifier"),
    ),
    responses(
        (status = 200, description = "File deleted", body = DeleteFileResponse),
        (status = 404, description = "File not found", body = ProblemDetails),
        (status = 500, description = "Internal server error", body = ProblemDetails)
    )
)]
async fn delete_file(
    State(state): State<Arc<FilesAppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, Problem> {
    state.file_service.delete_file(&id).await?;
    Ok(Json(DeleteFileResponse { deleted: true }))
}

/// List metadata for every file, soft-deleted ones included
#[utoipa::path(
    tag = "Files",
    get,
    path = "/files",
    responses(
        (status = 200, description = "All file records, including soft-deleted ones", body = [FileMetadataResponse]),
        (status = 500, description = "Internal server error", body = ProblemDetails)
    )
)]
async fn list_file_metadata(
    State(state): State<Arc<FilesAppState>>,
) -> Result<impl IntoResponse, Problem> {
    let records = state.file_service.get_all_metadata().await?;
    let response: Vec<FileMetadataResponse> =
        records.into_iter().map(FileMetadataResponse::from).collect();
    Ok(Json(response))
}

/// Look up metadata for specific ids
#[utoipa::path(
    tag = "Files",
    get,
    path = "/files/metadata",
    params(
        ("ids" = String, Query, description = "Comma-separated file identifiers"),
    ),
    responses(
        (status = 200, description = "Matching records; unknown ids are omitted", body = [FileMetadataResponse]),
        (status = 500, description = "Internal server error", body = ProblemDetails)
    )
)]
async fn get_file_metadata(
    State(state): State<Arc<FilesAppState>>,
    Query(query): Query<MetadataQuery>,
) -> Result<impl IntoResponse, Problem> {
    let records = state.file_service.get_metadata(&query.id_list()).await?;
    let response: Vec<FileMetadataResponse> =
        records.into_iter().map(FileMetadataResponse::from).collect();
    Ok(Json(response))
}

/// Number of non-deleted files in storage
#[utoipa::path(
    tag = "Files",
    get,
    path = "/files/count",
    responses(
        (status = 200, description = "Current upload count", body = CountResponse),
        (status = 500, description = "Internal server error", body = ProblemDetails)
    )
)]
async fn file_count(
    State(state): State<Arc<FilesAppState>>,
) -> Result<impl IntoResponse, Problem> {
    let count = state.file_service.upload_count().await?;
    Ok(Json(CountResponse { count }))
}

/// The configured upload whitelist
#[utoipa::path(
    tag = "Files",
    get,
    path = "/files/types",
    responses(
        (status = 200, description = "Allowed (content type, extension) pairs", body = [AllowedType])
    )
)]
async fn allowed_types(State(state): State<Arc<FilesAppState>>) -> impl IntoResponse {
    Json(state.file_service.allowed_types().to_vec())
}
