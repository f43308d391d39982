use crate::state;
use crate::uploads;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path as AxumPath, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use serde::Serialize;

#[derive(Serialize)]
pub(crate) struct UploadResponse {
    pub(crate) path: String,
    pub(crate) url: String,
}

#[derive(Serialize)]
pub(crate) struct UploadErrorResponse {
    pub(crate) error: &'static str,
}

pub(crate) async fn upload_image(
    State(state): State<state::AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UploadResponse>, (StatusCode, Json<UploadErrorResponse>)> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());
    let filename = headers
        .get("x-upload-filename")
        .and_then(|value| value.to_str().ok());

    let rel_path = match uploads::store_upload(&state.config.data_dir, &body, content_type, filename)
    {
        Ok(rel_path) => rel_path,
        Err(uploads::UploadError::EmptyBody) => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(UploadErrorResponse {
                    error: "upload body was empty",
                }),
            ));
        }
        Err(uploads::UploadError::UnsupportedType) => {
            return Err((
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                Json(UploadErrorResponse {
                    error: "unsupported image type",
                }),
            ));
        }
        Err(err) => {
            eprintln!("failed to store upload: {err}");
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(UploadErrorResponse {
                    error: "failed to store upload",
                }),
            ));
        }
    };

    let url = format!("/{rel_path}");
    Ok(Json(UploadResponse { path: rel_path, url }))
}

pub(crate) async fn serve_upload(
    State(state): State<state::AppState>,
    AxumPath(path): AxumPath<String>,
) -> Result<Response, (StatusCode, &'static str)> {
    let Some(content_type) = uploads::content_type_for(&path) else {
        return Err((StatusCode::NOT_FOUND, "not found"));
    };

    let resolved = match uploads::resolve_upload(&state.config.data_dir, &path) {
        Ok(resolved) => resolved,
        Err(uploads::UploadError::NotFound) | Err(uploads::UploadError::BadPath) => {
            return Err((StatusCode::NOT_FOUND, "not found"));
        }
        Err(err) => {
            eprintln!("failed to resolve upload {path}: {err}");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, "internal error"));
        }
    };

    let bytes = match std::fs::read(&resolved) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err((StatusCode::NOT_FOUND, "not found"));
        }
        Err(err) => {
            eprintln!("failed to read upload {resolved:?}: {err}");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, "internal error"));
        }
    };

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("content-type", content_type)
        .header("cache-control", "public, max-age=86400")
        .body(bytes.into())
        .unwrap())
}
