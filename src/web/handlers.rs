use std::sync::Arc;

use askama::Template;
use axum::Json;
use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Path, Request, State};
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{Html, IntoResponse, Response};
use tracing::{error, info, warn};

use super::state::{
    AppState, CommandResponse, ErrorResponse, HealthResponse, MetaResponse, UploadResponse,
};
use super::templates::IndexTemplate;
use crate::error::DecodeError;
use crate::frame::PNG_CONTENT_TYPE;
use crate::upload::{Upload, handle_upload};
use crate::viewers::CommandToken;

pub async fn index(State(state): State<AppState>) -> Response {
    let tpl = IndexTemplate {
        screen_width: state.screen.settings.width,
        screen_height: state.screen.settings.height,
    };
    match tpl.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!(error = %e, "Template render failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn meta(State(state): State<AppState>) -> Json<MetaResponse> {
    Json(MetaResponse {
        ok: true,
        meta: state.screen.frames.meta(),
    })
}

pub async fn latest_png(State(state): State<AppState>) -> Response {
    let frame = state.screen.frames.snapshot();
    ([(CONTENT_TYPE, PNG_CONTENT_TYPE)], frame.png.clone()).into_response()
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        host: state.host.clone(),
        port: state.port,
    })
}

pub async fn button(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Some(token) = CommandToken::for_button(&id) else {
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("unknown_button", "unknown button")),
        )
            .into_response();
    };
    info!(button = %id, "button");
    broadcast(&state, token.as_str())
}

pub async fn command(State(state): State<AppState>, Path(cmd): Path<String>) -> Response {
    broadcast(&state, &cmd)
}

fn broadcast(state: &AppState, raw: &str) -> Response {
    match state.screen.command(raw) {
        Some((token, clients)) => Json(CommandResponse {
            ok: true,
            cmd: token.to_string(),
            clients,
        })
        .into_response(),
        None => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("empty_cmd", "empty cmd")),
        )
            .into_response(),
    }
}

pub async fn image(State(state): State<AppState>, request: Request) -> Response {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let is_multipart = content_type
        .as_deref()
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    let upload = if is_multipart {
        match read_multipart(request, &state).await {
            Ok(upload) => upload,
            Err(resp) => return resp,
        }
    } else {
        match Bytes::from_request(request, &state).await {
            Ok(body) => Upload::raw(body.to_vec(), content_type.as_deref()),
            Err(e) => {
                warn!(error = %e, "Failed reading upload body");
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse::new("read_error", e)),
                )
                    .into_response();
            }
        }
    };
    info!(size = upload.data.len(), source = %upload.source, "Received upload");

    let screen = Arc::clone(&state.screen);
    let res = tokio::task::spawn_blocking(move || handle_upload(&screen, upload))
        .await
        .map_err(|e| DecodeError::Task(e.to_string()))
        .and_then(|r| r);

    match res {
        Ok(outcome) => {
            let clients = state.screen.viewers.broadcast(&CommandToken::frame());
            info!(generation = outcome.meta.generation, clients, "Frame updated");
            Json(UploadResponse {
                ok: true,
                src_width: outcome.src_width,
                src_height: outcome.src_height,
            })
            .into_response()
        }
        Err(e) => upload_error(e),
    }
}

async fn read_multipart(request: Request, state: &AppState) -> Result<Upload, Response> {
    let mut multipart = Multipart::from_request(request, state)
        .await
        .map_err(IntoResponse::into_response)?;

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() != Some("file") {
                    continue;
                }
                let content_type = field.content_type().map(str::to_string);
                return match field.bytes().await {
                    Ok(b) => Ok(Upload::multipart(b.to_vec(), content_type.as_deref())),
                    Err(e) => {
                        warn!(error = %e, "Failed reading upload field");
                        Err((
                            StatusCode::BAD_REQUEST,
                            Json(ErrorResponse::new("read_error", e)),
                        )
                            .into_response())
                    }
                };
            }
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Multipart parse error");
                return Err((
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse::new("read_error", e)),
                )
                    .into_response());
            }
        }
    }

    warn!("Upload missing file field");
    Err((
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new("empty_body", "no file provided")),
    )
        .into_response())
}

fn upload_error(e: DecodeError) -> Response {
    let (status, kind) = match &e {
        DecodeError::Empty => (StatusCode::BAD_REQUEST, "empty_body"),
        DecodeError::Image(_) => (StatusCode::UNPROCESSABLE_ENTITY, "decode_error"),
        DecodeError::Task(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
    };
    (status, Json(ErrorResponse::new(kind, e))).into_response()
}
