// src/handlers.rs
use actix_multipart::Multipart;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{Error, HttpResponse, web};
use bytes::BytesMut;
use futures_util::TryStreamExt;
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, errors::FitGeniusError, models::*};

#[derive(Debug, Deserialize)]
pub struct StyleRequest {
    pub style: StyleMode,
}

#[derive(Debug, Deserialize)]
pub struct NavigateRequest {
    pub view: ViewState,
}

#[derive(Debug, Deserialize)]
pub struct DataUrlRequest {
    pub image: String,
}

pub async fn list_styles() -> HttpResponse {
    let styles: Vec<_> = StyleMode::ALL
        .iter()
        .map(|style| {
            serde_json::json!({
                "id": style,
                "label": style.label(),
                "name": style.display_name(),
                "icon": style.icon(),
            })
        })
        .collect();

    HttpResponse::Ok().json(serde_json::json!({ "styles": styles }))
}

pub async fn loading_steps() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "steps": LOADING_STEPS }))
}

pub async fn create_session(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Created().json(data.sessions.create().await)
}

pub async fn list_sessions(data: web::Data<AppState>) -> HttpResponse {
    let sessions = data.sessions.list().await;
    HttpResponse::Ok().json(serde_json::json!({
        "count": sessions.len(),
        "sessions": sessions,
    }))
}

pub async fn get_session(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let snapshot = data.sessions.snapshot(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(snapshot))
}

pub async fn delete_session(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    data.sessions.remove(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn start_session(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let id = path.into_inner();
    data.sessions.update(id, |s| s.start()).await??;
    Ok(HttpResponse::Ok().json(data.sessions.snapshot(id).await?))
}

pub async fn navigate(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
    body: web::Json<NavigateRequest>,
) -> Result<HttpResponse, Error> {
    let id = path.into_inner();
    data.sessions.update(id, |s| s.navigate(body.view)).await??;
    Ok(HttpResponse::Ok().json(data.sessions.snapshot(id).await?))
}

pub async fn reset_session(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let id = path.into_inner();
    data.sessions.update(id, |s| s.reset()).await??;
    Ok(HttpResponse::Ok().json(data.sessions.snapshot(id).await?))
}

/// Takes the first file part of the form; the rest is ignored.
pub async fn upload_image(
    path: web::Path<Uuid>,
    mut payload: Multipart,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let id = path.into_inner();

    while let Some(mut field) = payload.try_next().await? {
        if field.content_disposition().get_filename().is_none() {
            while field.try_next().await?.is_some() {}
            continue;
        }
        let content_type = field.content_type().map(|ct| ct.to_string());

        let mut image_data = BytesMut::new();
        while let Some(chunk) = field.try_next().await? {
            image_data.extend_from_slice(&chunk);
        }

        if image_data.is_empty() {
            continue;
        }

        let snapshot = data
            .pipeline
            .submit_file(id, content_type.as_deref(), image_data.to_vec())
            .await?;
        return Ok(HttpResponse::Ok().json(snapshot));
    }

    Err(FitGeniusError::Validation("No file provided".to_string()).into())
}

pub async fn upload_data_url(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
    body: web::Json<DataUrlRequest>,
) -> Result<HttpResponse, Error> {
    let snapshot = data
        .pipeline
        .submit_data_url(path.into_inner(), &body.image)
        .await?;
    Ok(HttpResponse::Ok().json(snapshot))
}

pub async fn select_style(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
    body: web::Json<StyleRequest>,
) -> Result<HttpResponse, Error> {
    let snapshot = data
        .pipeline
        .select_style(path.into_inner(), body.style)
        .await?;
    Ok(HttpResponse::Ok().json(snapshot))
}

pub async fn regenerate(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let snapshot = data.pipeline.regenerate(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(snapshot))
}

async fn current_preview(
    id: Uuid,
    data: &AppState,
) -> Result<GeneratedPreviewImage, FitGeniusError> {
    data.sessions
        .read(id, |s| s.preview.clone())
        .await?
        .ok_or_else(|| FitGeniusError::Validation("No preview has been rendered".to_string()))
}

pub async fn get_preview(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let preview = current_preview(path.into_inner(), &data).await?;
    Ok(HttpResponse::Ok()
        .content_type(preview.image.mime_type.as_str())
        .body(preview.image.data))
}

pub async fn export_preview(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let preview = current_preview(path.into_inner(), &data).await?;
    let filename = preview.download_name();

    Ok(HttpResponse::Ok()
        .content_type(preview.image.mime_type.as_str())
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(filename)],
        })
        .body(preview.image.data))
}
