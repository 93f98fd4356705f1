// src/services/pipeline.rs
use std::sync::Arc;

use log::{info, warn};
use uuid::Uuid;

use crate::errors::FitGeniusError;
use crate::models::{EncodedImage, StyleMode, ViewState};
use crate::services::{ImageProcessor, SessionStore, StylistService};
use crate::session::SessionSnapshot;

/// Drives a session through ingestion and the three model stages.
///
/// Session state is locked only to capture inputs and to apply results, so a
/// slow model call never blocks other requests. Each stage result carries the
/// ticket it was issued under and is dropped if the session moved on.
pub struct StylingPipeline {
    sessions: Arc<SessionStore>,
    stylist: Arc<StylistService>,
    image_processor: Arc<ImageProcessor>,
}

impl StylingPipeline {
    pub fn new(
        sessions: Arc<SessionStore>,
        stylist: Arc<StylistService>,
        image_processor: Arc<ImageProcessor>,
    ) -> Self {
        Self {
            sessions,
            stylist,
            image_processor,
        }
    }

    /// Ingests an uploaded file. Non-image input leaves the session untouched.
    pub async fn submit_file(
        &self,
        id: Uuid,
        content_type: Option<&str>,
        data: Vec<u8>,
    ) -> Result<SessionSnapshot, FitGeniusError> {
        match self.image_processor.ingest(content_type, data)? {
            Some(image) => self.analyze(id, image).await,
            None => {
                info!("Session {}: ignoring non-image upload ({:?})", id, content_type);
                self.sessions.snapshot(id).await
            }
        }
    }

    pub async fn submit_data_url(
        &self,
        id: Uuid,
        data_url: &str,
    ) -> Result<SessionSnapshot, FitGeniusError> {
        match self.image_processor.ingest_data_url(data_url)? {
            Some(image) => self.analyze(id, image).await,
            None => {
                info!("Session {}: ignoring non-image data URL", id);
                self.sessions.snapshot(id).await
            }
        }
    }

    async fn analyze(&self, id: Uuid, image: EncodedImage) -> Result<SessionSnapshot, FitGeniusError> {
        let ticket = self
            .sessions
            .update(id, |s| s.accept_image(image.clone()))
            .await??;

        info!("Session {}: analyzing {} ({} bytes)", id, image.mime_type, image.data.len());
        let result = self.stylist.analyze_user_image(&image).await;

        let applied = self
            .sessions
            .update(id, |s| s.complete_analysis(ticket, &result))
            .await?;

        match result {
            Err(e) if applied => {
                warn!("Session {}: analysis failed: {}", id, e);
                Err(e)
            }
            Ok(_) if applied => self.open_results(id).await,
            _ => self.sessions.snapshot(id).await,
        }
    }

    /// Results opens on an Office outfit. If that fails the error stays on the
    /// session and the upload itself still succeeds.
    async fn open_results(&self, id: Uuid) -> Result<SessionSnapshot, FitGeniusError> {
        let on_results = self
            .sessions
            .read(id, |s| s.view == ViewState::Results && s.recommendation.is_none())
            .await?;
        if !on_results {
            return self.sessions.snapshot(id).await;
        }

        match self.select_style(id, StyleMode::default()).await {
            Ok(snapshot) => Ok(snapshot),
            Err(e) => {
                warn!("Session {}: initial outfit not generated: {}", id, e);
                self.sessions.snapshot(id).await
            }
        }
    }

    /// Stages two and three for `style`. A render failure still returns the outfit.
    pub async fn select_style(
        &self,
        id: Uuid,
        style: StyleMode,
    ) -> Result<SessionSnapshot, FitGeniusError> {
        let job = self
            .sessions
            .update(id, |s| s.begin_regenerate(style))
            .await??;

        info!("Session {}: generating {} outfit", id, style.label());
        let recommendation = self
            .stylist
            .generate_outfit_recommendation(&job.analysis, job.style)
            .await;

        let applied = self
            .sessions
            .update(id, |s| s.complete_recommendation(job.ticket, &recommendation))
            .await?;

        let recommendation = match recommendation {
            Ok(recommendation) if applied => recommendation,
            Err(e) if applied => {
                warn!("Session {}: outfit generation failed: {}", id, e);
                return Err(e);
            }
            _ => return self.sessions.snapshot(id).await,
        };

        let preview = self
            .stylist
            .generate_outfit_image(
                &recommendation.visual_prompt,
                Some(job.style),
                job.original.as_ref(),
            )
            .await;

        self.sessions
            .update(id, |s| s.complete_preview(job.ticket, preview))
            .await?;

        self.sessions.snapshot(id).await
    }

    /// Re-runs stages two and three for the active style.
    pub async fn regenerate(&self, id: Uuid) -> Result<SessionSnapshot, FitGeniusError> {
        let style = self.sessions.read(id, |s| s.active_style).await?;
        self.select_style(id, style).await
    }
}
