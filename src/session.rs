// src/session.rs
use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;
use uuid::Uuid;

use crate::errors::FitGeniusError;
use crate::models::*;

/// Events that move a session between screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Start,
    ImageAccepted,
    AnalysisSucceeded,
    AnalysisFailed,
    Navigate(ViewState),
    Reset,
}

/// The transition table. `has_analysis` gates direct navigation to Results.
pub fn next_view(
    from: ViewState,
    transition: Transition,
    has_analysis: bool,
) -> Result<ViewState, FitGeniusError> {
    use ViewState::*;

    let to = match (from, transition) {
        (_, Transition::Reset) => Some(Landing),
        (Landing | Uploading, Transition::Start) => Some(Uploading),
        (f, Transition::Start) if f.is_static_page() => Some(Uploading),
        (Uploading, Transition::ImageAccepted) => Some(Analyzing),
        (Analyzing, Transition::AnalysisSucceeded) => Some(Results),
        (Analyzing, Transition::AnalysisFailed) => Some(Uploading),
        (_, Transition::Navigate(Analyzing)) => None,
        (_, Transition::Navigate(Results)) if !has_analysis => None,
        (_, Transition::Navigate(to)) => Some(to),
        _ => None,
    };

    to.ok_or(FitGeniusError::InvalidTransition {
        from,
        to: match transition {
            Transition::Start => Uploading,
            Transition::ImageAccepted => Analyzing,
            Transition::AnalysisSucceeded => Results,
            Transition::AnalysisFailed => Uploading,
            Transition::Navigate(to) => to,
            Transition::Reset => Landing,
        },
    })
}

/// Identifies the pipeline run a stage result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// Inputs captured for one regenerate action.
#[derive(Debug, Clone)]
pub struct RegenerateJob {
    pub ticket: Ticket,
    pub style: StyleMode,
    pub analysis: UserAnalysis,
    pub original: Option<EncodedImage>,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub view: ViewState,
    pub image: Option<EncodedImage>,
    pub analysis: Option<UserAnalysis>,
    pub active_style: StyleMode,
    pub recommendation: Option<OutfitRecommendation>,
    pub preview: Option<GeneratedPreviewImage>,
    pub loading: bool,
    pub image_loading: bool,
    pub last_error: Option<String>,
    generation: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            view: ViewState::Landing,
            image: None,
            analysis: None,
            active_style: StyleMode::default(),
            recommendation: None,
            preview: None,
            loading: false,
            image_loading: false,
            last_error: None,
            generation: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply(&mut self, transition: Transition) -> Result<(), FitGeniusError> {
        self.view = next_view(self.view, transition, self.analysis.is_some())?;
        self.updated_at = Utc::now();
        Ok(())
    }

    fn bump(&mut self) -> Ticket {
        self.generation += 1;
        Ticket(self.generation)
    }

    fn is_current(&self, ticket: Ticket) -> bool {
        if ticket.0 == self.generation {
            true
        } else {
            debug!(
                "Session {}: discarding stale result (ticket {}, current {})",
                self.id, ticket.0, self.generation
            );
            false
        }
    }

    pub fn start(&mut self) -> Result<(), FitGeniusError> {
        self.apply(Transition::Start)
    }

    pub fn navigate(&mut self, view: ViewState) -> Result<(), FitGeniusError> {
        self.apply(Transition::Navigate(view))
    }

    /// Drops every piece of session data and returns to Landing.
    pub fn reset(&mut self) -> Result<(), FitGeniusError> {
        self.apply(Transition::Reset)?;
        self.image = None;
        self.analysis = None;
        self.active_style = StyleMode::default();
        self.recommendation = None;
        self.preview = None;
        self.loading = false;
        self.image_loading = false;
        self.last_error = None;
        self.bump();
        Ok(())
    }

    /// Starts a fresh pipeline run for `image`.
    pub fn accept_image(&mut self, image: EncodedImage) -> Result<Ticket, FitGeniusError> {
        self.apply(Transition::ImageAccepted)?;
        self.image = Some(image);
        self.analysis = None;
        self.recommendation = None;
        self.preview = None;
        self.loading = false;
        self.image_loading = false;
        self.last_error = None;
        Ok(self.bump())
    }

    /// Returns false when the result belongs to a superseded run.
    pub fn complete_analysis(
        &mut self,
        ticket: Ticket,
        result: &Result<UserAnalysis, FitGeniusError>,
    ) -> bool {
        if !self.is_current(ticket) {
            return false;
        }

        let transition = match result {
            Ok(analysis) => {
                self.analysis = Some(analysis.clone());
                Transition::AnalysisSucceeded
            }
            Err(e) => {
                self.image = None;
                self.last_error = Some(e.to_string());
                Transition::AnalysisFailed
            }
        };

        // Only moves the view if the user is still watching the analysis.
        if let Ok(view) = next_view(self.view, transition, self.analysis.is_some()) {
            self.view = view;
        }
        self.updated_at = Utc::now();
        true
    }

    /// Clears the previous outfit and captures the inputs for stages two and three.
    pub fn begin_regenerate(&mut self, style: StyleMode) -> Result<RegenerateJob, FitGeniusError> {
        let analysis = match (&self.analysis, self.view) {
            (Some(analysis), ViewState::Results) => analysis.clone(),
            _ => {
                return Err(FitGeniusError::InvalidTransition {
                    from: self.view,
                    to: ViewState::Results,
                });
            }
        };

        self.active_style = style;
        self.recommendation = None;
        self.preview = None;
        self.loading = true;
        self.image_loading = false;
        self.last_error = None;
        self.updated_at = Utc::now();

        Ok(RegenerateJob {
            ticket: self.bump(),
            style,
            analysis,
            original: self.image.clone(),
        })
    }

    pub fn complete_recommendation(
        &mut self,
        ticket: Ticket,
        result: &Result<OutfitRecommendation, FitGeniusError>,
    ) -> bool {
        if !self.is_current(ticket) {
            return false;
        }

        self.loading = false;
        match result {
            Ok(recommendation) => {
                self.recommendation = Some(recommendation.clone());
                self.image_loading = true;
            }
            Err(e) => {
                self.recommendation = None;
                self.last_error = Some(e.to_string());
            }
        }
        self.updated_at = Utc::now();
        true
    }

    /// A failed render only clears the preview; the outfit text stays.
    pub fn complete_preview(
        &mut self,
        ticket: Ticket,
        result: Result<EncodedImage, FitGeniusError>,
    ) -> bool {
        if !self.is_current(ticket) {
            return false;
        }

        self.image_loading = false;
        self.preview = result
            .ok()
            .map(|image| GeneratedPreviewImage::new(image, self.active_style));
        self.updated_at = Utc::now();
        true
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            view: self.view,
            active_style: self.active_style,
            has_image: self.image.is_some(),
            analysis: self.analysis.clone(),
            recommendation: self.recommendation.clone(),
            has_preview: self.preview.is_some(),
            loading: self.loading,
            image_loading: self.image_loading,
            last_error: self.last_error.clone(),
            generation: self.generation,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// What the presentation layer needs to draw the active screen.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub view: ViewState,
    pub active_style: StyleMode,
    pub has_image: bool,
    pub analysis: Option<UserAnalysis>,
    pub recommendation: Option<OutfitRecommendation>,
    pub has_preview: bool,
    pub loading: bool,
    pub image_loading: bool,
    pub last_error: Option<String>,
    pub generation: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis() -> UserAnalysis {
        UserAnalysis {
            gender: "female".into(),
            body_shape: "Hourglass".into(),
            skin_tone: "Warm Olive".into(),
            detected_colors: vec!["Navy".into(), "Cream".into()],
            vibe: "Classic".into(),
        }
    }

    fn outfit(prompt: &str) -> OutfitRecommendation {
        OutfitRecommendation {
            style_name: "Look".into(),
            description: "desc".into(),
            items: vec![],
            color_palette: vec![],
            visual_prompt: prompt.into(),
        }
    }

    fn on_results() -> Session {
        let mut session = Session::new();
        session.start().unwrap();
        let ticket = session
            .accept_image(EncodedImage::new("image/png", vec![1]))
            .unwrap();
        assert!(session.complete_analysis(ticket, &Ok(analysis())));
        session
    }

    #[test]
    fn transition_table() {
        use ViewState::*;

        assert_eq!(next_view(Landing, Transition::Start, false).unwrap(), Uploading);
        assert_eq!(next_view(Contact, Transition::Start, false).unwrap(), Uploading);
        assert_eq!(next_view(Uploading, Transition::ImageAccepted, false).unwrap(), Analyzing);
        assert_eq!(next_view(Analyzing, Transition::AnalysisSucceeded, true).unwrap(), Results);
        assert_eq!(next_view(Analyzing, Transition::AnalysisFailed, false).unwrap(), Uploading);
        assert_eq!(next_view(Results, Transition::Reset, true).unwrap(), Landing);
        assert_eq!(next_view(Analyzing, Transition::Navigate(Auth), false).unwrap(), Auth);

        assert!(next_view(Landing, Transition::ImageAccepted, false).is_err());
        assert!(next_view(Pricing, Transition::AnalysisSucceeded, true).is_err());
        assert!(next_view(Results, Transition::Start, true).is_err());
    }

    #[test]
    fn happy_path_reaches_results() {
        let session = on_results();
        assert_eq!(session.view, ViewState::Results);
        assert_eq!(session.analysis, Some(analysis()));
    }

    #[test]
    fn analysis_failure_returns_to_uploading() {
        let mut session = Session::new();
        session.start().unwrap();
        let ticket = session
            .accept_image(EncodedImage::new("image/png", vec![1]))
            .unwrap();
        session.complete_analysis(ticket, &Err(FitGeniusError::Analysis("blurry".into())));

        assert_eq!(session.view, ViewState::Uploading);
        assert!(session.analysis.is_none());
        assert!(session.image.is_none());
        assert!(session.last_error.as_deref().unwrap().contains("blurry"));
    }

    #[test]
    fn images_are_only_accepted_while_uploading() {
        let mut session = Session::new();
        let err = session
            .accept_image(EncodedImage::new("image/png", vec![1]))
            .unwrap_err();
        assert!(matches!(err, FitGeniusError::InvalidTransition { .. }));
    }

    #[test]
    fn static_pages_preserve_session_data() {
        let mut session = on_results();
        session.navigate(ViewState::Pricing).unwrap();
        assert_eq!(session.view, ViewState::Pricing);
        assert!(session.analysis.is_some());
        assert!(session.image.is_some());

        session.navigate(ViewState::Results).unwrap();
        assert_eq!(session.view, ViewState::Results);
    }

    #[test]
    fn results_and_analyzing_are_guarded() {
        let mut session = Session::new();
        assert!(session.navigate(ViewState::Results).is_err());
        assert!(session.navigate(ViewState::Analyzing).is_err());
        assert!(session.navigate(ViewState::Blog).is_ok());
        assert!(session.start().is_ok());
        assert_eq!(session.view, ViewState::Uploading);
    }

    #[test]
    fn results_does_not_restart_on_its_own() {
        let mut session = on_results();
        assert!(session.start().is_err());
        assert_eq!(session.view, ViewState::Results);
    }

    #[test]
    fn analysis_finishing_off_screen_keeps_the_current_page() {
        let mut session = Session::new();
        session.start().unwrap();
        let ticket = session
            .accept_image(EncodedImage::new("image/png", vec![1]))
            .unwrap();
        session.navigate(ViewState::About).unwrap();

        assert!(session.complete_analysis(ticket, &Ok(analysis())));
        assert_eq!(session.view, ViewState::About);
        assert!(session.navigate(ViewState::Results).is_ok());
    }

    #[test]
    fn reset_clears_everything() {
        let mut session = on_results();
        let job = session.begin_regenerate(StyleMode::Gym).unwrap();
        session.complete_recommendation(job.ticket, &Ok(outfit("gym fit")));
        session.complete_preview(job.ticket, Ok(EncodedImage::new("image/png", vec![2])));
        assert!(session.preview.is_some());

        session.reset().unwrap();
        assert_eq!(session.view, ViewState::Landing);
        assert!(session.image.is_none());
        assert!(session.analysis.is_none());
        assert!(session.recommendation.is_none());
        assert!(session.preview.is_none());
        assert_eq!(session.active_style, StyleMode::Office);
    }

    #[test]
    fn reset_is_accepted_from_every_screen() {
        let mut analyzing = Session::new();
        analyzing.start().unwrap();
        analyzing
            .accept_image(EncodedImage::new("image/png", vec![1]))
            .unwrap();
        assert!(analyzing.reset().is_ok());
        assert_eq!(analyzing.view, ViewState::Landing);

        let mut pricing = Session::new();
        pricing.navigate(ViewState::Pricing).unwrap();
        let before = pricing.updated_at;
        assert!(pricing.reset().is_ok());
        assert_eq!(pricing.view, ViewState::Landing);
        assert!(pricing.updated_at >= before);
    }

    #[test]
    fn results_arriving_after_reset_are_dropped() {
        let mut session = Session::new();
        session.start().unwrap();
        let ticket = session
            .accept_image(EncodedImage::new("image/png", vec![1]))
            .unwrap();
        session.reset().unwrap();

        assert!(!session.complete_analysis(ticket, &Ok(analysis())));
        assert!(session.analysis.is_none());
        assert_eq!(session.view, ViewState::Landing);
    }

    #[test]
    fn stale_recommendation_never_overwrites_newer_one() {
        let mut session = on_results();
        let first = session.begin_regenerate(StyleMode::Office).unwrap();
        let second = session.begin_regenerate(StyleMode::Party).unwrap();

        assert!(session.complete_recommendation(second.ticket, &Ok(outfit("party"))));
        assert!(!session.complete_recommendation(first.ticket, &Ok(outfit("office"))));
        assert!(!session.complete_preview(first.ticket, Ok(EncodedImage::new("image/png", vec![0]))));

        assert_eq!(session.recommendation.as_ref().unwrap().visual_prompt, "party");
        assert!(session.preview.is_none());
        assert_eq!(session.active_style, StyleMode::Party);
    }

    #[test]
    fn preview_failure_keeps_outfit_text() {
        let mut session = on_results();
        let job = session.begin_regenerate(StyleMode::Summer).unwrap();
        session.complete_recommendation(job.ticket, &Ok(outfit("linen")));
        assert!(session.image_loading);

        session.complete_preview(job.ticket, Err(FitGeniusError::Synthesis("none".into())));
        assert!(!session.image_loading);
        assert!(session.preview.is_none());
        assert_eq!(session.recommendation.as_ref().unwrap().visual_prompt, "linen");
    }

    #[test]
    fn generation_failure_leaves_empty_results() {
        let mut session = on_results();
        let job = session.begin_regenerate(StyleMode::Wedding).unwrap();
        session.complete_recommendation(job.ticket, &Err(FitGeniusError::Generation("x".into())));

        assert_eq!(session.view, ViewState::Results);
        assert!(!session.loading);
        assert!(session.recommendation.is_none());
        assert!(session.last_error.is_some());
    }

    #[test]
    fn regenerate_requires_results() {
        let mut session = Session::new();
        assert!(session.begin_regenerate(StyleMode::Party).is_err());
    }
}
