//! Interaction state machine.
//!
//! `Session` owns the per-session mutable state and is the only thing that
//! mutates it. User actions spawn at most one asynchronous operation at a
//! time (image load xor classification); completions come back as
//! `SessionEvent`s and are applied through [`Session::apply`].
//!
//! A monotonic generation counter guards against stale completions: every
//! `select_image` and `reset` bumps it, and any event tagged with an older
//! generation is discarded instead of applied.

use crate::classifier::Classifier;
use crate::model::{ClassifyOutcome, Phase, Preview, SelectedImage, SessionEvent};
use crate::preview;
use crate::recipes::RecipeBook;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no image selected; choose a photo first")]
    NoImageSelected,
    #[error("another operation is still in progress")]
    Busy,
    #[error("nothing identified yet")]
    NoResult,
    #[error("Recipe not available for this dish")]
    RecipeNotAvailable,
}

/// The session's mutable state. All fields start at their defaults and
/// return to them on reset.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub phase: Phase,
    pub selected_image: Option<SelectedImage>,
    pub preview: Option<Preview>,
    pub prediction_label: Option<String>,
    pub confidence_score: Option<f64>,
    pub busy: bool,
    pub recipe_expanded: bool,
}

pub struct Session {
    state: SessionState,
    generation: u64,
    classifier: Arc<dyn Classifier>,
    event_tx: UnboundedSender<SessionEvent>,
}

impl Session {
    pub fn new(classifier: Arc<dyn Classifier>, event_tx: UnboundedSender<SessionEvent>) -> Self {
        Self {
            state: SessionState::default(),
            generation: 0,
            classifier,
            event_tx,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn into_state(self) -> SessionState {
        self.state
    }

    /// Pick a new photo. Valid from any state; supersedes whatever was in
    /// flight, since only the latest selection matters.
    pub fn select_image(&mut self, path: PathBuf) {
        self.generation += 1;
        let generation = self.generation;
        self.state.busy = true;
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let event = match preview::load_preview(&path).await {
                Ok((image, preview)) => SessionEvent::PreviewReady {
                    generation,
                    image,
                    preview,
                },
                Err(e) => SessionEvent::PreviewFailed {
                    generation,
                    reason: format!("{e:#}"),
                },
            };
            let _ = tx.send(event);
        });
    }

    /// Send the selected photo to the classifier. Exactly one request per
    /// call; failures are recovered when the completion is applied.
    pub fn classify(&mut self) -> Result<(), SessionError> {
        if self.state.busy {
            return Err(SessionError::Busy);
        }
        let image = match (&self.state.selected_image, &self.state.preview) {
            (Some(image), Some(_)) => image.clone(),
            _ => return Err(SessionError::NoImageSelected),
        };

        self.state.busy = true;
        self.state.phase = Phase::Classifying;
        let generation = self.generation;
        let classifier = self.classifier.clone();
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let outcome = match classifier.classify(image.bytes, image.file_name).await {
                Ok(c) => ClassifyOutcome::Recognized {
                    label: c.label,
                    confidence: c.confidence,
                },
                Err(e) => ClassifyOutcome::Failed {
                    reason: e.to_string(),
                },
            };
            let _ = tx.send(SessionEvent::ClassificationDone { generation, outcome });
        });
        Ok(())
    }

    /// Show or hide the recipe for the current prediction. Only valid once
    /// a result exists, and only flips when a recipe is actually bundled.
    pub fn toggle_recipe(&mut self, book: &RecipeBook) -> Result<(), SessionError> {
        if !self.state.phase.has_result() {
            return Err(SessionError::NoResult);
        }
        let label = self
            .state
            .prediction_label
            .as_deref()
            .ok_or(SessionError::NoResult)?;
        if book.resolve(label).is_none() {
            return Err(SessionError::RecipeNotAvailable);
        }
        self.state.recipe_expanded = !self.state.recipe_expanded;
        self.state.phase = if self.state.recipe_expanded {
            Phase::ResultedExpanded
        } else {
            Phase::Resulted
        };
        Ok(())
    }

    /// New search: back to defaults. Safe while an operation is in flight;
    /// its completion will carry a stale generation and be discarded.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.state = SessionState::default();
    }

    /// Apply a completion event. Returns a user-visible notice when the
    /// completion carried a failure, `None` otherwise.
    pub fn apply(&mut self, event: SessionEvent) -> Option<String> {
        if event.generation() != self.generation {
            debug!(
                event_generation = event.generation(),
                current_generation = self.generation,
                "discarding stale completion"
            );
            return None;
        }
        match event {
            SessionEvent::PreviewReady { image, preview, .. } => {
                self.state.selected_image = Some(image);
                self.state.preview = Some(preview);
                self.state.prediction_label = None;
                self.state.confidence_score = None;
                self.state.recipe_expanded = false;
                self.state.busy = false;
                self.state.phase = Phase::Previewing;
                None
            }
            SessionEvent::PreviewFailed { reason, .. } => {
                // The selection did not take; keep whatever was shown
                // before. The selection may have superseded an in-flight
                // classify, so settle the phase on what the fields support.
                self.state.busy = false;
                self.state.phase = if self.state.prediction_label.is_some() {
                    if self.state.recipe_expanded {
                        Phase::ResultedExpanded
                    } else {
                        Phase::Resulted
                    }
                } else if self.state.preview.is_some() {
                    Phase::Previewing
                } else {
                    Phase::Idle
                };
                Some(format!("Could not load image: {reason}"))
            }
            SessionEvent::ClassificationDone { outcome, .. } => {
                let notice = match outcome {
                    ClassifyOutcome::Recognized { label, confidence } => {
                        self.state.prediction_label = Some(label);
                        self.state.confidence_score = Some(confidence);
                        None
                    }
                    ClassifyOutcome::Failed { reason } => {
                        self.state.prediction_label = Some("Unknown".to_string());
                        self.state.confidence_score = Some(0.0);
                        Some(format!("Identification failed: {reason}"))
                    }
                };
                self.state.busy = false;
                self.state.phase = Phase::Resulted;
                notice
            }
        }
    }
}
