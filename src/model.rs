use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Classifier endpoint configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub user_agent: String,
    /// No timeout unless the user opts in; a slow classifier is treated
    /// the same as a fast one.
    pub request_timeout: Option<Duration>,
}

/// Where the session currently is in the identify flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// No image selected.
    #[default]
    Idle,
    /// Image loaded and previewable, not yet classified.
    Previewing,
    /// Classification request in flight.
    Classifying,
    /// Prediction available, recipe collapsed.
    Resulted,
    /// Prediction available, recipe shown.
    ResultedExpanded,
}

impl Phase {
    /// Whether a classification attempt has completed (success or failure).
    pub fn has_result(self) -> bool {
        matches!(self, Phase::Resulted | Phase::ResultedExpanded)
    }
}

/// The image payload chosen by the user, shared with the upload task.
#[derive(Debug, Clone)]
pub struct SelectedImage {
    pub file_name: String,
    pub bytes: Bytes,
}

/// Locally renderable representation of the selected image.
#[derive(Debug, Clone)]
pub struct Preview {
    pub data_uri: String,
    pub width: u32,
    pub height: u32,
    pub mime: &'static str,
}

/// A parsed classifier verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    pub confidence: f64,
}

/// How a single classification attempt ended.
#[derive(Debug, Clone)]
pub enum ClassifyOutcome {
    Recognized { label: String, confidence: f64 },
    Failed { reason: String },
}

/// Completion events delivered back to the session by its spawned tasks.
///
/// Every event carries the generation it was spawned under so the session
/// can discard completions superseded by a newer selection or a reset.
#[derive(Debug)]
pub enum SessionEvent {
    PreviewReady {
        generation: u64,
        image: SelectedImage,
        preview: Preview,
    },
    PreviewFailed {
        generation: u64,
        reason: String,
    },
    ClassificationDone {
        generation: u64,
        outcome: ClassifyOutcome,
    },
}

impl SessionEvent {
    pub fn generation(&self) -> u64 {
        match self {
            SessionEvent::PreviewReady { generation, .. }
            | SessionEvent::PreviewFailed { generation, .. }
            | SessionEvent::ClassificationDone { generation, .. } => *generation,
        }
    }
}

/// One recipe from the bundled dataset, keyed by exact dish label.
///
/// Field names stay camelCase to match the dataset format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeRecord {
    pub cook_time: String,
    pub servings: u32,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
}

/// Final output of a one-shot identify run, for `--json` mode.
#[derive(Debug, Clone, Serialize)]
pub struct IdentifyResult {
    pub label: String,
    pub confidence: f64,
    pub recipe: Option<RecipeRecord>,
}
