//! Annotation plans: what to draw on each image, without drawing it.

use crate::matcher::Matches;
use crate::types::{FaceRectangle, FaceSet};
use serde::Serialize;

/// Text shown on a candidate face that no target face claimed.
pub const UNMATCHED_MARK: &str = "?";

pub const TARGET_CAPTION: &str = "Target faces";
pub const CANDIDATE_CAPTION: &str = "Matched faces";

/// One box and the text to put next to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    pub rectangle: FaceRectangle,
    pub text: String,
    /// Match confidence, for candidate faces that were claimed.
    pub confidence: Option<f32>,
}

/// Everything to draw on one image.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImagePlan {
    pub caption: String,
    pub annotations: Vec<Annotation>,
    /// `"<label>: <confidence>"` per matched face, comma separated; `None`
    /// when nothing matched.
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotationPlans {
    pub target: ImagePlan,
    pub candidate: ImagePlan,
}

/// Label every face of a single image with its own position.
pub fn label_faces(faces: &FaceSet, caption: impl Into<String>) -> ImagePlan {
    ImagePlan {
        caption: caption.into(),
        annotations: faces
            .labeled()
            .map(|(label, face)| Annotation {
                rectangle: face.rectangle,
                text: label.to_string(),
                confidence: None,
            })
            .collect(),
        summary: None,
    }
}

/// Plan both images of a similarity run.
///
/// Target faces carry their own label. A claimed candidate face carries the
/// label of the target face that claimed it; an unclaimed one gets `?`.
pub fn render_annotations(
    target: &FaceSet,
    candidates: &FaceSet,
    matches: &Matches,
) -> AnnotationPlans {
    let mut summary = Vec::new();
    let annotations = candidates
        .faces()
        .iter()
        .map(|face| match matches.get(&face.face_id) {
            Some(m) => {
                summary.push(format!("{}: {:.2}", m.target_label, m.confidence));
                Annotation {
                    rectangle: face.rectangle,
                    text: m.target_label.to_string(),
                    confidence: Some(m.confidence),
                }
            }
            None => Annotation {
                rectangle: face.rectangle,
                text: UNMATCHED_MARK.to_string(),
                confidence: None,
            },
        })
        .collect();

    AnnotationPlans {
        target: label_faces(target, TARGET_CAPTION),
        candidate: ImagePlan {
            caption: CANDIDATE_CAPTION.to_string(),
            annotations,
            summary: (!summary.is_empty()).then(|| summary.join(", ")),
        },
    }
}
