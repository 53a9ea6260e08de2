//! Face API v1.0 JSON shapes and their conversion into core types.

use facematch_core::{
    Emotion, Face, FaceAttributes, FaceRectangle, Gender, Glasses, Occlusion, SimilarCandidate,
};
use serde::{Deserialize, Serialize};

/// Attributes requested when a detection call asks for them.
pub(crate) const FACE_ATTRIBUTES: &str = "age,gender,glasses,emotion,occlusion";

/// `findsimilars` mode; compares identity rather than appearance.
pub(crate) const FIND_SIMILAR_MODE: &str = "matchPerson";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DetectedFace {
    face_id: String,
    face_rectangle: Rectangle,
    face_attributes: Option<Attributes>,
}

#[derive(Debug, Deserialize)]
struct Rectangle {
    left: u32,
    top: u32,
    width: u32,
    height: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Attributes {
    age: Option<f32>,
    gender: Option<String>,
    glasses: Option<String>,
    emotion: Option<EmotionScores>,
    occlusion: Option<OcclusionFlags>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EmotionScores {
    anger: f32,
    contempt: f32,
    disgust: f32,
    fear: f32,
    happiness: f32,
    neutral: f32,
    sadness: f32,
    surprise: f32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct OcclusionFlags {
    forehead_occluded: bool,
    eye_occluded: bool,
    mouth_occluded: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FindSimilarRequest<'a> {
    pub face_id: &'a str,
    pub face_ids: &'a [String],
    pub max_num_of_candidates_returned: u32,
    pub mode: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SimilarFace {
    face_id: String,
    confidence: f32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

impl From<DetectedFace> for Face {
    fn from(wire: DetectedFace) -> Self {
        let r = wire.face_rectangle;
        Face {
            face_id: wire.face_id,
            rectangle: FaceRectangle::new(r.left, r.top, r.width, r.height),
            attributes: wire.face_attributes.map(FaceAttributes::from),
        }
    }
}

impl From<Attributes> for FaceAttributes {
    fn from(wire: Attributes) -> Self {
        FaceAttributes {
            age: wire.age,
            gender: wire.gender.as_deref().map(parse_gender),
            glasses: wire.glasses.as_deref().and_then(parse_glasses),
            emotion: wire.emotion.map(|e| Emotion {
                anger: e.anger,
                contempt: e.contempt,
                disgust: e.disgust,
                fear: e.fear,
                happiness: e.happiness,
                neutral: e.neutral,
                sadness: e.sadness,
                surprise: e.surprise,
            }),
            occlusion: wire.occlusion.map(|o| Occlusion {
                forehead_occluded: o.forehead_occluded,
                eye_occluded: o.eye_occluded,
                mouth_occluded: o.mouth_occluded,
            }),
        }
    }
}

impl From<SimilarFace> for SimilarCandidate {
    fn from(wire: SimilarFace) -> Self {
        SimilarCandidate::new(wire.face_id, wire.confidence)
    }
}

fn parse_gender(raw: &str) -> Gender {
    match raw.to_ascii_lowercase().as_str() {
        "male" => Gender::Male,
        "female" => Gender::Female,
        _ => Gender::Unknown,
    }
}

fn parse_glasses(raw: &str) -> Option<Glasses> {
    match raw.to_ascii_lowercase().as_str() {
        "noglasses" => Some(Glasses::NoGlasses),
        "readingglasses" => Some(Glasses::ReadingGlasses),
        "sunglasses" => Some(Glasses::Sunglasses),
        "swimminggoggles" => Some(Glasses::SwimmingGoggles),
        other => {
            tracing::debug!(glasses = other, "unrecognised glasses value");
            None
        }
    }
}
