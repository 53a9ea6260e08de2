use serde::{Deserialize, Serialize};
use std::fmt;

/// Axis-aligned face rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceRectangle {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl FaceRectangle {
    pub fn new(left: u32, top: u32, width: u32, height: u32) -> Self {
        Self { left, top, width, height }
    }

    pub fn right(&self) -> u32 {
        self.left.saturating_add(self.width)
    }

    pub fn bottom(&self) -> u32 {
        self.top.saturating_add(self.height)
    }
}

impl fmt::Display for FaceRectangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}x{})", self.left, self.top, self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Unknown,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Unknown => "unknown",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Glasses {
    NoGlasses,
    ReadingGlasses,
    Sunglasses,
    SwimmingGoggles,
}

impl fmt::Display for Glasses {
    /// Same spelling the face service uses on the wire.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Glasses::NoGlasses => "noGlasses",
            Glasses::ReadingGlasses => "readingGlasses",
            Glasses::Sunglasses => "sunglasses",
            Glasses::SwimmingGoggles => "swimmingGoggles",
        })
    }
}

/// Emotion intensities, each in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Emotion {
    pub anger: f32,
    pub contempt: f32,
    pub disgust: f32,
    pub fear: f32,
    pub happiness: f32,
    pub neutral: f32,
    pub sadness: f32,
    pub surprise: f32,
}

impl Emotion {
    /// Field name/intensity pairs in declaration order.
    pub fn scores(&self) -> [(&'static str, f32); 8] {
        [
            ("anger", self.anger),
            ("contempt", self.contempt),
            ("disgust", self.disgust),
            ("fear", self.fear),
            ("happiness", self.happiness),
            ("neutral", self.neutral),
            ("sadness", self.sadness),
            ("surprise", self.surprise),
        ]
    }

    /// Name of the strongest emotion. Ties go to the earlier field.
    pub fn dominant(&self) -> &'static str {
        let scores = self.scores();
        let mut best = scores[0];
        for entry in &scores[1..] {
            if entry.1 > best.1 {
                best = *entry;
            }
        }
        best.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occlusion {
    pub forehead_occluded: bool,
    pub eye_occluded: bool,
    pub mouth_occluded: bool,
}

impl Occlusion {
    /// Names of the occluded regions, in field order.
    pub fn occluded_regions(&self) -> Vec<&'static str> {
        [
            ("forehead_occluded", self.forehead_occluded),
            ("eye_occluded", self.eye_occluded),
            ("mouth_occluded", self.mouth_occluded),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }
}

/// Descriptive attributes returned when the detection call asks for them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceAttributes {
    pub age: Option<f32>,
    pub gender: Option<Gender>,
    pub glasses: Option<Glasses>,
    pub emotion: Option<Emotion>,
    pub occlusion: Option<Occlusion>,
}

/// A face as returned by one detection call.
///
/// `face_id` is only meaningful to the service that issued it, and only
/// for a limited time after detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Face {
    pub face_id: String,
    pub rectangle: FaceRectangle,
    pub attributes: Option<FaceAttributes>,
}

impl Face {
    pub fn new(face_id: impl Into<String>, rectangle: FaceRectangle) -> Self {
        Self {
            face_id: face_id.into(),
            rectangle,
            attributes: None,
        }
    }
}

/// Faces from one detection call, in the order the service returned them.
///
/// A face's position is its label ("Face No. 0", "Face No. 1", ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaceSet {
    faces: Vec<Face>,
}

impl FaceSet {
    pub fn new(faces: Vec<Face>) -> Self {
        Self { faces }
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn get(&self, label: usize) -> Option<&Face> {
        self.faces.get(label)
    }

    /// Faces paired with their labels.
    pub fn labeled(&self) -> impl Iterator<Item = (usize, &Face)> {
        self.faces.iter().enumerate()
    }

    pub fn label_of(&self, face_id: &str) -> Option<usize> {
        self.faces.iter().position(|f| f.face_id == face_id)
    }

    pub fn face_ids(&self) -> Vec<String> {
        self.faces.iter().map(|f| f.face_id.clone()).collect()
    }
}

impl From<Vec<Face>> for FaceSet {
    fn from(faces: Vec<Face>) -> Self {
        Self::new(faces)
    }
}

/// One entry of a similarity query result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarCandidate {
    pub face_id: String,
    /// Similarity confidence in [0, 1].
    pub confidence: f32,
}

impl SimilarCandidate {
    pub fn new(face_id: impl Into<String>, confidence: f32) -> Self {
        Self {
            face_id: face_id.into(),
            confidence,
        }
    }
}

/// A candidate face claimed by a target face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    /// Label of the claiming face within the target set.
    pub target_label: usize,
    pub target_face_id: String,
    pub candidate_face_id: String,
    pub confidence: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(id: &str) -> Face {
        Face::new(id, FaceRectangle::new(0, 0, 10, 10))
    }

    #[test]
    fn test_labels_follow_detection_order() {
        let set = FaceSet::new(vec![face("a"), face("b"), face("c")]);
        assert_eq!(set.label_of("a"), Some(0));
        assert_eq!(set.label_of("b"), Some(1));
        assert_eq!(set.label_of("c"), Some(2));
        assert_eq!(set.label_of("z"), None);
        let labels: Vec<_> = set.labeled().map(|(l, f)| (l, f.face_id.as_str())).collect();
        assert_eq!(labels, vec![(0, "a"), (1, "b"), (2, "c")]);
    }

    #[test]
    fn test_rectangle_edges() {
        let rect = FaceRectangle::new(10, 20, 30, 40);
        assert_eq!(rect.right(), 40);
        assert_eq!(rect.bottom(), 60);
        assert_eq!(rect.to_string(), "(10, 20, 30x40)");
    }

    #[test]
    fn test_dominant_emotion() {
        let emotion = Emotion { happiness: 0.7, neutral: 0.3, ..Default::default() };
        assert_eq!(emotion.dominant(), "happiness");
    }

    #[test]
    fn test_dominant_emotion_tie_prefers_first_field() {
        let emotion = Emotion { fear: 0.5, surprise: 0.5, ..Default::default() };
        assert_eq!(emotion.dominant(), "fear");
        assert_eq!(Emotion::default().dominant(), "anger");
    }

    #[test]
    fn test_occluded_regions() {
        let occlusion = Occlusion { forehead_occluded: true, mouth_occluded: true, ..Default::default() };
        assert_eq!(occlusion.occluded_regions(), vec!["forehead_occluded", "mouth_occluded"]);
        assert!(Occlusion::default().occluded_regions().is_empty());
    }

    #[test]
    fn test_face_set_serializes_as_array() {
        let set = FaceSet::new(vec![face("a")]);
        let json = serde_json::to_value(&set).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["face_id"], "a");
    }
}
