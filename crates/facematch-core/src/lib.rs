//! facematch-core: face matching and annotation planning.
//!
//! Detection and similarity scoring run on a remote face service; this
//! crate holds the data model, the greedy matcher that pairs target faces
//! with candidate faces, and the pure annotation plans handed to renderers.

pub mod annotate;
pub mod describe;
pub mod detector;
pub mod matcher;
pub mod source;
pub mod types;

pub use annotate::{render_annotations, Annotation, AnnotationPlans, ImagePlan};
pub use detector::{DetectOptions, FaceDetector};
pub use matcher::{match_faces, match_faces_with, MatchError, MatchPolicy, Matches, SimilarityOracle};
pub use source::ImageSource;
pub use types::{
    Emotion, Face, FaceAttributes, FaceRectangle, FaceSet, Gender, Glasses, Match, Occlusion,
    SimilarCandidate,
};
