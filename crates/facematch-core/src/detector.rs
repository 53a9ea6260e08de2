//! Face detection seam. Detection itself runs remotely.

use crate::source::ImageSource;
use crate::types::FaceSet;

/// Per-call detection settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetectOptions {
    /// Ask for age, gender, glasses, emotion and occlusion.
    pub with_attributes: bool,
}

impl DetectOptions {
    pub fn with_attributes() -> Self {
        Self { with_attributes: true }
    }
}

/// Turns an image reference into the faces found in it.
///
/// Finding no face is `Ok` with an empty set.
#[allow(async_fn_in_trait)]
pub trait FaceDetector {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn detect(
        &self,
        source: &ImageSource,
        options: DetectOptions,
    ) -> Result<FaceSet, Self::Error>;
}
