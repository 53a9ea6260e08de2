//! Detection and similarity flows behind the CLI subcommands.

use crate::files::list_files;
use crate::render::{self, Renderer};
use anyhow::{bail, Context as _, Result};
use facematch_client::FaceClient;
use facematch_core::annotate::label_faces;
use facematch_core::describe::{describe_detection, describe_matches};
use facematch_core::{
    match_faces_with, render_annotations, AnnotationPlans, DetectOptions, FaceDetector, FaceSet,
    ImageSource, MatchPolicy, Matches,
};
use serde::Serialize;
use std::path::PathBuf;

/// Where annotated images go, and how they are drawn.
pub struct Output {
    pub dir: PathBuf,
    pub renderer: Renderer,
}

pub struct Context {
    pub client: FaceClient,
    pub output: Option<Output>,
    pub json: bool,
    pub policy: MatchPolicy,
}

#[derive(Debug, Serialize)]
pub struct DetectionReport {
    pub source: String,
    pub faces: FaceSet,
}

/// One failed image of a directory run.
#[derive(Debug, Serialize)]
pub struct Failure {
    pub source: String,
    pub error: String,
}

/// Result of `detect`: one report for a single image, or every image of a
/// directory with the ones that failed.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Detection {
    Single(DetectionReport),
    Batch {
        images: Vec<DetectionReport>,
        failures: Vec<Failure>,
    },
}

impl Detection {
    /// Fail if any image of a batch failed.
    pub fn check(&self) -> Result<()> {
        if let Detection::Batch { images, failures } = self {
            if !failures.is_empty() {
                let total = images.len() + failures.len();
                bail!("{} of {total} images failed", failures.len());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct SimilarityReport {
    pub target: String,
    pub candidate: String,
    pub target_faces: FaceSet,
    pub candidate_faces: FaceSet,
    pub matches: Matches,
    pub annotations: AnnotationPlans,
}

#[derive(Serialize)]
struct DemoReport<'a> {
    detection: Option<&'a Detection>,
    similarity: Option<&'a SimilarityReport>,
    errors: &'a [String],
}

pub async fn run_detect(ctx: &Context, reference: &str) -> Result<()> {
    let detection = detect(ctx, reference).await?;
    if ctx.json {
        print_json(&detection)?;
    }
    detection.check()
}

pub async fn run_similar(ctx: &Context, target: &str, candidate: &str) -> Result<()> {
    let report = similar(ctx, target, candidate).await?;
    if ctx.json {
        print_json(&report)?;
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Detect faces in one image, or in every file directly inside a directory.
///
/// A failing image in a directory run is reported and skipped; see
/// [`Detection::check`].
pub async fn detect(ctx: &Context, reference: &str) -> Result<Detection> {
    let source = ImageSource::parse(reference);
    let dir = source.as_path().filter(|p| p.is_dir()).map(|p| p.to_path_buf());

    let Some(dir) = dir else {
        return Ok(Detection::Single(detect_one(ctx, &source).await?));
    };

    let files = list_files(&dir, Some(0))
        .with_context(|| format!("cannot list {}", dir.display()))?;
    let mut images = Vec::new();
    let mut failures = Vec::new();
    for path in files {
        let source = ImageSource::File(path);
        match detect_one(ctx, &source).await {
            Ok(report) => images.push(report),
            Err(err) => {
                tracing::error!(source = %source, error = %err, "detection failed");
                eprintln!("    Failed: {source}: {err:#}");
                failures.push(Failure { source: source.to_string(), error: format!("{err:#}") });
            }
        }
    }
    Ok(Detection::Batch { images, failures })
}

async fn detect_one(ctx: &Context, source: &ImageSource) -> Result<DetectionReport> {
    if !ctx.json {
        println!("\nDetecting faces in photo:\n  {source}");
    }
    let faces = ctx.client.detect(source, DetectOptions::with_attributes()).await?;
    if !ctx.json {
        print!("{}", describe_detection(&faces));
    }

    if let Some(output) = &ctx.output {
        let mut image = load_image(ctx, source).await?;
        output.renderer.annotate(&mut image, &label_faces(&faces, "Detected faces"));
        let path = output.dir.join(format!("{}-faces.png", source.stem()));
        render::save_png(&image, &path)?;
        if !ctx.json {
            println!("    Saved {}", path.display());
        }
    }
    Ok(DetectionReport { source: source.to_string(), faces })
}

/// Find the target image's faces in the candidate image.
///
/// When either image has no faces the oracle is not asked and the report
/// carries no matches.
pub async fn similar(ctx: &Context, target: &str, candidate: &str) -> Result<SimilarityReport> {
    let target = ImageSource::parse(target);
    let candidate = ImageSource::parse(candidate);
    for source in [&target, &candidate] {
        if source.as_path().is_some_and(|p| p.is_dir()) {
            bail!("Only one photo allowed!");
        }
    }

    if !ctx.json {
        println!("\nDetecting faces in the target photo:\n  {target}");
    }
    let target_faces = ctx.client.detect(&target, DetectOptions::default()).await?;
    if !ctx.json {
        println!("\nDetecting faces in the candidate photo:\n  {candidate}");
    }
    let candidate_faces = ctx.client.detect(&candidate, DetectOptions::default()).await?;

    let no_faces = target_faces.is_empty() || candidate_faces.is_empty();
    let matches = if no_faces {
        if !ctx.json {
            println!("No faces found!");
        }
        Matches::new()
    } else {
        match_faces_with(&target_faces, &candidate_faces, &ctx.client, ctx.policy).await?
    };
    let annotations = render_annotations(&target_faces, &candidate_faces, &matches);
    tracing::info!(
        targets = target_faces.len(),
        candidates = candidate_faces.len(),
        matched = matches.len(),
        "matching finished"
    );

    if !no_faces && !ctx.json {
        println!("\nMatching results:");
        print!("{}", describe_matches(&candidate_faces, &matches));
    }

    if let (false, Some(output)) = (no_faces, &ctx.output) {
        let left = load_image(ctx, &target).await?;
        let right = load_image(ctx, &candidate).await?;
        let canvas = output
            .renderer
            .side_by_side(left, &annotations.target, right, &annotations.candidate);
        let path = output
            .dir
            .join(format!("{}-vs-{}.png", target.stem(), candidate.stem()));
        render::save_png(&canvas, &path)?;
        if !ctx.json {
            println!("    Saved {}", path.display());
        }
    }

    Ok(SimilarityReport {
        target: target.to_string(),
        candidate: candidate.to_string(),
        target_faces,
        candidate_faces,
        matches,
        annotations,
    })
}

/// Detection over a directory, then one similarity pair.
///
/// Each step fails on its own; a failure is reported and the next step runs.
pub async fn demo(ctx: &Context, detect_dir: &str, target: &str, candidate: &str) -> Result<()> {
    if !ctx.json {
        println!(
            "=============\nFace Services\n=============\n\n\
             A demo of the pre-built face models of a cloud face service: images are\n\
             analysed remotely and the results annotated locally.\n"
        );
    }

    let mut errors = Vec::new();
    let detection = match detect(ctx, detect_dir).await {
        Ok(detection) => {
            if let Err(err) = detection.check() {
                errors.push(format!("Face detection failed: {err:#}"));
            }
            Some(detection)
        }
        Err(err) => {
            errors.push(format!("Face detection failed: {err:#}"));
            None
        }
    };
    let similarity = match similar(ctx, target, candidate).await {
        Ok(report) => Some(report),
        Err(err) => {
            errors.push(format!("Face recognition failed: {err:#}"));
            None
        }
    };

    for error in &errors {
        eprintln!("{error}");
    }
    if ctx.json {
        print_json(&DemoReport {
            detection: detection.as_ref(),
            similarity: similarity.as_ref(),
            errors: &errors,
        })?;
    }

    if !errors.is_empty() {
        bail!("{} demo step(s) failed", errors.len());
    }
    Ok(())
}

async fn load_image(ctx: &Context, source: &ImageSource) -> Result<image::RgbImage> {
    let bytes = ctx.client.fetch_image(source).await?;
    render::decode(&bytes).with_context(|| format!("cannot decode image {source}"))
}
