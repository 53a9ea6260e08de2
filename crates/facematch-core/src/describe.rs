//! Human-readable reports for detection and similarity results.

use crate::matcher::Matches;
use crate::types::{Emotion, Face, FaceSet, Glasses, Occlusion};
use std::fmt::Write;

pub fn interpret_glasses(glasses: Glasses) -> String {
    match glasses {
        Glasses::NoGlasses => "No glasses".to_string(),
        other => format!("Glasses: {other}"),
    }
}

pub fn interpret_emotion(emotion: &Emotion) -> String {
    format!("Emotion: {}", emotion.dominant())
}

pub fn interpret_occlusion(occlusion: &Occlusion) -> String {
    let regions = occlusion.occluded_regions();
    if regions.is_empty() {
        "No occlusion".to_string()
    } else {
        format!("Occlusion: {}", regions.join(", "))
    }
}

/// Report block for one detected face.
pub fn describe_face(label: usize, face: &Face) -> String {
    let mut out = format!("    Face No. {label}:\n");
    let Some(attrs) = &face.attributes else {
        let _ = writeln!(out, "        Location: {}", face.rectangle);
        return out;
    };

    let age = attrs.age.map_or_else(|| "unknown".to_string(), |a| format!("{a}"));
    let gender = attrs.gender.map_or_else(|| "unknown".to_string(), |g| g.to_string());
    let glasses = attrs
        .glasses
        .map_or_else(|| "Glasses: unknown".to_string(), interpret_glasses);
    let emotion = attrs
        .emotion
        .as_ref()
        .map_or_else(|| "Emotion: unknown".to_string(), interpret_emotion);
    let occlusion = attrs
        .occlusion
        .as_ref()
        .map_or_else(|| "Occlusion: unknown".to_string(), interpret_occlusion);

    let _ = writeln!(out, "        Age: {age}");
    let _ = writeln!(out, "        Gender: {gender}");
    let _ = writeln!(out, "        {glasses}");
    let _ = writeln!(out, "        {emotion}");
    let _ = writeln!(out, "        {occlusion}");
    out
}

/// Report for every face of one image.
pub fn describe_detection(faces: &FaceSet) -> String {
    if faces.is_empty() {
        return "    No faces found!\n".to_string();
    }
    faces
        .labeled()
        .map(|(label, face)| describe_face(label, face))
        .collect()
}

/// One line per candidate face: which target claimed it, if any.
pub fn describe_matches(candidates: &FaceSet, matches: &Matches) -> String {
    let mut out = String::new();
    for (label, face) in candidates.labeled() {
        let _ = match matches.get(&face.face_id) {
            Some(m) => writeln!(
                out,
                "    Candidate face {label} at {} matches target face No. {} (confidence {:.2})",
                face.rectangle, m.target_label, m.confidence
            ),
            None => writeln!(out, "    Candidate face {label} at {}: no match", face.rectangle),
        };
    }
    out
}
