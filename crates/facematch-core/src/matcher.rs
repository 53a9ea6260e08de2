//! Greedy best-match assignment between a target and a candidate face set.
//!
//! Each target face, in label order, asks the similarity oracle which
//! candidates resemble it and claims its highest-confidence answer. A later
//! target takes over a claimed candidate only with a strictly higher
//! confidence. The earlier target is not offered its second choice, so the
//! result is not a globally optimal assignment.

use crate::types::{FaceSet, Match, SimilarCandidate};
use std::collections::BTreeMap;
use thiserror::Error;

/// Candidate face id → the target face that claimed it.
pub type Matches = BTreeMap<String, Match>;

/// Answers "which of these candidate faces look like this query face".
///
/// Results come back in no particular order; an empty list means nothing
/// was similar enough.
#[allow(async_fn_in_trait)]
pub trait SimilarityOracle {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn find_similar(
        &self,
        face_id: &str,
        candidate_ids: &[String],
    ) -> Result<Vec<SimilarCandidate>, Self::Error>;
}

/// What to do when the oracle fails for one target face.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchPolicy {
    /// Abort the whole operation and drop the partial result.
    #[default]
    FailFast,
    /// Log the failure and carry on with the next target face.
    SkipFailed,
}

#[derive(Error, Debug)]
pub enum MatchError<E: std::error::Error + 'static> {
    #[error("similarity query for face No. {label} failed: {source}")]
    Oracle {
        label: usize,
        #[source]
        source: E,
    },
    #[error("similarity query for face No. {label} returned unknown face id {face_id}")]
    UnknownCandidate { label: usize, face_id: String },
}

/// Match every target face against the candidates, failing fast.
pub async fn match_faces<O: SimilarityOracle>(
    target: &FaceSet,
    candidates: &FaceSet,
    oracle: &O,
) -> Result<Matches, MatchError<O::Error>> {
    match_faces_with(target, candidates, oracle, MatchPolicy::FailFast).await
}

/// Match every target face against the candidates under the given policy.
pub async fn match_faces_with<O: SimilarityOracle>(
    target: &FaceSet,
    candidates: &FaceSet,
    oracle: &O,
    policy: MatchPolicy,
) -> Result<Matches, MatchError<O::Error>> {
    let mut matches = Matches::new();
    if candidates.is_empty() {
        return Ok(matches);
    }

    let candidate_ids = candidates.face_ids();

    for (label, query) in target.labeled() {
        tracing::info!(label, face_id = %query.face_id, "matching face");

        let similar = match oracle.find_similar(&query.face_id, &candidate_ids).await {
            Ok(similar) => similar,
            Err(source) => match policy {
                MatchPolicy::FailFast => return Err(MatchError::Oracle { label, source }),
                MatchPolicy::SkipFailed => {
                    tracing::warn!(label, error = %source, "similarity query failed; skipping face");
                    continue;
                }
            },
        };

        let Some(best) = best_candidate(&similar) else {
            tracing::debug!(label, "no similar face");
            continue;
        };

        if candidates.label_of(&best.face_id).is_none() {
            return Err(MatchError::UnknownCandidate {
                label,
                face_id: best.face_id.clone(),
            });
        }

        let improves = matches
            .get(&best.face_id)
            .map_or(true, |current| best.confidence > current.confidence);
        if improves {
            tracing::debug!(
                label,
                candidate = %best.face_id,
                confidence = best.confidence,
                "candidate claimed"
            );
            matches.insert(
                best.face_id.clone(),
                Match {
                    target_label: label,
                    target_face_id: query.face_id.clone(),
                    candidate_face_id: best.face_id.clone(),
                    confidence: best.confidence,
                },
            );
        }
    }

    Ok(matches)
}

/// Highest-confidence entry; the first one wins a tie.
fn best_candidate(similar: &[SimilarCandidate]) -> Option<&SimilarCandidate> {
    let mut best: Option<&SimilarCandidate> = None;
    for candidate in similar {
        if best.map_or(true, |b| candidate.confidence > b.confidence) {
            best = Some(candidate);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Face, FaceRectangle};
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Error, Debug)]
    #[error("oracle unavailable")]
    struct OracleDown;

    /// Scripted oracle: fixed answers per query face id, with a call log.
    #[derive(Default)]
    struct StubOracle {
        answers: HashMap<String, Vec<SimilarCandidate>>,
        failing: Vec<String>,
        calls: RefCell<Vec<(String, Vec<String>)>>,
    }

    impl StubOracle {
        fn answer(mut self, face_id: &str, similar: &[(&str, f32)]) -> Self {
            self.answers.insert(
                face_id.to_string(),
                similar.iter().map(|(id, c)| SimilarCandidate::new(*id, *c)).collect(),
            );
            self
        }

        fn fail_on(mut self, face_id: &str) -> Self {
            self.failing.push(face_id.to_string());
            self
        }

        fn call_count(&self) -> usize {
            self.calls.borrow().len()
        }
    }

    impl SimilarityOracle for StubOracle {
        type Error = OracleDown;

        async fn find_similar(
            &self,
            face_id: &str,
            candidate_ids: &[String],
        ) -> Result<Vec<SimilarCandidate>, OracleDown> {
            self.calls
                .borrow_mut()
                .push((face_id.to_string(), candidate_ids.to_vec()));
            if self.failing.iter().any(|f| f == face_id) {
                return Err(OracleDown);
            }
            Ok(self.answers.get(face_id).cloned().unwrap_or_default())
        }
    }

    fn set(ids: &[&str]) -> FaceSet {
        ids.iter()
            .enumerate()
            .map(|(i, id)| Face::new(*id, FaceRectangle::new(i as u32 * 20, 0, 10, 10)))
            .collect::<Vec<_>>()
            .into()
    }

    #[tokio::test]
    async fn test_empty_candidates_skip_oracle() {
        let oracle = StubOracle::default().answer("t0", &[("c0", 0.9)]);
        let matches = match_faces(&set(&["t0", "t1"]), &set(&[]), &oracle).await.unwrap();
        assert!(matches.is_empty());
        assert_eq!(oracle.call_count(), 0);
    }

    #[tokio::test]
    async fn test_all_empty_answers_yield_no_matches() {
        let oracle = StubOracle::default();
        let matches = match_faces(&set(&["t0", "t1", "t2"]), &set(&["c0", "c1"]), &oracle)
            .await
            .unwrap();
        assert!(matches.is_empty());
        assert_eq!(oracle.call_count(), 3);
    }

    #[tokio::test]
    async fn test_queries_in_label_order_with_all_candidate_ids() {
        let oracle = StubOracle::default();
        match_faces(&set(&["t0", "t1"]), &set(&["c0", "c1"]), &oracle)
            .await
            .unwrap();
        let calls = oracle.calls.borrow();
        let expected_ids = vec!["c0".to_string(), "c1".to_string()];
        assert_eq!(calls[0], ("t0".to_string(), expected_ids.clone()));
        assert_eq!(calls[1], ("t1".to_string(), expected_ids));
    }

    #[tokio::test]
    async fn test_repeated_runs_are_identical() {
        let oracle = StubOracle::default()
            .answer("t0", &[("c0", 0.4), ("c1", 0.8)])
            .answer("t1", &[("c1", 0.7), ("c0", 0.6)]);
        let target = set(&["t0", "t1"]);
        let candidates = set(&["c0", "c1"]);
        let first = match_faces(&target, &candidates, &oracle).await.unwrap();
        let second = match_faces(&target, &candidates, &oracle).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_later_higher_confidence_takes_over() {
        let oracle = StubOracle::default()
            .answer("t1", &[("c", 0.6)])
            .answer("t2", &[("c", 0.9)]);
        let matches = match_faces(&set(&["t1", "t2"]), &set(&["c"]), &oracle).await.unwrap();
        let m = &matches["c"];
        assert_eq!(m.target_face_id, "t2");
        assert_eq!(m.target_label, 1);
        assert_eq!(m.confidence, 0.9);
    }

    #[tokio::test]
    async fn test_later_lower_confidence_does_not_take_over() {
        let oracle = StubOracle::default()
            .answer("t1", &[("c", 0.9)])
            .answer("t2", &[("c", 0.6)]);
        let matches = match_faces(&set(&["t1", "t2"]), &set(&["c"]), &oracle).await.unwrap();
        let m = &matches["c"];
        assert_eq!(m.target_face_id, "t1");
        assert_eq!(m.confidence, 0.9);
    }

    #[tokio::test]
    async fn test_equal_confidence_keeps_first_claim() {
        let oracle = StubOracle::default()
            .answer("t1", &[("c", 0.7)])
            .answer("t2", &[("c", 0.7)]);
        let matches = match_faces(&set(&["t1", "t2"]), &set(&["c"]), &oracle).await.unwrap();
        assert_eq!(matches["c"].target_face_id, "t1");
    }

    #[tokio::test]
    async fn test_tie_in_answer_picks_first_returned() {
        let oracle = StubOracle::default().answer("t", &[("c1", 0.8), ("c0", 0.8)]);
        let matches = match_faces(&set(&["t"]), &set(&["c0", "c1"]), &oracle).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert!(matches.contains_key("c1"));
    }

    #[tokio::test]
    async fn test_greedy_is_not_globally_optimal() {
        // t0 prefers c0, then t1 steals c0; t0 is not re-offered c1.
        let oracle = StubOracle::default()
            .answer("t0", &[("c0", 0.8), ("c1", 0.75)])
            .answer("t1", &[("c0", 0.9)]);
        let matches = match_faces(&set(&["t0", "t1"]), &set(&["c0", "c1"]), &oracle)
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches["c0"].target_face_id, "t1");
        assert!(!matches.contains_key("c1"));
    }

    #[tokio::test]
    async fn test_single_target_two_candidates() {
        let oracle = StubOracle::default().answer("A", &[("X", 0.8), ("Y", 0.95)]);
        let matches = match_faces(&set(&["A"]), &set(&["X", "Y"]), &oracle).await.unwrap();
        assert_eq!(matches.len(), 1);
        let m = &matches["Y"];
        assert_eq!(m.target_face_id, "A");
        assert_eq!(m.target_label, 0);
        assert_eq!(m.confidence, 0.95);
    }

    #[tokio::test]
    async fn test_empty_target_makes_no_calls() {
        let oracle = StubOracle::default();
        let matches = match_faces(&set(&[]), &set(&["X"]), &oracle).await.unwrap();
        assert!(matches.is_empty());
        assert_eq!(oracle.call_count(), 0);
    }

    #[tokio::test]
    async fn test_oracle_failure_aborts() {
        let oracle = StubOracle::default()
            .answer("t0", &[("c0", 0.9)])
            .fail_on("t1")
            .answer("t2", &[("c1", 0.9)]);
        let err = match_faces(&set(&["t0", "t1", "t2"]), &set(&["c0", "c1"]), &oracle)
            .await
            .unwrap_err();
        assert!(matches!(err, MatchError::Oracle { label: 1, .. }));
        // Nothing after the failing face is queried.
        assert_eq!(oracle.call_count(), 2);
    }

    #[tokio::test]
    async fn test_skip_failed_policy_continues() {
        let oracle = StubOracle::default()
            .answer("t0", &[("c0", 0.9)])
            .fail_on("t1")
            .answer("t2", &[("c1", 0.8)]);
        let matches = match_faces_with(
            &set(&["t0", "t1", "t2"]),
            &set(&["c0", "c1"]),
            &oracle,
            MatchPolicy::SkipFailed,
        )
        .await
        .unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches["c0"].target_label, 0);
        assert_eq!(matches["c1"].target_label, 2);
    }

    #[tokio::test]
    async fn test_unknown_candidate_is_rejected() {
        let oracle = StubOracle::default().answer("t0", &[("ghost", 0.9)]);
        let err = match_faces(&set(&["t0"]), &set(&["c0"]), &oracle).await.unwrap_err();
        match err {
            MatchError::UnknownCandidate { label, face_id } => {
                assert_eq!(label, 0);
                assert_eq!(face_id, "ghost");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_inputs_untouched() {
        let target = set(&["t0"]);
        let candidates = set(&["c0"]);
        let before = (target.clone(), candidates.clone());
        let oracle = StubOracle::default().answer("t0", &[("c0", 0.5)]);
        match_faces(&target, &candidates, &oracle).await.unwrap();
        assert_eq!((target, candidates), before);
    }
}
