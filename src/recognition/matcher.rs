use std::collections::BTreeMap;

use derive_more::Display;
use serde::Serialize;
use utoipa::ToSchema;

use super::embedding::Embedding;

/// A stored face template as the matcher sees it.
#[derive(Debug, Clone)]
pub struct StoredTemplate {
    pub template_id: u64,
    pub employee_id: u64,
    pub embedding: Embedding,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct Candidate {
    #[schema(example = 12)]
    pub employee_id: u64,
    /// Closest template of this employee over all rounds.
    #[schema(example = 40)]
    pub template_id: u64,
    /// Mean over rounds of the employee's best template distance.
    #[schema(example = 0.27)]
    pub distance: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema, Display)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    #[display(fmt = "no query embeddings")]
    NoQuery,
    #[display(fmt = "no face templates enrolled")]
    NoTemplates,
    #[display(fmt = "rounds matched different employees")]
    RoundsDisagree,
    #[display(fmt = "best candidate above acceptance threshold")]
    AboveThreshold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema, Display)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    #[display(fmt = "high")]
    High,
    #[display(fmt = "medium")]
    Medium,
    #[display(fmt = "low")]
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchedTemplate {
    pub employee_id: u64,
    pub template_id: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchDecision {
    pub matched: Option<MatchedTemplate>,
    /// Worst per-round distance of the chosen employee, or the best
    /// candidate's distance when rounds disagree.
    pub score: Option<f32>,
    pub confidence: Confidence,
    pub reason: Option<RejectReason>,
    /// Every employee ranked by distance, ascending; ties by employee id.
    pub candidates: Vec<Candidate>,
}

impl MatchDecision {
    fn rejected(reason: RejectReason, score: Option<f32>, candidates: Vec<Candidate>) -> Self {
        Self {
            matched: None,
            score,
            confidence: Confidence::Low,
            reason: Some(reason),
            candidates,
        }
    }

    pub fn is_match(&self) -> bool {
        self.matched.is_some()
    }
}

/// Best template of one employee within a single round.
#[derive(Debug, Clone, Copy)]
struct RoundBest {
    distance: f32,
    template_id: u64,
}

/// Linear-scan nearest-template matcher with a distance acceptance threshold.
///
/// Every round must pick the same employee. The reported score is that
/// employee's worst round, and it must not exceed the threshold.
#[derive(Debug, Clone, Copy)]
pub struct TemplateMatcher {
    threshold: f32,
}

impl TemplateMatcher {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn identify(&self, queries: &[Embedding], templates: &[StoredTemplate]) -> MatchDecision {
        if queries.is_empty() {
            return MatchDecision::rejected(RejectReason::NoQuery, None, Vec::new());
        }
        if templates.is_empty() {
            return MatchDecision::rejected(RejectReason::NoTemplates, None, Vec::new());
        }

        let rounds: Vec<BTreeMap<u64, RoundBest>> = queries
            .iter()
            .map(|query| best_per_employee(query, templates))
            .collect();

        let candidates = rank_candidates(&rounds);

        // BTreeMap iterates by ascending employee id and only a strictly
        // smaller distance replaces the leader, so ties go to the lowest id.
        let winners: Vec<(u64, RoundBest)> = rounds
            .iter()
            .filter_map(|round| {
                round.iter().fold(None, |best: Option<(u64, RoundBest)>, (id, rb)| match best {
                    Some((_, b)) if b.distance <= rb.distance => best,
                    _ => Some((*id, *rb)),
                })
            })
            .collect();

        let Some(&(employee_id, _)) = winners.first() else {
            return MatchDecision::rejected(RejectReason::NoTemplates, None, candidates);
        };

        if winners.iter().any(|(id, _)| *id != employee_id) {
            let score = candidates.first().map(|c| c.distance);
            tracing::debug!(
                winners = ?winners.iter().map(|(id, _)| *id).collect::<Vec<_>>(),
                "rounds disagree on employee"
            );
            return MatchDecision::rejected(RejectReason::RoundsDisagree, score, candidates);
        }

        let score = winners
            .iter()
            .map(|(_, rb)| rb.distance)
            .fold(f32::NEG_INFINITY, f32::max);

        if score > self.threshold {
            return MatchDecision::rejected(RejectReason::AboveThreshold, Some(score), candidates);
        }

        let template_id = winners
            .iter()
            .min_by(|a, b| a.1.distance.total_cmp(&b.1.distance))
            .map(|(_, rb)| rb.template_id)
            .unwrap_or_default();

        let confidence = if score <= self.threshold / 2.0 {
            Confidence::High
        } else {
            Confidence::Medium
        };

        MatchDecision {
            matched: Some(MatchedTemplate {
                employee_id,
                template_id,
            }),
            score: Some(score),
            confidence,
            reason: None,
            candidates,
        }
    }
}

fn best_per_employee(query: &Embedding, templates: &[StoredTemplate]) -> BTreeMap<u64, RoundBest> {
    let mut best: BTreeMap<u64, RoundBest> = BTreeMap::new();
    for t in templates {
        let distance = query.distance(&t.embedding);
        best.entry(t.employee_id)
            .and_modify(|cur| {
                if distance < cur.distance
                    || (distance == cur.distance && t.template_id < cur.template_id)
                {
                    *cur = RoundBest {
                        distance,
                        template_id: t.template_id,
                    };
                }
            })
            .or_insert(RoundBest {
                distance,
                template_id: t.template_id,
            });
    }
    best
}

fn rank_candidates(rounds: &[BTreeMap<u64, RoundBest>]) -> Vec<Candidate> {
    let Some(first) = rounds.first() else {
        return Vec::new();
    };

    let mut candidates: Vec<Candidate> = first
        .keys()
        .map(|employee_id| {
            let per_round: Vec<RoundBest> =
                rounds.iter().filter_map(|r| r.get(employee_id).copied()).collect();
            let mean = per_round.iter().map(|rb| rb.distance).sum::<f32>() / per_round.len() as f32;
            let closest = per_round
                .iter()
                .min_by(|a, b| {
                    a.distance
                        .total_cmp(&b.distance)
                        .then(a.template_id.cmp(&b.template_id))
                })
                .map(|rb| rb.template_id)
                .unwrap_or_default();
            Candidate {
                employee_id: *employee_id,
                template_id: closest,
                distance: mean,
            }
        })
        .collect();

    candidates.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then(a.employee_id.cmp(&b.employee_id))
    });
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::embedding::tests::emb;

    fn template(template_id: u64, employee_id: u64, first: f32) -> StoredTemplate {
        StoredTemplate {
            template_id,
            employee_id,
            embedding: emb(first),
        }
    }

    #[test]
    fn accepts_closest_template_under_threshold_and_lists_all() {
        // query at 0.0: distances are 0.3 and 0.5
        let templates = vec![template(1, 10, 0.3), template(2, 20, 0.5)];
        let d = TemplateMatcher::new(0.4).identify(&[emb(0.0)], &templates);

        assert_eq!(
            d.matched,
            Some(MatchedTemplate {
                employee_id: 10,
                template_id: 1
            })
        );
        assert!((d.score.unwrap() - 0.3).abs() < 1e-6);
        assert_eq!(d.candidates.len(), 2);
        assert_eq!(d.candidates[0].employee_id, 10);
        assert_eq!(d.candidates[1].employee_id, 20);
        assert!((d.candidates[1].distance - 0.5).abs() < 1e-6);
    }

    #[test]
    fn best_above_threshold_is_not_identified() {
        let templates = vec![template(1, 10, 0.45), template(2, 20, 0.8)];
        let d = TemplateMatcher::new(0.4).identify(&[emb(0.0)], &templates);

        assert!(!d.is_match());
        assert_eq!(d.reason, Some(RejectReason::AboveThreshold));
        assert_eq!(d.confidence, Confidence::Low);
        assert!((d.score.unwrap() - 0.45).abs() < 1e-6);
        assert_eq!(d.candidates.len(), 2);
        assert_eq!(d.candidates[0].employee_id, 10);
    }

    #[test]
    fn three_employees_pick_the_closest() {
        let templates = vec![
            template(1, 3, 0.9),
            template(2, 1, 0.41),
            template(3, 2, 0.25),
        ];
        let d = TemplateMatcher::new(0.4).identify(&[emb(0.0)], &templates);

        assert_eq!(d.matched.unwrap().employee_id, 2);
        let order: Vec<u64> = d.candidates.iter().map(|c| c.employee_id).collect();
        assert_eq!(order, vec![2, 1, 3]);
    }

    #[test]
    fn tie_goes_to_lowest_employee_id() {
        // 0.2 and -0.2 are equally far from the query
        let templates = vec![template(1, 9, 0.2), template(2, 4, -0.2)];
        let d = TemplateMatcher::new(0.4).identify(&[emb(0.0), emb(0.0)], &templates);

        assert_eq!(d.matched.unwrap().employee_id, 4);
        assert_eq!(d.candidates[0].employee_id, 4);
    }

    #[test]
    fn uses_best_template_per_employee() {
        let templates = vec![
            template(1, 10, 0.9),
            template(2, 10, 0.1),
            template(3, 20, 0.3),
        ];
        let d = TemplateMatcher::new(0.4).identify(&[emb(0.0)], &templates);

        assert_eq!(
            d.matched,
            Some(MatchedTemplate {
                employee_id: 10,
                template_id: 2
            })
        );
        assert_eq!(d.confidence, Confidence::High);
        assert_eq!(d.candidates.len(), 2);
    }

    #[test]
    fn rounds_must_agree() {
        let templates = vec![template(1, 10, 0.0), template(2, 20, 1.0)];
        // round one is closest to 10, round two closest to 20
        let d = TemplateMatcher::new(0.4).identify(&[emb(0.1), emb(0.9)], &templates);

        assert!(!d.is_match());
        assert_eq!(d.reason, Some(RejectReason::RoundsDisagree));
        assert_eq!(d.candidates.len(), 2);
    }

    #[test]
    fn score_is_worst_agreeing_round() {
        let templates = vec![template(1, 10, 0.0), template(2, 20, 1.0)];
        let d = TemplateMatcher::new(0.4).identify(&[emb(0.1), emb(0.35)], &templates);

        assert_eq!(d.matched.unwrap().employee_id, 10);
        assert!((d.score.unwrap() - 0.35).abs() < 1e-6);
        assert_eq!(d.confidence, Confidence::Medium);
        // mean of the two rounds
        assert!((d.candidates[0].distance - 0.225).abs() < 1e-6);
    }

    #[test]
    fn agreeing_rounds_still_need_every_round_under_threshold() {
        let templates = vec![template(1, 10, 0.0), template(2, 20, 2.0)];
        let d = TemplateMatcher::new(0.4).identify(&[emb(0.1), emb(0.6)], &templates);

        assert_eq!(d.reason, Some(RejectReason::AboveThreshold));
        assert!((d.score.unwrap() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn threshold_is_inclusive() {
        let templates = vec![template(1, 10, 0.5)];
        let d = TemplateMatcher::new(0.5).identify(&[emb(0.0)], &templates);
        assert!(d.is_match());
    }

    #[test]
    fn empty_inputs_are_rejected_without_panicking() {
        let m = TemplateMatcher::new(0.4);
        let d = m.identify(&[emb(0.0)], &[]);
        assert_eq!(d.reason, Some(RejectReason::NoTemplates));
        assert!(d.candidates.is_empty());

        let d = m.identify(&[], &[template(1, 10, 0.0)]);
        assert_eq!(d.reason, Some(RejectReason::NoQuery));
    }
}
