use std::time::Duration;

use async_trait::async_trait;

use super::embedding::{Embedding, EmbeddingError, average_round};

/// Source of raw face descriptors, one per camera frame.
///
/// `None` means the detector found no face in that frame.
#[async_trait]
pub trait FaceSampler: Send {
    async fn sample(&mut self) -> Option<Vec<f32>>;
}

/// Fixed sampling schedule used by kiosk clients.
#[derive(Debug, Clone, Copy)]
pub struct CapturePlan {
    pub samples_per_round: usize,
    pub rounds: usize,
    pub sample_delay: Duration,
    pub round_delay: Duration,
}

impl Default for CapturePlan {
    fn default() -> Self {
        Self {
            samples_per_round: 3,
            rounds: 2,
            sample_delay: Duration::from_millis(200),
            round_delay: Duration::from_millis(300),
        }
    }
}

/// Runs the bounded capture loop and returns one averaged descriptor per round.
///
/// Stops at the first round with no usable sample; the caller asks the user
/// to try again.
pub async fn capture_rounds<S: FaceSampler>(
    sampler: &mut S,
    plan: CapturePlan,
) -> Result<Vec<Embedding>, EmbeddingError> {
    let mut averaged = Vec::with_capacity(plan.rounds);

    for round in 0..plan.rounds {
        let mut samples = Vec::with_capacity(plan.samples_per_round);
        for i in 0..plan.samples_per_round {
            let sample = sampler.sample().await;
            if sample.is_none() {
                tracing::debug!(round = round + 1, sample = i + 1, "no face in sample");
            }
            samples.push(sample);
            if !plan.sample_delay.is_zero() {
                actix_web::rt::time::sleep(plan.sample_delay).await;
            }
        }

        let embedding = average_round(&samples).inspect_err(|_| {
            tracing::warn!(round = round + 1, "no face detected in round");
        })?;
        averaged.push(embedding);

        if round + 1 < plan.rounds && !plan.round_delay.is_zero() {
            actix_web::rt::time::sleep(plan.round_delay).await;
        }
    }

    Ok(averaged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::embedding::tests::axis;
    use std::collections::VecDeque;

    struct Scripted {
        frames: VecDeque<Option<Vec<f32>>>,
        calls: usize,
    }

    impl Scripted {
        fn new(frames: Vec<Option<Vec<f32>>>) -> Self {
            Self {
                frames: frames.into(),
                calls: 0,
            }
        }
    }

    #[async_trait]
    impl FaceSampler for Scripted {
        async fn sample(&mut self) -> Option<Vec<f32>> {
            self.calls += 1;
            self.frames.pop_front().flatten()
        }
    }

    fn instant() -> CapturePlan {
        CapturePlan {
            sample_delay: Duration::ZERO,
            round_delay: Duration::ZERO,
            ..CapturePlan::default()
        }
    }

    #[actix_web::test]
    async fn averages_each_round_separately() {
        let mut sampler = Scripted::new(vec![
            Some(axis(0.1)),
            None,
            Some(axis(0.3)),
            Some(axis(0.6)),
            Some(axis(0.6)),
            Some(axis(0.9)),
        ]);

        let rounds = capture_rounds(&mut sampler, instant()).await.unwrap();

        assert_eq!(rounds.len(), 2);
        assert!((rounds[0].values()[0] - 0.2).abs() < 1e-6);
        assert!((rounds[1].values()[0] - 0.7).abs() < 1e-6);
        assert_eq!(sampler.calls, 6);
    }

    #[actix_web::test]
    async fn stops_after_a_blank_round() {
        let mut sampler = Scripted::new(vec![None, None, None, Some(axis(0.5))]);

        let err = capture_rounds(&mut sampler, instant()).await.unwrap_err();

        assert_eq!(err, EmbeddingError::NoFaceDetected);
        // the second round never starts
        assert_eq!(sampler.calls, 3);
    }

    #[test]
    fn default_plan_matches_kiosk_schedule() {
        let plan = CapturePlan::default();
        assert_eq!(plan.samples_per_round, 3);
        assert_eq!(plan.rounds, 2);
        assert_eq!(plan.sample_delay, Duration::from_millis(200));
    }
}
