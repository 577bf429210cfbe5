//! Champion/challenger promotion rule.
//!
//! A candidate is accepted iff it scores at least as well as the champion on **every** tracked
//! metric (componentwise `>=`). This is a conjunctive dominance check, not a weighted scalar
//! comparison: a candidate that improves accuracy but regresses F1 is rejected. Ties favour the
//! candidate, so against the zero sentinel (no champion yet) any non-negative candidate wins.
//! A NaN score never compares `>=` and therefore rejects.

use ml_types::MetricScores;

#[derive(Debug, Clone)]
pub struct ChampionChallenger {
    metrics: Vec<String>,
}

impl ChampionChallenger {
    pub fn new(metrics: Vec<String>) -> Self {
        Self { metrics }
    }

    pub fn metrics(&self) -> &[String] {
        &self.metrics
    }

    /// Champion stand-in when no champion can be located.
    pub fn zero(&self) -> MetricScores {
        MetricScores::zero(&self.metrics)
    }

    pub fn decide(&self, candidate: &MetricScores, champion: &MetricScores) -> bool {
        decide(candidate, champion, &self.metrics)
    }
}

/// `true` iff `candidate[m] >= champion[m]` for every `m` in `metrics`. Missing scores read as 0.
pub fn decide<S: AsRef<str>>(
    candidate: &MetricScores,
    champion: &MetricScores,
    metrics: &[S],
) -> bool {
    metrics.iter().all(|m| {
        let m = m.as_ref();
        candidate.get(m) >= champion.get(m)
    })
}
