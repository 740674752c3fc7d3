//! Smart-confirmation decision policy.
//!
//! Pure function of the candidate list and two thresholds. The confirmation
//! round is skipped only for a single, unambiguously high-confidence match;
//! everything else either asks for confirmation, asks the user to pick, or
//! falls through to no-match.

use crate::agent::classifier::Candidate;
use crate::error::ConfigError;

/// Confidence thresholds, `0 <= low <= high <= 100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub high: u8,
    pub low: u8,
}

impl Thresholds {
    pub const DEFAULT_HIGH: u8 = 80;
    pub const DEFAULT_LOW: u8 = 50;

    /// Validate a threshold pair. `low > high` is a configuration error,
    /// never silently reordered.
    pub fn new(high: u8, low: u8) -> Result<Self, ConfigError> {
        if high > 100 {
            return Err(ConfigError::InvalidValue {
                key: "COMMAND_CONFIDENCE_HIGH_THRESHOLD".to_string(),
                message: format!("must be within 0-100, got {high}"),
            });
        }
        if low > high {
            return Err(ConfigError::InvalidValue {
                key: "COMMAND_CONFIDENCE_LOW_THRESHOLD".to_string(),
                message: format!("low threshold {low} exceeds high threshold {high}"),
            });
        }
        Ok(Self { high, low })
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            high: Self::DEFAULT_HIGH,
            low: Self::DEFAULT_LOW,
        }
    }
}

/// What to do with one classified utterance.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Single high-confidence match: run it without asking.
    AutoExecute(Candidate),
    /// One plausible match: ask the user to confirm it.
    Confirm(Candidate),
    /// Several plausible matches: ask the user to pick one.
    Clarify(Vec<Candidate>),
    /// Nothing plausible.
    NoMatch,
}

/// Map a ranked candidate list onto a [`Decision`].
///
/// Exactly one variant is produced for any input. Two candidates at or
/// above the high threshold are ambiguous and clarify rather than
/// auto-execute.
pub fn decide(candidates: &[Candidate], thresholds: Thresholds) -> Decision {
    if candidates.is_empty() {
        return Decision::NoMatch;
    }

    // Callers hand these over sorted already; re-sorting here keeps the
    // function total over arbitrary input. Stable, so equal confidences
    // keep their incoming (registry) order.
    let mut ranked = candidates.to_vec();
    ranked.sort_by(|a, b| b.confidence.cmp(&a.confidence));

    let above_high = ranked
        .iter()
        .filter(|c| c.confidence >= thresholds.high)
        .count();
    if above_high == 1 {
        return Decision::AutoExecute(ranked[0].clone());
    }

    let mut above_low: Vec<Candidate> = ranked
        .into_iter()
        .filter(|c| c.confidence >= thresholds.low)
        .collect();
    match above_low.len() {
        0 => Decision::NoMatch,
        1 => Decision::Confirm(above_low.remove(0)),
        _ => Decision::Clarify(above_low),
    }
}
