use std::fmt;

use serde::{Deserialize, Serialize};

use super::host::LiveSubdomain;

pub const MIN_SCORE: u8 = 0;
pub const MAX_SCORE: u8 = 10;

/// An integer risk score, guaranteed to lie in `MIN_SCORE..=MAX_SCORE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct RiskScore(u8);

impl RiskScore {
    pub fn new(value: i64) -> Option<Self> {
        (i64::from(MIN_SCORE)..=i64::from(MAX_SCORE))
            .contains(&value)
            .then(|| Self(value as u8))
    }

    /// Clamps `value` into the valid range.
    pub fn saturating(value: i64) -> Self {
        Self(value.clamp(i64::from(MIN_SCORE), i64::from(MAX_SCORE)) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for RiskScore {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        RiskScore::new(value)
            .ok_or_else(|| format!("score {value} outside {MIN_SCORE}..={MAX_SCORE}"))
    }
}

impl From<RiskScore> for u8 {
    fn from(score: RiskScore) -> Self {
        score.0
    }
}

impl fmt::Display for RiskScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RiskTier {
    High,
    Medium,
    Low,
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RiskTier::High => "high",
            RiskTier::Medium => "medium",
            RiskTier::Low => "low",
        };
        f.write_str(name)
    }
}

/// Lower bounds (inclusive) of the high and medium tiers. Anything below
/// `medium_min` is low.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierBoundaries {
    pub high_min: u8,
    pub medium_min: u8,
}

impl Default for TierBoundaries {
    fn default() -> Self {
        Self {
            high_min: 7,
            medium_min: 4,
        }
    }
}

impl TierBoundaries {
    pub fn tier(&self, score: RiskScore) -> RiskTier {
        self.tier_for(score.value())
    }

    pub fn tier_for(&self, value: u8) -> RiskTier {
        match value {
            s if s >= self.high_min => RiskTier::High,
            s if s >= self.medium_min => RiskTier::Medium,
            _ => RiskTier::Low,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.medium_min <= self.high_min && self.high_min <= MAX_SCORE
    }
}

/// A live subdomain annotated with its score and the model's rationale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskRecord {
    pub name: String,
    pub score: RiskScore,
    pub reasoning: String,
    pub subdomain: LiveSubdomain,
    /// Set when the score is the fallback rather than a validated model answer.
    pub degraded: bool,
}

impl RiskRecord {
    pub fn scored(subdomain: LiveSubdomain, score: RiskScore, reasoning: String) -> Self {
        Self {
            name: subdomain.name().to_string(),
            score,
            reasoning,
            subdomain,
            degraded: false,
        }
    }

    pub fn fallback(subdomain: LiveSubdomain, score: RiskScore, reasoning: String) -> Self {
        Self {
            degraded: true,
            ..Self::scored(subdomain, score, reasoning)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(value: i64) -> RiskScore {
        RiskScore::new(value).unwrap()
    }

    #[test]
    fn score_rejects_out_of_range() {
        assert!(RiskScore::new(-1).is_none());
        assert!(RiskScore::new(11).is_none());
        assert_eq!(RiskScore::new(0).map(RiskScore::value), Some(0));
        assert_eq!(RiskScore::new(10).map(RiskScore::value), Some(10));
        assert_eq!(RiskScore::saturating(42).value(), 10);
        assert_eq!(RiskScore::saturating(-5).value(), 0);
    }

    #[test]
    fn default_tiers_split_on_boundaries() {
        let tiers = TierBoundaries::default();
        assert_eq!(tiers.tier(score(10)), RiskTier::High);
        assert_eq!(tiers.tier(score(7)), RiskTier::High);
        assert_eq!(tiers.tier(score(6)), RiskTier::Medium);
        assert_eq!(tiers.tier(score(4)), RiskTier::Medium);
        assert_eq!(tiers.tier(score(3)), RiskTier::Low);
        assert_eq!(tiers.tier(score(0)), RiskTier::Low);
    }

    #[test]
    fn custom_tiers() {
        let tiers = TierBoundaries {
            high_min: 8,
            medium_min: 5,
        };
        assert!(tiers.is_valid());
        assert_eq!(tiers.tier(score(7)), RiskTier::Medium);
        assert_eq!(tiers.tier(score(4)), RiskTier::Low);

        let inverted = TierBoundaries {
            high_min: 3,
            medium_min: 5,
        };
        assert!(!inverted.is_valid());
    }

    #[test]
    fn score_deserialization_is_range_checked() {
        assert!(serde_json::from_str::<RiskScore>("7").is_ok());
        assert!(serde_json::from_str::<RiskScore>("12").is_err());
        assert!(serde_json::from_str::<RiskScore>("-3").is_err());
    }
}
