use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Token prices and rewards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pricing {
    /// Cost of one hint in any game
    pub hint_cost: u64,
    /// Cost of skipping the current level
    pub skip_cost: u64,
    /// Tokens awarded for finishing a level
    pub level_reward: u64,
    /// Tokens awarded by the daily reward
    pub daily_reward: u64,
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            hint_cost: 10,
            skip_cost: 40,
            level_reward: 5,
            daily_reward: 25,
        }
    }
}

/// Delays used by engines and sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    /// How long a completed pair stays revealed before it is evaluated
    #[serde(with = "millis")]
    pub match_reveal: Duration,
    /// Pause before the first cue of a sequence plays
    #[serde(with = "millis")]
    pub playback_lead_in: Duration,
    /// Period of display reshuffles in shuffle mode
    #[serde(with = "millis")]
    pub shuffle_interval: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            match_reveal: Duration::from_millis(600),
            playback_lead_in: Duration::from_millis(500),
            shuffle_interval: Duration::from_secs(4),
        }
    }
}

impl Timing {
    /// Everything fires immediately; used by tests and autoplay
    pub fn instant() -> Self {
        Self {
            match_reveal: Duration::ZERO,
            playback_lead_in: Duration::ZERO,
            shuffle_interval: Duration::from_secs(4),
        }
    }
}

/// All tunables of a play session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub pricing: Pricing,
    pub timing: Timing,
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
