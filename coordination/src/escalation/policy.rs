//! Escalation timing policy
//!
//! A policy is the ordered list of waits between consecutive ladder stages.
//! Events copy the policy in effect when they are triggered, so replacing it
//! never disturbs a chain that is already running.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::stage::EscalationStage;
use crate::config::ConfigError;

/// Number of delays a policy must carry (one per automatic transition)
pub const STAGE_DELAY_COUNT: usize = EscalationStage::LADDER.len() - 1;

/// On-disk shape of a policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyFile {
    pub stage_delays_secs: Vec<f64>,
}

/// Ordered waits between stage N and stage N+1
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PolicyFile", into = "PolicyFile")]
pub struct EscalationPolicy {
    delays: Vec<Duration>,
}

impl EscalationPolicy {
    /// Build a policy, rejecting anything but one delay per transition
    pub fn new(delays: Vec<Duration>) -> Result<Self, ConfigError> {
        if delays.len() != STAGE_DELAY_COUNT {
            return Err(ConfigError::Invalid(format!(
                "expected {} stage delays, got {}",
                STAGE_DELAY_COUNT,
                delays.len()
            )));
        }
        Ok(Self { delays })
    }

    /// Build a policy from fractional seconds
    pub fn from_secs_f64(secs: &[f64]) -> Result<Self, ConfigError> {
        let delays = secs
            .iter()
            .map(|s| {
                Duration::try_from_secs_f64(*s).map_err(|_| {
                    ConfigError::Invalid(format!(
                        "stage delay must be finite and non-negative, got {}",
                        s
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(delays)
    }

    /// Same delay between every pair of stages
    pub fn uniform(delay: Duration) -> Self {
        Self {
            delays: vec![delay; STAGE_DELAY_COUNT],
        }
    }

    /// Wait before firing `stage`, measured from the previous stage
    pub fn delay_before(&self, stage: EscalationStage) -> Option<Duration> {
        let ordinal = stage.ordinal()?;
        if ordinal == 0 {
            return None;
        }
        self.delays.get(ordinal - 1).copied()
    }

    /// Offset of `stage` from the trigger instant
    pub fn offset_of(&self, stage: EscalationStage) -> Option<Duration> {
        let ordinal = stage.ordinal()?;
        Some(self.delays.iter().take(ordinal).sum())
    }

    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }

    /// Time from trigger until the emergency stage fires
    pub fn total(&self) -> Duration {
        self.delays.iter().sum()
    }
}

impl Default for EscalationPolicy {
    /// 3 min to guardian push, 3 more to the voice call, 4 more to emergency
    fn default() -> Self {
        Self {
            delays: vec![
                Duration::from_secs(180),
                Duration::from_secs(180),
                Duration::from_secs(240),
            ],
        }
    }
}

impl TryFrom<PolicyFile> for EscalationPolicy {
    type Error = ConfigError;

    fn try_from(file: PolicyFile) -> Result<Self, Self::Error> {
        Self::from_secs_f64(&file.stage_delays_secs)
    }
}

impl From<EscalationPolicy> for PolicyFile {
    fn from(policy: EscalationPolicy) -> Self {
        Self {
            stage_delays_secs: policy.delays.iter().map(Duration::as_secs_f64).collect(),
        }
    }
}
