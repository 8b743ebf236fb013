//! Client state tracked per counterparty chain

use std::{fmt, str::FromStr};

use ibc_eureka_commitment::Height;
use ibc_eureka_merkle::ProofSpecs;
use ibc_eureka_utils::ensure;
use serde::{Deserialize, Serialize};

use crate::error::LightClientError;

/// Fraction of trusted voting power that must sign a non-adjacent header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TrustThreshold {
    /// Numerator of the fraction
    pub numerator: u64,
    /// Denominator of the fraction
    pub denominator: u64,
}

impl TrustThreshold {
    /// The usual `1/3` threshold
    pub const ONE_THIRD: Self = Self {
        numerator: 1,
        denominator: 3,
    };

    /// Whether `signed` out of `total` power is strictly more than this fraction
    #[must_use]
    pub fn is_exceeded_by(&self, signed: u64, total: u64) -> bool {
        u128::from(signed) * u128::from(self.denominator)
            > u128::from(total) * u128::from(self.numerator)
    }
}

impl fmt::Display for TrustThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl FromStr for TrustThreshold {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (numerator, denominator) = s
            .split_once('/')
            .ok_or_else(|| format!("trust level `{s}` is not of the form n/d"))?;
        let parse = |part: &str| {
            part.trim()
                .parse::<u64>()
                .map_err(|e| format!("trust level `{s}`: {e}"))
        };
        Ok(Self {
            numerator: parse(numerator)?,
            denominator: parse(denominator)?,
        })
    }
}

impl TryFrom<String> for TrustThreshold {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TrustThreshold> for String {
    fn from(threshold: TrustThreshold) -> Self {
        threshold.to_string()
    }
}

/// Client status as seen at a given time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// Accepting updates and answering membership queries
    Active,
    /// Misbehaviour was proven; only administrative recovery helps
    Frozen,
    /// The latest consensus state fell out of the trusting period
    Expired,
}

/// The light client's view of a counterparty chain. Periods are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientState {
    /// Chain id of the counterparty
    pub chain_id: String,
    /// Voting power fraction needed to skip validator set changes
    pub trust_level: TrustThreshold,
    /// How long a consensus state can be built upon
    pub trusting_period: u64,
    /// Unbonding period of the counterparty staking module
    pub unbonding_period: u64,
    /// Tolerated clock skew between the counterparty and the host
    pub max_clock_drift: u64,
    /// Highest height with a stored consensus state
    pub latest_height: Height,
    /// Height of the proven misbehaviour, zero while active
    #[serde(default)]
    pub frozen_height: Height,
    /// Proof specs of the counterparty store, leaf layer first
    #[serde(default)]
    pub proof_specs: ProofSpecs,
}

impl ClientState {
    /// Checks the parameters of a client about to be created.
    ///
    /// # Errors
    /// Returns [`LightClientError::InvalidClientState`] naming the first invalid parameter.
    pub fn validate(&self) -> Result<(), LightClientError> {
        let invalid = |reason: &str| LightClientError::InvalidClientState {
            reason: reason.to_string(),
        };

        ensure!(!self.chain_id.is_empty(), invalid("empty chain id"));
        ensure!(
            self.trust_level.numerator > 0
                && self.trust_level.numerator <= self.trust_level.denominator,
            invalid("trust level must be in (0, 1]")
        );
        ensure!(
            u128::from(self.trust_level.numerator) * 3
                >= u128::from(self.trust_level.denominator),
            invalid("trust level must be at least 1/3")
        );
        ensure!(self.trusting_period > 0, invalid("zero trusting period"));
        ensure!(
            self.trusting_period < self.unbonding_period,
            invalid("trusting period must be shorter than the unbonding period")
        );
        ensure!(self.max_clock_drift > 0, invalid("zero max clock drift"));
        ensure!(!self.latest_height.is_zero(), invalid("zero latest height"));
        ensure!(self.frozen_height.is_zero(), invalid("client is frozen"));
        ensure!(!self.proof_specs.is_empty(), invalid("no proof specs"));
        Ok(())
    }

    /// Whether misbehaviour has been proven
    #[must_use]
    pub const fn is_frozen(&self) -> bool {
        !self.frozen_height.is_zero()
    }

    /// Whether a consensus state from `timestamp` can no longer be trusted at `now`
    #[must_use]
    pub const fn is_expired(&self, timestamp: u64, now: u64) -> bool {
        timestamp.saturating_add(self.trusting_period) <= now
    }
}
