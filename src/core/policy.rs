//! Behavioral rules deciding whether an individual claims at a test age.
//!
//! Every variant goes through the same gates before its own rule: no further
//! accrual forces a claim, then eligibility can force a deferral. At the first
//! stage the career-length condition guards public-scheme rights only; years
//! short of it are claimable through the residual scheme.

use log::trace;
use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use super::legislation::LegislationResolver;
use super::rights::RightsCalculator;
use super::types::{
    Decision, Individual, LegislationParameters, LiquidationStage, MANDATORY_CLAIM_AGE,
    MIN_STEP_YEARS, RightsSnapshot,
};

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentValueParams {
    pub discount_rate: f64,
    pub horizon_age: f64,
    pub lookahead_years: f64,
    pub step_years: f64,
    pub min_gain: f64,
}

impl Default for PresentValueParams {
    fn default() -> Self {
        Self {
            discount_rate: 0.03,
            horizon_age: 85.0,
            lookahead_years: 5.0,
            step_years: 0.25,
            min_gain: 0.0,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplacementRateParams {
    pub target_rate: f64,
    pub lookahead_years: f64,
    pub step_years: f64,
}

impl Default for ReplacementRateParams {
    fn default() -> Self {
        Self {
            target_rate: 0.5,
            lookahead_years: 5.0,
            step_years: 0.25,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum BehavioralPolicy {
    MinimumAge,
    FullRate,
    ExogenousAge { age: f64 },
    PresentValue(PresentValueParams),
    ReplacementRate(ReplacementRateParams),
}

/// External collaborators a comparative rule needs to price later ages.
#[derive(Copy, Clone)]
pub struct Collaborators<'a> {
    pub rights: &'a dyn RightsCalculator,
    pub legislation: &'a dyn LegislationResolver,
}

impl BehavioralPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            BehavioralPolicy::MinimumAge => "minimum-age",
            BehavioralPolicy::FullRate => "full-rate",
            BehavioralPolicy::ExogenousAge { .. } => "exogenous-age",
            BehavioralPolicy::PresentValue(_) => "present-value",
            BehavioralPolicy::ReplacementRate(_) => "replacement-rate",
        }
    }

    /// Policy with its default parameters, looked up by name.
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "minimum-age" | "min-age" => Ok(BehavioralPolicy::MinimumAge),
            "full-rate" => Ok(BehavioralPolicy::FullRate),
            "exogenous-age" | "exogenous" => Ok(BehavioralPolicy::ExogenousAge { age: 62.0 }),
            "present-value" => Ok(BehavioralPolicy::PresentValue(PresentValueParams::default())),
            "replacement-rate" => Ok(BehavioralPolicy::ReplacementRate(
                ReplacementRateParams::default(),
            )),
            _ => Err(ConfigError::UnknownPolicy(name.to_string())),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let policy = self.name();
        let invalid = |field: &'static str, reason: &str| ConfigError::InvalidParameter {
            policy,
            field,
            reason: reason.to_string(),
        };

        match self {
            BehavioralPolicy::MinimumAge | BehavioralPolicy::FullRate => Ok(()),
            BehavioralPolicy::ExogenousAge { age } => {
                if !age.is_finite() || !(0.0..=MANDATORY_CLAIM_AGE).contains(age) {
                    return Err(invalid("age", "must be between 0 and 70"));
                }
                Ok(())
            }
            BehavioralPolicy::PresentValue(params) => {
                if !params.discount_rate.is_finite() || params.discount_rate <= -1.0 {
                    return Err(invalid("discountRate", "must be > -1"));
                }
                if !params.horizon_age.is_finite() || params.horizon_age <= 0.0 {
                    return Err(invalid("horizonAge", "must be > 0"));
                }
                if !params.min_gain.is_finite() || params.min_gain < 0.0 {
                    return Err(invalid("minGain", "must be >= 0"));
                }
                validate_lookahead(params.lookahead_years, params.step_years).map_err(
                    |(field, reason)| invalid(field, reason),
                )
            }
            BehavioralPolicy::ReplacementRate(params) => {
                if !params.target_rate.is_finite()
                    || params.target_rate <= 0.0
                    || params.target_rate > 5.0
                {
                    return Err(invalid("targetRate", "must be in (0, 5]"));
                }
                validate_lookahead(params.lookahead_years, params.step_years).map_err(
                    |(field, reason)| invalid(field, reason),
                )
            }
        }
    }

    pub fn evaluate(
        &self,
        stage: LiquidationStage,
        individual: &Individual,
        rights: &RightsSnapshot,
        legislation: &LegislationParameters,
        age: f64,
        collaborators: Collaborators<'_>,
    ) -> Decision {
        if legislation.no_further_accrual(age) {
            return Decision::Claim;
        }
        if !rights.has_eligible_scheme() || age < legislation.min_claim_age {
            return Decision::Defer;
        }
        if stage == LiquidationStage::First && public_claim_blocked(rights, legislation) {
            return Decision::Defer;
        }

        let decision = match self {
            BehavioralPolicy::MinimumAge => Decision::Claim,
            BehavioralPolicy::FullRate => Decision::from(age >= legislation.full_rate_age),
            BehavioralPolicy::ExogenousAge { age: target } => {
                let target = individual.target_claim_age.unwrap_or(*target);
                Decision::from(age >= target)
            }
            BehavioralPolicy::PresentValue(params) => {
                present_value_decision(params, stage, individual, rights, age, collaborators)
            }
            BehavioralPolicy::ReplacementRate(params) => {
                replacement_rate_decision(params, stage, individual, rights, age, collaborators)
            }
        };
        trace!(
            "individual {} {:?} stage at {age:.3}: {} -> {decision:?}",
            individual.id,
            stage,
            self.name()
        );
        decision
    }
}

fn validate_lookahead(
    lookahead_years: f64,
    step_years: f64,
) -> Result<(), (&'static str, &'static str)> {
    if !lookahead_years.is_finite() || lookahead_years <= 0.0 {
        return Err(("lookaheadYears", "must be > 0"));
    }
    if !step_years.is_finite()
        || step_years < MIN_STEP_YEARS - 1e-9
        || step_years > lookahead_years
    {
        return Err((
            "stepYears",
            "must be at least one month and <= lookaheadYears",
        ));
    }
    Ok(())
}

/// Only public rights are on offer and the career is too short to open them.
fn public_claim_blocked(rights: &RightsSnapshot, legislation: &LegislationParameters) -> bool {
    !rights.residual.eligible
        && legislation
            .min_contribution_years
            .is_some_and(|min_years| rights.contribution_years < min_years)
}

/// Later ages worth pricing, capped at the mandatory age.
fn candidate_ages(age: f64, lookahead_years: f64, step_years: f64) -> impl Iterator<Item = f64> {
    let limit = (age + lookahead_years).min(MANDATORY_CLAIM_AGE) + 1e-9;
    (1u32..)
        .map(move |k| age + k as f64 * step_years)
        .take_while(move |candidate| *candidate <= limit)
}

fn future_snapshot(
    collaborators: Collaborators<'_>,
    individual: &Individual,
    age: f64,
    stage: LiquidationStage,
) -> RightsSnapshot {
    let legislation = collaborators.legislation.resolve(individual, age);
    collaborators
        .rights
        .compute_rights(individual, &legislation, age, stage)
}

/// Value at `valuation_age` of `annual_benefit` paid continuously from `claim_age` to `horizon_age`.
pub fn benefit_present_value(
    annual_benefit: f64,
    valuation_age: f64,
    claim_age: f64,
    horizon_age: f64,
    discount_rate: f64,
) -> f64 {
    if claim_age >= horizon_age || annual_benefit <= 0.0 {
        return 0.0;
    }
    let delta = (1.0 + discount_rate).ln();
    if delta.abs() <= 1e-12 {
        return annual_benefit * (horizon_age - claim_age);
    }
    let start = (-delta * (claim_age - valuation_age)).exp();
    let end = (-delta * (horizon_age - valuation_age)).exp();
    annual_benefit * (start - end) / delta
}

fn present_value_decision(
    params: &PresentValueParams,
    stage: LiquidationStage,
    individual: &Individual,
    rights: &RightsSnapshot,
    age: f64,
    collaborators: Collaborators<'_>,
) -> Decision {
    let value_now = benefit_present_value(
        rights.annual_benefit(),
        age,
        age,
        params.horizon_age,
        params.discount_rate,
    );
    let threshold = value_now * (1.0 + params.min_gain);
    let mut later_ages = candidate_ages(age, params.lookahead_years, params.step_years);
    let deferral_pays = later_ages.any(|later| {
        let snapshot = future_snapshot(collaborators, individual, later, stage);
        let value_later = benefit_present_value(
            snapshot.annual_benefit(),
            age,
            later,
            params.horizon_age,
            params.discount_rate,
        );
        value_later > threshold + 1e-9
    });
    Decision::from(!deferral_pays)
}

fn replacement_rate_decision(
    params: &ReplacementRateParams,
    stage: LiquidationStage,
    individual: &Individual,
    rights: &RightsSnapshot,
    age: f64,
    collaborators: Collaborators<'_>,
) -> Decision {
    let rate_now = rights.replacement_rate();
    if rate_now >= params.target_rate {
        return Decision::Claim;
    }
    let mut later_ages = candidate_ages(age, params.lookahead_years, params.step_years);
    let improves = later_ages.any(|later| {
        let snapshot = future_snapshot(collaborators, individual, later, stage);
        snapshot.replacement_rate() > rate_now + 1e-12
    });
    Decision::from(!improves)
}
