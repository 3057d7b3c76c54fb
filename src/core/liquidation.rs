use log::debug;

use super::error::ConfigError;
use super::legislation::LegislationResolver;
use super::policy::{BehavioralPolicy, Collaborators};
use super::rights::RightsCalculator;
use super::types::{
    Decision, DecisionRow, Individual, LegislationParameters, LiquidationStage,
    MANDATORY_CLAIM_AGE, MAX_TABLE_AGE, MIN_STEP_YEARS, RightsSnapshot,
};

pub fn mandatory_claim(age: f64) -> bool {
    age >= MANDATORY_CLAIM_AGE
}

/// Claim/defer tests for one run. The policy is validated once, at construction.
pub struct ClaimTester<'a> {
    policy: BehavioralPolicy,
    rights: &'a dyn RightsCalculator,
    legislation: &'a dyn LegislationResolver,
}

impl<'a> ClaimTester<'a> {
    pub fn new(
        policy: BehavioralPolicy,
        rights: &'a dyn RightsCalculator,
        legislation: &'a dyn LegislationResolver,
    ) -> Result<Self, ConfigError> {
        policy.validate()?;
        debug!("claim tester configured with {} policy", policy.name());
        Ok(Self {
            policy,
            rights,
            legislation,
        })
    }

    /// Whether the individual starts collecting at `age`, with every right on the table.
    ///
    /// `rights` and `legislation` must have been computed for this exact age.
    pub fn test_first_liquidation(
        &self,
        individual: &Individual,
        rights: &RightsSnapshot,
        legislation: &LegislationParameters,
        age: f64,
    ) -> Decision {
        self.test(LiquidationStage::First, individual, rights, legislation, age)
    }

    /// Same as [`Self::test_first_liquidation`], for the rights left after a partial first claim.
    pub fn test_second_liquidation(
        &self,
        individual: &Individual,
        rights: &RightsSnapshot,
        legislation: &LegislationParameters,
        age: f64,
    ) -> Decision {
        self.test(LiquidationStage::Second, individual, rights, legislation, age)
    }

    fn test(
        &self,
        stage: LiquidationStage,
        individual: &Individual,
        rights: &RightsSnapshot,
        legislation: &LegislationParameters,
        age: f64,
    ) -> Decision {
        if mandatory_claim(age) {
            return Decision::Claim;
        }
        self.policy.evaluate(
            stage,
            individual,
            rights,
            legislation,
            age,
            self.collaborators(),
        )
    }

    fn collaborators(&self) -> Collaborators<'a> {
        Collaborators {
            rights: self.rights,
            legislation: self.legislation,
        }
    }

    /// Evaluates the test for `stage` at every step between two ages, without committing anything.
    pub fn decision_table(
        &self,
        individual: &Individual,
        stage: LiquidationStage,
        from_age: f64,
        to_age: f64,
        step_years: f64,
    ) -> Result<Vec<DecisionRow>, ConfigError> {
        if !from_age.is_finite()
            || !to_age.is_finite()
            || from_age < 0.0
            || from_age > to_age
            || to_age > MAX_TABLE_AGE
        {
            return Err(ConfigError::InvalidAgeRange {
                from: from_age,
                to: to_age,
            });
        }
        if !step_years.is_finite() || step_years < MIN_STEP_YEARS - 1e-9 {
            return Err(ConfigError::InvalidParameter {
                policy: self.policy.name(),
                field: "stepYears",
                reason: "must be at least one month".to_string(),
            });
        }

        // At most MAX_TABLE_AGE / MIN_STEP_YEARS steps.
        let steps = ((to_age - from_age) / step_years + 1e-9).floor() as u32;
        let rows = (0..=steps)
            .map(|k| {
                let age = from_age + k as f64 * step_years;
                let legislation = self.legislation.resolve(individual, age);
                let rights = self
                    .rights
                    .compute_rights(individual, &legislation, age, stage);
                let decision = match stage {
                    LiquidationStage::First => {
                        self.test_first_liquidation(individual, &rights, &legislation, age)
                    }
                    LiquidationStage::Second => {
                        self.test_second_liquidation(individual, &rights, &legislation, age)
                    }
                };
                DecisionRow {
                    age,
                    decision,
                    annual_benefit: rights.annual_benefit(),
                    replacement_rate: rights.replacement_rate(),
                    scope: rights.scope,
                }
            })
            .collect();
        Ok(rows)
    }
}
