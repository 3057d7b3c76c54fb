mod error;
mod legislation;
mod liquidation;
mod policy;
mod rights;
mod types;

pub use error::ConfigError;
pub use legislation::{CohortLegislation, FixedLegislation, LegislationResolver};
pub use liquidation::{ClaimTester, mandatory_claim};
pub use policy::{
    BehavioralPolicy, Collaborators, PresentValueParams, ReplacementRateParams,
    benefit_present_value,
};
pub use rights::{ProRataRights, RightsCalculator};
pub use types::{
    CareerSpell, ClaimScope, ClaimState, Decision, DecisionRow, Individual,
    LegislationParameters, LiquidationStage, MANDATORY_CLAIM_AGE, MAX_TABLE_AGE, MIN_STEP_YEARS,
    RightsSnapshot, Scheme, SchemeRights,
};
