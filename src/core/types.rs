use serde::{Deserialize, Serialize};

/// Age at which claiming is forced, whatever the cohort, scheme or behaviour.
pub const MANDATORY_CLAIM_AGE: f64 = 70.0;

/// Oldest age a decision table may sweep to.
pub const MAX_TABLE_AGE: f64 = 120.0;

/// Finest age step accepted for lookahead windows and decision tables: one month.
pub const MIN_STEP_YEARS: f64 = 1.0 / 12.0;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scheme {
    Public,
    Residual,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareerSpell {
    pub scheme: Scheme,
    pub start_age: f64,
    pub end_age: f64,
    pub annual_wage: f64,
}

impl CareerSpell {
    fn years_until(&self, age: f64) -> f64 {
        (self.end_age.min(age) - self.start_age).max(0.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Individual {
    pub id: u64,
    pub birth_year: i32,
    pub career: Vec<CareerSpell>,
    #[serde(default)]
    pub target_claim_age: Option<f64>,
}

impl Individual {
    pub fn contribution_years(&self, until_age: f64) -> f64 {
        self.career.iter().map(|spell| spell.years_until(until_age)).sum()
    }

    pub fn scheme_years(&self, scheme: Scheme, until_age: f64) -> f64 {
        self.career
            .iter()
            .filter(|spell| spell.scheme == scheme)
            .map(|spell| spell.years_until(until_age))
            .sum()
    }

    /// Time-weighted mean wage over the spells worked before `until_age`.
    pub fn reference_wage(&self, until_age: f64) -> f64 {
        let mut weighted = 0.0;
        let mut years = 0.0;
        for spell in &self.career {
            let worked = spell.years_until(until_age);
            weighted += worked * spell.annual_wage.max(0.0);
            years += worked;
        }
        if years <= 1e-12 { 0.0 } else { weighted / years }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemeRights {
    pub scheme: Scheme,
    pub eligible: bool,
    pub annual_benefit: f64,
}

impl SchemeRights {
    pub fn none(scheme: Scheme) -> Self {
        Self {
            scheme,
            eligible: false,
            annual_benefit: 0.0,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClaimScope {
    Full,
    Partial,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LiquidationStage {
    First,
    Second,
}

/// Rights acquired as of one test age, for one stage. Never reuse across ages.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RightsSnapshot {
    pub age: f64,
    pub stage: LiquidationStage,
    pub public: SchemeRights,
    pub residual: SchemeRights,
    pub contribution_years: f64,
    pub reference_wage: f64,
    pub scope: ClaimScope,
}

impl RightsSnapshot {
    pub fn annual_benefit(&self) -> f64 {
        [self.public, self.residual]
            .iter()
            .filter(|rights| rights.eligible)
            .fold(0.0, |total, rights| total + rights.annual_benefit.max(0.0))
    }

    pub fn has_eligible_scheme(&self) -> bool {
        self.public.eligible || self.residual.eligible
    }

    pub fn replacement_rate(&self) -> f64 {
        if self.reference_wage <= 1e-12 {
            return 0.0;
        }
        self.annual_benefit() / self.reference_wage
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegislationParameters {
    pub age: f64,
    pub min_claim_age: f64,
    pub full_rate_age: f64,
    pub required_contribution_years: f64,
    #[serde(default)]
    pub min_contribution_years: Option<f64>,
    pub penalty_per_year: f64,
    pub bonus_per_year: f64,
    pub accrual_end_age: f64,
}

impl LegislationParameters {
    pub fn mandatory_claim_age(&self) -> f64 {
        MANDATORY_CLAIM_AGE
    }

    /// True once deferring can no longer add anything to the rights.
    pub fn no_further_accrual(&self, age: f64) -> bool {
        age >= self.accrual_end_age
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Claim,
    Defer,
}

impl Decision {
    pub fn is_claim(self) -> bool {
        self == Decision::Claim
    }
}

impl From<bool> for Decision {
    fn from(claim: bool) -> Self {
        if claim { Decision::Claim } else { Decision::Defer }
    }
}

/// Claiming progress recorded on the individual's simulation record.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClaimState {
    #[default]
    NotClaimed,
    PartiallyClaimed,
    FullyClaimed,
}

impl ClaimState {
    pub fn stage_to_test(self) -> Option<LiquidationStage> {
        match self {
            ClaimState::NotClaimed => Some(LiquidationStage::First),
            ClaimState::PartiallyClaimed => Some(LiquidationStage::Second),
            ClaimState::FullyClaimed => None,
        }
    }

    pub fn advance(self, decision: Decision, scope: ClaimScope) -> ClaimState {
        if !decision.is_claim() {
            return self;
        }
        match (self, scope) {
            (ClaimState::NotClaimed, ClaimScope::Partial) => ClaimState::PartiallyClaimed,
            (ClaimState::NotClaimed, ClaimScope::Full) => ClaimState::FullyClaimed,
            (ClaimState::PartiallyClaimed, _) => ClaimState::FullyClaimed,
            (ClaimState::FullyClaimed, _) => ClaimState::FullyClaimed,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRow {
    pub age: f64,
    pub decision: Decision,
    pub annual_benefit: f64,
    pub replacement_rate: f64,
    pub scope: ClaimScope,
}
