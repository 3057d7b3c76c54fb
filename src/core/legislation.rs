use super::types::{Individual, LegislationParameters, MANDATORY_CLAIM_AGE};

/// Resolves the rule set that applies to an individual at a given age.
pub trait LegislationResolver: Send + Sync {
    fn resolve(&self, individual: &Individual, age: f64) -> LegislationParameters;
}

/// Age thresholds and required career length for one group of birth years.
#[derive(Copy, Clone, Debug)]
struct CohortRow {
    last_birth_year: i32,
    min_claim_age: f64,
    full_rate_age: f64,
    required_years: f64,
}

const fn months(years: u32, months: u32) -> f64 {
    years as f64 + months as f64 / 12.0
}

// Ordered by birth year; the last row applies to every later cohort.
const COHORT_TABLE: [CohortRow; 9] = [
    CohortRow {
        last_birth_year: 1951,
        min_claim_age: 60.0,
        full_rate_age: 65.0,
        required_years: 41.0,
    },
    CohortRow {
        last_birth_year: 1952,
        min_claim_age: months(60, 9),
        full_rate_age: months(65, 9),
        required_years: 41.25,
    },
    CohortRow {
        last_birth_year: 1953,
        min_claim_age: months(61, 2),
        full_rate_age: months(66, 2),
        required_years: 41.5,
    },
    CohortRow {
        last_birth_year: 1954,
        min_claim_age: months(61, 7),
        full_rate_age: months(66, 7),
        required_years: 41.5,
    },
    CohortRow {
        last_birth_year: 1957,
        min_claim_age: 62.0,
        full_rate_age: 67.0,
        required_years: 41.75,
    },
    CohortRow {
        last_birth_year: 1960,
        min_claim_age: 62.0,
        full_rate_age: 67.0,
        required_years: 42.0,
    },
    CohortRow {
        last_birth_year: 1963,
        min_claim_age: 62.0,
        full_rate_age: 67.0,
        required_years: 42.25,
    },
    CohortRow {
        last_birth_year: 1966,
        min_claim_age: 62.0,
        full_rate_age: 67.0,
        required_years: 42.5,
    },
    CohortRow {
        last_birth_year: i32::MAX,
        min_claim_age: 62.0,
        full_rate_age: 67.0,
        required_years: 43.0,
    },
];

fn cohort_row(birth_year: i32) -> CohortRow {
    COHORT_TABLE
        .iter()
        .copied()
        .find(|row| birth_year <= row.last_birth_year)
        .unwrap_or(COHORT_TABLE[COHORT_TABLE.len() - 1])
}

/// Reference resolver: thresholds depend on the birth cohort only.
#[derive(Debug, Clone)]
pub struct CohortLegislation {
    pub penalty_per_year: f64,
    pub bonus_per_year: f64,
    pub min_contribution_years: Option<f64>,
}

impl Default for CohortLegislation {
    fn default() -> Self {
        Self {
            penalty_per_year: 0.05,
            bonus_per_year: 0.05,
            min_contribution_years: None,
        }
    }
}

impl LegislationResolver for CohortLegislation {
    fn resolve(&self, individual: &Individual, age: f64) -> LegislationParameters {
        let row = cohort_row(individual.birth_year);
        LegislationParameters {
            age,
            min_claim_age: row.min_claim_age,
            full_rate_age: row.full_rate_age,
            required_contribution_years: row.required_years,
            min_contribution_years: self.min_contribution_years,
            penalty_per_year: self.penalty_per_year,
            bonus_per_year: self.bonus_per_year,
            accrual_end_age: MANDATORY_CLAIM_AGE,
        }
    }
}

/// Applies the same parameters to everyone; only the age is restamped.
#[derive(Debug, Clone)]
pub struct FixedLegislation(pub LegislationParameters);

impl LegislationResolver for FixedLegislation {
    fn resolve(&self, _individual: &Individual, age: f64) -> LegislationParameters {
        LegislationParameters {
            age,
            ..self.0.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn born(birth_year: i32) -> Individual {
        Individual {
            id: 0,
            birth_year,
            career: Vec::new(),
            target_claim_age: None,
        }
    }

    #[test]
    fn cohort_thresholds_rise_with_birth_year() {
        let resolver = CohortLegislation::default();
        let old = resolver.resolve(&born(1950), 60.0);
        let mid = resolver.resolve(&born(1953), 60.0);
        let young = resolver.resolve(&born(1975), 60.0);

        assert_eq!(old.min_claim_age, 60.0);
        assert_eq!(old.full_rate_age, 65.0);
        assert!((mid.min_claim_age - (61.0 + 2.0 / 12.0)).abs() < 1e-9);
        assert_eq!(young.min_claim_age, 62.0);
        assert_eq!(young.full_rate_age, 67.0);
        assert_eq!(young.required_contribution_years, 43.0);
    }

    #[test]
    fn thresholds_never_decrease_across_cohorts() {
        let resolver = CohortLegislation::default();
        let mut previous = resolver.resolve(&born(1940), 60.0);
        for year in 1941..1990 {
            let current = resolver.resolve(&born(year), 60.0);
            assert!(current.min_claim_age >= previous.min_claim_age);
            assert!(current.full_rate_age >= previous.full_rate_age);
            assert!(current.required_contribution_years >= previous.required_contribution_years);
            assert!(current.min_claim_age <= current.full_rate_age);
            assert_eq!(current.accrual_end_age, MANDATORY_CLAIM_AGE);
            previous = current;
        }
    }

    #[test]
    fn fixed_legislation_restamps_the_age() {
        let base = CohortLegislation::default().resolve(&born(1960), 60.0);
        let fixed = FixedLegislation(base.clone());
        let resolved = fixed.resolve(&born(1930), 64.5);
        assert_eq!(resolved.age, 64.5);
        assert_eq!(resolved.min_claim_age, base.min_claim_age);
    }
}
