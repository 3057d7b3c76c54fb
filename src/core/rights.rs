use super::types::{
    ClaimScope, Individual, LegislationParameters, LiquidationStage, RightsSnapshot, Scheme,
    SchemeRights,
};

/// Computes the rights an individual would liquidate at `age` for `stage`.
pub trait RightsCalculator: Send + Sync {
    fn compute_rights(
        &self,
        individual: &Individual,
        legislation: &LegislationParameters,
        age: f64,
        stage: LiquidationStage,
    ) -> RightsSnapshot;
}

/// Reference calculator: each scheme pays a share of the reference wage
/// proportional to the years spent in it, adjusted for early or late claims.
#[derive(Debug, Clone)]
pub struct ProRataRights {
    pub replacement_base: f64,
}

impl Default for ProRataRights {
    fn default() -> Self {
        Self {
            replacement_base: 0.5,
        }
    }
}

fn is_working_in(individual: &Individual, scheme: Scheme, age: f64) -> bool {
    individual
        .career
        .iter()
        .any(|spell| spell.scheme == scheme && spell.start_age <= age && age < spell.end_age)
}

/// Penalty per year short of the full rate, counting whichever of career length
/// and full-rate age is closer. Once nothing is missing, bonus per year past both
/// the required career length and the minimum claiming age.
fn rate_coefficient(legislation: &LegislationParameters, age: f64, total_years: f64) -> f64 {
    let required = legislation.required_contribution_years;
    let missing = (required - total_years)
        .max(0.0)
        .min((legislation.full_rate_age - age).max(0.0));
    let extra = if missing > 0.0 {
        0.0
    } else {
        (total_years - required)
            .max(0.0)
            .min((age - legislation.min_claim_age).max(0.0))
    };
    (1.0 - legislation.penalty_per_year * missing + legislation.bonus_per_year * extra).max(0.0)
}

impl ProRataRights {
    fn scheme_benefit(
        &self,
        legislation: &LegislationParameters,
        scheme_years: f64,
        reference_wage: f64,
        coefficient: f64,
    ) -> f64 {
        let required = legislation.required_contribution_years.max(1e-9);
        let prorata = (scheme_years / required).min(1.0);
        self.replacement_base * reference_wage * prorata * coefficient
    }
}

impl RightsCalculator for ProRataRights {
    fn compute_rights(
        &self,
        individual: &Individual,
        legislation: &LegislationParameters,
        age: f64,
        stage: LiquidationStage,
    ) -> RightsSnapshot {
        let total_years = individual.contribution_years(age);
        let reference_wage = individual.reference_wage(age);
        let coefficient = rate_coefficient(legislation, age, total_years);
        let age_ok = age >= legislation.min_claim_age;

        let public_years = individual.scheme_years(Scheme::Public, age);
        let mut residual_years = individual.scheme_years(Scheme::Residual, age);

        // Public years short of the career condition are transferred to the residual scheme.
        let public_qualifies = public_years > 0.0
            && legislation
                .min_contribution_years
                .is_none_or(|min_years| public_years >= min_years);
        if !public_qualifies {
            residual_years += public_years;
        }

        let residual_claimable =
            age_ok && residual_years > 0.0 && !is_working_in(individual, Scheme::Residual, age);
        let residual = SchemeRights {
            scheme: Scheme::Residual,
            eligible: residual_claimable,
            annual_benefit: self.scheme_benefit(
                legislation,
                residual_years,
                reference_wage,
                coefficient,
            ),
        };

        match stage {
            LiquidationStage::First => {
                let public = if public_qualifies {
                    SchemeRights {
                        scheme: Scheme::Public,
                        eligible: age_ok,
                        annual_benefit: self.scheme_benefit(
                            legislation,
                            public_years,
                            reference_wage,
                            coefficient,
                        ),
                    }
                } else {
                    SchemeRights::none(Scheme::Public)
                };
                let scope = if public.eligible && !residual.eligible && residual_years > 0.0 {
                    ClaimScope::Partial
                } else {
                    ClaimScope::Full
                };
                RightsSnapshot {
                    age,
                    stage,
                    public,
                    residual,
                    contribution_years: total_years,
                    reference_wage,
                    scope,
                }
            }
            LiquidationStage::Second => RightsSnapshot {
                age,
                stage,
                public: SchemeRights::none(Scheme::Public),
                residual,
                contribution_years: residual_years,
                reference_wage,
                scope: ClaimScope::Full,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::CareerSpell;

    fn legislation() -> LegislationParameters {
        LegislationParameters {
            age: 62.0,
            min_claim_age: 62.0,
            full_rate_age: 67.0,
            required_contribution_years: 40.0,
            min_contribution_years: Some(15.0),
            penalty_per_year: 0.05,
            bonus_per_year: 0.05,
            accrual_end_age: 70.0,
        }
    }

    fn spell(scheme: Scheme, start_age: f64, end_age: f64) -> CareerSpell {
        CareerSpell {
            scheme,
            start_age,
            end_age,
            annual_wage: 30_000.0,
        }
    }

    fn individual(career: Vec<CareerSpell>) -> Individual {
        Individual {
            id: 7,
            birth_year: 1960,
            career,
            target_claim_age: None,
        }
    }

    #[test]
    fn full_career_at_min_age_is_paid_at_full_rate() {
        let person = individual(vec![
            spell(Scheme::Residual, 20.0, 30.0),
            spell(Scheme::Public, 30.0, 62.0),
        ]);
        let rights = ProRataRights::default().compute_rights(
            &person,
            &legislation(),
            62.0,
            LiquidationStage::First,
        );
        assert!(rights.public.eligible);
        assert!(rights.residual.eligible);
        assert_eq!(rights.scope, ClaimScope::Full);
        assert!((rights.public.annual_benefit - 0.5 * 30_000.0 * 32.0 / 40.0 * 1.0).abs() < 1e-6);
        assert!((rights.residual.annual_benefit - 0.5 * 30_000.0 * 10.0 / 40.0 * 1.0).abs() < 1e-6);
    }

    #[test]
    fn short_career_claims_are_penalised() {
        let person = individual(vec![spell(Scheme::Public, 30.0, 62.0)]);
        let rights = ProRataRights::default().compute_rights(
            &person,
            &legislation(),
            62.0,
            LiquidationStage::First,
        );
        // Eight years short, five years before the full-rate age: five years of penalty.
        let expected = 0.5 * 30_000.0 * 32.0 / 40.0 * (1.0 - 0.05 * 5.0);
        assert!((rights.public.annual_benefit - expected).abs() < 1e-6);
    }

    #[test]
    fn working_in_residual_scheme_makes_the_first_claim_partial() {
        let person = individual(vec![
            spell(Scheme::Public, 22.0, 60.0),
            spell(Scheme::Residual, 60.0, 66.0),
        ]);
        let rights = ProRataRights::default().compute_rights(
            &person,
            &legislation(),
            63.0,
            LiquidationStage::First,
        );
        assert!(rights.public.eligible);
        assert!(!rights.residual.eligible);
        assert_eq!(rights.scope, ClaimScope::Partial);

        let later = ProRataRights::default().compute_rights(
            &person,
            &legislation(),
            66.0,
            LiquidationStage::Second,
        );
        assert!(later.residual.eligible);
        assert!(!later.public.eligible);
        assert!((later.contribution_years - 6.0).abs() < 1e-9);
        assert_eq!(later.scope, ClaimScope::Full);
    }

    #[test]
    fn public_years_below_career_condition_move_to_residual_scheme() {
        let person = individual(vec![
            spell(Scheme::Public, 20.0, 30.0),
            spell(Scheme::Residual, 30.0, 62.0),
        ]);
        let rights = ProRataRights::default().compute_rights(
            &person,
            &legislation(),
            62.0,
            LiquidationStage::First,
        );
        assert!(!rights.public.eligible);
        assert_eq!(rights.public.annual_benefit, 0.0);
        assert!((rights.residual.annual_benefit - 0.5 * 30_000.0).abs() < 1e-6);
    }

    #[test]
    fn nothing_is_claimable_before_min_age() {
        let person = individual(vec![spell(Scheme::Public, 20.0, 60.0)]);
        let rights = ProRataRights::default().compute_rights(
            &person,
            &legislation(),
            61.0,
            LiquidationStage::First,
        );
        assert!(!rights.has_eligible_scheme());
        assert_eq!(rights.annual_benefit(), 0.0);
    }

    #[test]
    fn bonus_applies_past_full_rate() {
        let legislation = legislation();
        assert!((rate_coefficient(&legislation, 64.0, 42.0) - 1.1).abs() < 1e-9);
        assert!((rate_coefficient(&legislation, 67.0, 30.0) - 1.0).abs() < 1e-9);
        // Bonus years are capped by the time spent past the minimum age...
        assert!((rate_coefficient(&legislation, 62.5, 45.0) - 1.025).abs() < 1e-9);
        // ...and by the years worked past the required career.
        assert!((rate_coefficient(&legislation, 66.0, 41.0) - 1.05).abs() < 1e-9);
        assert_eq!(rate_coefficient(&legislation, 40.0, 0.0), 0.0);
    }
}
