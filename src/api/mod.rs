use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Parser, ValueEnum};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{
    BehavioralPolicy, CareerSpell, ClaimTester, CohortLegislation, Decision, DecisionRow,
    Individual, LegislationParameters, LegislationResolver, LiquidationStage, MAX_TABLE_AGE,
    PresentValueParams, ProRataRights, ReplacementRateParams, RightsCalculator, RightsSnapshot,
    Scheme, mandatory_claim,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliPolicy {
    MinimumAge,
    FullRate,
    ExogenousAge,
    PresentValue,
    ReplacementRate,
}

impl From<BehavioralPolicy> for CliPolicy {
    fn from(value: BehavioralPolicy) -> Self {
        match value {
            BehavioralPolicy::MinimumAge => CliPolicy::MinimumAge,
            BehavioralPolicy::FullRate => CliPolicy::FullRate,
            BehavioralPolicy::ExogenousAge { .. } => CliPolicy::ExogenousAge,
            BehavioralPolicy::PresentValue(_) => CliPolicy::PresentValue,
            BehavioralPolicy::ReplacementRate(_) => CliPolicy::ReplacementRate,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliStage {
    First,
    Second,
}

impl From<CliStage> for LiquidationStage {
    fn from(value: CliStage) -> Self {
        match value {
            CliStage::First => LiquidationStage::First,
            CliStage::Second => LiquidationStage::Second,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiStage {
    #[serde(alias = "1", alias = "initial")]
    First,
    #[serde(alias = "2", alias = "residual")]
    Second,
}

impl From<ApiStage> for CliStage {
    fn from(value: ApiStage) -> Self {
        match value {
            ApiStage::First => CliStage::First,
            ApiStage::Second => CliStage::Second,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct DecisionPayload {
    id: Option<u64>,
    birth_year: Option<i32>,
    career_start_age: Option<f64>,
    public_years: Option<f64>,
    residual_years: Option<f64>,
    annual_wage: Option<f64>,
    target_claim_age: Option<f64>,

    policy: Option<String>,
    exogenous_age: Option<f64>,
    discount_rate: Option<f64>,
    horizon_age: Option<f64>,
    lookahead_years: Option<f64>,
    lookahead_step_months: Option<u32>,
    min_gain: Option<f64>,
    target_replacement_rate: Option<f64>,

    min_contribution_years: Option<f64>,
    penalty_rate: Option<f64>,
    bonus_rate: Option<f64>,

    stage: Option<ApiStage>,
    test_age: Option<f64>,
    from_age: Option<f64>,
    to_age: Option<f64>,
    step_months: Option<u32>,
}

#[derive(Parser, Debug)]
#[command(
    name = "claimage",
    about = "Claim-or-defer decisions for a simulated retiree (two-stage public then residual claims)"
)]
struct Cli {
    #[arg(long, default_value_t = 1)]
    id: u64,
    #[arg(long)]
    birth_year: i32,
    #[arg(long, default_value_t = 22.0, help = "Age at which the career starts")]
    career_start_age: f64,
    #[arg(long, help = "Years worked in the public scheme, first")]
    public_years: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Years worked in the residual scheme, after the public spell"
    )]
    residual_years: f64,
    #[arg(long, default_value_t = 35_000.0, help = "Annual wage in today's money")]
    annual_wage: f64,
    #[arg(long, help = "Individual claiming age used by the exogenous-age policy")]
    target_claim_age: Option<f64>,
    #[arg(long, value_enum, default_value_t = CliPolicy::MinimumAge)]
    policy: CliPolicy,
    #[arg(long, default_value_t = 62.0, help = "Claiming age for the exogenous-age policy")]
    exogenous_age: f64,
    #[arg(
        long,
        default_value_t = 3.0,
        help = "Annual discount rate in percent for the present-value policy"
    )]
    discount_rate: f64,
    #[arg(long, default_value_t = 85.0, help = "Age up to which benefits are valued")]
    horizon_age: f64,
    #[arg(
        long,
        default_value_t = 5.0,
        help = "Years of later claiming ages compared by comparative policies"
    )]
    lookahead_years: f64,
    #[arg(long, default_value_t = 3, help = "Months between compared claiming ages")]
    lookahead_step_months: u32,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Relative gain in percent a later age must beat to justify deferring"
    )]
    min_gain: f64,
    #[arg(
        long,
        default_value_t = 50.0,
        help = "Target replacement rate in percent for the replacement-rate policy"
    )]
    target_replacement_rate: f64,
    #[arg(long, help = "Public-scheme years required before its rights can be claimed")]
    min_contribution_years: Option<f64>,
    #[arg(long, default_value_t = 5.0, help = "Penalty per missing year in percent")]
    penalty_rate: f64,
    #[arg(long, default_value_t = 5.0, help = "Bonus per extra year in percent")]
    bonus_rate: f64,
    #[arg(long, value_enum, default_value_t = CliStage::First)]
    stage: CliStage,
    #[arg(long, help = "Single age to test; prints one decision instead of a table")]
    test_age: Option<f64>,
    #[arg(long, default_value_t = 58.0)]
    from_age: f64,
    #[arg(long, default_value_t = 70.0)]
    to_age: f64,
    #[arg(long, default_value_t = 3, help = "Months between tested ages in the table")]
    step_months: u32,
}

#[derive(Debug)]
struct DecisionRequest {
    individual: Individual,
    policy: BehavioralPolicy,
    legislation: CohortLegislation,
    stage: LiquidationStage,
    test_age: Option<f64>,
    from_age: f64,
    to_age: f64,
    step_years: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DecideResponse {
    policy: BehavioralPolicy,
    stage: LiquidationStage,
    age: f64,
    decision: Decision,
    mandatory: bool,
    rights: RightsSnapshot,
    legislation: LegislationParameters,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TableResponse {
    policy: BehavioralPolicy,
    stage: LiquidationStage,
    first_claim_age: Option<f64>,
    rows: Vec<DecisionRow>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_policy(cli: &Cli) -> BehavioralPolicy {
    let step_years = cli.lookahead_step_months as f64 / 12.0;
    match cli.policy {
        CliPolicy::MinimumAge => BehavioralPolicy::MinimumAge,
        CliPolicy::FullRate => BehavioralPolicy::FullRate,
        CliPolicy::ExogenousAge => BehavioralPolicy::ExogenousAge {
            age: cli.exogenous_age,
        },
        CliPolicy::PresentValue => BehavioralPolicy::PresentValue(PresentValueParams {
            discount_rate: cli.discount_rate / 100.0,
            horizon_age: cli.horizon_age,
            lookahead_years: cli.lookahead_years,
            step_years,
            min_gain: cli.min_gain / 100.0,
        }),
        CliPolicy::ReplacementRate => BehavioralPolicy::ReplacementRate(ReplacementRateParams {
            target_rate: cli.target_replacement_rate / 100.0,
            lookahead_years: cli.lookahead_years,
            step_years,
        }),
    }
}

fn build_request(cli: Cli) -> Result<DecisionRequest, String> {
    if !cli.career_start_age.is_finite() || cli.career_start_age < 0.0 {
        return Err("--career-start-age must be >= 0".to_string());
    }

    if !cli.public_years.is_finite() || cli.public_years < 0.0 {
        return Err("--public-years must be >= 0".to_string());
    }

    if !cli.residual_years.is_finite() || cli.residual_years < 0.0 {
        return Err("--residual-years must be >= 0".to_string());
    }

    if cli.public_years + cli.residual_years <= 0.0 {
        return Err("--public-years and --residual-years cannot both be 0".to_string());
    }

    if !cli.annual_wage.is_finite() || cli.annual_wage < 0.0 {
        return Err("--annual-wage must be >= 0".to_string());
    }

    if let Some(age) = cli.target_claim_age {
        if !age.is_finite() || age < 0.0 {
            return Err("--target-claim-age must be >= 0".to_string());
        }
    }

    if let Some(years) = cli.min_contribution_years {
        if !years.is_finite() || years < 0.0 {
            return Err("--min-contribution-years must be >= 0".to_string());
        }
    }

    for (name, rate) in [
        ("--penalty-rate", cli.penalty_rate),
        ("--bonus-rate", cli.bonus_rate),
    ] {
        if !(0.0..=100.0).contains(&rate) {
            return Err(format!("{name} must be between 0 and 100"));
        }
    }

    if cli.step_months == 0 {
        return Err("--step-months must be > 0".to_string());
    }

    if !cli.from_age.is_finite() || !cli.to_age.is_finite() || cli.from_age < 0.0 {
        return Err("--from-age and --to-age must be finite and >= 0".to_string());
    }

    if cli.to_age < cli.from_age {
        return Err("--to-age must be >= --from-age".to_string());
    }

    if cli.to_age > MAX_TABLE_AGE {
        return Err(format!("--to-age must be <= {MAX_TABLE_AGE}"));
    }

    if let Some(age) = cli.test_age {
        if !age.is_finite() || !(0.0..=MAX_TABLE_AGE).contains(&age) {
            return Err(format!("--test-age must be between 0 and {MAX_TABLE_AGE}"));
        }
    }

    let policy = build_policy(&cli);
    policy.validate().map_err(|e| e.to_string())?;

    let public_end = cli.career_start_age + cli.public_years;
    let mut career = Vec::with_capacity(2);
    if cli.public_years > 0.0 {
        career.push(CareerSpell {
            scheme: Scheme::Public,
            start_age: cli.career_start_age,
            end_age: public_end,
            annual_wage: cli.annual_wage,
        });
    }
    if cli.residual_years > 0.0 {
        career.push(CareerSpell {
            scheme: Scheme::Residual,
            start_age: public_end,
            end_age: public_end + cli.residual_years,
            annual_wage: cli.annual_wage,
        });
    }

    Ok(DecisionRequest {
        individual: Individual {
            id: cli.id,
            birth_year: cli.birth_year,
            career,
            target_claim_age: cli.target_claim_age,
        },
        policy,
        legislation: CohortLegislation {
            penalty_per_year: cli.penalty_rate / 100.0,
            bonus_per_year: cli.bonus_rate / 100.0,
            min_contribution_years: cli.min_contribution_years,
        },
        stage: cli.stage.into(),
        test_age: cli.test_age,
        from_age: cli.from_age,
        to_age: cli.to_age,
        step_years: cli.step_months as f64 / 12.0,
    })
}

fn decide(request: &DecisionRequest, age: f64) -> Result<DecideResponse, String> {
    let calculator = ProRataRights::default();
    let tester = ClaimTester::new(request.policy, &calculator, &request.legislation)
        .map_err(|e| e.to_string())?;
    let individual = &request.individual;
    let legislation = request.legislation.resolve(individual, age);
    let rights = calculator.compute_rights(individual, &legislation, age, request.stage);
    let decision = match request.stage {
        LiquidationStage::First => {
            tester.test_first_liquidation(individual, &rights, &legislation, age)
        }
        LiquidationStage::Second => {
            tester.test_second_liquidation(individual, &rights, &legislation, age)
        }
    };
    Ok(DecideResponse {
        policy: request.policy,
        stage: request.stage,
        age,
        decision,
        mandatory: mandatory_claim(age),
        rights,
        legislation,
    })
}

fn decision_table(request: &DecisionRequest) -> Result<TableResponse, String> {
    let calculator = ProRataRights::default();
    let tester = ClaimTester::new(request.policy, &calculator, &request.legislation)
        .map_err(|e| e.to_string())?;
    let rows = tester
        .decision_table(
            &request.individual,
            request.stage,
            request.from_age,
            request.to_age,
            request.step_years,
        )
        .map_err(|e| e.to_string())?;
    let first_claim_age = rows
        .iter()
        .find(|row| row.decision.is_claim())
        .map(|row| row.age);
    Ok(TableResponse {
        policy: request.policy,
        stage: request.stage,
        first_claim_age,
        rows,
    })
}

pub fn run_cli() -> Result<(), String> {
    let request = build_request(Cli::parse())?;
    let json = match request.test_age {
        Some(age) => serde_json::to_string_pretty(&decide(&request, age)?),
        None => serde_json::to_string_pretty(&decision_table(&request)?),
    }
    .map_err(|e| format!("failed to serialize response: {e}"))?;
    println!("{json}");
    Ok(())
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/api/decide", get(decide_get_handler).post(decide_post_handler))
        .route("/api/table", get(table_get_handler).post(table_post_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!("claimage HTTP API listening on http://{addr}");
    info!("Local access: http://127.0.0.1:{port}/api/table");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn decide_get_handler(Query(payload): Query<DecisionPayload>) -> Response {
    decide_handler_impl(payload).await
}

async fn decide_post_handler(Json(payload): Json<DecisionPayload>) -> Response {
    decide_handler_impl(payload).await
}

async fn table_get_handler(Query(payload): Query<DecisionPayload>) -> Response {
    table_handler_impl(payload).await
}

async fn table_post_handler(Json(payload): Json<DecisionPayload>) -> Response {
    table_handler_impl(payload).await
}

async fn decide_handler_impl(payload: DecisionPayload) -> Response {
    let request = match request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };
    let Some(age) = request.test_age else {
        return error_response(StatusCode::BAD_REQUEST, "testAge is required");
    };
    match decide(&request, age) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

async fn table_handler_impl(payload: DecisionPayload) -> Response {
    let request = match request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };
    match decision_table(&request) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    warn!("request rejected ({status}): {msg}");
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn request_from_json(json: &str) -> Result<DecisionRequest, String> {
    let payload = serde_json::from_str::<DecisionPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    request_from_payload(payload)
}

fn request_from_payload(payload: DecisionPayload) -> Result<DecisionRequest, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.id {
        cli.id = v;
    }
    if let Some(v) = payload.birth_year {
        cli.birth_year = v;
    }
    if let Some(v) = payload.career_start_age {
        cli.career_start_age = v;
    }
    if let Some(v) = payload.public_years {
        cli.public_years = v;
    }
    if let Some(v) = payload.residual_years {
        cli.residual_years = v;
    }
    if let Some(v) = payload.annual_wage {
        cli.annual_wage = v;
    }
    if let Some(v) = payload.target_claim_age {
        cli.target_claim_age = Some(v);
    }

    if let Some(name) = payload.policy {
        let policy = BehavioralPolicy::from_name(&name).map_err(|e| e.to_string())?;
        cli.policy = policy.into();
    }
    if let Some(v) = payload.exogenous_age {
        cli.exogenous_age = v;
    }
    if let Some(v) = payload.discount_rate {
        cli.discount_rate = v;
    }
    if let Some(v) = payload.horizon_age {
        cli.horizon_age = v;
    }
    if let Some(v) = payload.lookahead_years {
        cli.lookahead_years = v;
    }
    if let Some(v) = payload.lookahead_step_months {
        cli.lookahead_step_months = v;
    }
    if let Some(v) = payload.min_gain {
        cli.min_gain = v;
    }
    if let Some(v) = payload.target_replacement_rate {
        cli.target_replacement_rate = v;
    }

    if let Some(v) = payload.min_contribution_years {
        cli.min_contribution_years = Some(v);
    }
    if let Some(v) = payload.penalty_rate {
        cli.penalty_rate = v;
    }
    if let Some(v) = payload.bonus_rate {
        cli.bonus_rate = v;
    }

    if let Some(v) = payload.stage {
        cli.stage = v.into();
    }
    if let Some(v) = payload.test_age {
        cli.test_age = Some(v);
    }
    if let Some(v) = payload.from_age {
        cli.from_age = v;
    }
    if let Some(v) = payload.to_age {
        cli.to_age = v;
    }
    if let Some(v) = payload.step_months {
        cli.step_months = v;
    }

    build_request(cli)
}

fn default_cli_for_api() -> Cli {
    Cli {
        id: 1,
        birth_year: 1960,
        career_start_age: 22.0,
        public_years: 40.0,
        residual_years: 0.0,
        annual_wage: 35_000.0,
        target_claim_age: None,
        policy: CliPolicy::MinimumAge,
        exogenous_age: 62.0,
        discount_rate: 3.0,
        horizon_age: 85.0,
        lookahead_years: 5.0,
        lookahead_step_months: 3,
        min_gain: 0.0,
        target_replacement_rate: 50.0,
        min_contribution_years: None,
        penalty_rate: 5.0,
        bonus_rate: 5.0,
        stage: CliStage::First,
        test_age: None,
        from_age: 58.0,
        to_age: 70.0,
        step_months: 3,
    }
}
