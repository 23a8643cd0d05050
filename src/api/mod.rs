use anyhow::Context;
use axum::{
    Router,
    body::Bytes,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tokio::net::TcpListener;

use crate::core::{
    MAX_PROJECTION_AGE, ProjectionResult, ProjectionSummary, RetirementData, StrategyComparison,
    WithdrawalStrategy, calculate_projection_at, compare_strategies, parse_birth_year, summarize,
};

const EARLIEST_AS_OF_YEAR: i32 = 1900;
const LATEST_AS_OF_YEAR: i32 = 2200;

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("invalid {field}: '{value}' is not a YYYY-MM-DD date")]
    InvalidDate { field: &'static str, value: String },
    #[error("{0}")]
    UnknownStrategy(String),
    #[error("invalid {field}: {reason}")]
    InvalidParameter { field: &'static str, reason: String },
}

impl RequestError {
    fn status(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliStrategy {
    Balanced,
    LowestGrowthFirst,
    TaxOptimized,
}

impl From<CliStrategy> for WithdrawalStrategy {
    fn from(value: CliStrategy) -> Self {
        match value {
            CliStrategy::Balanced => WithdrawalStrategy::Balanced,
            CliStrategy::LowestGrowthFirst => WithdrawalStrategy::LowestGrowthFirst,
            CliStrategy::TaxOptimized => WithdrawalStrategy::TaxOptimized,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "drawdown",
    about = "UK household retirement projection (pensions, ISAs, Bed and ISA, tax-aware drawdown)"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Serve the JSON API")]
    Serve {
        #[arg(long, env = "DRAWDOWN_PORT", default_value_t = 8080)]
        port: u16,
    },
    #[command(about = "Project one strategy and print the result as JSON")]
    Project {
        #[command(flatten)]
        run: RunArgs,
        #[arg(long, value_enum, default_value_t = CliStrategy::Balanced)]
        strategy: CliStrategy,
    },
    #[command(about = "Project every strategy and print the comparison as JSON")]
    Compare {
        #[command(flatten)]
        run: RunArgs,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    #[arg(long, help = "Household record JSON file")]
    input: PathBuf,
    #[arg(long, help = "Stop after this many years (default: run to age 100)")]
    max_years: Option<u32>,
    #[arg(long, help = "Calendar year treated as now (default: this year)")]
    as_of_year: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectionRequest {
    data: RetirementData,
    #[serde(default)]
    strategy: Option<String>,
    #[serde(default)]
    max_years: Option<u32>,
    #[serde(default)]
    as_of_year: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompareRequest {
    data: RetirementData,
    #[serde(default)]
    max_years: Option<u32>,
    #[serde(default)]
    as_of_year: Option<i32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectionResponse {
    strategy: WithdrawalStrategy,
    summary: ProjectionSummary,
    projection: ProjectionResult,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve { port } => run_http_server(port)
            .await
            .with_context(|| format!("HTTP server on port {port} failed")),
        Command::Project { run, strategy } => {
            let data = load_household(&run.input)?;
            let response = build_projection_response(
                &data,
                strategy.into(),
                run.max_years,
                resolve_as_of_year(run.as_of_year)?,
            );
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Command::Compare { run } => {
            let data = load_household(&run.input)?;
            let as_of_year = resolve_as_of_year(run.as_of_year)?;
            let comparisons = compare_strategies(&data, run.max_years, as_of_year);
            println!("{}", serde_json::to_string_pretty(&comparisons)?);
            Ok(())
        }
    }
}

fn load_household(path: &Path) -> anyhow::Result<RetirementData> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let data: RetirementData = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse household JSON in {}", path.display()))?;
    validate_household(&data)?;
    Ok(data)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/api/projection", post(projection_handler))
        .route("/api/compare", post(compare_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    log::info!("drawdown API listening on http://{addr}");
    log::info!("local access: http://127.0.0.1:{port}/health");

    axum::serve(listener, app).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn projection_handler(body: Bytes) -> Response {
    match projection_from_body(&body) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(err) => request_error_response(&err),
    }
}

async fn compare_handler(body: Bytes) -> Response {
    match comparison_from_body(&body) {
        Ok(comparisons) => json_response(StatusCode::OK, comparisons),
        Err(err) => request_error_response(&err),
    }
}

fn projection_from_body(body: &[u8]) -> Result<ProjectionResponse, RequestError> {
    let request: ProjectionRequest = serde_json::from_slice(body)?;
    validate_household(&request.data)?;
    let strategy = resolve_strategy(request.strategy.as_deref())?;
    let as_of_year = resolve_as_of_year(request.as_of_year)?;
    Ok(build_projection_response(
        &request.data,
        strategy,
        request.max_years,
        as_of_year,
    ))
}

fn comparison_from_body(body: &[u8]) -> Result<Vec<StrategyComparison>, RequestError> {
    let request: CompareRequest = serde_json::from_slice(body)?;
    validate_household(&request.data)?;
    let as_of_year = resolve_as_of_year(request.as_of_year)?;
    Ok(compare_strategies(
        &request.data,
        request.max_years,
        as_of_year,
    ))
}

fn build_projection_response(
    data: &RetirementData,
    strategy: WithdrawalStrategy,
    max_years: Option<u32>,
    as_of_year: i32,
) -> ProjectionResponse {
    let projection = calculate_projection_at(data, max_years, strategy, as_of_year);
    ProjectionResponse {
        strategy,
        summary: summarize(&projection, data),
        projection,
    }
}

fn resolve_strategy(name: Option<&str>) -> Result<WithdrawalStrategy, RequestError> {
    match name {
        None => Ok(WithdrawalStrategy::default()),
        Some(name) => name.parse().map_err(RequestError::UnknownStrategy),
    }
}

fn resolve_as_of_year(as_of_year: Option<i32>) -> Result<i32, RequestError> {
    use chrono::Datelike;

    let year = as_of_year.unwrap_or_else(|| chrono::Local::now().year());
    if !(EARLIEST_AS_OF_YEAR..=LATEST_AS_OF_YEAR).contains(&year) {
        return Err(RequestError::InvalidParameter {
            field: "asOfYear",
            reason: format!(
                "{year} is outside {EARLIEST_AS_OF_YEAR}..={LATEST_AS_OF_YEAR}"
            ),
        });
    }
    Ok(year)
}

// Blank dates mean "not provided"; a date that is present must parse.
fn validate_household(data: &RetirementData) -> Result<(), RequestError> {
    for (field, value) in [
        ("dateOfBirth", &data.personal.date_of_birth),
        ("spouseDateOfBirth", &data.personal.spouse_date_of_birth),
    ] {
        if !value.trim().is_empty() && parse_birth_year(value).is_none() {
            return Err(RequestError::InvalidDate {
                field,
                value: value.clone(),
            });
        }
    }
    if data.personal.retirement_age > MAX_PROJECTION_AGE {
        return Err(RequestError::InvalidParameter {
            field: "retirementAge",
            reason: format!("must be at most {MAX_PROJECTION_AGE}"),
        });
    }
    if let Some(glide) = data.assumptions.investment_balance {
        for (field, pct) in [
            ("initialEquityPercentage", glide.initial_equity_percentage),
            ("targetEquityPercentage", glide.target_equity_percentage),
        ] {
            if !(0.0..=100.0).contains(&pct) {
                return Err(RequestError::InvalidParameter {
                    field,
                    reason: format!("{pct} is not a percentage"),
                });
            }
        }
    }
    Ok(())
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, axum::Json(body)))
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

fn request_error_response(err: &RequestError) -> Response {
    log::debug!("rejected request: {err}");
    error_response(err.status(), &err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AssetCategory, Outlook};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    const HOUSEHOLD_JSON: &str = r#"{
      "personal": {
        "dateOfBirth": "1960-04-01",
        "spouseDateOfBirth": "1962-09-30",
        "retirementAge": 65
      },
      "assets": [
        { "id": "a1", "name": "SIPP", "value": 300000, "category": "pension" },
        { "id": "a2", "name": "Stocks ISA", "value": 80000, "category": "isa" },
        { "id": "a3", "name": "Joint cash", "value": 20000, "category": "cash", "belongsToSpouse": true },
        { "id": "a4", "name": "GIA", "value": 10000, "category": "stocks" }
      ],
      "incomeNeeds": [
        { "id": "n1", "description": "Go-go years", "annualAmount": 40000 },
        { "id": "n2", "description": "Slow-go years", "annualAmount": 30000, "startingAge": 80 }
      ],
      "retirementIncome": [
        { "id": "r1", "description": "DB scheme", "annualAmount": 8000, "startYear": 2026,
          "inflationAdjusted": true, "belongsToSpouse": true }
      ],
      "assumptions": {
        "inflationRate": 2.5,
        "categoryGrowthRates": { "pension": 5, "cash": 1, "stocks": 6, "bonds": 3, "property": 2 },
        "bedAndISAEnabled": true,
        "investmentBalance": { "initialEquityPercentage": 80, "targetEquityPercentage": 40, "yearsToTarget": 20 }
      },
      "incomeTax": { "personalAllowance": 12570, "higherRateThreshold": 50270 },
      "shocks": [ { "id": "s1", "year": 2030, "impactPercent": -25 } ],
      "oneOffs": [ { "id": "o1", "description": "Downsize", "amount": 100000, "age": 75 } ]
    }"#;

    fn projection_body(extra: &str) -> String {
        format!(r#"{{ "data": {HOUSEHOLD_JSON}{extra} }}"#)
    }

    #[test]
    fn household_json_parses_data_entry_keys() {
        let data: RetirementData = serde_json::from_str(HOUSEHOLD_JSON).expect("json should parse");

        assert_eq!(data.personal.retirement_age, 65);
        assert_eq!(data.assets.len(), 4);
        assert_eq!(data.assets[1].category, AssetCategory::Isa);
        assert_eq!(data.assets[3].category, AssetCategory::StocksAndShares);
        assert!(data.assets[2].belongs_to_spouse);
        assert_eq!(data.income_needs[1].starting_age, Some(80));
        assert!(data.retirement_income[0].enabled);
        assert!(data.assumptions.bed_and_isa_enabled());
        assert_approx(data.assumptions.tax_band_increase_rate(), 2.5);
        assert_eq!(data.shocks[0].description, None);
        assert!(data.one_offs[0].enabled);
        assert!(!data.one_offs[0].belongs_to_spouse);
    }

    #[test]
    fn missing_optional_sections_fall_back_to_defaults() {
        let data: RetirementData = serde_json::from_str(
            r#"{ "personal": { "dateOfBirth": "1970-01-01" }, "assets": [] }"#,
        )
        .expect("json should parse");
        assert_eq!(data.personal.retirement_age, 65);
        assert!(data.retirement_income.is_empty());
        assert!(data.shocks.is_empty());
        assert_approx(data.income_tax.personal_allowance, 12_570.0);
        assert_approx(data.income_tax.higher_rate_threshold, 50_270.0);
    }

    #[test]
    fn projection_request_defaults_to_balanced() {
        let response = projection_from_body(projection_body(r#", "asOfYear": 2025"#).as_bytes())
            .expect("valid request");
        assert_eq!(response.strategy, WithdrawalStrategy::Balanced);
        assert_eq!(response.projection.yearly_data[0].year, 2025);
        assert_eq!(response.projection.yearly_data.last().map(|d| d.age), Some(100));
        assert_approx(response.summary.current_assets, 410_000.0);
    }

    #[test]
    fn projection_request_honours_strategy_and_max_years() {
        let body = projection_body(
            r#", "strategy": "tax-optimized", "maxYears": 5, "asOfYear": 2025"#,
        );
        let response = projection_from_body(body.as_bytes()).expect("valid request");
        assert_eq!(response.strategy, WithdrawalStrategy::TaxOptimized);
        assert_eq!(response.projection.yearly_data.len(), 6);
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        let body = projection_body(r#", "strategy": "yolo""#);
        let err = projection_from_body(body.as_bytes()).expect_err("must reject strategy");
        assert!(matches!(err, RequestError::UnknownStrategy(_)));
        assert!(err.to_string().contains("yolo"));
    }

    #[test]
    fn malformed_json_is_rejected() {
        let err = projection_from_body(b"{ \"data\": ").expect_err("must reject json");
        assert!(matches!(err, RequestError::InvalidJson(_)));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unparseable_birth_date_is_rejected() {
        let body = r#"{ "data": { "personal": { "dateOfBirth": "01/04/1960" }, "assets": [] } }"#;
        let err = projection_from_body(body.as_bytes()).expect_err("must reject date");
        assert!(matches!(
            err,
            RequestError::InvalidDate {
                field: "dateOfBirth",
                ..
            }
        ));
    }

    #[test]
    fn out_of_range_parameters_are_rejected() {
        let err = resolve_as_of_year(Some(1066)).expect_err("must reject year");
        assert!(err.to_string().contains("asOfYear"));

        let mut data: RetirementData =
            serde_json::from_str(HOUSEHOLD_JSON).expect("json should parse");
        data.personal.retirement_age = 120;
        let err = validate_household(&data).expect_err("must reject retirement age");
        assert!(matches!(
            err,
            RequestError::InvalidParameter {
                field: "retirementAge",
                ..
            }
        ));
    }

    #[test]
    fn compare_request_returns_all_strategies() {
        let body = projection_body(r#", "maxYears": 10, "asOfYear": 2025"#);
        let comparisons = comparison_from_body(body.as_bytes()).expect("valid request");
        let order: Vec<WithdrawalStrategy> = comparisons.iter().map(|c| c.strategy).collect();
        assert_eq!(order, WithdrawalStrategy::ALL.to_vec());
    }

    #[test]
    fn projection_response_serialization_contains_expected_fields() {
        let response = projection_from_body(
            projection_body(r#", "maxYears": 2, "asOfYear": 2025"#).as_bytes(),
        )
        .expect("valid request");
        let json = serde_json::to_value(&response).expect("response should serialize");

        assert_eq!(json["strategy"], "balanced");
        assert!(json["summary"]["outlook"].is_string());
        assert!(json["summary"].get("runsOutAtAge").is_some());
        let first = &json["projection"]["yearlyData"][0];
        for key in [
            "year",
            "age",
            "spouseAge",
            "assets",
            "pensionCrystallised",
            "stocksAndShares",
            "statePension",
            "retirementIncome",
            "taxPayable",
            "assetWithdrawals",
            "shortfall",
        ] {
            assert!(first.get(key).is_some(), "missing {key}");
        }
        assert_eq!(first["spouseAge"], 63);
        assert!(json["projection"].get("runsOutAt").is_some());
    }

    #[test]
    fn outlook_serializes_lowercase() {
        let json = serde_json::to_string(&Outlook::Warning).expect("serialize");
        assert_eq!(json, "\"warning\"");
    }

    #[tokio::test]
    async fn handlers_set_no_store_and_status() {
        let ok = projection_handler(Bytes::from(projection_body(r#", "maxYears": 1"#))).await;
        assert_eq!(ok.status(), StatusCode::OK);
        assert_eq!(
            ok.headers().get(header::CACHE_CONTROL),
            Some(&HeaderValue::from_static("no-store"))
        );

        let bad = compare_handler(Bytes::from_static(b"not json")).await;
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let missing = not_found_handler().await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let health = health_handler().await;
        assert_eq!(health.status(), StatusCode::OK);
    }

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from([
            "drawdown",
            "project",
            "--input",
            "household.json",
            "--strategy",
            "lowest-growth-first",
            "--max-years",
            "20",
        ])
        .expect("cli should parse");
        match cli.command {
            Command::Project { run, strategy } => {
                assert_eq!(WithdrawalStrategy::from(strategy), WithdrawalStrategy::LowestGrowthFirst);
                assert_eq!(run.max_years, Some(20));
                assert_eq!(run.as_of_year, None);
                assert_eq!(run.input, PathBuf::from("household.json"));
            }
            other => panic!("unexpected command {other:?}"),
        }

        let cli = Cli::try_parse_from(["drawdown", "serve", "--port", "9000"]).expect("cli should parse");
        assert!(matches!(cli.command, Command::Serve { port: 9000 }));
    }
}
