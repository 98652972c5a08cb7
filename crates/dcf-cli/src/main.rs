//! dcf-cli: run the full valuation suite for one company and print it as JSON.
//!
//! Usage:
//!   cargo run -p dcf-cli -- demos/sample_company.json
//!   cargo run -p dcf-cli -- demos/sample_company.json overrides.json
//!
//! The optional second file is a partial set of assumptions layered over the
//! defaults derived from the company's history.

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use dcf_engine::{build_default_assumptions, run_model, DcfEngine};
use model_diagnostics::{diagnostic_overview, run_diagnostics, DiagnosticOverview, DiagnosticReport};
use reverse_dcf::{run_reverse_analysis, ReverseReport, SolverConfig};
use scenario_engine::{
    analyze_scenarios, default_monte_carlo_parameters, default_tornado_parameters, run_monte_carlo, run_tornado,
    MonteCarloConfig, MonteCarloResult, Scenario, ScenarioLibrary, TornadoChart, TornadoParameter,
};
use serde::Serialize;
use std::path::Path;
use valuation_core::{merge_assumptions, AssumptionOverlay, DcfData, DcfModel, EngineConfig, ModelAssumptions};

#[derive(Debug, Serialize)]
struct AnalysisOutput {
    symbol: String,
    generated_at: DateTime<Utc>,
    config: EngineConfig,
    model: DcfModel,
    scenarios: Vec<Scenario>,
    tornado: TornadoChart,
    monte_carlo: MonteCarloResult,
    reverse: ReverseReport,
    diagnostics: DiagnosticReport,
    overview: DiagnosticOverview,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn base_assumptions(data: &DcfData, overrides: Option<&AssumptionOverlay>) -> ModelAssumptions {
    let defaults = build_default_assumptions(data);
    match overrides {
        Some(overlay) => merge_assumptions(&defaults, overlay),
        None => defaults,
    }
}

/// Every default tornado input swung by the configured variation.
fn tornado_parameters(config: &EngineConfig) -> Vec<TornadoParameter> {
    default_tornado_parameters()
        .into_iter()
        .map(|p| TornadoParameter::new(p.parameter, config.tornado_variation))
        .collect()
}

fn analyze(data: &DcfData, assumptions: &ModelAssumptions, config: &EngineConfig) -> anyhow::Result<AnalysisOutput> {
    let model = run_model(data, assumptions).context("base model run failed")?;
    let engine = DcfEngine::new(data);

    let scenarios = analyze_scenarios(&engine, &model, ScenarioLibrary::predefined(assumptions));
    let tornado = run_tornado(&engine, assumptions, &tornado_parameters(config))
        .context("tornado analysis failed")?;
    let monte_carlo = run_monte_carlo(
        &engine,
        assumptions,
        &default_monte_carlo_parameters(),
        &MonteCarloConfig::from(config),
    );
    let reverse = run_reverse_analysis(&engine, assumptions, None, &SolverConfig::from(config))
        .context("reverse analysis failed")?;
    let diagnostics = run_diagnostics(data, &model);
    let overview = diagnostic_overview(&diagnostics);

    Ok(AnalysisOutput {
        symbol: data.company.symbol.clone(),
        generated_at: Utc::now(),
        config: config.clone(),
        model,
        scenarios,
        tornado,
        monte_carlo,
        reverse,
        diagnostics,
        overview,
    })
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dcf_cli=info,dcf_engine=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(company_path) = args.first() else {
        bail!("usage: dcf-cli <company.json> [assumptions.json]");
    };

    let config = EngineConfig::from_env()?;
    let data: DcfData = read_json(Path::new(company_path))?;
    let overrides: Option<AssumptionOverlay> = args.get(1).map(|p| read_json(Path::new(p))).transpose()?;

    tracing::info!(
        symbol = %data.company.symbol,
        years = data.historical.len(),
        overrides = overrides.is_some(),
        "starting analysis"
    );

    let assumptions = base_assumptions(&data, overrides.as_ref());
    let output = analyze(&data, &assumptions, &config)?;

    tracing::info!(
        value_per_share = output.model.valuation.value_per_share,
        current_price = output.model.valuation.current_price,
        diagnostics_score = output.diagnostics.overall_score,
        "analysis complete"
    );

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
