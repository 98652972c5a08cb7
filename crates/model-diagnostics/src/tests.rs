#[cfg(test)]
mod diagnostics_tests {
    use approx::assert_abs_diff_eq;
    use dcf_engine::run_model;
    use valuation_core::{CompanyProfile, DcfData, HistoricalFinancialRow, MarketData, ModelAssumptions};

    use crate::{
        diagnostic_overview, run_diagnostics, CheckCategory, CheckStatus, DiagnosticReport,
        IndicatorStatus, CHECKS,
    };

    /// Five years of steady 6% growth, 18% EBIT margin, 90% cash conversion.
    fn steady_company(current_price: f64) -> DcfData {
        let historical = (0..5)
            .map(|i| {
                let revenue = 1_000.0 * 1.06_f64.powi(i);
                let nopat = revenue * 0.18 * 0.79;
                HistoricalFinancialRow {
                    year: 2019 + i,
                    revenue,
                    gross_profit: revenue * 0.45,
                    ebit: revenue * 0.18,
                    nopat,
                    fcff: nopat * 0.9,
                    effective_tax_rate: 0.21,
                    total_debt: 200.0,
                    cash: 150.0,
                    ..Default::default()
                }
            })
            .collect();
        DcfData {
            company: CompanyProfile {
                symbol: "STDY".to_string(),
                diluted_shares: 100.0,
                ..Default::default()
            },
            historical,
            market: MarketData { current_price, ..Default::default() },
        }
    }

    fn find<'a>(report: &'a DiagnosticReport, id: &str) -> &'a crate::DiagnosticCheck {
        report.checks.iter().find(|c| c.id == id).unwrap()
    }

    #[test]
    fn test_steady_company_passes_data_quality() {
        let data = steady_company(20.0);
        let model = run_model(&data, &ModelAssumptions::default()).unwrap();
        let report = run_diagnostics(&data, &model);

        assert_eq!(report.checks.len(), CHECKS.len());
        for check in report.checks.iter().filter(|c| c.category == CheckCategory::DataQuality) {
            assert_eq!(check.status, CheckStatus::Pass, "{}", check.id);
        }
        assert_eq!(find(&report, "historical_completeness").score, 100.0);
        assert_abs_diff_eq!(find(&report, "revenue_consistency").score, 100.0, epsilon = 1e-6);
        assert_abs_diff_eq!(find(&report, "cash_flow_quality").score, 90.0, epsilon = 1e-9);

        for id in [
            "wacc_reasonableness",
            "terminal_spread_guard",
            "growth_progression",
            "margin_progression",
            "terminal_growth_gdp",
            "beta_reasonableness",
            "tax_rate_reasonableness",
            "capex_reasonableness",
            "roic_reasonableness",
            "fcf_growth_reasonableness",
        ] {
            assert_eq!(find(&report, id).status, CheckStatus::Pass, "{id}");
        }

        let total = report.summary.passed + report.summary.warnings + report.summary.failed;
        assert_eq!(total, report.checks.len());
        assert!(report.overall_score >= 0.0 && report.overall_score <= 100.0);
        assert_eq!(report.overall_score, report.overall_score.round());
    }

    #[test]
    fn test_clamped_terminal_spread_fails() {
        let data = steady_company(20.0);
        let a = ModelAssumptions { terminal_growth_rate: 0.10, ..Default::default() };
        let model = run_model(&data, &a).unwrap();
        assert!(model.valuation.terminal_spread_clamped);

        let report = run_diagnostics(&data, &model);
        let guard = find(&report, "terminal_spread_guard");
        assert_eq!(guard.status, CheckStatus::Fail);
        assert_eq!(guard.score, 40.0);

        let gdp = find(&report, "terminal_growth_gdp");
        assert_eq!(gdp.status, CheckStatus::Fail);
        assert_eq!(gdp.score, 30.0);
        assert!(report.key_issues.contains(&guard.message));

        let overview = diagnostic_overview(&report);
        assert!(overview.major_concerns.len() <= 3);
        assert!(overview.major_concerns.contains(&"Terminal Spread Guard".to_string()));
        let consistency = overview
            .indicators
            .iter()
            .find(|i| i.category == CheckCategory::ModelConsistency)
            .unwrap();
        assert_eq!(consistency.status, IndicatorStatus::Risk);
    }

    #[test]
    fn test_failing_check_is_replaced_not_fatal() {
        // zero market price makes the upside infinite
        let data = steady_company(0.0);
        let model = run_model(&data, &ModelAssumptions::default()).unwrap();
        let report = run_diagnostics(&data, &model);

        assert_eq!(report.checks.len(), CHECKS.len());
        let upside = find(&report, "valuation_reasonableness");
        assert_eq!(upside.status, CheckStatus::Fail);
        assert_eq!(upside.score, 0.0);
        assert!(upside.message.starts_with("Unable to evaluate"));
        assert_eq!(find(&report, "historical_completeness").status, CheckStatus::Pass);
    }

    #[test]
    fn test_short_history_and_accelerating_growth() {
        let mut data = steady_company(20.0);
        data.historical.truncate(2);
        let a = ModelAssumptions {
            revenue_growth_rates: vec![0.02, 0.05, 0.10, 0.15, 0.20],
            ..Default::default()
        };
        let model = run_model(&data, &a).unwrap();
        let report = run_diagnostics(&data, &model);

        let completeness = find(&report, "historical_completeness");
        assert_eq!(completeness.status, CheckStatus::Fail);
        assert_eq!(completeness.score, 40.0);
        assert!(completeness.recommendation.is_some());

        let growth = find(&report, "growth_progression");
        assert_eq!(growth.status, CheckStatus::Warning);
        assert_eq!(growth.score, 70.0);
        assert!(report
            .recommendations
            .iter()
            .any(|r| r == "Consider tapering growth rates over the forecast period"));
    }

    #[test]
    fn test_short_horizon_reads_history_rows() {
        let data = steady_company(20.0);
        let a = ModelAssumptions { forecast_years: 1, ..Default::default() };
        let model = run_model(&data, &a).unwrap();
        let report = run_diagnostics(&data, &model);
        assert_eq!(report.checks.len(), CHECKS.len());

        // the only forecast year is terminal, so ROIC comes from 2023
        let roic = find(&report, "roic_reasonableness");
        assert_eq!(roic.status, CheckStatus::Pass);
        assert_eq!(roic.message, "Implied ROIC: 47.4%");

        // four history-only rates of 6%
        let fcf = find(&report, "fcf_growth_reasonableness");
        assert_eq!(fcf.status, CheckStatus::Pass);
        assert_eq!(fcf.score, 100.0);
        assert_eq!(fcf.message, "Average FCF growth: 6.0%");
    }

    #[test]
    fn test_fcf_growth_spans_history_and_forecast() {
        let data = steady_company(20.0);
        let a = ModelAssumptions { forecast_years: 2, ..Default::default() };
        let model = run_model(&data, &a).unwrap();
        let report = run_diagnostics(&data, &model);

        // 4 x 6% plus the -3.4% step into the first forecast year, over 5 rates
        let fcf = find(&report, "fcf_growth_reasonableness");
        assert_eq!(fcf.message, "Average FCF growth: 4.1%");
        assert_eq!(fcf.status, CheckStatus::Pass);
        assert!(report.checks.iter().any(|c| c.id == "roic_reasonableness"));
    }

    #[test]
    fn test_checks_carry_catalogue_metadata() {
        let data = steady_company(20.0);
        let model = run_model(&data, &ModelAssumptions::default()).unwrap();
        let report = run_diagnostics(&data, &model);

        for (def, check) in CHECKS.iter().zip(&report.checks) {
            assert_eq!(check.id, def.id);
            assert_eq!(check.name, def.name);
            assert_eq!(check.category, def.category);
        }
    }
}
