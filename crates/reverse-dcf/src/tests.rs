#[cfg(test)]
mod reverse_tests {
    use std::time::Duration;

    use approx::assert_abs_diff_eq;
    use dcf_engine::{capital_cost, DcfEngine};
    use valuation_core::{
        CompanyProfile, DcfData, HistoricalFinancialRow, MarketData, ModelAssumptions, Valuator,
    };

    use crate::{
        run_reverse_analysis, run_what_if_analysis, solve_axis, Feasibility, SolveAxis,
        SolverConfig,
    };

    fn company() -> DcfData {
        let historical = (0..3)
            .map(|i| {
                let revenue = 5_000.0 * 1.05_f64.powi(i);
                HistoricalFinancialRow {
                    year: 2021 + i,
                    revenue,
                    gross_profit: revenue * 0.4,
                    ebit: revenue * 0.15,
                    nopat: revenue * 0.15 * 0.75,
                    effective_tax_rate: 0.25,
                    total_debt: 1_000.0,
                    cash: 600.0,
                    ..Default::default()
                }
            })
            .collect();
        DcfData {
            company: CompanyProfile {
                symbol: "REV".to_string(),
                diluted_shares: 200.0,
                ..Default::default()
            },
            historical,
            market: MarketData { current_price: 40.0, ..Default::default() },
        }
    }

    #[test]
    fn test_terminal_growth_round_trip() {
        let data = company();
        let engine = DcfEngine::new(&data);
        let base = ModelAssumptions::default();
        let model_price = engine.valuate(&base).unwrap().value_per_share;

        let config = SolverConfig::default();
        let solved = solve_axis(&engine, &base, SolveAxis::TerminalGrowth, model_price, &config);
        assert!(solved.converged);

        let rerun = ModelAssumptions { terminal_growth_rate: solved.value, ..base };
        let price = engine.valuate(&rerun).unwrap().value_per_share;
        assert_abs_diff_eq!(price, model_price, epsilon = config.tolerance);
        assert_abs_diff_eq!(solved.value, 0.03, epsilon = 1e-3);
    }

    #[test]
    fn test_wacc_axis_recovers_base_wacc() {
        let data = company();
        let engine = DcfEngine::new(&data);
        let base = ModelAssumptions::default();
        let model_price = engine.valuate(&base).unwrap().value_per_share;

        let solved = solve_axis(&engine, &base, SolveAxis::Wacc, model_price, &SolverConfig::default());
        assert!(solved.converged);
        assert_abs_diff_eq!(solved.value, capital_cost(&base).wacc, epsilon = 1e-3);
        assert_abs_diff_eq!(solved.final_price, model_price, epsilon = 0.01);
    }

    #[test]
    fn test_series_axes_report_series() {
        let data = company();
        let engine = DcfEngine::new(&data);
        let base = ModelAssumptions::default();
        let target = engine.valuate(&base).unwrap().value_per_share * 1.1;

        for axis in [SolveAxis::RevenueGrowth, SolveAxis::OperatingMargin] {
            let solved = solve_axis(&engine, &base, axis, target, &SolverConfig::default());
            assert!(solved.converged, "{axis}");
            let series = solved.implied_series.as_ref().unwrap();
            assert_eq!(series.len(), base.forecast_years);
            assert_abs_diff_eq!(solved.final_price, target, epsilon = 0.01);
        }
    }

    #[test]
    fn test_unreachable_target_reports_partial_failure() {
        let data = company();
        let engine = DcfEngine::new(&data);
        let base = ModelAssumptions::default();

        let solved = solve_axis(&engine, &base, SolveAxis::Wacc, 1e9, &SolverConfig::default());
        assert!(!solved.converged);
        assert!(solved.iterations < 100);
        // pushed to the low end of the WACC bracket
        assert_abs_diff_eq!(solved.value, 0.04, epsilon = 1e-6);
        assert!(solved.final_price.is_finite());
        assert!(solved.final_price < 1e9);
    }

    #[test]
    fn test_wacc_axis_with_zero_beta_does_not_converge() {
        let data = company();
        let engine = DcfEngine::new(&data);
        // WACC no longer depends on the equity risk premium, so no midpoint maps
        let base = ModelAssumptions { beta: 0.0, ..Default::default() };

        let solved = solve_axis(&engine, &base, SolveAxis::Wacc, 40.0, &SolverConfig::default());
        assert!(!solved.converged);
        assert!(solved.iterations < 100);
        // failed evaluations push a falling axis to the top of its bracket
        assert_abs_diff_eq!(solved.value, 0.20, epsilon = 1e-6);
        assert!(solved.final_price.is_nan());
        assert!(solved.implied_series.is_none());
    }

    #[test]
    fn test_expired_deadline_stops_solver() {
        let data = company();
        let engine = DcfEngine::new(&data);
        let config = SolverConfig { deadline: Some(Duration::ZERO), ..Default::default() };
        let solved = solve_axis(&engine, &ModelAssumptions::default(), SolveAxis::TerminalGrowth, 40.0, &config);
        assert!(!solved.converged);
        assert_eq!(solved.iterations, 0);
        assert_abs_diff_eq!(solved.value, (0.005 + 0.08) / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_report_at_model_price_is_feasible() {
        let data = company();
        let engine = DcfEngine::new(&data);
        let base = ModelAssumptions::default();
        let model_price = engine.valuate(&base).unwrap().value_per_share;

        let report = run_reverse_analysis(&engine, &base, Some(model_price), &SolverConfig::default()).unwrap();
        assert_eq!(report.target_price, model_price);
        assert_eq!(report.current_model_price, model_price);
        assert!(!report.market_expectations.is_optimistic);
        assert!(report.feasibility.terminal_growth_feasible);
        assert!(report.feasibility.wacc_reasonable);
        assert_eq!(report.feasibility.overall, Feasibility::High);
        assert!(report.market_expectations.is_realistic);
    }

    #[test]
    fn test_report_defaults_to_market_price() {
        let data = company();
        let engine = DcfEngine::new(&data);
        let report =
            run_reverse_analysis(&engine, &ModelAssumptions::default(), None, &SolverConfig::default()).unwrap();
        assert_eq!(report.target_price, 40.0);
    }

    #[test]
    fn test_what_if_recommendations() {
        let data = company();
        let engine = DcfEngine::new(&data);
        let base = ModelAssumptions::default();
        let model_price = engine.valuate(&base).unwrap().value_per_share;

        let results =
            run_what_if_analysis(&engine, &base, &[model_price, model_price * 50.0], &SolverConfig::default())
                .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].feasibility, Feasibility::High);
        assert!(["Achievable upside", "Fair value"].contains(&results[0].recommendation.as_str()));
        assert_ne!(results[1].feasibility, Feasibility::High);
        assert_ne!(results[1].recommendation, "Fair value");
    }
}
