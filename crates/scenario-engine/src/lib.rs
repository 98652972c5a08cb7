//! What-if analysis on top of a [`valuation_core::Valuator`]: named scenarios,
//! tornado ranking, sensitivity grids and Monte Carlo simulation.

pub mod monte_carlo;
pub mod parameters;
pub mod scenarios;
pub mod sensitivity;

pub use monte_carlo::{
    box_muller, calculate_statistics, default_monte_carlo_parameters, run_monte_carlo,
    Distribution, MonteCarloConfig, MonteCarloParameter, MonteCarloResult, MonteCarloStatistics,
};
pub use parameters::Parameter;
pub use scenarios::{analyze_scenarios, apply_scenario, Scenario, ScenarioKind, ScenarioLibrary};
pub use sensitivity::{
    default_tornado_parameters, run_sensitivity_grid, run_sensitivity_matrix, run_tornado,
    ParameterRange, SensitivityMatrix, TornadoBar, TornadoChart, TornadoParameter,
};
