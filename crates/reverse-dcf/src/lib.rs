//! Reverse DCF: which single assumption change justifies a given share price.

pub mod analysis;
pub mod solver;

pub use analysis::{
    run_reverse_analysis, run_what_if_analysis, Feasibility, FeasibilityAssessment,
    MarketExpectations, RequiredAssumptions, ReverseReport, WhatIfResult,
};
pub use solver::{solve_axis, AxisSolution, AxisSpec, SolveAxis, SolverConfig, AXIS_TABLE};

mod tests;
