//! Quality checks for a finished DCF model run.

pub mod checks;
pub mod report;

pub use checks::{CheckCategory, CheckStatus, DiagnosticCheck, CHECKS};
pub use report::{
    diagnostic_overview, run_diagnostics, ConfidenceIndicator, ConfidenceLevel, DiagnosticOverview,
    DiagnosticReport, DiagnosticSummary, IndicatorStatus, OverallHealth,
};

mod tests;
