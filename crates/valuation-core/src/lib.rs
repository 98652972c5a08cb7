pub mod assumptions;
pub mod config;
pub mod error;
pub mod stats;
pub mod traits;
pub mod types;

pub use assumptions::*;
pub use config::EngineConfig;
pub use error::*;
pub use traits::*;
pub use types::*;
