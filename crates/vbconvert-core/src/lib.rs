pub mod analysis;
pub mod audit;
pub mod config;
pub mod error;
pub mod gaps;
pub mod io;
pub mod master_plan;
pub mod orchestrator;
pub mod paths;
pub mod prompt;
pub mod scan;
pub mod specgen;
pub mod status;
pub mod steps;
pub mod types;

pub use error::{ConvertError, Result};
