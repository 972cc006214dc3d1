pub mod config;
pub mod error;
pub mod types;
pub mod value;

pub use config::{EngineLimits, InterpreterConfig, HOME_ENV, MODULE_PATH_ENV};
pub use error::BridgeError;
pub use types::*;
pub use value::*;
