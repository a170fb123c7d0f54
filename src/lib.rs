pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod validation;

pub use error::{FederationError, Result};
pub use models::*;
pub use services::*;
pub use validation::*;
