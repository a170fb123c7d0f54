pub mod command;
pub mod expression;
pub mod plan;
pub mod visit;

pub use command::*;
pub use expression::*;
pub use plan::*;
