pub mod dialect; // Per-source dialect configuration and function modifiers
pub mod executor; // Concurrent execution of fan-out branches
pub mod multisource; // Multi-source fan-out planning
pub mod registry;
pub mod renderer; // Command to SQL text rendering

pub use dialect::{BindMode, DialectConfig, DialectKind, PaginationStrategy};
pub use executor::*;
pub use multisource::*;
pub use registry::*;
pub use renderer::{BoundValue, EngineSettings, RenderedCommand, SqlRenderer};
