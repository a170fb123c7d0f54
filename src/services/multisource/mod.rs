// Multi-source planning
//
// Fan-out of accesses to models bound to several physical sources, the
// source substitution and folding it relies on, and the capability mask
// applied while such models are planned.

pub mod capabilities;
pub mod catalog;
pub mod fanout;
pub mod folding;
pub mod substitution;

pub use capabilities::{
    mask_capabilities, BasicCapabilities, Capability, MultiSourceCapabilities, SourceCapabilities,
};
pub use catalog::{MultiSourceCatalog, StaticCatalog};
pub use fanout::{FanOutPlanner, ShouldExecute, StaticPruningOracle};
pub use folding::{ConstantFolder, SimpleConstantFolder};
pub use substitution::SourceSubstitutionRewriter;
