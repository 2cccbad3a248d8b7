pub mod reconciler;
pub mod sampler;
pub mod symbols;
pub mod types;
pub mod vrf_engine;

pub use reconciler::OutcomeReconciler;
pub use sampler::WeightedSampler;
pub use symbols::{Symbol, SymbolError, SymbolId, SymbolTable};
pub use types::*;
pub use vrf_engine::{VRFBundle, VRFGameEngine};
