pub mod stub;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use stub::{StubMode, StubModel};

#[cfg(feature = "backend-tract")]
pub use tract::TractModel;
