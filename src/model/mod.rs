mod backend;
mod backends;
mod loader;

pub use backend::{ModelBackend, ModelShape};
pub use backends::{StubMode, StubModel};
#[cfg(feature = "backend-tract")]
pub use backends::TractModel;
pub use loader::load_model;
