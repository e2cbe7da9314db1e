mod loader;
mod types;

pub use loader::FileConfig;
pub use types::RuntimeConfig;
