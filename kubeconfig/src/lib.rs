pub mod clean;
pub mod direct;
mod error;
pub mod loader;

pub use clean::*;
pub use error::{Error, Result};
pub use loader::{kube_dir, Loader};
