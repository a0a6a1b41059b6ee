pub mod config;
pub mod error;
pub mod extract;
pub mod interchange;
pub mod load;
pub mod pipeline;
pub mod sink;
pub mod transform;

pub use error::{EtlError, Result};
