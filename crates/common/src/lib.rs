pub mod error;

pub mod utils;

pub use anyhow;
pub use async_trait;
pub use log;
pub use tokio;

pub use error::{RecorderError, Result};
