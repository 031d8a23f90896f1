pub mod config;
pub mod delivery;
pub mod error;
pub mod observability;
pub mod pipeline;
pub mod storage;

pub use error::{DeliveryError, Result};
