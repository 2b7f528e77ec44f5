//! Core types, settings, and error taxonomy for the cell monitor pipeline.

pub mod cell;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod limits;
pub mod notifications;
pub mod session;

pub use cell::*;
pub use clock::*;
pub use config::*;
pub use error::{DeliveryError, Error, Result};
pub use events::*;
pub use notifications::*;
pub use session::*;
