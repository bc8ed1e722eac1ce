//! Domain models for the refill-track system.

mod facility;
mod refill;

pub use facility::*;
pub use refill::*;
