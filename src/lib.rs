//! Importa - Brazilian import landed-cost simulator
//!
//! Resolves the PTAX exchange rate for a quote date (falling back to earlier
//! business days), computes CIF and the federal/state import taxes for a
//! customs regime, applies regional and sectorial incentives and adds customs
//! expenses into a total landed cost.

pub mod config;
pub mod db;
pub mod error;
pub mod exchange;
pub mod incentives;
pub mod regimes;
pub mod simulation;
pub mod tax;
pub mod utils;

pub use error::SimulationError;
pub use simulation::{SimulationInputs, SimulationResult, Simulator};
