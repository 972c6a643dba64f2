//! # mycel-app
//!
//! The Mycel application.
//!
//! This crate ties together:
//! - Store-backed keepers implementing the admission pipeline's capabilities
//! - The modules compiled into this binary and their consensus versions
//! - The upgrade catalogue (v1.4.0 through v2.0.0)
//! - The block lifecycle: `begin_block` (upgrades first), `deliver_tx`,
//!   `end_block`, `commit`, plus `check_tx` and `simulate_tx` for the mempool

#![warn(missing_docs)]
#![warn(clippy::all)]

mod app;
mod error;
mod genesis;
pub mod keepers;
pub mod modules;
mod router;
pub mod upgrades;

pub use app::{App, AppOptions, TxResult};
pub use error::{AppError, AppResult};
pub use genesis::{Genesis, GenesisAccount};
pub use keepers::AppKeepers;
pub use router::{AppRouter, MsgResponse, MsgRouter};
