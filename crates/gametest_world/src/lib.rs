//! # Gametest World
//!
//! The simulated remote game the harness scripts against, plus the two
//! boundary surfaces a test touches:
//!
//! - [`RemoteClient`], the remote actor proxy: `look_at` / `right_click`,
//!   each suspending until the world acknowledges the action, processed
//!   strictly in issuance order.
//! - [`PlayerHandle`], the accessor surface: synchronous reads/writes of
//!   last-known remote state (game mode, hotbar, held item, position).
//!
//! The world delivers consequences (spawns, primes, breaks, inventory
//! propagation) to an [`EventSink`](gametest_event_system::EventSink);
//! normally the harness's event bus.

pub mod client;
pub mod player;
pub mod sim;
pub mod state;

#[cfg(test)]
mod tests;

pub use client::{ClientCommand, RemoteClient};
pub use player::PlayerHandle;
pub use sim::{SimWorld, SimWorldConfig};
pub use state::{LookTarget, GROUND_LEVEL, HOTBAR_SLOTS};
