//! Actor+Relay primitives the explorer domain is built from.
//!
//! - [`Relay`] carries events from widgets and background tasks.
//! - [`Actor`] owns one value and changes it in a sequential loop.
//! - [`ActorVec`] does the same for a list.
//! - [`Atom`] holds local widget state.
//!
//! Views never mutate state directly; they send events into relays and bind
//! to Actor signals.

pub mod actor;
pub mod actor_vec;
pub mod atom;
pub mod relay;

pub use actor::Actor;
pub use actor_vec::{ActorVec, ActorVecHandle};
pub use atom::Atom;
pub use relay::{Relay, relay};
