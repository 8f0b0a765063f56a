//! A small mailbox-per-actor runtime on tokio, plus the actor that owns a
//! Quarry research session.
//!
//! - [`actor`]: the [`Actor`](actor::Actor) trait, addresses and spawning
//! - [`system`] / [`builder`]: task tracking and coordinated shutdown
//! - [`research`]: [`ResearchActor`](research::ResearchActor) and the
//!   [`ResearchHandle`](research::ResearchHandle) front ends use to reach it
pub mod actor;
pub mod builder;
pub mod research;
pub mod system;

pub use research::{ModelMenu, ResearchActor, ResearchHandle, ResearchMsg, Turn};
