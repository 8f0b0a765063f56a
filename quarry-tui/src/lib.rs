//! Interactive terminal front end for Quarry.
//!
//! [`TuiActor`] owns the terminal and talks to the research session through
//! a [`quarry_actors::ResearchHandle`]. Input, redraw ticks and pipeline
//! progress arrive as [`TuiMsg`]s from the feeders in this crate.
mod command;
mod feeders;
mod input;
mod styles;
mod transcript;
mod tui;
mod view;

pub use command::{Command, parse_command};
pub use feeders::{spawn_progress_feeder, spawn_tui_feeders};
pub use tui::{TuiActor, TuiMsg};
