pub mod client;
pub mod types;

pub use client::{SERPER_BASE_URL, SerperClient};
