pub mod client;
pub mod prompts;
pub mod questions;

pub use client::*;
pub use prompts::*;
pub use questions::*;
