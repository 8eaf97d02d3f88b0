pub mod matcher;
pub mod normalizer;
pub mod parser;

pub use matcher::*;
pub use normalizer::*;
pub use parser::*;
