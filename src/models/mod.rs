pub mod decision;
pub mod token;
pub mod transcript;

pub use decision::*;
pub use token::*;
pub use transcript::*;
