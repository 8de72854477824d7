pub mod import;
pub mod library;

pub use import::*;
pub use library::*;
