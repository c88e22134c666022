pub mod api;
pub mod generation;

pub use api::*;
pub use generation::*;
