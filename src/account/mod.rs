pub mod model;
pub mod secret;

pub use model::*;
pub use secret::*;
