mod engine;
mod result;

pub use engine::*;
pub use result::*;
