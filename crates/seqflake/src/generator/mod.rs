mod mutex;
mod sequence;
mod sleep;

pub use mutex::*;
pub use sequence::*;
pub use sleep::*;
