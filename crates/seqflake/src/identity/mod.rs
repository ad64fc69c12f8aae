mod node;
mod source;

pub use node::*;
pub use source::*;
