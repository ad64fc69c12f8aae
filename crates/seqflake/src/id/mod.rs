mod layout;
mod sequence_id;

pub use sequence_id::*;
