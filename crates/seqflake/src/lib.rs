#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod error;
pub mod generator;
pub mod id;
pub mod identity;
pub mod rand;
#[cfg(feature = "serde")]
mod serde;
pub mod time;

pub use crate::error::*;
pub use crate::generator::*;
pub use crate::id::*;
pub use crate::identity::*;
pub use crate::rand::*;
pub use crate::time::*;
