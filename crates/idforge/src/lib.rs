#![doc = include_str!("../README.md")]

mod error;
mod generator;
mod id;
mod mutex;
#[cfg(feature = "async-tokio")]
mod runtime;
#[cfg(feature = "serde")]
mod serde;
mod status;
mod store;
mod time;

pub use crate::error::*;
pub use crate::generator::*;
pub use crate::id::*;
#[cfg(feature = "async-tokio")]
pub use crate::runtime::*;
#[cfg(feature = "serde")]
pub use crate::serde::*;
pub use crate::status::*;
pub use crate::store::*;
pub use crate::time::*;
