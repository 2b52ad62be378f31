mod endpoint;
mod interface;
mod memory;
#[cfg(feature = "redis")]
mod redis;
mod scope;

pub use endpoint::*;
pub use interface::*;
pub use memory::*;
#[cfg(feature = "redis")]
pub use self::redis::*;
pub use scope::*;
