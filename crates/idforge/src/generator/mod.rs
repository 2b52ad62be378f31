mod factory;
mod sequence;
mod snowflake;

pub use factory::*;
pub use sequence::*;
pub use snowflake::*;
