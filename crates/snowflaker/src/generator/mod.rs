mod config;
mod interface;
mod mutex;
mod snowflake;
mod status;
#[cfg(test)]
mod tests;

pub use config::*;
pub use interface::*;
pub use snowflake::*;
pub use status::*;
