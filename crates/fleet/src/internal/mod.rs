#[macro_use]
pub(crate) mod common;
pub mod cloud;
pub mod config;
pub mod cores;
pub mod manager;
pub mod pool;
pub mod resources;
pub mod shutdown;
pub mod updates;
pub mod worker;

#[cfg(test)]
pub(crate) mod tests;
