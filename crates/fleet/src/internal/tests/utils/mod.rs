pub mod cloud;
pub mod env;
pub mod node;
pub mod resources;
pub mod user;
