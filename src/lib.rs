pub mod cli;
pub mod config;
pub mod decision;
pub mod logging;
pub mod model;
pub mod schema;
pub mod server;
