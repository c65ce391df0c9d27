pub mod aws;
pub mod clock;
pub mod config;
pub mod consts;
pub mod error;
pub mod generator;
pub mod handler;
pub mod logging;
pub mod publisher;
