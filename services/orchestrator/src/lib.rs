pub mod args;
pub mod bucket;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod naming;
pub mod object_store;
pub mod phases;
pub mod project;
pub mod rekognition;
pub mod s3_store;
pub mod state;
pub mod waiter;

pub use error::{DemoError, Result};
