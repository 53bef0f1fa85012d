pub mod error;
pub mod schema;
pub mod manifest;
pub mod validator;
pub mod tsv;

pub use error::*;
pub use schema::*;
pub use manifest::*;
pub use validator::*;
