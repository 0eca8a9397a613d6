//! Error conversions for infrastructure code

mod conversions;

pub use conversions::{map_sql_error, map_storage_error, InfraError};
