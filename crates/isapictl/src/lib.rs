pub mod cmd_query;
pub mod common;
