pub mod response;
pub mod types;
