pub mod encoder;
pub mod models;
