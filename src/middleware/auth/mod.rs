pub mod access;
pub mod require;
