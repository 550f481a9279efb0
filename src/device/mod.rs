pub mod btle;
pub mod connection;
pub mod constants;
pub mod display;
pub mod parser;
pub mod platform;
pub mod session;
pub mod types;

#[cfg(test)]
pub mod fake;
