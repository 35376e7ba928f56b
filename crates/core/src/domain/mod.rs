pub mod client;
pub mod quote;
pub mod service;
