pub mod catalog;
pub mod costing;
pub mod error;
pub mod models;
pub mod receipt;
pub mod service;
pub mod session;
pub mod shopping;
pub mod store;
