pub mod backend;
pub mod cancel;
pub mod config;
pub mod driver;
pub mod error;
pub mod event;
pub mod executor;
pub mod loader;
pub mod models;
pub mod name_generator;
pub mod report;
pub mod retry;
pub mod rng;
pub mod scale;
pub mod stats;
pub mod store;
pub mod transactions;
pub mod types;
pub mod worker;
