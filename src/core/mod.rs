pub mod accumulator;
pub mod backend;
pub mod config;
pub mod error;
pub mod message;
pub mod pipeline;
pub mod registry;
pub mod session;
pub mod settings;
pub mod state;
pub mod store;
