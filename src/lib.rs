pub mod authority;
pub mod clock;
pub mod config;
pub mod derive;
pub mod error;
pub mod pipeline;
pub mod prefs;
pub mod repository;
pub mod request;
pub mod scope;
pub mod service;
pub mod store;
pub mod types;
pub mod utils;

pub use error::{Refusal, Result, WorkflowError};
