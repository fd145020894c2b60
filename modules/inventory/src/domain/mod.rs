pub mod error;
pub mod model;
pub mod registry;
pub mod repo;
pub mod service;
