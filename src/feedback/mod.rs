pub mod repo;
pub mod repo_types;
pub mod sentiment;
pub mod services;
