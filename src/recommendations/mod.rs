pub mod dto;
pub mod repo;
pub mod repo_types;
pub mod scoring;
pub mod services;
