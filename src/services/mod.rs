pub mod categorizer;
pub mod history_service;
pub mod visit_source;
