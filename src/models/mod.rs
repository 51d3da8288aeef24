pub mod analytics;
pub mod history;
