//! Browsing-history aggregation and domain categorization.
//!
//! The pipeline takes raw visit records from an abstract
//! [`services::visit_source::VisitSource`], classifies each by domain and
//! path into a closed category taxonomy, and folds them into dashboard-ready
//! analytics with a short-lived single-slot result cache. Presentation
//! (charts, popup, DOM) is the embedding application's concern; this crate
//! only produces the output contract in [`models::analytics`].

pub mod error;
pub mod models;
pub mod services;
pub mod utils;
