// Preference Grid Library
// Staging and reconciliation engine for schedule preference grids

pub mod error;
pub mod models;
pub mod services;
