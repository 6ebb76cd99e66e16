// Service module exports

pub mod grid;
pub mod overlay;
pub mod persistence;
pub mod reconcile;
pub mod session;
pub mod store;
pub mod view;
