// Module exports for models

pub mod entity_context;
pub mod pending_change;
pub mod period;
pub mod preference;
