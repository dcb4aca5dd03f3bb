mod handler;
mod model;

pub use handler::{get_stats, health, record_hit, reset_stats};
pub use model::{HitRequest, ResetResponse};
