pub mod exterior;
pub mod floor_plan;
pub mod health;

pub use exterior::upload_exterior;
pub use floor_plan::get_plan;
pub use health::{health_check, metrics_endpoint};
