//! Turning model outputs into forecast frames.

pub mod components;
pub mod reshape;

pub use components::{rescale_components, ComponentKind};
pub use reshape::{denormalize, forecast_origins, raw_frame, target_frame};
