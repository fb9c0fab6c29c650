pub mod delivery;
pub mod error;
pub mod render;

pub use delivery::{Delivery, Rendered};
pub use error::{DeliveryError, RenderError};
pub use render::{IncrementalRenderer, RenderPhase, RenderState};
