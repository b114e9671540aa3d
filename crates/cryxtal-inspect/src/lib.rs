pub mod config;
pub mod context;
pub mod dimensions;
pub mod focus;
pub mod selection;

pub use config::{InspectConfig, MeasurementDisplayConfig, SelectionConfig};
pub use context::{Context, ContextBuilder};
pub use dimensions::{DimensionEngine, DragTarget, MeasurementSegment};
pub use focus::FocusTask;
pub use selection::{PickOutcome, SelectionEngine};
