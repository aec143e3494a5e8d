pub mod coordinator;
pub mod target;

pub use coordinator::{Coordinator, DetectionSettings, SettingsUpdate, TargetChange};
pub use target::Target;
