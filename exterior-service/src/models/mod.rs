pub mod controlnet;
pub mod exterior;
pub mod plan;

pub use controlnet::ControlNetInput;
pub use exterior::{
    storage_key, ExteriorForm, ExteriorUpload, PromptSource, StyleDescriptor, UploadedImage,
};
pub use plan::PlanRequest;
