//! Request-scoped data for `POST /upload-exterior`.

use service_core::error::AppError;

/// Multipart part carrying the photo.
pub const IMAGE_FIELD: &str = "image";

/// Structured style fields, in the order they are reported when missing.
const REQUIRED_STYLE_FIELDS: [&str; 3] = ["exteriorStyle", "environment", "time"];

/// The uploaded photo as read from the multipart body.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub file_name: String,
}

/// Style descriptors used to render the generation prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleDescriptor {
    pub exterior_style: String,
    pub environment: String,
    pub time: String,
    pub materials: Vec<String>,
}

impl StyleDescriptor {
    pub fn compose_prompt(&self) -> String {
        format!(
            "Generate a {} house exterior with {}, set in a {} environment during the {}.",
            self.exterior_style,
            self.materials.join(", "),
            self.environment,
            self.time
        )
    }
}

/// Where the prompt comes from. Structured fields are the canonical contract;
/// a bare `prompt` is still accepted when no style field is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptSource {
    Structured(StyleDescriptor),
    Freeform(String),
}

impl PromptSource {
    pub fn prompt(&self) -> String {
        match self {
            PromptSource::Structured(style) => style.compose_prompt(),
            PromptSource::Freeform(prompt) => prompt.clone(),
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            PromptSource::Structured(_) => "structured",
            PromptSource::Freeform(_) => "freeform",
        }
    }
}

/// A validated upload, ready for the network steps.
#[derive(Debug, Clone)]
pub struct ExteriorUpload {
    pub image: UploadedImage,
    pub source: PromptSource,
}

/// Raw multipart fields, collected before any validation happens.
#[derive(Debug, Default)]
pub struct ExteriorForm {
    pub image: Option<UploadedImage>,
    pub prompt: Option<String>,
    pub exterior_style: Option<String>,
    pub environment: Option<String>,
    pub time: Option<String>,
    /// Every `materials` part, in body order, undecoded.
    pub materials: Vec<String>,
}

impl ExteriorForm {
    /// Records a text part. Returns `false` for names the endpoint ignores.
    pub fn set_text(&mut self, name: &str, value: String) -> bool {
        match name {
            "prompt" => self.prompt = Some(value),
            "exteriorStyle" => self.exterior_style = Some(value),
            "environment" => self.environment = Some(value),
            "time" => self.time = Some(value),
            "materials" | "materials[]" => self.materials.push(value),
            _ => return false,
        }
        true
    }

    pub fn validate(self) -> Result<ExteriorUpload, AppError> {
        let image = self
            .image
            .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("No file uploaded")))?;

        let style_fields = [&self.exterior_style, &self.environment, &self.time];
        let any_style = style_fields.iter().any(|f| f.is_some());

        if !any_style {
            if let Some(prompt) = self.prompt.filter(|p| !p.trim().is_empty()) {
                return Ok(ExteriorUpload {
                    image,
                    source: PromptSource::Freeform(prompt),
                });
            }
        }

        let missing: Vec<&str> = REQUIRED_STYLE_FIELDS
            .iter()
            .zip(style_fields)
            .filter(|(_, value)| value.as_deref().map_or(true, |v| v.trim().is_empty()))
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        let materials = decode_materials(&self.materials)?;

        Ok(ExteriorUpload {
            image,
            source: PromptSource::Structured(StyleDescriptor {
                exterior_style: self.exterior_style.unwrap_or_default(),
                environment: self.environment.unwrap_or_default(),
                time: self.time.unwrap_or_default(),
                materials,
            }),
        })
    }
}

/// Flattens `materials` parts. A part that looks like a JSON array must
/// decode as an array of strings; anything else is taken as one material.
pub fn decode_materials(parts: &[String]) -> Result<Vec<String>, AppError> {
    let mut materials = Vec::new();
    for part in parts {
        if part.trim_start().starts_with('[') {
            let decoded: Vec<String> = serde_json::from_str(part).map_err(|e| {
                tracing::debug!(error = %e, "Rejected materials payload");
                AppError::BadRequest(anyhow::anyhow!("materials must be a JSON array of strings"))
            })?;
            materials.extend(decoded);
        } else {
            materials.push(part.clone());
        }
    }
    Ok(materials)
}

/// Object key for an upload: `uploads/<epoch-millis>_<original-filename>`.
///
/// The filename is used as sent, so two uploads of the same name in the same
/// millisecond share a key.
pub fn storage_key(epoch_millis: i64, file_name: &str) -> String {
    format!("uploads/{}_{}", epoch_millis, file_name)
}
