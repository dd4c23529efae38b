//! Input for the ControlNet (Hough line) image-to-image model.
//!
//! Only `image` and `prompt` change between requests; every sampling and
//! resolution parameter is pinned so renders stay comparable.

use serde::Serialize;

pub const ETA: u32 = 0;
pub const SCALE: u32 = 9;
pub const A_PROMPT: &str = "best quality, extremely detailed";
pub const N_PROMPT: &str = "longbody, lowres, bad anatomy, bad hands, missing fingers, extra digit, fewer digits, cropped, worst quality, low quality";
pub const DDIM_STEPS: u32 = 20;
/// The model schema takes these two as strings.
pub const NUM_SAMPLES: &str = "1";
pub const IMAGE_RESOLUTION: &str = "512";
pub const VALUE_THRESHOLD: f64 = 0.1;
pub const DETECT_RESOLUTION: u32 = 512;
pub const DISTANCE_THRESHOLD: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlNetInput {
    pub image: String,
    pub prompt: String,
    eta: u32,
    scale: u32,
    a_prompt: &'static str,
    n_prompt: &'static str,
    ddim_steps: u32,
    num_samples: &'static str,
    value_threshold: f64,
    image_resolution: &'static str,
    detect_resolution: u32,
    distance_threshold: f64,
}

impl ControlNetInput {
    pub fn new(image_url: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            image: image_url.into(),
            prompt: prompt.into(),
            eta: ETA,
            scale: SCALE,
            a_prompt: A_PROMPT,
            n_prompt: N_PROMPT,
            ddim_steps: DDIM_STEPS,
            num_samples: NUM_SAMPLES,
            value_threshold: VALUE_THRESHOLD,
            image_resolution: IMAGE_RESOLUTION,
            detect_resolution: DETECT_RESOLUTION,
            distance_threshold: DISTANCE_THRESHOLD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_pinned_parameters_with_their_wire_types() {
        let input = ControlNetInput::new("https://bucket.s3.amazonaws.com/uploads/1_a.png", "a barn");

        assert_eq!(
            serde_json::to_value(&input).unwrap(),
            json!({
                "image": "https://bucket.s3.amazonaws.com/uploads/1_a.png",
                "prompt": "a barn",
                "eta": 0,
                "scale": 9,
                "a_prompt": "best quality, extremely detailed",
                "n_prompt": "longbody, lowres, bad anatomy, bad hands, missing fingers, extra digit, fewer digits, cropped, worst quality, low quality",
                "ddim_steps": 20,
                "num_samples": "1",
                "value_threshold": 0.1,
                "image_resolution": "512",
                "detect_resolution": 512,
                "distance_threshold": 0.1
            })
        );
    }

    #[test]
    fn only_image_and_prompt_vary() {
        let a = ControlNetInput::new("u1", "p1");
        let b = ControlNetInput::new("u2", "p2");
        let mut a_value = serde_json::to_value(&a).unwrap();
        let mut b_value = serde_json::to_value(&b).unwrap();
        for v in [&mut a_value, &mut b_value] {
            let obj = v.as_object_mut().unwrap();
            obj.remove("image");
            obj.remove("prompt");
        }
        assert_eq!(a_value, b_value);
    }
}
