//! Sampling options forwarded to the model endpoint.

use bon::Builder;
use serde::{Deserialize, Serialize};

/// Settings controlling text generation.
#[derive(Debug, Clone, Builder, Serialize, Deserialize, PartialEq)]
pub struct GenerationSettings {
    pub temperature: Option<f64>,
    pub seed: Option<u64>,
    /// Context window requested from the model server.
    pub num_ctx: Option<u32>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: Some(0.7),
            seed: None,
            num_ctx: None,
        }
    }
}

impl GenerationSettings {
    /// Render as an Ollama `options` object, omitting unset fields.
    pub fn to_options(&self) -> serde_json::Value {
        let mut options = serde_json::Map::new();
        if let Some(temperature) = self.temperature {
            options.insert("temperature".into(), temperature.into());
        }
        if let Some(seed) = self.seed {
            options.insert("seed".into(), seed.into());
        }
        if let Some(num_ctx) = self.num_ctx {
            options.insert("num_ctx".into(), num_ctx.into());
        }
        serde_json::Value::Object(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_leaves_unset_fields_out_of_options() {
        let settings = GenerationSettings::builder().temperature(0.1).build();
        let options = settings.to_options();
        assert_eq!(options["temperature"], 0.1);
        assert!(options.get("seed").is_none());
        assert!(options.get("num_ctx").is_none());
    }

    #[test]
    fn default_temperature_matches_assistant_default() {
        assert_eq!(GenerationSettings::default().temperature, Some(0.7));
    }
}
