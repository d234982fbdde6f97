use serde::{Deserialize, Serialize};

/// An AI model the backend can route to, from `GET /ai/models`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model name, e.g. `"nova-simulator"`.
    pub model_name: String,

    /// Provider family, e.g. `"openai"` or `"simulation"`.
    pub model_type: String,

    /// Whether the backend holds credentials for this model.
    pub api_key_configured: bool,

    /// Maximum tokens per reply.
    pub max_tokens: u32,

    /// Sampling temperature.
    pub temperature: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn model_list_deserialization() {
        let models: Vec<ModelInfo> = serde_json::from_value(json!([
            {
                "model_name": "gpt-3.5-turbo",
                "model_type": "openai",
                "api_key_configured": false,
                "max_tokens": 4096,
                "temperature": 0.7
            },
            {
                "model_name": "nova-simulator",
                "model_type": "simulation",
                "api_key_configured": true,
                "max_tokens": 1000,
                "temperature": 0.7
            }
        ]))
        .unwrap();

        assert_eq!(models.len(), 2);
        assert!(!models[0].api_key_configured);
        assert_eq!(models[1].model_name, "nova-simulator");
        assert_eq!(models[1].max_tokens, 1000);
    }
}
