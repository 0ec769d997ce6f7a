use serde::{Deserialize, Deserializer, Serialize};

/// Reason recorded when the classifier could not produce a verdict.
pub const LLM_ERROR_REASON: &str = "LLM_Error";

/// Classification result for a single task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskVerdict {
    #[serde(deserialize_with = "bool_or_string")]
    pub is_risky: bool,
    pub reason: String,
}

impl RiskVerdict {
    pub fn new(is_risky: bool, reason: impl Into<String>) -> Self {
        Self {
            is_risky,
            reason: reason.into(),
        }
    }

    pub fn risky(reason: impl Into<String>) -> Self {
        Self::new(true, reason)
    }

    pub fn safe(reason: impl Into<String>) -> Self {
        Self::new(false, reason)
    }

    /// Non-fatal fallback used for every inference failure.
    pub fn llm_error() -> Self {
        Self::safe(LLM_ERROR_REASON)
    }

    pub fn is_llm_error(&self) -> bool {
        !self.is_risky && self.reason == LLM_ERROR_REASON
    }
}

// Models sometimes quote booleans in "JSON mode"; accept "true"/"false" too.
fn bool_or_string<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => Ok(b),
        Flag::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "expected boolean for is_risky, got {other:?}"
            ))),
        },
    }
}
