use crate::model::verdict::RiskVerdict;
use errors::StoreError;
use serde::{Serialize, Serializer};
use std::collections::HashMap;

/// Key prefix shared by every per-user record in the feature store.
pub const USER_RISK_PREFIX: &str = "user_risk:";

pub const FIELD_RISKY: &str = "risky";
pub const FIELD_REASON: &str = "reason";

/// Latest verdict for one user. Each write replaces the previous record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureRecord {
    pub user_id: String,
    #[serde(serialize_with = "serialize_flag")]
    pub risky: bool,
    pub reason: String,
}

impl FeatureRecord {
    pub fn from_verdict(user_id: impl Into<String>, verdict: &RiskVerdict) -> Self {
        Self {
            user_id: user_id.into(),
            risky: verdict.is_risky,
            reason: verdict.reason.clone(),
        }
    }

    pub fn key(&self) -> String {
        Self::key_for(&self.user_id)
    }

    pub fn key_for(user_id: &str) -> String {
        format!("{USER_RISK_PREFIX}{user_id}")
    }

    /// Inverse of [`FeatureRecord::key_for`].
    pub fn user_id_from_key(key: &str) -> Option<&str> {
        key.strip_prefix(USER_RISK_PREFIX)
    }

    /// Hash fields as written to the store.
    pub fn fields(&self) -> [(&'static str, String); 2] {
        [
            (FIELD_RISKY, flag_str(self.risky).to_string()),
            (FIELD_REASON, self.reason.clone()),
        ]
    }

    pub fn from_fields(
        user_id: impl Into<String>,
        fields: &HashMap<String, String>,
    ) -> Result<Self, StoreError> {
        let user_id = user_id.into();
        let invalid = |reason: &str| StoreError::InvalidRecord {
            key: Self::key_for(&user_id),
            reason: reason.to_string(),
        };

        let risky = fields
            .get(FIELD_RISKY)
            .ok_or_else(|| invalid("missing field `risky`"))
            .and_then(|v| parse_flag(v).ok_or_else(|| invalid("unrecognised `risky` value")))?;
        let reason = fields
            .get(FIELD_REASON)
            .cloned()
            .ok_or_else(|| invalid("missing field `reason`"))?;

        Ok(Self {
            user_id,
            risky,
            reason,
        })
    }
}

/// Stored flag spelling; readers compare against "True".
pub fn flag_str(flag: bool) -> &'static str {
    if flag { "True" } else { "False" }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn serialize_flag<S>(flag: &bool, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(flag_str(*flag))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_prefixed_user_id() {
        let record = FeatureRecord::from_verdict("u1", &RiskVerdict::safe("ok"));
        assert_eq!(record.key(), "user_risk:u1");
        assert_eq!(FeatureRecord::user_id_from_key("user_risk:u1"), Some("u1"));
        assert_eq!(FeatureRecord::user_id_from_key("other:u1"), None);
    }

    #[test]
    fn fields_use_capitalised_flags() {
        let record = FeatureRecord::from_verdict("u1", &RiskVerdict::risky("threat"));
        assert_eq!(
            record.fields(),
            [("risky", "True".to_string()), ("reason", "threat".to_string())]
        );
    }

    #[test]
    fn reads_back_stored_fields() {
        let fields = HashMap::from([
            ("risky".to_string(), "False".to_string()),
            ("reason".to_string(), "LLM_Error".to_string()),
        ]);
        let record = FeatureRecord::from_fields("u9", &fields).unwrap();
        assert!(!record.risky);
        assert_eq!(record.reason, "LLM_Error");
    }

    #[test]
    fn rejects_unknown_flag_spelling() {
        let fields = HashMap::from([
            ("risky".to_string(), "None".to_string()),
            ("reason".to_string(), "x".to_string()),
        ]);
        let err = FeatureRecord::from_fields("u9", &fields).unwrap_err();
        assert!(matches!(err, StoreError::InvalidRecord { .. }));
    }

    #[test]
    fn serializes_flag_as_string() {
        let record = FeatureRecord::from_verdict("u1", &RiskVerdict::risky("threat"));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["risky"], "True");
        assert_eq!(json["user_id"], "u1");
    }
}
