//! Structured RFP record produced by the extractor
//!
//! Every optional scalar deserializes to `None` when missing, null, or blank.
//! Lists deserialize to empty when missing or null. Numbers and booleans are
//! accepted in their common string spellings since small models emit them
//! that way. Records and their nested records must be JSON objects; use
//! [`ExtractionSchema::from_json`] rather than `serde_json::from_value`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Structured information extracted from an RFP document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExtractionSchema {
    /// The name of the agency or organization issuing the RFP.
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub issuing_agency: Option<String>,

    /// The official RFP/solicitation identifier number, if found.
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub solicitation_number: Option<String>,

    /// Details regarding proposal submission.
    #[serde(default, deserialize_with = "lenient::opt_object")]
    pub submission_details: Option<SubmissionDetails>,

    /// Specific formatting rules for the proposal.
    #[serde(default, deserialize_with = "lenient::opt_object")]
    pub formatting_requirements: Option<FormattingRequirements>,

    /// List of key eligibility requirements extracted.
    #[serde(default, deserialize_with = "lenient::object_list")]
    pub eligibility_criteria: Vec<EligibilityRequirement>,
}

impl ExtractionSchema {
    /// Decode one record. Anything but a JSON object is rejected, at every
    /// nesting level.
    pub fn from_json(value: serde_json::Value) -> serde_json::Result<Self> {
        lenient::object(value)
    }
}

/// Result of merging per-chunk records; same shape as a single record.
pub type MergedExtraction = ExtractionSchema;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SubmissionDetails {
    /// The final date for submission (YYYY-MM-DD if possible, otherwise as stated).
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub deadline_date: Option<String>,

    /// The final time for submission (HH:MM if possible, include timezone if stated).
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub deadline_time: Option<String>,

    /// How the proposal must be submitted (e.g., electronically via portal, email, mail).
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub submission_method: Option<String>,
}

impl SubmissionDetails {
    pub fn is_empty(&self) -> bool {
        self.deadline_date.is_none()
            && self.deadline_time.is_none()
            && self.submission_method.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PageLimit {
    /// Specific section the limit applies to (e.g., 'technical volume', 'management plan', 'overall').
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub section: Option<String>,

    /// The maximum number of pages allowed for the section.
    #[serde(default, deserialize_with = "lenient::opt_count")]
    pub page_limit: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FormattingRequirements {
    /// List of page limit requirements for different sections.
    #[serde(default, deserialize_with = "lenient::object_list")]
    pub page_limits: Vec<PageLimit>,

    /// Required font specifications (e.g., 'Times New Roman 12pt', 'Arial 11pt').
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub font_details: Option<String>,

    /// Required line spacing (e.g., 'single', 'double', '1.5 lines').
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub line_spacing: Option<String>,

    /// Section titles explicitly required (e.g., 'Table of Contents', 'Executive Summary').
    #[serde(default, deserialize_with = "lenient::list")]
    pub required_sections: Vec<String>,
}

impl FormattingRequirements {
    pub fn is_empty(&self) -> bool {
        self.page_limits.is_empty()
            && self.font_details.is_none()
            && self.line_spacing.is_none()
            && self.required_sections.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EligibilityRequirement {
    /// Type of requirement (e.g., 'Certification', 'Registration', 'Experience', 'Insurance').
    #[serde(deserialize_with = "lenient::text")]
    pub requirement_type: String,

    /// Specific details of the requirement (e.g., 'ISO 9001', 'Registered in Virginia').
    #[serde(deserialize_with = "lenient::text")]
    pub details: String,

    /// True if stated as mandatory, false if preferred, null if unclear.
    #[serde(default, deserialize_with = "lenient::opt_flag")]
    pub is_mandatory: Option<bool>,
}

mod lenient {
    use serde::de::{DeserializeOwned, Error};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn describe(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "a boolean",
            Value::Number(_) => "a number",
            Value::String(_) => "a string",
            Value::Array(_) => "an array",
            Value::Object(_) => "an object",
        }
    }

    pub fn opt_text<'de, D>(d: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(d)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => {
                let s = s.trim();
                Ok((!s.is_empty()).then(|| s.to_string()))
            }
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(other) => Err(D::Error::custom(format!(
                "expected a string, found {}",
                describe(&other)
            ))),
        }
    }

    pub fn text<'de, D>(d: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(d)? {
            Value::String(s) => Ok(s.trim().to_string()),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(D::Error::custom(format!(
                "expected a string, found {}",
                describe(&other)
            ))),
        }
    }

    pub fn opt_count<'de, D>(d: D) -> Result<Option<u32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = match Option::<Value>::deserialize(d)? {
            None | Some(Value::Null) => return Ok(None),
            Some(v) => v,
        };
        let parsed = match &value {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
            Value::String(s) if s.trim().is_empty() => return Ok(None),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        };
        parsed
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| {
                D::Error::custom(format!("expected a page count, found {}", describe(&value)))
            })
    }

    pub fn opt_flag<'de, D>(d: D) -> Result<Option<bool>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(d)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(b)),
            Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(Some(true)),
                "false" | "no" | "0" => Ok(Some(false)),
                "" | "null" | "unknown" | "unclear" => Ok(None),
                other => Err(D::Error::custom(format!("expected a boolean, found '{}'", other))),
            },
            Some(other) => Err(D::Error::custom(format!(
                "expected a boolean, found {}",
                describe(&other)
            ))),
        }
    }

    /// Struct decoding restricted to objects. Derived visitors would also
    /// fill fields positionally from an array.
    pub fn object<T: DeserializeOwned>(value: Value) -> serde_json::Result<T> {
        match value {
            v @ Value::Object(_) => serde_json::from_value(v),
            other => Err(serde_json::Error::custom(format!(
                "expected an object, found {}",
                describe(&other)
            ))),
        }
    }

    pub fn opt_object<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        match Option::<Value>::deserialize(d)? {
            None | Some(Value::Null) => Ok(None),
            Some(v) => object(v).map(Some).map_err(D::Error::custom),
        }
    }

    pub fn object_list<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        match Option::<Value>::deserialize(d)? {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| object(item).map_err(D::Error::custom))
                .collect(),
            Some(other) => Err(D::Error::custom(format!(
                "expected a list, found {}",
                describe(&other)
            ))),
        }
    }

    pub fn list<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        match Option::<Value>::deserialize(d)? {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(v @ Value::Array(_)) => serde_json::from_value(v).map_err(D::Error::custom),
            Some(other) => Err(D::Error::custom(format!(
                "expected a list, found {}",
                describe(&other)
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_fields_default_to_absent() {
        let record = ExtractionSchema::from_json(json!({})).unwrap();
        assert_eq!(record, ExtractionSchema::default());

        let record = ExtractionSchema::from_json(json!({
            "issuing_agency": "",
            "eligibility_criteria": null,
            "formatting_requirements": { "page_limits": null }
        }))
        .unwrap();
        assert!(record.issuing_agency.is_none());
        assert!(record.eligibility_criteria.is_empty());
        assert!(record.formatting_requirements.unwrap().page_limits.is_empty());
    }

    #[test]
    fn test_lenient_scalars() {
        let record = ExtractionSchema::from_json(json!({
            "solicitation_number": 12345,
            "formatting_requirements": {
                "page_limits": [{ "section": "technical volume", "page_limit": "30" }]
            },
            "eligibility_criteria": [
                { "requirement_type": "Certification", "details": "ISO 9001", "is_mandatory": "yes" }
            ]
        }))
        .unwrap();
        assert_eq!(record.solicitation_number.as_deref(), Some("12345"));
        let limits = record.formatting_requirements.unwrap().page_limits;
        assert_eq!(limits[0].page_limit, Some(30));
        assert_eq!(record.eligibility_criteria[0].is_mandatory, Some(true));
    }

    #[test]
    fn test_schema_violations() {
        // Eligibility entries require both fields
        let missing = ExtractionSchema::from_json(json!({
            "eligibility_criteria": [{ "requirement_type": "Certification" }]
        }));
        assert!(missing.is_err());

        let wrong_type = ExtractionSchema::from_json(json!({
            "formatting_requirements": { "page_limits": [{ "page_limit": "thirty" }] }
        }));
        assert!(wrong_type.is_err());

        let not_object = ExtractionSchema::from_json(json!(["a", "b"]));
        assert!(not_object.is_err());
    }

    #[test]
    fn test_positional_arrays_rejected_when_nested() {
        let submission = ExtractionSchema::from_json(json!({
            "submission_details": ["2024-05-01", "14:00", "portal"]
        }));
        assert!(submission.is_err());

        let formatting = ExtractionSchema::from_json(json!({
            "formatting_requirements": [[], "Arial 11pt"]
        }));
        assert!(formatting.is_err());

        let page_limit = ExtractionSchema::from_json(json!({
            "formatting_requirements": { "page_limits": [["technical volume", 30]] }
        }));
        assert!(page_limit.is_err());

        let eligibility = ExtractionSchema::from_json(json!({
            "eligibility_criteria": [["Certification", "ISO 9001"]]
        }));
        assert!(eligibility.is_err());
    }

    #[test]
    fn test_json_schema_mentions_fields() {
        let schema = schemars::schema_for!(ExtractionSchema);
        let text = serde_json::to_string(&schema).unwrap();
        assert!(text.contains("solicitation_number"));
        assert!(text.contains("page_limit"));
        assert!(text.contains("requirement_type"));
    }
}
