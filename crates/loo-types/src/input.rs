use serde::{Deserialize, Serialize};

use crate::geometry::Location;
use crate::ids::LooId;
use crate::properties::LooProperties;

/// Payload of an add/edit submission.
///
/// `edit` names the loo being edited; it is absent for a new toilet.
/// `location` is required for a new toilet and optional for an edit.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit: Option<LooId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(flatten)]
    pub fields: LooProperties,
}

impl ReportInput {
    pub fn new_loo(location: Location, fields: LooProperties) -> Self {
        Self {
            edit: None,
            location: Some(location),
            fields,
        }
    }

    pub fn edit(target: LooId, fields: LooProperties) -> Self {
        Self {
            edit: Some(target),
            location: None,
            fields,
        }
    }

    /// Trim free text and drop blank values.
    pub fn normalized(self) -> Self {
        Self {
            fields: self.fields.normalized(),
            ..self
        }
    }
}

/// Payload of a removal submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalInput {
    pub edit: LooId,
    pub reason: String,
}

impl RemovalInput {
    pub fn new(edit: LooId, reason: impl Into<String>) -> Self {
        Self {
            edit,
            reason: reason.into(),
        }
    }

    pub fn normalized(self) -> Self {
        Self {
            reason: self.reason.trim().to_string(),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flat_submission_payload() {
        let json = serde_json::json!({
            "name": "Station Loo",
            "location": { "lat": 51.5, "lng": -0.1 },
            "accessible": true,
            "babyChange": false,
        });
        let input: ReportInput = serde_json::from_value(json).unwrap();
        assert_eq!(input.edit, None);
        assert_eq!(input.location, Some(Location::new(51.5, -0.1)));
        assert_eq!(input.fields.name.as_deref(), Some("Station Loo"));
        assert_eq!(input.fields.accessible, Some(true));
        assert_eq!(input.fields.baby_change, Some(false));
    }

    #[test]
    fn edit_target_parses_from_string() {
        let id = LooId::new();
        let json = serde_json::json!({ "edit": id.to_string(), "notes": "Closed for repair" });
        let input: ReportInput = serde_json::from_value(json).unwrap();
        assert_eq!(input.edit, Some(id));
        assert_eq!(input.location, None);
    }

    #[test]
    fn removal_reason_is_trimmed() {
        let input = RemovalInput::new(LooId::new(), "  Demolished ").normalized();
        assert_eq!(input.reason, "Demolished");
    }
}
