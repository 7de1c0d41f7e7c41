use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// Version of the [`LooProperties`] record schema.
pub const SCHEMA_VERSION: u32 = 1;

/// Who may use a loo.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessPermission {
    #[serde(rename = "public")]
    Public,
    #[serde(rename = "permissive")]
    Permissive,
    #[serde(rename = "customers only")]
    CustomersOnly,
    #[serde(rename = "none")]
    Private,
}

impl fmt::Display for AccessPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Permissive => write!(f, "permissive"),
            Self::CustomersOnly => write!(f, "customers only"),
            Self::Private => write!(f, "none"),
        }
    }
}

/// Which facilities a loo provides.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Facilities {
    #[serde(rename = "female")]
    Female,
    #[serde(rename = "male")]
    Male,
    #[serde(rename = "female and male")]
    FemaleAndMale,
    #[serde(rename = "unisex")]
    Unisex,
    #[serde(rename = "male urinal")]
    MaleUrinal,
    #[serde(rename = "children only")]
    Children,
    #[serde(rename = "none")]
    None,
}

/// Named geographic grouping (council, borough, ...).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Area {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub area_type: Option<String>,
}

impl Area {
    pub fn new(name: impl Into<String>, area_type: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            area_type: Some(area_type.into()),
        }
    }
}

/// Semantic fields of a loo.
///
/// Every field is optional: the same shape carries the partial set of fields
/// submitted in a report (its diff) and the merged current state of a loo.
/// Absent fields are skipped on serialization so a diff shows exactly what
/// was submitted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LooProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<Vec<Area>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<AccessPermission>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub facilities: Option<Facilities>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessible_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baby_change: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radar: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attended: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automatic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removal_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Point>,
}

macro_rules! overwrite_present {
    ($target:expr, $diff:expr, $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = &$diff.$field {
                $target.$field = Some(value.clone());
            }
        )+
    };
}

impl LooProperties {
    /// Shallow per-field overwrite: every field present in `diff` replaces
    /// the current value, absent fields are left unchanged.
    pub fn merge(&mut self, diff: &LooProperties) {
        overwrite_present!(
            self,
            diff,
            name,
            area,
            access,
            facilities,
            opening,
            accessible,
            accessible_type,
            baby_change,
            radar,
            attended,
            automatic,
            fee,
            notes,
            removal_reason,
            active,
            geometry,
        );
    }

    /// Returns `true` if no field is present.
    pub fn is_empty(&self) -> bool {
        self.present_fields().is_empty()
    }

    /// Wire names of the fields that are present, in schema order.
    pub fn present_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        let mut mark = |present: bool, name: &'static str| {
            if present {
                fields.push(name);
            }
        };
        mark(self.name.is_some(), "name");
        mark(self.area.is_some(), "area");
        mark(self.access.is_some(), "access");
        mark(self.facilities.is_some(), "type");
        mark(self.opening.is_some(), "opening");
        mark(self.accessible.is_some(), "accessible");
        mark(self.accessible_type.is_some(), "accessibleType");
        mark(self.baby_change.is_some(), "babyChange");
        mark(self.radar.is_some(), "radar");
        mark(self.attended.is_some(), "attended");
        mark(self.automatic.is_some(), "automatic");
        mark(self.fee.is_some(), "fee");
        mark(self.notes.is_some(), "notes");
        mark(self.removal_reason.is_some(), "removalReason");
        mark(self.active.is_some(), "active");
        mark(self.geometry.is_some(), "geometry");
        fields
    }

    /// Trim free-text fields and drop the ones left blank. Area entries
    /// that end up with neither a name nor a type are dropped.
    pub fn normalized(mut self) -> Self {
        for field in [
            &mut self.name,
            &mut self.opening,
            &mut self.accessible_type,
            &mut self.fee,
            &mut self.notes,
            &mut self.removal_reason,
        ] {
            *field = normalize_text(field.take());
        }

        if let Some(areas) = self.area.take() {
            let areas = areas
                .into_iter()
                .map(|area| Area {
                    name: normalize_text(area.name),
                    area_type: normalize_text(area.area_type),
                })
                .filter(|area| area.name.is_some() || area.area_type.is_some())
                .collect();
            self.area = Some(areas);
        }

        self
    }
}

fn normalize_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn station_loo() -> LooProperties {
        LooProperties {
            name: Some("Station Loo".into()),
            access: Some(AccessPermission::Public),
            accessible: Some(true),
            active: Some(true),
            geometry: Some(Point::new(-0.1, 51.5)),
            ..Default::default()
        }
    }

    #[test]
    fn merge_overwrites_only_present_fields() {
        let mut state = station_loo();
        let diff = LooProperties {
            notes: Some("Closed for repair".into()),
            ..Default::default()
        };
        state.merge(&diff);

        assert_eq!(state.notes.as_deref(), Some("Closed for repair"));
        assert_eq!(state.name.as_deref(), Some("Station Loo"));
        assert_eq!(state.accessible, Some(true));
        assert_eq!(state.geometry, Some(Point::new(-0.1, 51.5)));
    }

    #[test]
    fn diff_serializes_only_submitted_fields() {
        let diff = LooProperties {
            notes: Some("Closed for repair".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&diff).unwrap();
        assert_eq!(json, serde_json::json!({ "notes": "Closed for repair" }));
    }

    #[test]
    fn wire_names_match_schema() {
        let props = LooProperties {
            facilities: Some(Facilities::FemaleAndMale),
            access: Some(AccessPermission::CustomersOnly),
            baby_change: Some(false),
            removal_reason: Some("Demolished".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&props).unwrap();
        assert_eq!(json["type"], "female and male");
        assert_eq!(json["access"], "customers only");
        assert_eq!(json["babyChange"], false);
        assert_eq!(json["removalReason"], "Demolished");
        assert_eq!(
            props.present_fields(),
            vec!["access", "type", "babyChange", "removalReason"]
        );
    }

    #[test]
    fn normalized_trims_and_drops_blank_text() {
        let props = LooProperties {
            name: Some("  Market Hall  ".into()),
            notes: Some("   ".into()),
            area: Some(vec![
                Area::new(" Norwich ", "District"),
                Area {
                    name: Some(" ".into()),
                    area_type: None,
                },
            ]),
            ..Default::default()
        }
        .normalized();

        assert_eq!(props.name.as_deref(), Some("Market Hall"));
        assert_eq!(props.notes, None);
        assert_eq!(props.area, Some(vec![Area::new("Norwich", "District")]));
    }

    #[test]
    fn empty_properties() {
        assert!(LooProperties::default().is_empty());
        assert!(!station_loo().is_empty());
    }

    proptest! {
        #[test]
        fn merging_a_diff_twice_is_idempotent(
            notes in proptest::option::of("[a-z ]{1,20}"),
            baby_change in proptest::option::of(any::<bool>()),
            radar in proptest::option::of(any::<bool>()),
        ) {
            let diff = LooProperties { notes, baby_change, radar, ..Default::default() };
            let mut once = station_loo();
            once.merge(&diff);
            let mut twice = once.clone();
            twice.merge(&diff);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn merge_never_clears_a_field(accessible in proptest::option::of(any::<bool>())) {
            let diff = LooProperties { accessible, ..Default::default() };
            let mut state = station_loo();
            state.merge(&diff);
            prop_assert!(state.accessible.is_some());
            prop_assert_eq!(state.name.as_deref(), Some("Station Loo"));
        }
    }
}
