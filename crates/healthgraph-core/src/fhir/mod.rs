//! Typed FHIR input for the graph loader.

mod resources;

pub use resources::{
    Bundle, BundleEntry, CodeableConcept, Coding, Condition, HumanName, MedicationRequest,
    Patient, Reference, Resource,
};

const URN_UUID_PREFIX: &str = "urn:uuid:";

/// Extract the target id from a literal reference.
///
/// `Patient/p1` resolves to `p1` (suffix after the last `/`) and
/// `urn:uuid:abc` to `abc`. Returns `None` when no id can be extracted.
pub fn reference_id(reference: &str) -> Option<&str> {
    let reference = reference.trim();
    let id = match reference.strip_prefix(URN_UUID_PREFIX) {
        Some(uuid) => uuid,
        None => reference.rsplit('/').next().unwrap_or(reference),
    };
    let id = id.trim();
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_id() {
        assert_eq!(reference_id("Patient/p1"), Some("p1"));
        assert_eq!(reference_id("http://example.org/fhir/Patient/42"), Some("42"));
        assert_eq!(reference_id("urn:uuid:1b2c-3d"), Some("1b2c-3d"));
        assert_eq!(reference_id("p7"), Some("p7"));
    }

    #[test]
    fn test_malformed_reference() {
        assert_eq!(reference_id(""), None);
        assert_eq!(reference_id("   "), None);
        assert_eq!(reference_id("Patient/"), None);
        assert_eq!(reference_id("urn:uuid:"), None);
    }

    #[test]
    fn test_parse_bundle_with_unknown_resources() {
        let json = r#"{
            "resourceType": "Bundle",
            "type": "collection",
            "entry": [
                {"resource": {"resourceType": "Patient", "id": "p1", "gender": "female"}},
                {"resource": {"resourceType": "Observation", "id": "o1", "status": "final"}},
                {"fullUrl": "urn:uuid:x"}
            ]
        }"#;
        let bundle = Bundle::from_json(json).unwrap();
        assert_eq!(bundle.entry.len(), 3);
        assert!(matches!(bundle.entry[0].resource, Some(Resource::Patient(_))));
        assert!(matches!(bundle.entry[1].resource, Some(Resource::Other)));
        assert!(bundle.entry[2].resource.is_none());
    }

    #[test]
    fn test_primary_coding_skips_empty_codes() {
        let concept = CodeableConcept {
            coding: vec![
                Coding {
                    code: Some(" ".to_string()),
                    ..Coding::default()
                },
                Coding {
                    code: Some("E11".to_string()),
                    ..Coding::default()
                },
            ],
            text: None,
        };
        assert_eq!(concept.primary_coding().and_then(|c| c.code.as_deref()), Some("E11"));
    }
}
