//! In-place de-identification of a data set.
//!
//! [`Anonymizer::anonymize`] runs three steps on a mutable data set:
//!
//! 1. the direct-field pass over [`DIRECT_FIELDS`], capturing the previous value of every
//!    field it finds;
//! 2. the nested pass over [`NESTED_TARGETS`], where each target is resolved and overwritten
//!    on its own and a failing target never stops the others;
//! 3. the removal of all private elements, at any depth.
//!
//! The resulting data set is written with [`Anonymizer::persist`].

use crate::config::Config;
use crate::fields::{DIRECT_FIELDS, NESTED_TARGETS};
use crate::flatten::{format_tag, is_private_tag};
use crate::nested::{read_str, update_item, NestedError, NestedFailure};
use dicom_core::header::Header;
use dicom_core::value::{PrimitiveValue, Value};
use dicom_core::Tag;
use dicom_object::{DefaultDicomObject, InMemDicomObject};
use log::debug;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum AnonymizationError {
    #[error("Persist error: {path}: {}", .message.to_lowercase())]
    PersistError { path: String, message: String },
}

pub type Result<T, E = AnonymizationError> = std::result::Result<T, E>;

/// A direct field found by the direct-field pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub tag: Tag,
    pub previous: String,
    pub current: String,
}

impl FieldChange {
    pub fn is_modified(&self) -> bool {
        self.previous != self.current
    }
}

/// Outcome of [`Anonymizer::anonymize`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnonymizationReport {
    pub changes: Vec<FieldChange>,
    pub failures: Vec<NestedFailure>,
    pub private_removed: usize,
}

/// Rewrites identifying fields of a data set with fixed placeholders.
///
/// # Example
///
/// ```
/// use dicom_audit::anonymizer::Anonymizer;
/// use dicom_audit::tags;
/// use dicom_core::{value::Value, VR};
/// use dicom_object::{mem::InMemElement, InMemDicomObject};
///
/// let mut obj = InMemDicomObject::from_element_iter([InMemElement::new(
///     tags::PATIENT_NAME,
///     VR::PN,
///     Value::from("Doe^John"),
/// )]);
///
/// let report = Anonymizer::default().anonymize(&mut obj);
/// assert_eq!(report.changes[0].previous, "Doe^John");
/// assert_eq!(report.changes[0].current, "Anonymized Patient");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anonymizer {
    remove_private_tags: bool,
}

impl Default for Anonymizer {
    fn default() -> Self {
        Self::new(true)
    }
}

impl From<&Config> for Anonymizer {
    fn from(config: &Config) -> Self {
        Self::new(config.remove_private_tags())
    }
}

impl Anonymizer {
    pub fn new(remove_private_tags: bool) -> Self {
        Self {
            remove_private_tags,
        }
    }

    /// Anonymizes `obj` in place.
    ///
    /// Never fails as a whole: nested targets that cannot be resolved are reported in
    /// [`AnonymizationReport::failures`].
    pub fn anonymize(&self, obj: &mut InMemDicomObject) -> AnonymizationReport {
        let changes = anonymize_direct_fields(obj);
        let failures = anonymize_nested_targets(obj);
        let private_removed = if self.remove_private_tags {
            strip_private_tags(obj)
        } else {
            0
        };

        AnonymizationReport {
            changes,
            failures,
            private_removed,
        }
    }

    /// Writes `obj` to `destination`, including its file meta group.
    pub fn persist(&self, obj: &DefaultDicomObject, destination: &Path) -> Result<()> {
        obj.write_to_file(destination)
            .map_err(|e| AnonymizationError::PersistError {
                path: destination.display().to_string(),
                message: e.to_string(),
            })
    }
}

/// Replaces the value of `tag` with `value`, keeping the element's VR.
fn overwrite(
    obj: &mut InMemDicomObject,
    tag: Tag,
    value: &str,
) -> std::result::Result<(), NestedError> {
    let found = obj.update_value(tag, |v| {
        if let Value::Primitive(p) = v {
            *p = PrimitiveValue::Str(value.into());
        }
    });
    if found {
        Ok(())
    } else {
        Err(NestedError::MissingElement(format_tag(tag)))
    }
}

fn anonymize_direct_fields(obj: &mut InMemDicomObject) -> Vec<FieldChange> {
    let mut changes = Vec::new();
    for field in DIRECT_FIELDS.iter() {
        let Some(previous) = read_str(obj, field.tag) else {
            continue;
        };
        let current = field.action.apply(&previous).to_string();
        if field.action.is_write() && overwrite(obj, field.tag, &current).is_err() {
            continue;
        }
        changes.push(FieldChange {
            tag: field.tag,
            previous,
            current,
        });
    }
    changes
}

fn anonymize_nested_targets(obj: &mut InMemDicomObject) -> Vec<NestedFailure> {
    let mut failures = Vec::new();
    for target in NESTED_TARGETS.iter() {
        let result = update_item(obj, target.path.0, &mut |item| {
            overwrite(item, target.leaf, target.placeholder)
        });
        if let Err(error) = result {
            let failure = NestedFailure::new(&target.path, target.leaf, error);
            debug!("nested target not anonymized: {failure}");
            failures.push(failure);
        }
    }
    failures
}

/// Removes private elements from `obj` and all nested items, returning how many were removed.
fn strip_private_tags(obj: &mut InMemDicomObject) -> usize {
    let before = obj.tags().count();
    obj.retain(|elem| !is_private_tag(&elem.tag()));
    let mut removed = before - obj.tags().count();

    let sequences: Vec<Tag> = obj
        .iter()
        .filter(|elem| elem.items().is_some())
        .map(|elem| elem.tag())
        .collect();
    for tag in sequences {
        obj.update_value(tag, |value| {
            if let Some(items) = value.items_mut() {
                removed += items.iter_mut().map(strip_private_tags).sum::<usize>();
            }
        });
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{CONTRIBUTING_EQUIPMENT, MODIFIED_ATTRIBUTES, ORIGINAL_ATTRIBUTES};
    use crate::nested::{read_nested_str, NestedPath};
    use crate::tags;
    use crate::test_utils::{ct_instance, into_file_object, sequence, with_nested_containers};
    use dicom_core::VR;
    use dicom_object::mem::InMemElement;
    use dicom_object::open_file;

    fn private_element(value: &str) -> InMemElement {
        InMemElement::new(Tag(0x0009, 0x1001), VR::LO, Value::from(value))
    }

    #[test]
    fn test_direct_fields() {
        let mut obj = ct_instance();
        let report = Anonymizer::default().anonymize(&mut obj);

        assert_eq!(read_str(&obj, tags::PATIENT_NAME).unwrap(), "Anonymized Patient");
        assert_eq!(read_str(&obj, tags::INSTITUTION_NAME).unwrap(), "Anonymized Institute");
        assert_eq!(
            read_str(&obj, tags::PERFORMING_PHYSICIAN_NAME).unwrap(),
            "Anomized perf. Physician"
        );
        assert_eq!(read_str(&obj, tags::PATIENT_SEX).unwrap(), "O");
        assert_eq!(read_str(&obj, tags::PATIENT_SIZE).unwrap(), "1.80");
        assert_eq!(read_str(&obj, tags::PATIENT_WEIGHT).unwrap(), "80");
        assert_eq!(
            read_str(&obj, tags::ADDITIONAL_PATIENT_HISTORY).unwrap(),
            "Anonymized Patient History"
        );
        // birth date is read, not rewritten; patient id is the grouping key
        assert_eq!(read_str(&obj, tags::PATIENT_BIRTH_DATE).unwrap(), "19700101");
        assert_eq!(read_str(&obj, tags::PATIENT_ID).unwrap(), "P1");

        assert_eq!(report.changes.len(), DIRECT_FIELDS.len());
        let name_change = report
            .changes
            .iter()
            .find(|change| change.tag == tags::PATIENT_NAME)
            .unwrap();
        assert_eq!(name_change.previous, "Doe^John");
        assert!(name_change.is_modified());
        let birth_change = report
            .changes
            .iter()
            .find(|change| change.tag == tags::PATIENT_BIRTH_DATE)
            .unwrap();
        assert!(!birth_change.is_modified());
    }

    #[test]
    fn test_keeps_vr() {
        let mut obj = ct_instance();
        Anonymizer::default().anonymize(&mut obj);
        assert_eq!(obj.element(tags::PATIENT_NAME).unwrap().vr(), VR::PN);
        assert_eq!(obj.element(tags::PATIENT_SIZE).unwrap().vr(), VR::DS);
    }

    #[test]
    fn test_absent_direct_fields_are_not_added() {
        let mut obj = ct_instance();
        obj.remove_element(tags::STATION_NAME);
        let report = Anonymizer::default().anonymize(&mut obj);
        assert!(obj.element_opt(tags::STATION_NAME).unwrap().is_none());
        assert!(report.changes.iter().all(|c| c.tag != tags::STATION_NAME));
    }

    #[test]
    fn test_idempotence() {
        let mut once = ct_instance();
        Anonymizer::default().anonymize(&mut once);

        let mut twice = once.clone();
        let report = Anonymizer::default().anonymize(&mut twice);

        assert_eq!(once, twice);
        assert!(report
            .changes
            .iter()
            .all(|change| !change.is_modified()));
    }

    #[test]
    fn test_nested_targets() {
        let mut obj = with_nested_containers(ct_instance());
        let report = Anonymizer::default().anonymize(&mut obj);
        assert!(report.failures.is_empty());

        let nested = |path: &NestedPath, tag: Tag| read_nested_str(&obj, path, tag).unwrap();
        assert_eq!(
            nested(&CONTRIBUTING_EQUIPMENT, tags::MANUFACTURER),
            "Anonymized Manufacturer"
        );
        assert_eq!(
            nested(&CONTRIBUTING_EQUIPMENT, tags::INSTITUTION_NAME),
            "Anonymized Institutename"
        );
        assert_eq!(nested(&MODIFIED_ATTRIBUTES, tags::ACCESSION_NUMBER), "0123456789");
        assert_eq!(nested(&MODIFIED_ATTRIBUTES, tags::PATIENT_ID), "Anonymized PatID");
        assert_eq!(
            nested(&MODIFIED_ATTRIBUTES, tags::CURRENT_PATIENT_LOCATION),
            "Anonymized Pat Location"
        );
        assert_eq!(
            nested(&ORIGINAL_ATTRIBUTES, tags::SOURCE_OF_PREVIOUS_VALUES),
            "Anonymized Source of Previous Values"
        );
    }

    #[test]
    fn test_missing_exposure_container() {
        let mut obj = with_nested_containers(ct_instance());
        obj.remove_element(tags::CONTRIBUTING_EQUIPMENT_SEQUENCE);
        let report = Anonymizer::default().anonymize(&mut obj);

        // one failure per target inside the missing container
        assert_eq!(report.failures.len(), 2);
        for failure in &report.failures {
            assert_eq!(
                failure.error,
                NestedError::MissingSequence("(0018,A001)".into())
            );
        }
        assert!(report.failures[0].target.starts_with("(0018,A001)[0]."));

        // everything else is still anonymized
        assert_eq!(read_str(&obj, tags::PATIENT_NAME).unwrap(), "Anonymized Patient");
        assert_eq!(read_str(&obj, tags::OPERATORS_NAME).unwrap(), "Anonymized Operator");
        assert_eq!(
            read_nested_str(&obj, &MODIFIED_ATTRIBUTES, tags::PATIENT_NAME).unwrap(),
            "Anonymized Patient"
        );
    }

    #[test]
    fn test_no_containers() {
        let mut obj = ct_instance();
        let report = Anonymizer::default().anonymize(&mut obj);
        assert_eq!(report.failures.len(), NESTED_TARGETS.len());
        assert_eq!(report.changes.len(), DIRECT_FIELDS.len());
    }

    #[test]
    fn test_missing_leaf() {
        let mut obj = ct_instance();
        obj.put(sequence(
            tags::CONTRIBUTING_EQUIPMENT_SEQUENCE,
            vec![InMemDicomObject::new_empty()],
        ));
        obj.remove_element(tags::ORIGINAL_ATTRIBUTES_SEQUENCE);
        let report = Anonymizer::default().anonymize(&mut obj);
        assert_eq!(
            report.failures[0].error,
            NestedError::MissingElement("(0008,0070)".into())
        );
        let item = crate::nested::resolve_item(&obj, &CONTRIBUTING_EQUIPMENT).unwrap();
        assert!(item.element_opt(tags::MANUFACTURER).unwrap().is_none());
    }

    #[test]
    fn test_strip_private_tags_recursively() {
        let mut item = InMemDicomObject::new_empty();
        item.put(private_element("nested"));
        item.put(InMemElement::new(
            tags::MANUFACTURER,
            VR::LO,
            Value::from("Vendor"),
        ));
        let mut obj = ct_instance();
        obj.put(private_element("top"));
        obj.put(sequence(tags::CONTRIBUTING_EQUIPMENT_SEQUENCE, vec![item]));

        let report = Anonymizer::default().anonymize(&mut obj);
        assert_eq!(report.private_removed, 2);
        assert!(obj.element_opt(Tag(0x0009, 0x1001)).unwrap().is_none());
        let item = crate::nested::resolve_item(&obj, &CONTRIBUTING_EQUIPMENT).unwrap();
        assert!(item.element_opt(Tag(0x0009, 0x1001)).unwrap().is_none());
        assert!(item.element_opt(tags::MANUFACTURER).unwrap().is_some());
    }

    #[test]
    fn test_keep_private_tags() {
        let mut obj = ct_instance();
        obj.put(private_element("top"));
        let report = Anonymizer::new(false).anonymize(&mut obj);
        assert_eq!(report.private_removed, 0);
        assert!(obj.element_opt(Tag(0x0009, 0x1001)).unwrap().is_some());
    }

    #[test]
    fn test_from_config() {
        let config = crate::config::ConfigBuilder::new()
            .remove_private_tags(false)
            .build()
            .unwrap();
        assert_eq!(Anonymizer::from(&config), Anonymizer::new(false));
    }

    #[test]
    fn test_persist() {
        let mut obj = into_file_object(ct_instance());
        Anonymizer::default().anonymize(&mut obj);

        let dir = std::env::temp_dir().join(format!("dicom-audit-persist-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let destination = dir.join("anonymized.dcm");
        Anonymizer::default().persist(&obj, &destination).unwrap();

        let reopened = open_file(&destination).unwrap();
        assert_eq!(
            read_str(&reopened, tags::PATIENT_NAME).unwrap(),
            "Anonymized Patient"
        );
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_persist_failure() {
        let obj = into_file_object(ct_instance());
        let destination = std::env::temp_dir()
            .join("dicom-audit-missing-dir")
            .join("nested")
            .join("out.dcm");
        let result = Anonymizer::default().persist(&obj, &destination);
        match result {
            Err(AnonymizationError::PersistError { path, .. }) => {
                assert_eq!(path, destination.display().to_string());
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
