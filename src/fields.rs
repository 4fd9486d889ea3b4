//! Fixed tables of identifying fields and their de-identified placeholders.

use crate::actions::Action;
use crate::nested::NestedPath;
use crate::tags;
use dicom_core::Tag;

/// First item of the Contributing Equipment Sequence `(0018,A001)`, which records the
/// equipment (and its site) involved in exposure and dose reporting.
pub const CONTRIBUTING_EQUIPMENT: NestedPath = NestedPath(&[tags::CONTRIBUTING_EQUIPMENT_SEQUENCE]);

/// First item of the Original Attributes Sequence `(0400,0561)`.
pub const ORIGINAL_ATTRIBUTES: NestedPath = NestedPath(&[tags::ORIGINAL_ATTRIBUTES_SEQUENCE]);

/// First item of the Modified Attributes Sequence `(0400,0550)` inside [`ORIGINAL_ATTRIBUTES`].
pub const MODIFIED_ATTRIBUTES: NestedPath = NestedPath(&[
    tags::ORIGINAL_ATTRIBUTES_SEQUENCE,
    tags::MODIFIED_ATTRIBUTES_SEQUENCE,
]);

pub const MANUFACTURER_PLACEHOLDER: &str = "Anonymized Manufacturer";
pub const EQUIPMENT_INSTITUTION_PLACEHOLDER: &str = "Anonymized Institutename";

/// A top-level field handled by the direct-field pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectField {
    pub tag: Tag,
    pub action: Action,
}

const fn replace(tag: Tag, placeholder: &'static str) -> DirectField {
    DirectField {
        tag,
        action: Action::Replace(placeholder),
    }
}

/// Top-level identifying fields, in the order they are processed.
pub const DIRECT_FIELDS: [DirectField; 16] = [
    replace(tags::INSTITUTION_NAME, "Anonymized Institute"),
    replace(tags::INSTITUTION_ADDRESS, "Anonymized Instituteaddress"),
    replace(tags::REFERRING_PHYSICIAN_NAME, "Anonymized Physician"),
    replace(tags::STATION_NAME, "Anonymized Station"),
    replace(tags::PERFORMING_PHYSICIAN_NAME, "Anomized perf. Physician"),
    replace(tags::OPERATORS_NAME, "Anonymized Operator"),
    replace(tags::PATIENT_NAME, "Anonymized Patient"),
    replace(tags::PATIENT_ADDRESS, "Anonymized Patient Address"),
    DirectField {
        tag: tags::PATIENT_BIRTH_DATE,
        action: Action::Keep,
    },
    // "O" (other) is the neutral category of the Patient's Sex code string
    replace(tags::PATIENT_SEX, "O"),
    replace(tags::PATIENT_SIZE, "1.80"),
    replace(tags::PATIENT_WEIGHT, "80"),
    replace(tags::REASON_FOR_STUDY, "Anonymized Reason"),
    replace(tags::STUDY_COMMENTS, "Anonymized Patient Comments"),
    replace(tags::CURRENT_PATIENT_LOCATION, "Anonymized Patient Location"),
    replace(tags::ADDITIONAL_PATIENT_HISTORY, "Anonymized Patient History"),
];

/// A field nested in structured content, overwritten by the nested pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NestedTarget {
    pub path: NestedPath,
    pub leaf: Tag,
    pub placeholder: &'static str,
}

pub const NESTED_TARGETS: [NestedTarget; 8] = [
    NestedTarget {
        path: CONTRIBUTING_EQUIPMENT,
        leaf: tags::MANUFACTURER,
        placeholder: MANUFACTURER_PLACEHOLDER,
    },
    NestedTarget {
        path: CONTRIBUTING_EQUIPMENT,
        leaf: tags::INSTITUTION_NAME,
        placeholder: EQUIPMENT_INSTITUTION_PLACEHOLDER,
    },
    NestedTarget {
        path: MODIFIED_ATTRIBUTES,
        leaf: tags::ACCESSION_NUMBER,
        placeholder: "0123456789",
    },
    NestedTarget {
        path: MODIFIED_ATTRIBUTES,
        leaf: tags::REFERRING_PHYSICIAN_NAME,
        placeholder: "Anonymized Physician",
    },
    NestedTarget {
        path: MODIFIED_ATTRIBUTES,
        leaf: tags::PATIENT_NAME,
        placeholder: "Anonymized Patient",
    },
    NestedTarget {
        path: MODIFIED_ATTRIBUTES,
        leaf: tags::PATIENT_ID,
        placeholder: "Anonymized PatID",
    },
    NestedTarget {
        path: MODIFIED_ATTRIBUTES,
        leaf: tags::CURRENT_PATIENT_LOCATION,
        placeholder: "Anonymized Pat Location",
    },
    NestedTarget {
        path: ORIGINAL_ATTRIBUTES,
        leaf: tags::SOURCE_OF_PREVIOUS_VALUES,
        placeholder: "Anonymized Source of Previous Values",
    },
];
