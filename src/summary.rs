//! Per-instance summaries and the validation rows used for pre/post anonymization tables.

use crate::classify::{classify, Classification};
use crate::config::EquipmentCapture;
use crate::fields::{
    CONTRIBUTING_EQUIPMENT, EQUIPMENT_INSTITUTION_PLACEHOLDER, MANUFACTURER_PLACEHOLDER,
    MODIFIED_ATTRIBUTES, ORIGINAL_ATTRIBUTES,
};
use crate::nested::{read_nested_str, read_str, NestedFailure, NestedPath};
use crate::tags;
use chrono::NaiveDate;
use dicom_core::Tag;
use dicom_object::InMemDicomObject;
use serde::Serialize;

/// Value reported for a nested field that is not available.
pub const NOT_DEFINED: &str = "n.d.";

/// Value reported for the nested accession number when it cannot be read.
pub const DEFAULT_ACCESSION_NUMBER: &str = "default";

// accept hyphens too, even though that format is not compliant with the DICOM standard
const DATE_SUPPORTED_FORMATS: [&str; 2] = ["%Y%m%d", "%Y-%m-%d"];

/// Column names of a [`ValidationRow`]. Consumers rely on both the order and the
/// duplicated names.
pub const VALIDATION_COLUMNS: [&str; 27] = [
    "file",
    "Study Description",
    "Series Description",
    "Institute",
    "Inst Address",
    "Physicianname",
    "Performing Physician",
    "Stationname",
    "Opetratorsname",
    "Patientname",
    "Patientbirth",
    "Patientsex",
    "Patientsize",
    "Patientweight",
    "Patientaddress",
    "PatLocation",
    "AccessionNum",
    "Physician",
    "Patientname",
    "patID",
    "source_of_previous_vals",
    "manufacturer",
    "institute",
    "study_reason",
    "study_comments",
    "patient_location",
    "patient_history",
];

/// Identifying and administrative fields of one instance, together with its classification.
///
/// Owns all of its data, so it outlives the data set it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceSummary {
    pub modality: String,
    pub study_description: String,
    pub series_description: String,
    pub manufacturer: String,
    pub manufacturer_model_name: String,
    pub institution_name: String,
    pub institution_address: String,
    pub referring_physician_name: String,
    pub performing_physician_name: String,
    pub station_name: String,
    pub operators_name: String,
    pub patient_name: String,
    pub patient_id: String,
    pub patient_birth_date: String,
    pub patient_sex: String,
    pub patient_size: String,
    pub patient_weight: String,
    pub patient_address: String,
    pub reason_for_study: String,
    pub study_comments: String,
    pub current_patient_location: String,
    pub additional_patient_history: String,
    pub series_instance_uid: Option<String>,
    pub study_date: Option<NaiveDate>,
    pub classification: Classification,
}

impl InstanceSummary {
    /// Reads the summary of `obj`. Absent fields are empty strings.
    pub fn from_object(obj: &InMemDicomObject) -> Self {
        let field = |tag: Tag| read_str(obj, tag).unwrap_or_default();

        Self {
            modality: field(tags::MODALITY),
            study_description: field(tags::STUDY_DESCRIPTION),
            series_description: field(tags::SERIES_DESCRIPTION),
            manufacturer: field(tags::MANUFACTURER),
            manufacturer_model_name: field(tags::MANUFACTURER_MODEL_NAME),
            institution_name: field(tags::INSTITUTION_NAME),
            institution_address: field(tags::INSTITUTION_ADDRESS),
            referring_physician_name: field(tags::REFERRING_PHYSICIAN_NAME),
            performing_physician_name: field(tags::PERFORMING_PHYSICIAN_NAME),
            station_name: field(tags::STATION_NAME),
            operators_name: field(tags::OPERATORS_NAME),
            patient_name: field(tags::PATIENT_NAME),
            patient_id: field(tags::PATIENT_ID),
            patient_birth_date: field(tags::PATIENT_BIRTH_DATE),
            patient_sex: field(tags::PATIENT_SEX),
            patient_size: field(tags::PATIENT_SIZE),
            patient_weight: field(tags::PATIENT_WEIGHT),
            patient_address: field(tags::PATIENT_ADDRESS),
            reason_for_study: field(tags::REASON_FOR_STUDY),
            study_comments: field(tags::STUDY_COMMENTS),
            current_patient_location: field(tags::CURRENT_PATIENT_LOCATION),
            additional_patient_history: field(tags::ADDITIONAL_PATIENT_HISTORY),
            series_instance_uid: read_str(obj, tags::SERIES_INSTANCE_UID)
                .filter(|uid| !uid.is_empty()),
            study_date: read_str(obj, tags::STUDY_DATE).and_then(|date| parse_date(&date)),
            classification: classify(obj),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.classification.is_valid()
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    DATE_SUPPORTED_FORMATS
        .iter()
        .find_map(|&format| NaiveDate::parse_from_str(value, format).ok())
}

/// One row of a validation table, see [`VALIDATION_COLUMNS`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRow {
    pub file: String,
    pub study_description: String,
    pub series_description: String,
    pub institution_name: String,
    pub institution_address: String,
    pub referring_physician_name: String,
    pub performing_physician_name: String,
    pub station_name: String,
    pub operators_name: String,
    pub patient_name: String,
    pub patient_birth_date: String,
    pub patient_sex: String,
    pub patient_size: String,
    pub patient_weight: String,
    pub patient_address: String,
    pub original_patient_location: String,
    pub original_accession_number: String,
    pub original_physician_name: String,
    pub original_patient_name: String,
    pub original_patient_id: String,
    pub source_of_previous_values: String,
    pub equipment_manufacturer: String,
    pub equipment_institution: String,
    pub reason_for_study: String,
    pub study_comments: String,
    pub current_patient_location: String,
    pub additional_patient_history: String,
}

impl ValidationRow {
    /// Builds the row of `obj` reported under `file`.
    ///
    /// Reading never changes `obj`. Nested fields that cannot be read keep their default and
    /// are returned as failures, except the original patient location which is optional.
    pub fn extract(
        file: &str,
        summary: &InstanceSummary,
        obj: &InMemDicomObject,
        capture: EquipmentCapture,
    ) -> (Self, Vec<NestedFailure>) {
        let mut failures = Vec::new();
        let mut nested = |path: &NestedPath, leaf: Tag, default: &str| {
            read_nested_str(obj, path, leaf).unwrap_or_else(|error| {
                failures.push(NestedFailure::new(path, leaf, error));
                default.to_string()
            })
        };

        let (equipment_manufacturer, equipment_institution) =
            if has_element(obj, tags::CONTRIBUTING_EQUIPMENT_SEQUENCE) {
                match capture {
                    EquipmentCapture::CaptureBeforeWrite => (
                        nested(&CONTRIBUTING_EQUIPMENT, tags::MANUFACTURER, NOT_DEFINED),
                        nested(&CONTRIBUTING_EQUIPMENT, tags::INSTITUTION_NAME, NOT_DEFINED),
                    ),
                    EquipmentCapture::WriteOnly => (
                        MANUFACTURER_PLACEHOLDER.to_string(),
                        EQUIPMENT_INSTITUTION_PLACEHOLDER.to_string(),
                    ),
                }
            } else {
                (NOT_DEFINED.to_string(), NOT_DEFINED.to_string())
            };

        let mut original = OriginalAttributes::default();
        if has_element(obj, tags::ORIGINAL_ATTRIBUTES_SEQUENCE) {
            original.accession_number = nested(
                &MODIFIED_ATTRIBUTES,
                tags::ACCESSION_NUMBER,
                DEFAULT_ACCESSION_NUMBER,
            );
            original.physician_name =
                nested(&MODIFIED_ATTRIBUTES, tags::REFERRING_PHYSICIAN_NAME, NOT_DEFINED);
            original.patient_name = nested(&MODIFIED_ATTRIBUTES, tags::PATIENT_NAME, NOT_DEFINED);
            original.patient_id = nested(&MODIFIED_ATTRIBUTES, tags::PATIENT_ID, NOT_DEFINED);
            original.patient_location = read_nested_str(
                obj,
                &MODIFIED_ATTRIBUTES,
                tags::CURRENT_PATIENT_LOCATION,
            )
            .unwrap_or_else(|_| NOT_DEFINED.to_string());
            original.source_of_previous_values = nested(
                &ORIGINAL_ATTRIBUTES,
                tags::SOURCE_OF_PREVIOUS_VALUES,
                NOT_DEFINED,
            );
        }

        let row = Self {
            file: file.to_string(),
            study_description: summary.study_description.clone(),
            series_description: summary.series_description.clone(),
            institution_name: summary.institution_name.clone(),
            institution_address: summary.institution_address.clone(),
            referring_physician_name: summary.referring_physician_name.clone(),
            performing_physician_name: summary.performing_physician_name.clone(),
            station_name: summary.station_name.clone(),
            operators_name: summary.operators_name.clone(),
            patient_name: summary.patient_name.clone(),
            patient_birth_date: summary.patient_birth_date.clone(),
            patient_sex: summary.patient_sex.clone(),
            patient_size: summary.patient_size.clone(),
            patient_weight: summary.patient_weight.clone(),
            patient_address: summary.patient_address.clone(),
            original_patient_location: original.patient_location,
            original_accession_number: original.accession_number,
            original_physician_name: original.physician_name,
            original_patient_name: original.patient_name,
            original_patient_id: original.patient_id,
            source_of_previous_values: original.source_of_previous_values,
            equipment_manufacturer,
            equipment_institution,
            reason_for_study: summary.reason_for_study.clone(),
            study_comments: summary.study_comments.clone(),
            current_patient_location: summary.current_patient_location.clone(),
            additional_patient_history: summary.additional_patient_history.clone(),
        };
        (row, failures)
    }

    /// Values in [`VALIDATION_COLUMNS`] order.
    pub fn into_values(self) -> Vec<String> {
        vec![
            self.file,
            self.study_description,
            self.series_description,
            self.institution_name,
            self.institution_address,
            self.referring_physician_name,
            self.performing_physician_name,
            self.station_name,
            self.operators_name,
            self.patient_name,
            self.patient_birth_date,
            self.patient_sex,
            self.patient_size,
            self.patient_weight,
            self.patient_address,
            self.original_patient_location,
            self.original_accession_number,
            self.original_physician_name,
            self.original_patient_name,
            self.original_patient_id,
            self.source_of_previous_values,
            self.equipment_manufacturer,
            self.equipment_institution,
            self.reason_for_study,
            self.study_comments,
            self.current_patient_location,
            self.additional_patient_history,
        ]
    }
}

/// Fields of the Original Attributes Sequence as reported in a [`ValidationRow`].
struct OriginalAttributes {
    accession_number: String,
    physician_name: String,
    patient_name: String,
    patient_id: String,
    patient_location: String,
    source_of_previous_values: String,
}

impl Default for OriginalAttributes {
    fn default() -> Self {
        Self {
            accession_number: NOT_DEFINED.to_string(),
            physician_name: NOT_DEFINED.to_string(),
            patient_name: NOT_DEFINED.to_string(),
            patient_id: NOT_DEFINED.to_string(),
            patient_location: NOT_DEFINED.to_string(),
            source_of_previous_values: NOT_DEFINED.to_string(),
        }
    }
}

fn has_element(obj: &InMemDicomObject, tag: Tag) -> bool {
    obj.element_opt(tag).ok().flatten().is_some()
}

/// Table of validation rows, serialized as `{"columns": [...], "rows": [[...], ...]}`.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ValidationTable {
    columns: [&'static str; 27],
    rows: Vec<Vec<String>>,
}

impl Default for ValidationTable {
    fn default() -> Self {
        Self {
            columns: VALIDATION_COLUMNS,
            rows: Vec::new(),
        }
    }
}

impl ValidationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: ValidationRow) {
        self.rows.push(row.into_values());
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
