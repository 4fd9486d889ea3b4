//! Auditing and de-identification of DICOM metadata.
//!
//! The crate reads DICOM data sets with [`dicom_object`] and
//!
//! * flattens them into ordered [`TagRecord`]s for export ([`flatten`]),
//! * decides whether an instance is primary image content and derives its geometry
//!   ([`classify`]),
//! * rewrites identifying fields, including fields nested in sequences ([`Anonymizer`]),
//! * groups valid instances into series with pseudonymous identifiers ([`SeriesGrouper`]).
//!
//! [`Pipeline`] ties these together for a directory of files.
//!
//! # Example
//!
//! ```
//! use dicom_audit::{classify, flatten, tags, FlattenOptions};
//! use dicom_core::{value::Value, VR};
//! use dicom_object::{mem::InMemElement, InMemDicomObject};
//!
//! let obj = InMemDicomObject::from_element_iter([
//!     InMemElement::new(tags::MODALITY, VR::CS, Value::from("CT")),
//!     InMemElement::new(tags::PATIENT_ID, VR::LO, Value::from("P1")),
//! ]);
//!
//! let records = flatten(&obj, &FlattenOptions::default());
//! assert_eq!(records[0].path, "Modality");
//! assert_eq!(records[1].value, "P1");
//!
//! // no Image Type, so not usable for series statistics
//! assert!(!classify(&obj).is_valid());
//! ```

pub mod actions;
pub mod anonymizer;
pub mod classify;
pub mod config;
pub mod fields;
pub mod flatten;
pub mod format;
pub mod hashing;
pub mod log_sink;
pub mod nested;
pub mod pipeline;
pub mod series;
pub mod summary;

#[cfg(test)]
mod test_utils;

pub use anonymizer::{AnonymizationReport, Anonymizer};
pub use classify::{classify, Classification};
pub use config::{Config, ConfigBuilder};
pub use dicom_dictionary_std::tags;
pub use flatten::{flatten, FlattenOptions, TagRecord};
pub use format::format_value;
pub use pipeline::{BatchReport, Pipeline};
pub use series::{Pseudonymizer, SeriesGrouper, SeriesKey};
pub use summary::{InstanceSummary, ValidationRow};
