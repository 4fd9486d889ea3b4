//! Grouping of valid instances into series, and the series report.
//!
//! Groups are kept in first-seen order. The first summary inserted for a key stays the
//! representative of its series; later instances only add their file path.

use crate::actions::HashLength;
use crate::format::truncate_to;
use crate::hashing::{self, Hasher};
use crate::summary::InstanceSummary;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};

/// Patient identifier used for instances without a Patient ID.
pub const UNKNOWN_PATIENT: &str = "UNKNOWN_PATIENT";
const UNKNOWN_PATH_COMPONENT: &str = "unknown";
const PSEUDONYM_SEPARATOR: &str = "\\";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesKey {
    pub patient_id: String,
    pub series_id: String,
}

impl SeriesKey {
    pub fn new(patient_id: impl Into<String>, series_id: impl Into<String>) -> Self {
        Self {
            patient_id: patient_id.into(),
            series_id: series_id.into(),
        }
    }

    /// Key of an instance: its Patient ID (or [`UNKNOWN_PATIENT`]) and its Series Instance
    /// UID, falling back to the directory of the file relative to the input root.
    pub fn resolve(summary: &InstanceSummary, relative_dir: &str) -> Self {
        let patient_id = if summary.patient_id.is_empty() {
            UNKNOWN_PATIENT
        } else {
            summary.patient_id.as_str()
        };
        let series_id = summary
            .series_instance_uid
            .as_deref()
            .unwrap_or(relative_dir);
        Self::new(patient_id, series_id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesGroup {
    pub key: SeriesKey,
    /// Member files in insertion order.
    pub files: Vec<PathBuf>,
    pub representative: InstanceSummary,
    /// Directory of the first member, relative to the input root.
    pub relative_path: String,
}

impl SeriesGroup {
    /// First and second component of the relative path, e.g. `("patient01", "ct")`.
    pub fn path_names(&self) -> (String, String) {
        let mut components = Path::new(&self.relative_path)
            .components()
            .filter_map(|component| match component {
                Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
                _ => None,
            });
        let patient = components
            .next()
            .unwrap_or_else(|| UNKNOWN_PATH_COMPONENT.to_string());
        let series = components
            .next()
            .unwrap_or_else(|| UNKNOWN_PATH_COMPONENT.to_string());
        (patient, series)
    }
}

/// Derives pseudo-identifiers for patients and series.
#[derive(Debug, Clone, PartialEq)]
pub struct Pseudonymizer<H: Hasher> {
    hasher: H,
    length: HashLength,
}

impl<H: Hasher> Pseudonymizer<H> {
    pub fn new(hasher: H, length: HashLength) -> Self {
        Self { hasher, length }
    }

    pub fn patient_pseudo_id(&self, patient_id: &str) -> hashing::Result<String> {
        self.pseudonym(patient_id)
    }

    pub fn series_pseudo_id(&self, patient_id: &str, series_id: &str) -> hashing::Result<String> {
        self.pseudonym(&format!("{patient_id}{PSEUDONYM_SEPARATOR}{series_id}"))
    }

    fn pseudonym(&self, input: &str) -> hashing::Result<String> {
        let hash = self.hasher.hash(input)?;
        Ok(truncate_to(self.length.value(), &hash))
    }
}

/// One line of the series report.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SeriesRow {
    pub id: usize,
    pub pseudo_id: String,
    pub patient_pseudo_id: String,
    pub modality: String,
    pub manufacturer: String,
    pub device: String,
    pub series_description: String,
    pub patient: String,
    pub series: String,
    pub num_images: usize,
    pub series_path: String,
}

/// The series report as written to disk.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SeriesReport {
    pub patient_count: usize,
    pub series: Vec<SeriesRow>,
}

/// Collects instances into [`SeriesGroup`]s keyed by [`SeriesKey`].
#[derive(Debug, Clone, Default)]
pub struct SeriesGrouper {
    groups: Vec<SeriesGroup>,
    index: HashMap<SeriesKey, usize>,
}

impl SeriesGrouper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `file` to the group of `key`.
    ///
    /// Creates the group with `summary` as representative if the key is new, otherwise
    /// `summary` is dropped. Returns `true` if a new group was created.
    pub fn insert(
        &mut self,
        key: SeriesKey,
        file: PathBuf,
        relative_path: &str,
        summary: InstanceSummary,
    ) -> bool {
        if let Some(&i) = self.index.get(&key) {
            self.groups[i].files.push(file);
            return false;
        }

        self.index.insert(key.clone(), self.groups.len());
        self.groups.push(SeriesGroup {
            key,
            files: vec![file],
            representative: summary,
            relative_path: relative_path.to_string(),
        });
        true
    }

    pub fn get(&self, key: &SeriesKey) -> Option<&SeriesGroup> {
        self.index.get(key).map(|&i| &self.groups[i])
    }

    pub fn groups(&self) -> &[SeriesGroup] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of distinct patient identifiers over all groups.
    pub fn patient_count(&self) -> usize {
        self.groups
            .iter()
            .map(|group| group.key.patient_id.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    /// One report row per group, in first-seen order.
    pub fn rows<H: Hasher>(&self, pseudonymizer: &Pseudonymizer<H>) -> hashing::Result<Vec<SeriesRow>> {
        self.groups
            .iter()
            .enumerate()
            .map(|(id, group)| {
                let summary = &group.representative;
                let (patient, series) = group.path_names();
                Ok(SeriesRow {
                    id,
                    pseudo_id: pseudonymizer
                        .series_pseudo_id(&group.key.patient_id, &group.key.series_id)?,
                    patient_pseudo_id: pseudonymizer.patient_pseudo_id(&group.key.patient_id)?,
                    modality: summary.modality.clone(),
                    manufacturer: summary.manufacturer.clone(),
                    device: summary.manufacturer_model_name.clone(),
                    series_description: summary.series_description.clone(),
                    patient,
                    series,
                    num_images: group.files.len(),
                    series_path: group
                        .files
                        .first()
                        .map(|file| file.display().to_string())
                        .unwrap_or_default(),
                })
            })
            .collect()
    }

    pub fn report<H: Hasher>(&self, pseudonymizer: &Pseudonymizer<H>) -> hashing::Result<SeriesReport> {
        Ok(SeriesReport {
            patient_count: self.patient_count(),
            series: self.rows(pseudonymizer)?,
        })
    }
}
