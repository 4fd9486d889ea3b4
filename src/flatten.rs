//! Flattening of a DICOM data set into an ordered list of [`TagRecord`]s.
//!
//! Each element yields one record whose `path` locates it inside the tree, e.g.
//! `SharedFunctionalGroupsSequence[0].MRScaleSlope`. Records are emitted depth-first in
//! the native order of the data set (ascending tag per level), so positional diffs between
//! two exports are meaningful.

use crate::config::Config;
use crate::format::format_value;
use dicom_core::header::Header;
use dicom_core::{DataDictionary, Tag, VR};
use dicom_dictionary_std::StandardDataDictionary;
use dicom_object::mem::InMemElement;
use dicom_object::InMemDicomObject;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SequenceReadError {
    #[error("value of {tag} is not a data set sequence")]
    NotASequence { tag: String },
}

/// One flattened data element.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TagRecord {
    pub path: String,
    pub tag: String,
    pub group: u16,
    pub element: u16,
    pub vr: String,
    pub name: String,
    pub keyword: String,
    pub value: String,
    pub vm: u32,
    pub private: bool,
}

/// Options controlling what [`flatten`] emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlattenOptions {
    pub include_private: bool,
    pub include_pixel_data: bool,
    pub max_value_length: usize,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self {
            include_private: true,
            include_pixel_data: false,
            max_value_length: 200,
        }
    }
}

impl From<&Config> for FlattenOptions {
    fn from(config: &Config) -> Self {
        Self {
            include_private: config.include_private(),
            include_pixel_data: config.include_pixel_data(),
            max_value_length: config.max_value_length(),
        }
    }
}

/// Renders a tag as `(GGGG,EEEE)`, uppercase and zero-padded.
pub fn format_tag(tag: Tag) -> String {
    format!("({:04X},{:04X})", tag.group(), tag.element())
}

pub(crate) fn is_private_tag(tag: &Tag) -> bool {
    // tags with odd group numbers are private tags
    tag.group() % 2 != 0
}

/// The dictionary keyword of a tag, empty when the tag is unknown.
pub fn tag_keyword(tag: Tag) -> &'static str {
    StandardDataDictionary
        .by_tag(tag)
        .map(|entry| entry.alias)
        .unwrap_or_default()
}

/// Human readable name derived from the keyword, e.g. `SOPInstanceUID` -> `SOP Instance UID`.
pub fn keyword_to_name(keyword: &str) -> String {
    let chars: Vec<char> = keyword.chars().collect();
    let mut name = String::with_capacity(keyword.len() + 8);
    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && c.is_uppercase() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower)
            {
                name.push(' ');
            }
        }
        name.push(c);
    }
    name
}

/// Flattens `obj` into one [`TagRecord`] per visited element.
///
/// Private elements (and everything nested in them) are skipped unless
/// `options.include_private` is set. A sequence element whose value cannot be walked gets
/// a second record carrying `<sequence read error: ...>` and its subtree is not visited.
pub fn flatten(obj: &InMemDicomObject, options: &FlattenOptions) -> Vec<TagRecord> {
    let mut records = Vec::new();
    walk(obj, "", options, &mut records);
    records
}

fn walk(obj: &InMemDicomObject, base_path: &str, options: &FlattenOptions, out: &mut Vec<TagRecord>) {
    for elem in obj.iter() {
        if is_private_tag(&elem.tag()) && !options.include_private {
            continue;
        }

        let record = make_record(elem, base_path, options);
        let path = record.path.clone();
        out.push(record);

        if elem.vr() != VR::SQ {
            continue;
        }

        match sequence_items(elem) {
            Ok(items) => {
                for (i, item) in items.iter().enumerate() {
                    walk(item, &format!("{path}[{i}]"), options, out);
                }
            }
            Err(e) => {
                let mut error_record = make_record(elem, base_path, options);
                error_record.value = format!("<sequence read error: {e}>");
                out.push(error_record);
            }
        }
    }
}

fn sequence_items(elem: &InMemElement) -> Result<&[InMemDicomObject], SequenceReadError> {
    elem.items().ok_or_else(|| SequenceReadError::NotASequence {
        tag: format_tag(elem.tag()),
    })
}

fn make_record(elem: &InMemElement, base_path: &str, options: &FlattenOptions) -> TagRecord {
    let tag = elem.tag();
    let tag_str = format_tag(tag);
    let keyword = tag_keyword(tag);
    // unknown (e.g. private) tags are named and addressed by their tag string
    let (segment, name) = if keyword.is_empty() {
        (tag_str.as_str(), tag_str.clone())
    } else {
        (keyword, keyword_to_name(keyword))
    };
    let path = if base_path.is_empty() {
        segment.to_string()
    } else {
        format!("{base_path}.{segment}")
    };

    TagRecord {
        path,
        name,
        tag: tag_str,
        group: tag.group(),
        element: tag.element(),
        vr: elem.vr().to_string().to_owned(),
        keyword: keyword.to_string(),
        value: format_value(elem, options.include_pixel_data, options.max_value_length),
        vm: elem.value().multiplicity(),
        private: is_private_tag(&tag),
    }
}

/// Console rendering of one record: `{path} {tag} [{vr}] = {value}`.
pub fn render_line(record: &TagRecord) -> String {
    format!(
        "{} {} [{}] = {}",
        record.path, record.tag, record.vr, record.value
    )
}

/// Pretty printed JSON array of `records`, in order.
pub fn to_json_pretty(records: &[TagRecord]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(records)
}
