//! Rendering of single data element values for display and export.

use dicom_core::header::Header;
use dicom_core::value::Value;
use dicom_core::VR;
use dicom_dictionary_std::tags;
use dicom_object::mem::InMemElement;
use thiserror::Error;

pub const SEQUENCE_PLACEHOLDER: &str = "<Sequence>";
pub const PIXEL_DATA_PLACEHOLDER: &str = "<PixelData omitted>";
pub const ELLIPSIS: char = '…';

/// Separator used between the values of a multi-valued element.
const MULTI_VALUE_SEPARATOR: &str = ", ";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    #[error("value of {vr} element is a data set sequence")]
    UnexpectedSequence { vr: String },

    #[error("encapsulated pixel data with {fragments} fragment(s)")]
    Encapsulated { fragments: usize },
}

pub(crate) fn truncate_to(n: usize, s: &str) -> String {
    s.chars().take(n).collect()
}

/// Shortens `s` to `max_length` characters followed by an ellipsis, if it is longer.
pub fn truncate_with_ellipsis(s: String, max_length: usize) -> String {
    if s.chars().count() > max_length {
        let mut truncated = truncate_to(max_length, &s);
        truncated.push(ELLIPSIS);
        truncated
    } else {
        s
    }
}

fn stringify(elem: &InMemElement) -> Result<String, FormatError> {
    match elem.value() {
        Value::Primitive(primitive) => Ok(primitive.to_multi_str().join(MULTI_VALUE_SEPARATOR)),
        Value::Sequence(_) => Err(FormatError::UnexpectedSequence {
            vr: elem.vr().to_string().to_owned(),
        }),
        Value::PixelSequence(pixel_sequence) => Err(FormatError::Encapsulated {
            fragments: pixel_sequence.fragments().len(),
        }),
    }
}

/// Renders the value of `elem` as a display string.
///
/// Never fails: values that cannot be rendered produce an `<unprintable: ...>` marker.
/// Sequences are never rendered, walking their items is up to [`crate::flatten`].
pub fn format_value(elem: &InMemElement, include_pixel_data: bool, max_length: usize) -> String {
    if elem.vr() == VR::SQ {
        return SEQUENCE_PLACEHOLDER.into();
    }
    if elem.tag() == tags::PIXEL_DATA && !include_pixel_data {
        return PIXEL_DATA_PLACEHOLDER.into();
    }

    let s = match stringify(elem) {
        Ok(s) => s,
        Err(e) => format!("<unprintable: {e}>"),
    };
    truncate_with_ellipsis(s, max_length)
}
