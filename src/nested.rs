//! Access to values of a data set, including items nested in sequences.
//!
//! Nested fields are addressed by a [`NestedPath`]: a list of sequence tags, each step
//! descending into the first item of that sequence. Resolution is bounded by the length of
//! the path and reports which step failed instead of panicking.

use crate::flatten::format_tag;
use dicom_core::Tag;
use dicom_object::InMemDicomObject;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NestedError {
    #[error("sequence {0} not found")]
    MissingSequence(String),

    #[error("{0} is not a sequence")]
    NotASequence(String),

    #[error("sequence {0} has no items")]
    EmptySequence(String),

    #[error("element {0} not found")]
    MissingElement(String),
}

/// A nested field that could not be read or written, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct NestedFailure {
    /// Rendered as `{path}.{leaf}`, e.g. `(0400,0561)[0].(0400,0564) SourceOfPreviousValues`.
    pub target: String,
    pub error: NestedError,
}

impl NestedFailure {
    pub fn new(path: &NestedPath, leaf: Tag, error: NestedError) -> Self {
        Self {
            target: format!("{path}.{}", describe(leaf)),
            error,
        }
    }
}

impl fmt::Display for NestedFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.target, self.error)
    }
}

/// Path of "first item of sequence" steps leading to a nested data set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NestedPath(pub &'static [Tag]);

impl fmt::Display for NestedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, tag) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}[0]", format_tag(*tag))?;
        }
        Ok(())
    }
}

/// Resolves `path` starting at `obj`, returning the data set reached by the last step.
pub fn resolve_item<'a>(
    obj: &'a InMemDicomObject,
    path: &NestedPath,
) -> Result<&'a InMemDicomObject, NestedError> {
    let mut current = obj;
    for &tag in path.0 {
        let elem = current
            .element_opt(tag)
            .ok()
            .flatten()
            .ok_or_else(|| NestedError::MissingSequence(format_tag(tag)))?;
        let items = elem
            .items()
            .ok_or_else(|| NestedError::NotASequence(format_tag(tag)))?;
        current = items
            .first()
            .ok_or_else(|| NestedError::EmptySequence(format_tag(tag)))?;
    }
    Ok(current)
}

/// Applies `f` to the data set reached by `path`, descending through the first item of
/// each sequence with [`InMemDicomObject::update_value`].
///
/// The error of the first failing step, or the error returned by `f`, is returned.
pub fn update_item(
    obj: &mut InMemDicomObject,
    path: &[Tag],
    f: &mut dyn FnMut(&mut InMemDicomObject) -> Result<(), NestedError>,
) -> Result<(), NestedError> {
    let Some((&tag, rest)) = path.split_first() else {
        return f(obj);
    };

    let mut result = Err(NestedError::MissingSequence(format_tag(tag)));
    obj.update_value(tag, |value| {
        result = match value.items_mut() {
            None => Err(NestedError::NotASequence(format_tag(tag))),
            Some(items) => match items.first_mut() {
                None => Err(NestedError::EmptySequence(format_tag(tag))),
                Some(item) => update_item(item, rest, &mut *f),
            },
        };
    });
    result
}

/// String value of `tag`, trimmed, if the element is present and convertible.
pub fn read_str(obj: &InMemDicomObject, tag: Tag) -> Option<String> {
    obj.element_opt(tag)
        .ok()
        .flatten()
        .and_then(|elem| elem.to_str().ok())
        .map(|s| s.trim().to_string())
}

/// All string values of `tag`, trimmed.
pub fn read_multi_str(obj: &InMemDicomObject, tag: Tag) -> Option<Vec<String>> {
    obj.element_opt(tag)
        .ok()
        .flatten()
        .and_then(|elem| elem.to_multi_str().ok())
        .map(|values| values.iter().map(|s| s.trim().to_string()).collect())
}

/// String value of the leaf `tag` inside the item reached by `path`.
pub fn read_nested_str(
    obj: &InMemDicomObject,
    path: &NestedPath,
    tag: Tag,
) -> Result<String, NestedError> {
    let item = resolve_item(obj, path)?;
    let elem = item
        .element_opt(tag)
        .ok()
        .flatten()
        .ok_or_else(|| NestedError::MissingElement(format_tag(tag)))?;
    Ok(elem
        .to_str()
        .map(|s| s.trim().to_string())
        .unwrap_or_default())
}

/// Tag of the element, rendered for messages.
pub(crate) fn describe(elem_tag: Tag) -> String {
    format!("{} {}", format_tag(elem_tag), crate::flatten::tag_keyword(elem_tag))
        .trim_end()
        .to_string()
}
