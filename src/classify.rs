//! Decides whether an instance is eligible for series statistics and derives its geometry.
//!
//! Classification is a one-shot transition from "unclassified" to either
//! [`Classification::Valid`] or [`Classification::Invalid`]. Secondary captures, dose
//! reports and localizers are rejected by image type so they never count as primary
//! diagnostic content.

use crate::flatten::format_tag;
use crate::nested::{read_multi_str, read_str};
use crate::tags;
use dicom_core::Tag;
use dicom_object::InMemDicomObject;
use thiserror::Error;

/// Image Type values of instances that are never treated as primary content.
pub const EXCLUDED_IMAGE_TYPES: [[&str; 3]; 5] = [
    ["DERIVED", "SECONDARY", "PATIENT_INFO"],
    ["ORIGINAL", "PRIMARY", "LOCALIZER"],
    ["DERIVED", "SECONDARY", "DOSE_INFO"],
    ["DERIVED", "SECONDARY", "EXECUTED_SURVIEW"],
    ["DERIVED", "SECONDARY", "REF_SURVIEW"],
];

const SEGMENTATION_MODALITY: &str = "SEG";
/// Modalities with volumetric geometry; `MRT` is a legacy alias of `MR`.
const VOLUMETRIC_MODALITIES: [&str; 3] = ["CT", "MR", "MRT"];
const DEFAULT_SLICE_THICKNESS: f64 = 1.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidReason {
    #[error("image type tag missing")]
    MissingImageType,

    #[error("excluded image type {}", .0.join("\\"))]
    ExcludedImageType(Vec<String>),

    #[error("geometry derivation failed: {0}")]
    Geometry(#[from] GeometryError),

    #[error("required field {0} missing")]
    MissingField(String),
}

impl InvalidReason {
    /// Whether the instance was rejected because its data could not be used, rather than
    /// excluded for its image type.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Geometry(_) | Self::MissingField(_))
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("{0} missing")]
    Missing(String),

    #[error("{tag} holds {found} numeric value(s), expected at least {expected}")]
    WrongMultiplicity {
        tag: String,
        found: usize,
        expected: usize,
    },

    #[error("{tag} is not numeric")]
    NotNumeric { tag: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rescale {
    pub slope: f64,
    pub intercept: f64,
}

/// Geometry derived for a valid instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    pub slice_thickness: f64,
    /// `[row spacing, column spacing, slice thickness]`, volumetric modalities only.
    pub voxel_size: Option<[f64; 3]>,
    /// CT only.
    pub rescale: Option<Rescale>,
}

/// Fields every valid instance provides.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInfo {
    pub patient_id: String,
    pub study_date: String,
    /// `[rows, columns, 1]`
    pub image_size: [u32; 3],
    /// `uint{BitsAllocated}`, e.g. `uint16`
    pub datatype: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Valid { geometry: Geometry, image: ImageInfo },
    Invalid(InvalidReason),
}

impl Classification {
    pub fn is_valid(&self) -> bool {
        matches!(self, Classification::Valid { .. })
    }

    pub fn geometry(&self) -> Option<&Geometry> {
        match self {
            Classification::Valid { geometry, .. } => Some(geometry),
            Classification::Invalid(_) => None,
        }
    }

    pub fn image(&self) -> Option<&ImageInfo> {
        match self {
            Classification::Valid { image, .. } => Some(image),
            Classification::Invalid(_) => None,
        }
    }

    pub fn invalid_reason(&self) -> Option<&InvalidReason> {
        match self {
            Classification::Valid { .. } => None,
            Classification::Invalid(reason) => Some(reason),
        }
    }

    /// Slice thickness to report; zero for invalid instances.
    pub fn slice_thickness(&self) -> f64 {
        self.geometry().map_or(0.0, |g| g.slice_thickness)
    }
}

pub fn is_excluded_image_type(image_type: &[String]) -> bool {
    EXCLUDED_IMAGE_TYPES
        .iter()
        .any(|excluded| image_type.iter().map(String::as_str).eq(excluded.iter().copied()))
}

/// Classifies `obj`. Never fails: every input ends up either valid or invalid.
pub fn classify(obj: &InMemDicomObject) -> Classification {
    match try_classify(obj) {
        Ok((geometry, image)) => Classification::Valid { geometry, image },
        Err(reason) => Classification::Invalid(reason),
    }
}

fn try_classify(obj: &InMemDicomObject) -> Result<(Geometry, ImageInfo), InvalidReason> {
    let image_type =
        read_multi_str(obj, tags::IMAGE_TYPE).ok_or(InvalidReason::MissingImageType)?;
    if is_excluded_image_type(&image_type) {
        return Err(InvalidReason::ExcludedImageType(image_type));
    }

    let modality = read_str(obj, tags::MODALITY).unwrap_or_default();
    let geometry = if modality == SEGMENTATION_MODALITY {
        Geometry {
            slice_thickness: 0.0,
            voxel_size: None,
            rescale: None,
        }
    } else {
        derive_geometry(obj, &modality)?
    };

    let image = read_image_info(obj)?;
    Ok((geometry, image))
}

fn derive_geometry(obj: &InMemDicomObject, modality: &str) -> Result<Geometry, GeometryError> {
    let mut geometry = Geometry {
        slice_thickness: DEFAULT_SLICE_THICKNESS,
        voxel_size: None,
        rescale: None,
    };

    if VOLUMETRIC_MODALITIES.contains(&modality) {
        let slice_thickness = positional_slice_thickness(obj)?;
        let spacing = read_floats(obj, tags::PIXEL_SPACING, 2)?;
        geometry.slice_thickness = slice_thickness;
        geometry.voxel_size = Some([spacing[0], spacing[1], slice_thickness]);
    }

    if modality == "CT" {
        geometry.rescale = Some(Rescale {
            slope: read_float(obj, tags::RESCALE_SLOPE)?,
            intercept: read_float(obj, tags::RESCALE_INTERCEPT)?,
        });
    }

    Ok(geometry)
}

/// Slice thickness of a single instance from its positional metadata.
///
/// A single image position carries no spacing to the neighbouring slice, so the
/// position only gates the derivation. The declared Slice Thickness is used when it
/// holds a number, otherwise the thickness is zero (the attribute is type 2 and may be
/// present without a value).
fn positional_slice_thickness(obj: &InMemDicomObject) -> Result<f64, GeometryError> {
    read_floats(obj, tags::IMAGE_POSITION_PATIENT, 3)?;
    Ok(obj
        .element_opt(tags::SLICE_THICKNESS)
        .ok()
        .flatten()
        .and_then(|elem| elem.to_float64().ok())
        .map(f64::abs)
        .unwrap_or(0.0))
}

fn read_floats(obj: &InMemDicomObject, tag: Tag, expected: usize) -> Result<Vec<f64>, GeometryError> {
    let elem = obj
        .element_opt(tag)
        .ok()
        .flatten()
        .ok_or_else(|| GeometryError::Missing(format_tag(tag)))?;
    let values = elem
        .to_multi_float64()
        .map_err(|_| GeometryError::NotNumeric {
            tag: format_tag(tag),
        })?;
    if values.len() < expected {
        return Err(GeometryError::WrongMultiplicity {
            tag: format_tag(tag),
            found: values.len(),
            expected,
        });
    }
    Ok(values)
}

fn read_float(obj: &InMemDicomObject, tag: Tag) -> Result<f64, GeometryError> {
    Ok(read_floats(obj, tag, 1)?[0])
}

fn read_image_info(obj: &InMemDicomObject) -> Result<ImageInfo, InvalidReason> {
    let required = |tag: Tag| {
        read_str(obj, tag).ok_or_else(|| InvalidReason::MissingField(format_tag(tag)))
    };
    let required_int = |tag: Tag| {
        obj.element_opt(tag)
            .ok()
            .flatten()
            .and_then(|elem| elem.to_int::<u32>().ok())
            .ok_or_else(|| InvalidReason::MissingField(format_tag(tag)))
    };

    Ok(ImageInfo {
        patient_id: required(tags::PATIENT_ID)?,
        study_date: required(tags::STUDY_DATE)?,
        image_size: [required_int(tags::ROWS)?, required_int(tags::COLUMNS)?, 1],
        datatype: format!("uint{}", required_int(tags::BITS_ALLOCATED)?),
    })
}
