use dicom_audit::tags;
use dicom_core::value::{DataSetSequence, PrimitiveValue, Value};
use dicom_core::{Length, Tag, VR};
use dicom_object::mem::InMemElement;
use dicom_object::meta::FileMetaTableBuilder;
use dicom_object::{DefaultDicomObject, FileDicomObject, InMemDicomObject};
use std::path::{Path, PathBuf};

/// A scratch directory below the system temp dir, removed on drop.
pub struct TempDir(PathBuf);

impl TempDir {
    pub fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!("dicom-audit-{name}-{}", std::process::id()));
        if path.exists() {
            std::fs::remove_dir_all(&path).unwrap();
        }
        std::fs::create_dir_all(&path).unwrap();
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

pub struct Instance<'a> {
    pub patient_id: &'a str,
    pub series_uid: Option<&'a str>,
    pub sop_instance_uid: &'a str,
    pub image_type: [&'a str; 3],
    pub series_description: &'a str,
}

impl Default for Instance<'_> {
    fn default() -> Self {
        Self {
            patient_id: "P1",
            series_uid: Some("1.2.3.1"),
            sop_instance_uid: "1.2.3.1.1",
            image_type: ["ORIGINAL", "PRIMARY", "AXIAL"],
            series_description: "Thorax",
        }
    }
}

fn put_str(obj: &mut InMemDicomObject, tag: Tag, vr: VR, value: &str) {
    obj.put(InMemElement::new(tag, vr, Value::from(value)));
}

pub fn make_instance(instance: &Instance) -> DefaultDicomObject {
    let meta = FileMetaTableBuilder::new()
        .media_storage_sop_class_uid("1.2.840.10008.5.1.4.1.1.2")
        .media_storage_sop_instance_uid(instance.sop_instance_uid)
        .transfer_syntax("1.2.840.10008.1.2.1") // Explicit VR Little Endian
        .build()
        .unwrap();
    let mut obj: FileDicomObject<InMemDicomObject> = FileDicomObject::new_empty_with_meta(meta);

    obj.put(InMemElement::new(
        tags::IMAGE_TYPE,
        VR::CS,
        PrimitiveValue::Strs(instance.image_type.map(String::from).to_vec().into()),
    ));
    put_str(&mut obj, tags::SOP_INSTANCE_UID, VR::UI, instance.sop_instance_uid);
    put_str(&mut obj, tags::STUDY_DATE, VR::DA, "20240131");
    put_str(&mut obj, tags::MODALITY, VR::CS, "MR");
    put_str(&mut obj, tags::MANUFACTURER, VR::LO, "Acme Medical");
    put_str(&mut obj, tags::INSTITUTION_NAME, VR::LO, "General Hospital");
    put_str(&mut obj, tags::SERIES_DESCRIPTION, VR::LO, instance.series_description);
    put_str(&mut obj, tags::MANUFACTURER_MODEL_NAME, VR::LO, "Magnet 1.5");
    put_str(&mut obj, tags::PATIENT_NAME, VR::PN, "Doe^John");
    put_str(&mut obj, tags::PATIENT_ID, VR::LO, instance.patient_id);
    put_str(&mut obj, tags::PATIENT_SEX, VR::CS, "M");
    if let Some(uid) = instance.series_uid {
        put_str(&mut obj, tags::SERIES_INSTANCE_UID, VR::UI, uid);
    }
    obj.put(InMemElement::new(
        tags::IMAGE_POSITION_PATIENT,
        VR::DS,
        PrimitiveValue::Strs(vec!["0", "0", "10"].into_iter().map(String::from).collect()),
    ));
    obj.put(InMemElement::new(tags::ROWS, VR::US, PrimitiveValue::from(4_u16)));
    obj.put(InMemElement::new(tags::COLUMNS, VR::US, PrimitiveValue::from(4_u16)));
    obj.put(InMemElement::new(
        tags::PIXEL_SPACING,
        VR::DS,
        PrimitiveValue::Strs(vec!["1", "1"].into_iter().map(String::from).collect()),
    ));
    obj.put(InMemElement::new(
        tags::BITS_ALLOCATED,
        VR::US,
        PrimitiveValue::from(16_u16),
    ));
    put_str(&mut obj, Tag(0x0009, 0x0010), VR::LO, "ACME PRIVATE");
    put_str(&mut obj, Tag(0x0009, 0x1001), VR::LO, "vendor secret");

    let mut modified = InMemDicomObject::new_empty();
    put_str(&mut modified, tags::PATIENT_NAME, VR::PN, "Old^Name");
    put_str(&mut modified, tags::PATIENT_ID, VR::LO, "OLD-ID");
    let mut original = InMemDicomObject::new_empty();
    original.put(InMemElement::new(
        tags::MODIFIED_ATTRIBUTES_SEQUENCE,
        VR::SQ,
        DataSetSequence::new(vec![modified], Length::UNDEFINED),
    ));
    obj.put(InMemElement::new(
        tags::ORIGINAL_ATTRIBUTES_SEQUENCE,
        VR::SQ,
        DataSetSequence::new(vec![original], Length::UNDEFINED),
    ));
    obj
}

pub fn write_instance(root: &Path, relative: &str, instance: &Instance) -> PathBuf {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    make_instance(instance).write_to_file(&path).unwrap();
    path
}
