use crate::tags;
use dicom_core::value::{DataSetSequence, PrimitiveValue, Value};
use dicom_core::{Length, VR};
use dicom_object::mem::InMemElement;
use dicom_object::meta::FileMetaTableBuilder;
use dicom_object::{DefaultDicomObject, FileDicomObject, FileMetaTable, InMemDicomObject};

pub(crate) fn make_file_meta() -> FileMetaTable {
    FileMetaTableBuilder::new()
        .media_storage_sop_class_uid("1.2.840.10008.5.1.4.1.1.2")
        .media_storage_sop_instance_uid("2.3.4")
        .transfer_syntax("1.2.840.10008.1.2.1") // Explicit VR Little Endian
        .build()
        .unwrap()
}

pub(crate) fn strs(values: &[&str]) -> PrimitiveValue {
    PrimitiveValue::Strs(values.iter().map(|s| s.to_string()).collect())
}

pub(crate) fn sequence(tag: dicom_core::Tag, items: Vec<InMemDicomObject>) -> InMemElement {
    InMemElement::new(tag, VR::SQ, DataSetSequence::new(items, Length::UNDEFINED))
}

fn put_str(obj: &mut InMemDicomObject, tag: dicom_core::Tag, vr: VR, value: &str) {
    obj.put(InMemElement::new(tag, vr, Value::from(value)));
}

/// A valid CT slice carrying every identifying field of the direct table.
pub(crate) fn ct_instance() -> InMemDicomObject {
    let mut obj = InMemDicomObject::new_empty();
    obj.put(InMemElement::new(
        tags::IMAGE_TYPE,
        VR::CS,
        strs(&["ORIGINAL", "PRIMARY", "AXIAL"]),
    ));
    put_str(&mut obj, tags::STUDY_DATE, VR::DA, "20240131");
    put_str(&mut obj, tags::MODALITY, VR::CS, "CT");
    put_str(&mut obj, tags::MANUFACTURER, VR::LO, "Acme Medical");
    put_str(&mut obj, tags::INSTITUTION_NAME, VR::LO, "General Hospital");
    put_str(&mut obj, tags::INSTITUTION_ADDRESS, VR::ST, "1 Main Street");
    put_str(&mut obj, tags::REFERRING_PHYSICIAN_NAME, VR::PN, "Doe^Jane");
    put_str(&mut obj, tags::STATION_NAME, VR::SH, "CT01");
    put_str(&mut obj, tags::STUDY_DESCRIPTION, VR::LO, "Thorax");
    put_str(&mut obj, tags::SERIES_DESCRIPTION, VR::LO, "Lung 1mm");
    put_str(&mut obj, tags::PERFORMING_PHYSICIAN_NAME, VR::PN, "Roe^Rick");
    put_str(&mut obj, tags::OPERATORS_NAME, VR::PN, "Smith^Sam");
    put_str(&mut obj, tags::MANUFACTURER_MODEL_NAME, VR::LO, "Scanner 3000");
    put_str(&mut obj, tags::PATIENT_NAME, VR::PN, "Doe^John");
    put_str(&mut obj, tags::PATIENT_ID, VR::LO, "P1");
    put_str(&mut obj, tags::PATIENT_BIRTH_DATE, VR::DA, "19700101");
    put_str(&mut obj, tags::PATIENT_SEX, VR::CS, "M");
    put_str(&mut obj, tags::PATIENT_SIZE, VR::DS, "1.75");
    put_str(&mut obj, tags::PATIENT_WEIGHT, VR::DS, "70");
    put_str(&mut obj, tags::PATIENT_ADDRESS, VR::LO, "2 Side Street");
    put_str(&mut obj, tags::ADDITIONAL_PATIENT_HISTORY, VR::LT, "None");
    put_str(&mut obj, tags::SLICE_THICKNESS, VR::DS, "2.5");
    put_str(&mut obj, tags::SERIES_INSTANCE_UID, VR::UI, "1.2.3.4.5");
    obj.put(InMemElement::new(
        tags::IMAGE_POSITION_PATIENT,
        VR::DS,
        strs(&["-100", "-120.5", "30"]),
    ));
    put_str(&mut obj, tags::REASON_FOR_STUDY, VR::LO, "Follow-up");
    put_str(&mut obj, tags::STUDY_COMMENTS, VR::LT, "Contrast");
    obj.put(InMemElement::new(tags::ROWS, VR::US, PrimitiveValue::from(512_u16)));
    obj.put(InMemElement::new(
        tags::COLUMNS,
        VR::US,
        PrimitiveValue::from(512_u16),
    ));
    obj.put(InMemElement::new(
        tags::PIXEL_SPACING,
        VR::DS,
        strs(&["0.5", "0.75"]),
    ));
    obj.put(InMemElement::new(
        tags::BITS_ALLOCATED,
        VR::US,
        PrimitiveValue::from(16_u16),
    ));
    put_str(&mut obj, tags::RESCALE_INTERCEPT, VR::DS, "-1024");
    put_str(&mut obj, tags::RESCALE_SLOPE, VR::DS, "1");
    put_str(&mut obj, tags::CURRENT_PATIENT_LOCATION, VR::LO, "Ward 3");
    obj
}

/// Adds the contributing equipment and original attributes containers with all nested
/// targets filled in.
pub(crate) fn with_nested_containers(mut obj: InMemDicomObject) -> InMemDicomObject {
    let mut equipment = InMemDicomObject::new_empty();
    put_str(&mut equipment, tags::MANUFACTURER, VR::LO, "Dose Vendor");
    put_str(&mut equipment, tags::INSTITUTION_NAME, VR::LO, "Dose Site");
    obj.put(sequence(
        tags::CONTRIBUTING_EQUIPMENT_SEQUENCE,
        vec![equipment],
    ));

    let mut modified = InMemDicomObject::new_empty();
    put_str(&mut modified, tags::ACCESSION_NUMBER, VR::SH, "ACC42");
    put_str(&mut modified, tags::REFERRING_PHYSICIAN_NAME, VR::PN, "Old^Doc");
    put_str(&mut modified, tags::PATIENT_NAME, VR::PN, "Old^Name");
    put_str(&mut modified, tags::PATIENT_ID, VR::LO, "OLD-ID");
    put_str(&mut modified, tags::CURRENT_PATIENT_LOCATION, VR::LO, "Old Ward");

    let mut original = InMemDicomObject::new_empty();
    put_str(&mut original, tags::SOURCE_OF_PREVIOUS_VALUES, VR::LO, "Old PACS");
    original.put(sequence(tags::MODIFIED_ATTRIBUTES_SEQUENCE, vec![modified]));
    obj.put(sequence(tags::ORIGINAL_ATTRIBUTES_SEQUENCE, vec![original]));
    obj
}

pub(crate) fn into_file_object(obj: InMemDicomObject) -> DefaultDicomObject {
    let mut file_obj: FileDicomObject<InMemDicomObject> =
        FileDicomObject::new_empty_with_meta(make_file_meta());
    for elem in obj {
        file_obj.put(elem);
    }
    file_obj
}
