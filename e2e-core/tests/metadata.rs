mod common;

use common::{key, patient, text_list, FileBuilder};
use e2e_core::chunk::{
    TYPE_DEVICE_NAME, TYPE_ENFACE_MODALITY, TYPE_EXAMINED_STRUCTURE, TYPE_EYE_DATA,
    TYPE_LATERALITY, TYPE_LOCALIZER, TYPE_OCT_MODALITY, TYPE_SCAN_PATTERN, TYPE_TIME_DATA,
};
use e2e_core::metadata::DeviceRecord;
use e2e_core::{E2eFile, Laterality};

fn laterality_payload(side: u8) -> Vec<u8> {
    let mut v = vec![0u8; 20];
    v[14] = side;
    v
}

fn eye_data(side: u8, iop: f64) -> Vec<u8> {
    let mut v = vec![side];
    for x in [iop, -1.25, 7.7, 0.0, 0.0, -0.5, 90.0, 0.0, 3.5] {
        v.extend_from_slice(&x.to_le_bytes());
    }
    v
}

#[test]
fn per_series_text_keeps_first_occurrence() {
    let a = key(1, 1, 1);
    let b = key(1, 1, 2);
    let bytes = FileBuilder::new()
        .chunk(a, 0, 0, TYPE_EXAMINED_STRUCTURE, text_list(&["Retina"], 32))
        .chunk(a, 0, 0, TYPE_EXAMINED_STRUCTURE, text_list(&["Cornea"], 32))
        .chunk(b, 0, 0, TYPE_EXAMINED_STRUCTURE, text_list(&["Optic Nerve"], 32))
        .chunk(a, 0, 0, TYPE_SCAN_PATTERN, text_list(&["Volume", "ignored"], 32))
        .chunk(a, 0, 0, TYPE_ENFACE_MODALITY, text_list(&["IR", "Infrared"], 32))
        .chunk(a, 0, 0, TYPE_OCT_MODALITY, text_list(&["OCT"], 32))
        .chunk(a, 0, 0, TYPE_OCT_MODALITY, text_list(&["Angio"], 32))
        .build();
    let meta = E2eFile::from_bytes(bytes).read_all_metadata().unwrap();
    assert_eq!(meta.examined_structure[&a], "Retina");
    assert_eq!(meta.examined_structure[&b], "Optic Nerve");
    assert_eq!(meta.scan_pattern[&a], "Volume");
    assert_eq!(meta.enface_modality[&a], "Infrared");
    assert_eq!(meta.oct_modality[&a], "OCT");
    assert_eq!(meta.oct_modality.len(), 1);
}

#[test]
fn enface_modality_without_second_string_is_skipped() {
    let a = key(1, 1, 1);
    let bytes = FileBuilder::new()
        .chunk(a, 0, 0, TYPE_ENFACE_MODALITY, text_list(&["IR"], 32))
        .build();
    let meta = E2eFile::from_bytes(bytes).read_all_metadata().unwrap();
    assert!(meta.enface_modality.is_empty());
}

#[test]
fn other_categories_accumulate() {
    let a = key(1, 1, 1);
    let bytes = FileBuilder::new()
        .patient(key(1, 0, 0), patient("Ann", "Lee", 19_800_517, "F", "P1"))
        .patient(key(1, 0, 0), patient("Ann", "Lee", 19_800_517, "F", "P1"))
        .chunk(a, 0, 0, TYPE_DEVICE_NAME, text_list(&["Spectralis"], 32))
        .chunk(a, 0, 0, TYPE_DEVICE_NAME, text_list(&["Spectralis"], 32))
        .chunk(a, 0, 0, TYPE_LATERALITY, laterality_payload(b'L'))
        .chunk(a, 0, 0, TYPE_EYE_DATA, eye_data(b'R', 15.0))
        .chunk(a, 0, 0, TYPE_LOCALIZER, vec![0xde, 0xad])
        .chunk(a, 0, 0, TYPE_TIME_DATA, vec![1, 2, 3])
        .chunk(a, 0, 0, 52, b"1.2.276.0.75\0\0\0\0".to_vec())
        .chunk(a, 0, 0, 1005, b"Heidelberg Engineering".to_vec())
        .chunk(a, 0, 0, 1007, vec![9, 9])
        .bscan(a, 0, 0.0039, 0)
        .fundus(a, 1, 1, 5)
        .oct(a, 0, 1, 1, common::CODE_ONE)
        .contour(a, 0, 2, &[1.0, 2.0])
        .build();
    let meta = E2eFile::from_bytes(bytes).read_all_metadata().unwrap();
    assert_eq!(meta.patient_data.len(), 2);
    assert_eq!(meta.device_data.len(), 2);
    assert_eq!(meta.laterality_data.len(), 1);
    assert_eq!(meta.laterality_data[0].laterality, Some(Laterality::Left));
    assert_eq!(meta.eye_data[0].eye_side, "R");
    assert_eq!(meta.eye_data[0].iop_mmhg, 15.0);
    assert_eq!(meta.eye_data[0].pupil_size_mm, 3.5);
    assert_eq!(meta.localizer[0].bytes, vec![0xde, 0xad]);
    assert_eq!(meta.time_data[0].bytes, vec![1, 2, 3]);
    assert_eq!(meta.uid_data[0].uid, "1.2.276.0.75");
    assert_eq!(meta.uid_data[0].chunk_type, 52);
    assert_eq!(meta.additional_device_data.len(), 2);
    assert!(matches!(
        &meta.additional_device_data[0],
        DeviceRecord::Text(t) if t.text == "Heidelberg Engineering"
    ));
    assert!(matches!(
        &meta.additional_device_data[1],
        DeviceRecord::Raw(r) if r.chunk_type == 1007
    ));
    assert_eq!(meta.bscan_data.len(), 1);
    assert_eq!(meta.fundus_data.len(), 1);
    assert_eq!(meta.image_data.len(), 1);
    assert_eq!(meta.contour_data.len(), 1);
    assert_eq!(meta.contour_data[0].width, 2);
}

#[test]
fn json_dump_uses_series_key_strings_and_hex_bytes() {
    let a = key(3, 4, 5);
    let bytes = FileBuilder::new()
        .chunk(a, 0, 0, TYPE_EXAMINED_STRUCTURE, text_list(&["Retina"], 32))
        .chunk(a, 0, 0, TYPE_LOCALIZER, vec![0xde, 0xad, 0x01])
        .fundus(a, 1, 1, 5)
        .build();
    let meta = E2eFile::from_bytes(bytes).read_all_metadata().unwrap();
    let json: serde_json::Value = serde_json::from_str(&meta.to_json_pretty().unwrap()).unwrap();
    assert_eq!(json["examined_structure"]["3_4_5"], "Retina");
    assert_eq!(json["localizer"][0]["bytes"], "dead01");
    assert_eq!(json["fundus_data"][0]["type"], 0);
    assert_eq!(json["fundus_data"][0]["width"], 1);
}
