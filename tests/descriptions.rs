use mediameta::descriptor::{
    Rule, TagDef, Vocabulary, enum_description, format_fixed_16_16, format_hex, illegal_value,
    indexed_description,
};
use mediameta::directory::{Directory, TagValue};
use mediameta::metadata::Metadata;

static SAMPLE: Vocabulary = Vocabulary {
    name: "Sample",
    tags: &[
        TagDef { id: 1, name: "Mode", rule: Rule::Enum(&[(0, "Off"), (1, "On")]) },
        TagDef { id: 2, name: "Mask", rule: Rule::BitMask { digits: 8 } },
        TagDef { id: 3, name: "Role", rule: Rule::Indexed { base: 1, labels: &["First", "Second"] } },
        TagDef { id: 4, name: "Gamma", rule: Rule::Fixed1616 },
        TagDef { id: 5, name: "Width", rule: Rule::Suffix("pixels") },
        TagDef { id: 6, name: "Blob", rule: Rule::ByteLength },
        TagDef { id: 7, name: "Shout", rule: Rule::Custom(shout) },
    ],
};

fn shout(dir: &Directory, tag: i32) -> Option<String> {
    dir.get_string(tag).map(|s| s.to_uppercase())
}

fn with(values: &[(i32, TagValue)]) -> Metadata {
    let mut m = Metadata::new();
    let id = m.add_directory(&SAMPLE, None);
    let d = m.directory_mut(id).unwrap();
    for (tag, v) in values {
        d.set(*tag, v.clone());
    }
    m
}

fn describe(values: &[(i32, TagValue)], tag: i32) -> Option<String> {
    let m = with(values);
    m.first_of(&SAMPLE).unwrap().description(tag)
}

#[test]
fn fixed_point_16_16() {
    assert_eq!(format_fixed_16_16(0x0001_8000), "1.5");
    assert_eq!(format_fixed_16_16(0), "0");
    assert_eq!(format_fixed_16_16(0x0002_2000), "2.125");
    assert_eq!(format_fixed_16_16(0x0000_0001), "0");
    assert_eq!(describe(&[(4, TagValue::Int(0x0001_8000))], 4).as_deref(), Some("1.5"));
}

#[test]
fn bit_mask_hex() {
    assert_eq!(format_hex(255, 8), "0x000000FF");
    assert_eq!(format_hex(-1, 8), "0xFFFFFFFF");
    assert_eq!(describe(&[(2, TagValue::Int(0x00FF_0000))], 2).as_deref(), Some("0x00FF0000"));
}

#[test]
fn enum_lookup_and_illegal_values() {
    assert_eq!(describe(&[(1, TagValue::Int(1))], 1).as_deref(), Some("On"));
    assert_eq!(describe(&[(1, TagValue::Int(0x1F))], 1).as_deref(), Some("Illegal value 0x1f"));
    assert_eq!(enum_description(2, &[(2, "Two")]), "Two");
    assert_eq!(illegal_value(-2), "Illegal value 0xfffffffe");
}

#[test]
fn indexed_strings() {
    assert_eq!(indexed_description(2, 1, &["a", "b"]), Some("b"));
    assert_eq!(indexed_description(0, 1, &["a", "b"]), None);
    assert_eq!(indexed_description(3, 1, &["a", "b"]), None);
    assert_eq!(indexed_description(i64::MIN, 1, &["a"]), None);

    let m = with(&[(3, TagValue::Int(1))]);
    let d = m.first_of(&SAMPLE).unwrap();
    let first = d.description(3);
    assert_eq!(first.as_deref(), Some("First"));
    assert_eq!(d.description(3), first);

    assert_eq!(describe(&[(3, TagValue::Int(9))], 3), None);
}

#[test]
fn suffix_length_and_custom() {
    assert_eq!(describe(&[(5, TagValue::Int(640))], 5).as_deref(), Some("640 pixels"));
    assert_eq!(describe(&[(6, TagValue::Bytes(vec![0; 2048]))], 6).as_deref(), Some("2048 bytes"));
    assert_eq!(describe(&[(7, TagValue::from("quiet"))], 7).as_deref(), Some("QUIET"));
}

#[test]
fn generic_fallbacks() {
    let m = with(&[
        (40, TagValue::Int(-3)),
        (41, TagValue::Float(2.5)),
        (42, TagValue::Bytes(vec![1, 2, 3])),
        (43, TagValue::Ints(vec![8, 8, 8])),
        (44, TagValue::Texts(vec!["mp41".into(), "isom".into()])),
    ]);
    let d = m.first_of(&SAMPLE).unwrap();
    assert_eq!(d.description(40).as_deref(), Some("-3"));
    assert_eq!(d.description(41).as_deref(), Some("2.5"));
    assert_eq!(d.description(42).as_deref(), Some("[3 bytes]"));
    assert_eq!(d.description(43).as_deref(), Some("8 8 8"));
    assert_eq!(d.description(44).as_deref(), Some("mp41, isom"));
    assert_eq!(d.description(99), None);
}

#[test]
fn missing_tag_has_no_description() {
    assert_eq!(describe(&[], 1), None);
    assert_eq!(describe(&[], 4), None);
}
