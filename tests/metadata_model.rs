use mediameta::descriptor::{Rule, TagDef, Vocabulary};
use mediameta::directory::TagValue;
use mediameta::metadata::{Metadata, UnknownTagTally};

static CAMERA: Vocabulary = Vocabulary {
    name: "Camera",
    tags: &[
        TagDef { id: 1, name: "Make", rule: Rule::Raw },
        TagDef { id: 2, name: "Exposure", rule: Rule::Raw },
    ],
};

static LENS: Vocabulary = Vocabulary {
    name: "Lens",
    tags: &[TagDef { id: 1, name: "Focal Length", rule: Rule::Raw }],
};

#[test]
fn set_overwrites_and_keeps_order() {
    let mut m = Metadata::new();
    let id = m.add_directory(&CAMERA, None);
    let d = m.directory_mut(id).unwrap();
    d.set(2, 100i64);
    d.set(1, "Acme");
    d.set(2, 250i64);

    assert_eq!(d.tag_count(), 2);
    assert_eq!(d.get_i64(2), Some(250));
    let order: Vec<i32> = d.tags().map(|(t, _)| t).collect();
    assert_eq!(order, vec![2, 1]);
    // tags() can be walked again
    assert_eq!(d.tags().count(), 2);
}

#[test]
fn absent_and_uncoercible_values_are_none() {
    let mut m = Metadata::new();
    let id = m.add_directory(&CAMERA, None);
    let d = m.directory_mut(id).unwrap();
    d.set(1, "Acme");
    d.set(3, TagValue::Bytes(vec![1, 2, 3]));

    assert!(d.get(77).is_none());
    assert_eq!(d.get_i64(77), None);
    assert_eq!(d.get_i64(1), None);
    assert_eq!(d.get_f64(3), None);
    assert_eq!(d.get_string(1).as_deref(), Some("Acme"));
    assert_eq!(d.get_bytes(3), Some(&[1u8, 2, 3][..]));
    assert!(!d.contains(77));
}

#[test]
fn coercions() {
    let mut m = Metadata::new();
    let id = m.add_directory(&CAMERA, None);
    let d = m.directory_mut(id).unwrap();
    d.set(1, " 42 ");
    d.set(2, 3.75);
    d.set(3, 5_000_000_000i64);

    assert_eq!(d.get_i64(1), Some(42));
    assert_eq!(d.get_i64(2), Some(3));
    assert_eq!(d.get_f64(2), Some(3.75));
    assert_eq!(d.get_i32(3), None);
    assert_eq!(d.get_string(2).as_deref(), Some("3.75"));
}

#[test]
fn errors_do_not_hide_tags() {
    let mut m = Metadata::new();
    let id = m.add_directory(&CAMERA, None);
    let d = m.directory_mut(id).unwrap();
    d.set(1, "Acme");
    d.add_error("exposure field truncated");
    d.set(2, 10i64);

    assert!(d.has_errors());
    assert_eq!(d.errors(), &["exposure field truncated".to_string()]);
    assert_eq!(d.get_string(1).as_deref(), Some("Acme"));
    assert_eq!(d.get_i64(2), Some(10));
    assert!(m.has_errors());
}

#[test]
fn parents_are_resolved_through_metadata() {
    let mut m = Metadata::new();
    let camera = m.add_directory(&CAMERA, None);
    let lens_a = m.add_directory(&LENS, Some(camera));
    let lens_b = m.add_directory(&LENS, Some(camera));

    let a = m.directory(lens_a).unwrap();
    assert_eq!(a.parent(), Some(camera));
    assert_eq!(m.parent_of(a).map(|p| p.name()), Some("Camera"));
    assert!(m.directory(camera).unwrap().parent().is_none());

    let kids: Vec<_> = m.children(camera).map(|d| d.id()).collect();
    assert_eq!(kids, vec![lens_a, lens_b]);
    assert_eq!(m.of_type(&LENS).count(), 2);
    assert!(m.first_of(&CAMERA).unwrap().is(&CAMERA));
    assert!(!m.first_of(&CAMERA).unwrap().is(&LENS));
}

#[test]
fn tag_view() {
    let mut m = Metadata::new();
    let id = m.add_directory(&LENS, None);
    let d = m.directory_mut(id).unwrap();
    d.set(1, 35i64);
    d.set(0x2a, 1i64);

    let tags: Vec<_> = m.tags().collect();
    assert_eq!(tags.len(), 2);
    assert_eq!(tags[0].name(), "Focal Length");
    assert_eq!(tags[0].directory_name(), "Lens");
    assert_eq!(tags[0].description().as_deref(), Some("35"));
    assert_eq!(tags[0].id_hex(), "0x0001");
    assert!(!tags[1].has_name());
    assert_eq!(tags[1].name(), "Unknown tag (0x002a)");
}

#[test]
fn unknown_tag_tally_counts_across_decodes() {
    let mut tally = UnknownTagTally::new();
    for extra in [2, 3] {
        let mut m = Metadata::new();
        let id = m.add_directory(&LENS, None);
        let d = m.directory_mut(id).unwrap();
        d.set(1, 50i64);
        d.set(9, 1i64);
        if extra == 3 {
            d.set(8, 1i64);
        }
        tally.record(&m);
    }
    assert_eq!(tally.rows(), vec![("Lens", 9, 2), ("Lens", 8, 1)]);
}
