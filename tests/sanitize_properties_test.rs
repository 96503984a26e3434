use tdoc_harvest::sanitize::{sanitize_folder_name, NameSanitizer, FALLBACK_NAME, HASH_SUFFIX_LEN};

const ILLEGAL: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

fn labels() -> Vec<String> {
    vec![
        String::new(),
        "   ".to_string(),
        "Security".to_string(),
        "CR\nPack, Release 19".to_string(),
        r#"A\B/C*D?E:F"G<H>I|J"#.to_string(),
        "|||///".to_string(),
        "Very long category name that exceeds fifty characters total length easily".to_string(),
        "Ü".repeat(120),
        "7.1 Study on Network Slicing Phase 3 / Stage 1 aspects, incl. roaming".to_string(),
        "x".repeat(51),
    ]
}

#[test]
fn test_output_is_always_safe_bounded_and_non_empty() {
    for max_len in [16, 20, 50, 255] {
        for label in labels() {
            let name = sanitize_folder_name(&label, max_len);
            assert!(!name.is_empty(), "empty name for {:?}", label);
            assert!(
                name.chars().count() <= max_len,
                "{:?} longer than {} for {:?}",
                name,
                max_len,
                label
            );
            assert!(
                !name.contains(ILLEGAL),
                "{:?} contains an illegal character",
                name
            );
            assert_eq!(name, name.trim(), "untrimmed name {:?}", name);
        }
    }
}

#[test]
fn test_blank_labels_fall_back() {
    assert_eq!(sanitize_folder_name("", 50), FALLBACK_NAME);
    assert_eq!(sanitize_folder_name("|||///", 50), FALLBACK_NAME);
}

#[test]
fn test_long_label_suffix_is_deterministic() {
    let label = "Very long category name that exceeds fifty characters total length easily";
    let sanitizer = NameSanitizer::new(50);

    let first = sanitizer.sanitize(label);
    let second = sanitizer.sanitize(label);
    assert_eq!(first, second);
    assert_eq!(first.chars().count(), 50);

    let suffix: String = first.chars().skip(50 - HASH_SUFFIX_LEN).collect();
    assert_eq!(suffix.len(), HASH_SUFFIX_LEN);
    assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn test_labels_sharing_a_prefix_get_distinct_folders() {
    let base = "Study on enhancements for cyber-physical control applications";
    let a = sanitize_folder_name(&format!("{} in vertical domains", base), 50);
    let b = sanitize_folder_name(&format!("{} in industrial domains", base), 50);
    assert_ne!(a, b);
    assert_eq!(a[..20], b[..20]);
}
