use super::*;

#[test]
fn encodes_square_symbol_with_finder_patterns() {
    let m = QrMatrix::encode("https://tickets.ecocruise.org/verify?ticketId=DR-1").unwrap();
    assert!(m.width() >= 21);
    assert_eq!((m.width() - 17) % 4, 0);

    // Top-left finder pattern: dark outer ring, light separator ring, dark core.
    assert!(m.is_dark(0, 0));
    assert!(m.is_dark(6, 6));
    assert!(!m.is_dark(1, 1));
    assert!(m.is_dark(3, 3));
    assert!(!m.is_dark(m.width(), 0));
}

#[test]
fn longer_payloads_grow_the_symbol() {
    let short = QrMatrix::encode("DR-1").unwrap();
    let long = QrMatrix::encode(&"x".repeat(300)).unwrap();
    assert!(long.width() > short.width());
}

#[test]
fn svg_path_has_one_square_per_dark_module() {
    let m = QrMatrix::encode("DR-1").unwrap();
    let d = m.svg_path();
    assert_eq!(d.matches('z').count(), m.dark_count());
    assert!(d.starts_with("M0 0h1v1h-1z"));
}

#[test]
fn empty_payload_still_encodes() {
    assert!(QrMatrix::encode("").is_ok());
}
