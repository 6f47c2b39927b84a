use super::*;

#[test]
fn empty_document_uses_defaults() {
    let cfg: PipelineConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(cfg, PipelineConfig::default());
    cfg.validate().unwrap();
    assert_eq!(cfg.capture.width_px, 330);
    assert_eq!(cfg.capture.pixel_ratio, 2.0);
    assert_eq!(cfg.capture.background, Rgb8::WHITE);
    assert_eq!(cfg.readiness_policy, ReadinessPolicy::ProceedWithWarning);
}

#[test]
fn unknown_fields_are_rejected() {
    assert!(serde_json::from_str::<PipelineConfig>(r#"{"nope": 1}"#).is_err());
}

#[test]
fn nested_overrides_keep_other_defaults() {
    let cfg: PipelineConfig = serde_json::from_str(
        r##"{"capture": {"background": "#F0F0F0"}, "readiness_policy": "abort"}"##,
    )
    .unwrap();
    assert_eq!(cfg.capture.background, Rgb8([0xf0, 0xf0, 0xf0]));
    assert_eq!(cfg.capture.width_px, 330);
    assert_eq!(cfg.readiness_policy, ReadinessPolicy::Abort);
}

#[test]
fn validate_rejects_bad_capture_values() {
    let mut cfg = PipelineConfig::default();
    cfg.capture.quality = 1.5;
    assert!(cfg.validate().is_err());

    let mut cfg = PipelineConfig::default();
    cfg.capture.pixel_ratio = 0.0;
    assert!(cfg.validate().is_err());

    let mut cfg = PipelineConfig::default();
    cfg.capture.width_px = 0;
    assert!(cfg.validate().is_err());

    let mut cfg = PipelineConfig::default();
    cfg.page_origin = Some("not a url".to_string());
    assert!(cfg.validate().is_err());
}

#[test]
fn rgb_parse_roundtrip_and_errors() {
    assert_eq!(Rgb8::parse("#ffffff").unwrap(), Rgb8::WHITE);
    assert_eq!(Rgb8::parse("102030").unwrap().to_hex(), "#102030");
    assert!(Rgb8::parse("#fff").is_err());
    assert!(Rgb8::parse("#gg0000").is_err());
}

#[test]
fn local_hosts_select_local_backend() {
    let cfg = PipelineConfig::default();
    assert_eq!(
        ApiBase::resolve(Some("localhost"), &cfg).0,
        "http://localhost:4000"
    );
    assert_eq!(
        ApiBase::resolve(Some("127.0.0.1"), &cfg).0,
        "http://localhost:4000"
    );
    assert_eq!(
        ApiBase::resolve(Some("tickets.ecocruise.org"), &cfg).0,
        PRODUCTION_API_BASE
    );
    assert_eq!(ApiBase::resolve(None, &cfg).0, PRODUCTION_API_BASE);
}

#[test]
fn api_base_follows_page_origin() {
    let cfg = PipelineConfig {
        page_origin: Some("http://localhost:5173".to_string()),
        ..PipelineConfig::default()
    };
    assert_eq!(cfg.page().host(), Some("localhost"));
    assert_eq!(cfg.api_base(), "http://localhost:4000");
}

#[test]
fn page_context_without_host_is_empty() {
    assert_eq!(PageContext::from_origin(Some("data:text/plain,hi")).host(), None);
    assert_eq!(PageContext::from_origin(None).origin(), None);
}

#[test]
fn load_reads_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cfg.json");
    std::fs::write(&path, r#"{"readiness_max_retries": 5}"#).unwrap();
    let cfg = PipelineConfig::load(&path).unwrap();
    assert_eq!(cfg.readiness_max_retries, 5);

    let missing = dir.path().join("missing.json");
    let err = PipelineConfig::load(&missing).unwrap_err();
    assert!(err.to_string().contains("open config"));
}
