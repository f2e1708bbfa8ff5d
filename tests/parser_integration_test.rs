mod common;

use common::{TestFixtures, create_test_file, gzip};
use tempfile::TempDir;

use dmarc_ingest::{NOT_AVAILABLE, ReportError, ReportParser, SourceId, Tolerance};

const GZIP_MINIMAL: &str = "<feedback><version>1.0</version><record><row>\
    <source_ip>192.0.2.1</source_ip><count>1</count></row></record></feedback>";

fn parser(tolerance: Tolerance) -> ReportParser {
    ReportParser::new(tolerance).unwrap()
}

#[test]
fn test_every_tolerance_name_constructs() {
    for name in ["minimal", "relaxed", "strict"] {
        let parser = ReportParser::from_name(name).unwrap();
        assert_eq!(parser.tolerance().as_str(), name);
    }

    for name in ["", "Minimal", "lenient", "strict "] {
        match ReportParser::from_name(name) {
            Err(ReportError::Configuration(msg)) => {
                assert!(msg.contains("minimal"));
                assert!(msg.contains("relaxed"));
                assert!(msg.contains("strict"));
            }
            other => panic!("Expected Configuration error for {:?}, got {:?}", name, other),
        }
    }
}

#[test]
fn test_gzip_and_raw_produce_identical_reports() {
    let fixtures = TestFixtures::new();
    let raw = fixtures.read(&fixtures.strict_full());
    let compressed = gzip(&raw);

    for tolerance in Tolerance::ALL {
        let parser = parser(tolerance);
        assert_eq!(
            parser.parse_bytes(&raw).unwrap(),
            parser.parse_bytes(&compressed).unwrap()
        );
    }
}

#[test]
fn test_parse_is_idempotent() {
    let fixtures = TestFixtures::new();
    let raw = fixtures.read(&fixtures.relaxed_only());
    let parser = parser(Tolerance::Relaxed);

    let first = parser.parse_bytes(&raw).unwrap();
    let second = parser.parse_bytes(&raw).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_defaults_for_missing_and_malformed_fields() {
    let xml = b"<feedback><report_metadata><email>a@b.example</email></report_metadata>\
        <record><row><source_ip>192.0.2.5</source_ip><count>lots</count></row></record></feedback>";

    let report = parser(Tolerance::Minimal).parse_bytes(xml).unwrap();

    assert_eq!(report.metadata.org_name, NOT_AVAILABLE);
    assert_eq!(report.metadata.email, "a@b.example");
    assert_eq!(report.metadata.date_begin, 0);
    assert_eq!(report.policy.domain, NOT_AVAILABLE);
    assert_eq!(report.records[0].count, 0);
    assert_eq!(report.records[0].source_ip, "192.0.2.5");
}

#[test]
fn test_three_records_in_document_order() {
    let fixtures = TestFixtures::new();
    let report = parser(Tolerance::Strict)
        .parse_file(fixtures.strict_full())
        .unwrap();

    let ips: Vec<_> = report.records.iter().map(|r| r.source_ip.as_str()).collect();
    assert_eq!(ips, vec!["209.85.220.41", "198.51.100.23", "2001:db8::25"]);
    assert_eq!(report.message_count(), 16);

    let quarantined = &report.records[1];
    assert_eq!(quarantined.disposition, "quarantine");
    assert_eq!(quarantined.reason_type, "local_policy");
    assert_eq!(quarantined.comment, "arc=fail");
    assert_eq!(quarantined.envelope_from, "bounce.example.net");
    assert_eq!(quarantined.dkim_hresult, "signature did not verify");
    assert_eq!(quarantined.spf_result, "softfail");

    let no_dkim = &report.records[2];
    assert_eq!(no_dkim.dkim_domain, NOT_AVAILABLE);
    assert_eq!(no_dkim.spf_domain, "example.com");
}

#[test]
fn test_strictness_ordering() {
    let fixtures = TestFixtures::new();
    let full = fixtures.read(&fixtures.strict_full());
    let relaxed_only = fixtures.read(&fixtures.relaxed_only());
    let minimal_only = fixtures.read(&fixtures.minimal_only());

    let minimal = parser(Tolerance::Minimal);
    let relaxed = parser(Tolerance::Relaxed);
    let strict = parser(Tolerance::Strict);

    assert!(minimal.validate(full.as_slice()).unwrap());
    assert!(relaxed.validate(full.as_slice()).unwrap());
    assert!(strict.validate(full.as_slice()).unwrap());

    assert!(minimal.validate(relaxed_only.as_slice()).unwrap());
    assert!(relaxed.validate(relaxed_only.as_slice()).unwrap());
    assert!(!strict.validate(relaxed_only.as_slice()).unwrap());

    assert!(minimal.validate(minimal_only.as_slice()).unwrap());
    assert!(!relaxed.validate(minimal_only.as_slice()).unwrap());
    assert!(!strict.validate(minimal_only.as_slice()).unwrap());

    let err = strict.parse_bytes(&minimal_only).unwrap_err();
    assert!(err.is_validation());
    assert!(minimal.parse_bytes(&minimal_only).is_ok());
}

#[test]
fn test_relaxed_report_keeps_raw_values() {
    let fixtures = TestFixtures::new();
    let report = parser(Tolerance::Relaxed)
        .parse_file(fixtures.relaxed_only())
        .unwrap();

    assert_eq!(report.version, None);
    assert_eq!(report.policy.pct, "100%");
    assert_eq!(report.records[0].source_ip, "mail.example.org");
    assert_eq!(report.metadata.errors, vec!["policy record had unknown tag np"]);
    assert_eq!(report.inconsistencies(), vec!["pct '100%' is not a number"]);
}

#[test]
fn test_gzip_minimal_scenario() {
    let compressed = gzip(GZIP_MINIMAL.as_bytes());
    let report = parser(Tolerance::Minimal).parse_bytes(&compressed).unwrap();

    assert_eq!(report.version.as_deref(), Some("1.0"));
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].count, 1);
}

#[test]
fn test_empty_input_is_validation_error_for_every_tolerance() {
    for tolerance in Tolerance::ALL {
        let parser = parser(tolerance);
        let err = parser.parse_bytes(b"").unwrap_err();
        assert!(err.is_validation(), "{}: {:?}", tolerance, err);
        assert!(!parser.validate(&b""[..]).unwrap());
    }
}

#[test]
fn test_non_gzip_bytes_are_treated_as_raw_xml() {
    let report = parser(Tolerance::Minimal)
        .parse_bytes(GZIP_MINIMAL.as_bytes())
        .unwrap();
    assert_eq!(report.records.len(), 1);
}

#[test]
fn test_corrupt_gzip_stream_is_not_a_crash() {
    let mut data = vec![0x1f, 0x8b];
    data.extend_from_slice(GZIP_MINIMAL.as_bytes());

    let parser = parser(Tolerance::Minimal);
    assert!(!parser.validate(data.as_slice()).unwrap());
    assert!(parser.parse_bytes(&data).unwrap_err().is_validation());
}

#[test]
fn test_non_xml_input_is_validation_error() {
    let parser = parser(Tolerance::Minimal);
    let inputs: [&[u8]; 4] = [b"hello", b"<feedback>", b"<feedback></report>", b"\x00\x01\x02"];
    for input in inputs {
        assert!(!parser.validate(input).unwrap());
        assert!(parser.parse_bytes(input).unwrap_err().is_validation());
    }
}

#[test]
fn test_parse_file_ignores_extension() {
    let temp_dir = TempDir::new().unwrap();
    let compressed = gzip(GZIP_MINIMAL.as_bytes());
    let path = create_test_file(temp_dir.path(), "report.xml", &compressed);

    let parser = parser(Tolerance::Minimal);
    let report = parser.parse_file(&path).unwrap();
    assert_eq!(report.version.as_deref(), Some("1.0"));
    assert!(parser.validate(path.as_path()).unwrap());
}

#[test]
fn test_invalid_file_reports_its_path() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_test_file(temp_dir.path(), "bad.xml", b"<invoice/>");

    let err = parser(Tolerance::Minimal).parse_file(&path).unwrap_err();
    assert!(err.is_validation());
    assert_eq!(err.source_id(), Some(&SourceId::file(&path)));
    assert!(err.to_string().contains("bad.xml"));
}

#[test]
fn test_missing_file_is_io_error_not_validation() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("gone.xml.gz");

    let parser = parser(Tolerance::Minimal);
    let err = parser.parse_file(&path).unwrap_err();
    assert!(matches!(err, ReportError::Io { .. }));
    assert!(!err.is_validation());
    assert!(matches!(
        parser.validate(path.as_path()),
        Err(ReportError::Io { .. })
    ));
}

#[test]
fn test_tolerance_switch_takes_effect() {
    let fixtures = TestFixtures::new();
    let minimal_only = fixtures.read(&fixtures.minimal_only());

    let mut parser = parser(Tolerance::Minimal);
    assert!(parser.parse_bytes(&minimal_only).is_ok());

    parser.set_tolerance(Tolerance::Strict).unwrap();
    assert!(parser.parse_bytes(&minimal_only).unwrap_err().is_validation());

    parser.set_tolerance(Tolerance::Minimal).unwrap();
    assert!(parser.parse_bytes(&minimal_only).is_ok());
}

#[test]
fn test_multi_member_gzip_matches_raw() {
    let fixtures = TestFixtures::new();
    let raw = fixtures.read(&fixtures.strict_full());
    let (head, tail) = raw.split_at(raw.len() / 2);
    let mut members = gzip(head);
    members.extend_from_slice(&gzip(tail));

    let parser = parser(Tolerance::Strict);
    assert!(parser.validate(members.as_slice()).unwrap());
    assert_eq!(
        parser.parse_bytes(&members).unwrap(),
        parser.parse_bytes(&raw).unwrap()
    );
}

#[test]
fn test_comment_inside_field_does_not_hide_text() {
    let xml = b"<feedback><report_metadata><org_name><!-- reporter -->acme.example</org_name>\
        </report_metadata><record><row><source_ip>192.0.2.9</source_ip>\
        <count>4<!-- approx --></count></row></record></feedback>";

    let report = parser(Tolerance::Minimal).parse_bytes(xml).unwrap();
    assert_eq!(report.metadata.org_name, "acme.example");
    assert_eq!(report.records[0].count, 4);
}
