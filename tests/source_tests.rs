use flate2::write::GzEncoder;
use flate2::Compression;
use runforge::source::stream_runs;
use std::fs::File;
use std::io::Write;
use std::path::Path;

fn write_gzip(path: &Path, bytes: &[u8]) {
    let file = File::create(path).unwrap();
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder.write_all(bytes).unwrap();
    encoder.finish().unwrap();
}

const TWO_RUNS: &str = r#"{"first_L7_TrueEnd":{"Character":"Reimu"},"second_L7_TrueEnd":{"Character":"Cirno"}}"#;

#[test]
fn gzip_container_is_detected_by_magic_bytes() {
    let dir = tempfile::tempdir().unwrap();
    // Extension is irrelevant; only the magic bytes matter.
    let path = dir.path().join("archive.json");
    write_gzip(&path, TWO_RUNS.as_bytes());

    let mut ids = Vec::new();
    let stats = stream_runs(&path, |id, _| ids.push(id)).unwrap();
    assert_eq!(stats.yielded, 2);
    assert_eq!(ids, vec!["first_L7_TrueEnd", "second_L7_TrueEnd"]);
}

#[test]
fn utf8_bom_is_stripped_in_both_containers() {
    let dir = tempfile::tempdir().unwrap();

    let plain = dir.path().join("plain.json");
    let mut content = Vec::new();
    content.extend_from_slice(&[0xEF, 0xBB, 0xBF]);
    content.extend_from_slice(TWO_RUNS.as_bytes());
    std::fs::write(&plain, &content).unwrap();
    assert_eq!(stream_runs(&plain, |_, _| {}).unwrap().yielded, 2);

    let gz = dir.path().join("archive.gz");
    write_gzip(&gz, &content);
    assert_eq!(stream_runs(&gz, |_, _| {}).unwrap().yielded, 2);
}

#[test]
fn corrupt_archive_yields_nothing_without_failing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garbage.gz");
    std::fs::write(&path, b"this is not json and not gzip").unwrap();

    let stats = stream_runs(&path, |_, _| {}).unwrap();
    assert_eq!(stats.yielded, 0);
}

#[test]
fn truncated_stream_keeps_records_already_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("truncated.json");

    // Many records, cut off mid-document.
    let mut content = String::from("{");
    for i in 0..50 {
        content.push_str(&format!(r#""run{:03}":{{"Character":"Reimu"}},"#, i));
    }
    let cut = content.len() - 20;
    std::fs::write(&path, &content[..cut]).unwrap();

    let mut count = 0u64;
    let stats = stream_runs(&path, |_, _| count += 1).unwrap();
    assert!(stats.yielded >= 40, "expected most records, got {}", stats.yielded);
    assert_eq!(stats.yielded, count);
}

#[test]
fn runs_larger_than_one_buffer_still_stream() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.gz");

    // One run with a few thousand stations, to exercise buffered decoding.
    let mut content = String::from(r#"{"big_L7_TrueEnd":{"Character":"Reimu","Stations":["#);
    for i in 0..3000 {
        if i > 0 {
            content.push(',');
        }
        content.push_str(r#"{"Type":"Gap","Status":{"Hp":50}}"#);
    }
    content.push_str("]}}");
    write_gzip(&path, content.as_bytes());

    let mut stations = 0;
    let stats = stream_runs(&path, |_, run| stations = run.stations.len()).unwrap();
    assert_eq!(stats.yielded, 1);
    assert_eq!(stations, 3000);
}
