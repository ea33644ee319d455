//! GDELT pointer and archive fixtures

use std::io::{Cursor, Write};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path of the English pointer on the mock server
pub const ENG_POINTER_PATH: &str = "/gdeltv2/lastupdate.txt";

/// Path of the translation pointer on the mock server
pub const TRANS_POINTER_PATH: &str = "/gdeltv2/lastupdate-translation.txt";

/// Two tab-separated GKG rows
pub const GKG_ROWS: &[u8] = b"20250724144500-0\t20250724144500\t1\texample.com\thttps://example.com/a\n\
20250724144500-1\t20250724144500\t1\texample.org\thttps://example.org/b\n";

/// A single-entry GKG archive, as GDELT publishes them
pub fn gkg_archive(csv_name: &str, rows: &[u8]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    writer.start_file(csv_name, options).unwrap();
    writer.write_all(rows).unwrap();
    writer.finish().unwrap().into_inner()
}

/// Pointer body in GDELT's `<size> <hash> <url>` format
///
/// Lists the export and mentions archives before the GKG one, like the real
/// feed.
pub fn pointer_body(base: &str, timestamp: &str, gkg_name: &str) -> String {
    format!(
        "150383 297a16b493de7cf6ca809a7cc31d0b93 {base}/gdeltv2/{timestamp}.export.CSV.zip\n\
         318084 bb27f78ba45f69a17ea6ed7755e9f8ff {base}/gdeltv2/{timestamp}.mentions.CSV.zip\n\
         10768507 ea8dde0beb0ba98810a92db068c0ce99 {base}/gdeltv2/{gkg_name}\n"
    )
}

/// Serve `body` at `pointer_path`
pub async fn mount_pointer(server: &MockServer, pointer_path: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(pointer_path))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Serve `bytes` at `/gdeltv2/<name>`, expecting exactly `expected` requests
pub async fn mount_archive(server: &MockServer, name: &str, bytes: Vec<u8>, expected: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/gdeltv2/{name}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(bytes))
        .expect(expected)
        .mount(server)
        .await;
}
