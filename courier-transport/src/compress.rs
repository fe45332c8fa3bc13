//! Whole-body gzip for batch requests.

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;

/// Gzip a serialized request body.
pub fn gzip(body: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(body)?;
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    #[test]
    fn gzip_round_trips() {
        let body = br#"{"events":[1,2,3]}"#;
        let compressed = super::gzip(body).unwrap();
        assert_ne!(&compressed[..], &body[..]);

        let mut decoder = flate2::read::GzDecoder::new(&compressed[..]);
        let mut restored = Vec::new();
        decoder.read_to_end(&mut restored).unwrap();
        assert_eq!(restored, body);
    }
}
