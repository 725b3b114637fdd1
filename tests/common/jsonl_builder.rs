use bytes::Bytes;
use futures_util::stream::{self, Stream};

/// One well-formed record line (no trailing newline).
pub fn record_line(id: usize) -> String {
    format!(
        r#"{{"fictionId": "{id}", "title": "Novel Number {id} novel", "url": "https://example.test/fiction/{id}", "tags": ["fantasy"], "label": "ongoing", "followingUsers": {id}, "rating": 4.5, "pages": 100, "views": 1000, "chapters": 10, "lastUpdated": 1700000000, "description": "Entry {id}"}}"#
    )
}

/// `n` record lines joined with `\n`, with a trailing newline.
pub fn jsonl(n: usize) -> String {
    (1..=n).map(|i| record_line(i) + "\n").collect()
}

/// Splits `body` into chunks of `size` bytes, ignoring character boundaries.
pub fn chunked(body: &[u8], size: usize) -> Vec<Vec<u8>> {
    body.chunks(size).map(|c| c.to_vec()).collect()
}

/// Turns chunks into the byte stream shape the ingester consumes.
pub fn byte_stream(
    chunks: Vec<Vec<u8>>,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> {
    stream::iter(chunks.into_iter().map(|c| Ok(Bytes::from(c))))
}
