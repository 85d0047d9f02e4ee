//! Byte streams
//!
//! Blob content is exchanged as a boxed stream of `Bytes` chunks. Streams are
//! single-pass; dropping one releases whatever connection backs it.

use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt, stream};

use crate::error::{Error, Result};
use crate::traits::ByteRange;

/// Stream of bytes for blob content
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// Wrap an in-memory buffer as a one-chunk stream
pub fn bytes_stream(data: Bytes) -> ByteStream {
    if data.is_empty() {
        return Box::pin(stream::empty());
    }
    Box::pin(stream::once(async move { Ok(data) }))
}

/// Cut an inclusive range out of a buffer
///
/// Mirrors object-store semantics: a start past the end is unsatisfiable,
/// an end past the end is clamped.
pub fn slice_range(data: &Bytes, range: ByteRange) -> Result<Bytes> {
    let size = data.len() as u64;
    if range.start >= size {
        return Err(Error::Transfer(format!(
            "range not satisfiable: {} for {size} bytes",
            range.to_header()
        )));
    }
    let end = range.end_inclusive().min(size - 1);
    Ok(data.slice(range.start as usize..=end as usize))
}

/// Drain a stream into a single buffer
pub async fn read_to_bytes(mut stream: ByteStream) -> Result<Bytes> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| Error::Transfer(e.to_string()))?;
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bytes_stream_round_trip() {
        let data = read_to_bytes(bytes_stream(Bytes::from_static(b"hello")))
            .await
            .unwrap();
        assert_eq!(&data[..], b"hello");
    }

    #[tokio::test]
    async fn test_empty_stream_yields_no_chunks() {
        let mut s = bytes_stream(Bytes::new());
        assert!(s.next().await.is_none());
    }

    #[test]
    fn test_slice_range() {
        let data = Bytes::from_static(b"hello");
        assert_eq!(&slice_range(&data, ByteRange::new(2, 2)).unwrap()[..], b"ll");
        assert_eq!(&slice_range(&data, ByteRange::new(3, 10)).unwrap()[..], b"lo");
        assert!(matches!(
            slice_range(&data, ByteRange::new(5, 1)),
            Err(Error::Transfer(_))
        ));
    }

    #[tokio::test]
    async fn test_read_error_becomes_transfer() {
        let failing: ByteStream = Box::pin(stream::iter(vec![
            Ok(Bytes::from_static(b"ab")),
            Err(std::io::Error::other("connection reset")),
        ]));
        let err = read_to_bytes(failing).await.unwrap_err();
        assert!(matches!(err, Error::Transfer(msg) if msg.contains("connection reset")));
    }
}
