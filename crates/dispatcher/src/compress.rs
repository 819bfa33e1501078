//! Gzip encoding of batch payloads
//!
//! Compression is CPU bound, so workers run it on the blocking pool and
//! move both buffers in and out of the closure.

use std::io::{self, Write};

use bytes::{BufMut, BytesMut};
use flate2::write::GzEncoder;
use flate2::Compression;
use ingestion::Batch;

/// Gzip `input` into `out` (cleared first) and hand `out` back
pub fn gzip_into(input: &[u8], level: u32, mut out: BytesMut) -> io::Result<BytesMut> {
    out.clear();
    let mut encoder = GzEncoder::new(out.writer(), Compression::new(level.min(9)));
    encoder.write_all(input)?;
    Ok(encoder.finish()?.into_inner())
}

/// Compress a batch on the blocking pool
///
/// Returns the untouched batch together with the compressed body.
pub async fn gzip_batch(
    batch: Batch,
    level: u32,
    scratch: BytesMut,
) -> io::Result<(Batch, BytesMut)> {
    tokio::task::spawn_blocking(move || -> io::Result<(Batch, BytesMut)> {
        let body = gzip_into(batch.as_bytes(), level, scratch)?;
        Ok((batch, body))
    })
    .await
    .map_err(io::Error::other)?
}
