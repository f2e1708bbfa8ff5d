//! Content sniffing for report payloads.
//!
//! Reports arrive either as raw XML or gzip-compressed XML. The format is decided from the
//! leading bytes only; file names play no part.

use std::borrow::Cow;
use std::io::Read;

use flate2::read::MultiGzDecoder;

/// gzip member header magic (RFC 1952, ID1 ID2)
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// A report payload tagged with its detected encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload<'a> {
    Gzip(&'a [u8]),
    Raw(&'a [u8]),
}

impl<'a> Payload<'a> {
    /// Tag `data` by inspecting its header
    pub fn sniff(data: &'a [u8]) -> Self {
        if data.starts_with(&GZIP_MAGIC) {
            Payload::Gzip(data)
        } else {
            Payload::Raw(data)
        }
    }

    pub fn is_gzip(&self) -> bool {
        matches!(self, Payload::Gzip(_))
    }

    /// Produce the document bytes
    ///
    /// Every member of a multi-member gzip stream is inflated, in order.
    ///
    /// A payload that carries the gzip magic but does not inflate is handed back
    /// unchanged as raw text, so a bad stream surfaces later as a validation failure.
    pub fn decode(self) -> Cow<'a, [u8]> {
        match self {
            Payload::Raw(data) => Cow::Borrowed(data),
            Payload::Gzip(data) => {
                let mut decoder = MultiGzDecoder::new(data);
                let mut inflated = Vec::with_capacity(data.len().saturating_mul(4));
                match decoder.read_to_end(&mut inflated) {
                    Ok(_) => {
                        tracing::trace!(
                            compressed = data.len(),
                            inflated = inflated.len(),
                            "inflated gzip report payload"
                        );
                        Cow::Owned(inflated)
                    }
                    Err(err) => {
                        tracing::debug!(error = %err, "gzip header present but stream is corrupt; treating as raw");
                        Cow::Borrowed(data)
                    }
                }
            }
        }
    }
}

/// Sniff and decode in one step
pub fn decode_report_bytes(data: &[u8]) -> Cow<'_, [u8]> {
    Payload::sniff(data).decode()
}
