//! Frame decoding shared by every exchange.
//!
//! [`FrameCodec`] turns a [`RawFrame`] into a JSON value: compressed frames
//! are inflated with the exchange's [`Compression`] before UTF-8 and JSON
//! parsing. Exchange parsers then build a [`tw_core::Message`] from the value.
//!
//! [`ChannelNaming`] is the table that maps a market symbol to its trade
//! channel name and back.

use std::borrow::Cow;
use std::io::Read;

use flate2::read::{DeflateDecoder, GzDecoder};
use serde_json::Value;
use tw_core::error::DecodeError;
use tw_core::{Compression, RawFrame};

/// Inflate `data` according to `compression`, failing once the output would
/// exceed `limit` bytes.
pub fn decompress(data: &[u8], compression: Compression, limit: usize) -> Result<Vec<u8>, DecodeError> {
    let mut out = Vec::with_capacity(data.len().saturating_mul(4).min(limit));
    // One byte past the limit is enough to tell "exactly full" from "too big".
    let cap = limit as u64 + 1;
    let result = match compression {
        Compression::None => return Ok(data.to_vec()),
        Compression::Gzip => GzDecoder::new(data).take(cap).read_to_end(&mut out),
        Compression::Deflate => DeflateDecoder::new(data).take(cap).read_to_end(&mut out),
    };
    result.map_err(|e| DecodeError::Decompress(e.to_string()))?;
    if out.len() > limit {
        return Err(DecodeError::Decompress(format!("inflated payload exceeds {limit} bytes")));
    }
    Ok(out)
}

/// Compress `data`; the inverse of [`decompress`], used to build test frames.
#[cfg(test)]
pub(crate) fn compress(data: &[u8], compression: Compression) -> Vec<u8> {
    use std::io::Write;

    use flate2::write::{DeflateEncoder, GzEncoder};

    match compression {
        Compression::None => data.to_vec(),
        Compression::Gzip => {
            let mut enc = GzEncoder::new(Vec::new(), flate2::Compression::default());
            enc.write_all(data).unwrap();
            enc.finish().unwrap()
        }
        Compression::Deflate => {
            let mut enc = DeflateEncoder::new(Vec::new(), flate2::Compression::default());
            enc.write_all(data).unwrap();
            enc.finish().unwrap()
        }
    }
}

/// Per-exchange frame decoder front end.
#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    compression: Compression,
    /// Upper bound on inflated output, normally the transport's message limit.
    max_inflated: usize,
}

impl FrameCodec {
    pub const fn new(compression: Compression, max_inflated: usize) -> Self {
        Self { compression, max_inflated }
    }

    /// Inflate a payload that is compressed independently of its frame.
    pub fn inflate(&self, data: &[u8]) -> Result<Vec<u8>, DecodeError> {
        decompress(data, self.compression, self.max_inflated)
    }

    /// Payload text, inflated first when the frame is flagged compressed.
    pub fn text<'a>(&self, frame: &'a RawFrame) -> Result<Cow<'a, str>, DecodeError> {
        if frame.compressed && self.compression != Compression::None {
            let bytes = self.inflate(&frame.payload)?;
            String::from_utf8(bytes).map(Cow::Owned).map_err(|_| DecodeError::Utf8)
        } else {
            std::str::from_utf8(&frame.payload).map(Cow::Borrowed).map_err(|_| DecodeError::Utf8)
        }
    }

    /// Payload parsed as JSON.
    pub fn json(&self, frame: &RawFrame) -> Result<Value, DecodeError> {
        let text = self.text(frame)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// How an exchange names trade channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelNaming {
    pub prefix: &'static str,
    pub suffix: &'static str,
    /// Separator used to split a channel name back into segments.
    pub delimiter: char,
    /// Index of the symbol segment after splitting on `delimiter`.
    pub symbol_segment: usize,
    /// Symbols are lowercased in channel names.
    pub lowercase: bool,
    /// Channel subscribed ahead of every trade channel, if any.
    pub control_channel: Option<&'static str>,
}

impl ChannelNaming {
    pub fn trade_channel(&self, symbol: &str) -> String {
        let symbol: Cow<'_, str> =
            if self.lowercase { Cow::Owned(symbol.to_lowercase()) } else { Cow::Borrowed(symbol) };
        format!("{}{}{}", self.prefix, symbol, self.suffix)
    }

    /// Symbol segment of a channel name.
    pub fn symbol_of<'a>(&self, channel: &'a str) -> Option<&'a str> {
        channel.split(self.delimiter).nth(self.symbol_segment).filter(|s| !s.is_empty())
    }
}
