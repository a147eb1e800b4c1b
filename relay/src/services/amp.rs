//! amp frame codec used by PM2's axon pub/sub bus
//!
//! A frame is one header byte `(version << 4) | argc` followed by `argc`
//! arguments, each a big-endian `u32` length and that many bytes. Arguments
//! starting with `s:` are strings, `j:` are JSON, anything else is raw bytes.

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{RelayError, RelayResult};

pub const AMP_VERSION: u8 = 1;

/// Largest argument accepted from the bus
pub const MAX_ARG_LEN: u32 = 16 * 1024 * 1024;

/// One decoded frame argument
#[derive(Debug, Clone, PartialEq)]
pub enum AmpArg {
    Text(String),
    Json(Value),
    Bytes(Vec<u8>),
}

impl AmpArg {
    /// Decode a raw argument according to its type prefix
    pub fn decode(raw: Vec<u8>) -> RelayResult<Self> {
        match raw.get(..2) {
            Some(b"s:") => String::from_utf8(raw[2..].to_vec())
                .map(AmpArg::Text)
                .map_err(|e| RelayError::frame(format!("string argument is not UTF-8: {e}"))),
            Some(b"j:") => Ok(AmpArg::Json(serde_json::from_slice(&raw[2..])?)),
            _ => Ok(AmpArg::Bytes(raw)),
        }
    }

    /// Encode with the type prefix the bus uses
    pub fn encode(&self) -> Vec<u8> {
        match self {
            AmpArg::Text(text) => [b"s:".as_slice(), text.as_bytes()].concat(),
            AmpArg::Json(value) => [b"j:".as_slice(), value.to_string().as_bytes()].concat(),
            AmpArg::Bytes(bytes) => bytes.clone(),
        }
    }
}

/// Encode a whole frame
pub fn encode_frame(args: &[AmpArg]) -> Vec<u8> {
    let mut frame = vec![(AMP_VERSION << 4) | (args.len() as u8 & 0x0f)];
    for arg in args {
        let bytes = arg.encode();
        frame.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
        frame.extend_from_slice(&bytes);
    }
    frame
}

/// One frame as read off the wire, arguments still undecoded
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    pub version: u8,
    pub args: Vec<Vec<u8>>,
}

impl RawFrame {
    /// Decode every argument. A failure here leaves the stream aligned on the next frame.
    pub fn decode(self) -> RelayResult<Vec<AmpArg>> {
        if self.version != AMP_VERSION {
            return Err(RelayError::frame(format!("unsupported amp version {}", self.version)));
        }
        self.args.into_iter().map(AmpArg::decode).collect()
    }
}

/// Read one frame. Returns `Ok(None)` on a clean end of stream between frames.
///
/// Only I/O failures and oversized arguments are errors; those leave the
/// stream position unknown.
pub async fn read_frame<R>(reader: &mut R) -> RelayResult<Option<RawFrame>>
where
    R: AsyncRead + Unpin,
{
    let header = match reader.read_u8().await {
        Ok(header) => header,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let argc = header & 0x0f;
    let mut args = Vec::with_capacity(argc as usize);
    for _ in 0..argc {
        let len = reader.read_u32().await?;
        if len > MAX_ARG_LEN {
            return Err(RelayError::frame(format!("argument of {len} bytes exceeds limit")));
        }
        let mut raw = vec![0u8; len as usize];
        reader.read_exact(&mut raw).await?;
        args.push(raw);
    }

    Ok(Some(RawFrame {
        version: header >> 4,
        args,
    }))
}

/// Split a pub-emitter frame into its topic and JSON packet
pub fn into_bus_message(args: Vec<AmpArg>) -> RelayResult<(String, Value)> {
    let mut args = args.into_iter();
    let topic = match args.next() {
        Some(AmpArg::Text(topic)) => topic,
        Some(other) => return Err(RelayError::frame(format!("topic is not a string: {other:?}"))),
        None => return Err(RelayError::frame("empty frame")),
    };

    let packet = match args.next() {
        Some(AmpArg::Json(value)) => value,
        Some(AmpArg::Text(text)) => Value::String(text),
        Some(AmpArg::Bytes(_)) => return Err(RelayError::frame(format!("binary packet on {topic}"))),
        None => Value::Null,
    };

    Ok((topic, packet))
}
