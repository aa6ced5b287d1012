//! Fixed-layout message records exchanged with external peers.
//!
//! A [`Msg`] is the wire header shared by every message: type name, string
//! destination and source, sequence number and the total record length. An
//! [`ErrorMsg`] extends it with the error triple used by confirmations. All
//! text fields are NUL-padded; integers are little-endian.
//!
//! Messages travel inside events as payloads, which is how the request and
//! confirmation helpers in [`Hsm`](crate::hsm::Hsm) find them.

use heapless::String;
use thiserror::Error;

use crate::error::ErrorCode;
use crate::event::Evt;
use crate::signal::Sequence;

pub const TYPE_LEN: usize = 38;
pub const TO_LEN: usize = 16;
pub const FROM_LEN: usize = 16;
pub const ERROR_LEN: usize = 16;
pub const ORIGIN_LEN: usize = 16;
pub const REASON_LEN: usize = 16;

const SEQ_OFFSET: usize = TYPE_LEN + TO_LEN + FROM_LEN;
const LEN_OFFSET: usize = SEQ_OFFSET + 2;

/// Encoded size of a bare [`Msg`].
pub const MSG_LEN: usize = LEN_OFFSET + 4;
/// Encoded size of an [`ErrorMsg`].
pub const ERROR_MSG_LEN: usize = MSG_LEN + ERROR_LEN + ORIGIN_LEN + REASON_LEN;

pub const MSG_UNDEF: &str = "UNDEF";
pub const MSG_REASON_UNSPEC: &str = "UNSPEC";

/// String address of a message peer.
pub type MsgId = String<TO_LEN>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MsgError {
    #[error("record of {actual} bytes is shorter than {needed}")]
    Truncated { needed: usize, actual: usize },
    #[error("length field says {declared} bytes but {actual} were received")]
    LengthMismatch { declared: usize, actual: usize },
    #[error("buffer of {actual} bytes cannot hold {needed}")]
    BufferTooSmall { needed: usize, actual: usize },
    #[error("field `{0}` is not valid UTF-8")]
    InvalidText(&'static str),
}

/// Copies `s` into a field of `N` bytes, keeping room for the NUL terminator.
pub fn fixed<const N: usize>(s: &str) -> String<N> {
    let mut out = String::new();
    for c in s.chars() {
        if out.len() + c.len_utf8() >= N {
            break;
        }
        // Capacity checked above.
        let _ = out.push(c);
    }
    out
}

fn put_text(buf: &mut [u8], text: &str) {
    buf.fill(0);
    buf[..text.len()].copy_from_slice(text.as_bytes());
}

fn get_text<const N: usize>(buf: &[u8], field: &'static str) -> Result<String<N>, MsgError> {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len()).min(N - 1);
    let text = core::str::from_utf8(&buf[..end]).map_err(|_| MsgError::InvalidText(field))?;
    Ok(fixed(text))
}

/// Reads the length field and checks it against the received byte count.
fn check_len(bytes: &[u8], min: usize) -> Result<(), MsgError> {
    if bytes.len() < min {
        return Err(MsgError::Truncated {
            needed: min,
            actual: bytes.len(),
        });
    }
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[LEN_OFFSET..MSG_LEN]);
    let declared = u32::from_le_bytes(raw) as usize;
    if declared != bytes.len() {
        return Err(MsgError::LengthMismatch {
            declared,
            actual: bytes.len(),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Msg {
    kind: String<TYPE_LEN>,
    to: MsgId,
    from: String<FROM_LEN>,
    seq: Sequence,
    len: u32,
}

impl Msg {
    pub fn new(kind: &str) -> Self {
        Self::with_route(kind, MSG_UNDEF, MSG_UNDEF, 0)
    }

    pub fn with_route(kind: &str, to: &str, from: &str, seq: Sequence) -> Self {
        Self {
            kind: fixed(kind),
            to: fixed(to),
            from: fixed(from),
            seq,
            len: MSG_LEN as u32,
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn seq(&self) -> Sequence {
        self.seq
    }

    /// Total encoded length, including any derived record.
    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn set_to(&mut self, to: &str) {
        self.to = fixed(to);
    }

    pub fn set_from(&mut self, from: &str) {
        self.from = fixed(from);
    }

    pub fn set_seq(&mut self, seq: Sequence) {
        self.seq = seq;
    }

    /// Sets the total length for records that extend the header.
    pub fn set_len(&mut self, len: usize) {
        self.len = len as u32;
    }

    pub fn to_id(&self) -> MsgId {
        self.to.clone()
    }

    pub fn from_id(&self) -> MsgId {
        fixed(&self.from)
    }

    /// Writes the header into `buf` and returns the number of bytes written.
    pub fn encode_into(&self, buf: &mut [u8]) -> Result<usize, MsgError> {
        if buf.len() < MSG_LEN {
            return Err(MsgError::BufferTooSmall {
                needed: MSG_LEN,
                actual: buf.len(),
            });
        }
        put_text(&mut buf[..TYPE_LEN], &self.kind);
        put_text(&mut buf[TYPE_LEN..TYPE_LEN + TO_LEN], &self.to);
        put_text(&mut buf[TYPE_LEN + TO_LEN..SEQ_OFFSET], &self.from);
        buf[SEQ_OFFSET..LEN_OFFSET].copy_from_slice(&self.seq.to_le_bytes());
        buf[LEN_OFFSET..MSG_LEN].copy_from_slice(&self.len.to_le_bytes());
        Ok(MSG_LEN)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; MSG_LEN];
        // Sized above.
        let _ = self.encode_into(&mut buf);
        buf
    }

    /// Decodes a header and returns it with the bytes of the derived record.
    ///
    /// The length field must equal `bytes.len()`; nothing else is read
    /// before that holds.
    pub fn decode(bytes: &[u8]) -> Result<(Self, &[u8]), MsgError> {
        check_len(bytes, MSG_LEN)?;
        Ok((Self::decode_header(bytes)?, &bytes[MSG_LEN..]))
    }

    fn decode_header(bytes: &[u8]) -> Result<Self, MsgError> {
        let mut seq = [0u8; 2];
        seq.copy_from_slice(&bytes[SEQ_OFFSET..LEN_OFFSET]);
        Ok(Self {
            kind: get_text(&bytes[..TYPE_LEN], "type")?,
            to: get_text(&bytes[TYPE_LEN..TYPE_LEN + TO_LEN], "to")?,
            from: get_text(&bytes[TYPE_LEN + TO_LEN..SEQ_OFFSET], "from")?,
            seq: u16::from_le_bytes(seq),
            len: bytes.len() as u32,
        })
    }
}

/// Message carrying an error triple, used for confirmations and responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorMsg {
    base: Msg,
    error: String<ERROR_LEN>,
    origin: String<ORIGIN_LEN>,
    reason: String<REASON_LEN>,
}

impl ErrorMsg {
    pub fn new(kind: &str) -> Self {
        Self::with_error(kind, ErrorCode::Success.name(), MSG_UNDEF, MSG_REASON_UNSPEC)
    }

    pub fn with_error(kind: &str, error: &str, origin: &str, reason: &str) -> Self {
        let mut base = Msg::new(kind);
        base.set_len(ERROR_MSG_LEN);
        Self {
            base,
            error: fixed(error),
            origin: fixed(origin),
            reason: fixed(reason),
        }
    }

    pub fn msg(&self) -> &Msg {
        &self.base
    }

    pub fn msg_mut(&mut self) -> &mut Msg {
        &mut self.base
    }

    pub fn error(&self) -> &str {
        &self.error
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn set_error(&mut self, error: &str, origin: &str, reason: &str) {
        self.error = fixed(error);
        self.origin = fixed(origin);
        self.reason = fixed(reason);
    }

    pub fn is_success(&self) -> bool {
        self.error.as_str() == ErrorCode::Success.name()
    }

    pub fn encode_into(&self, buf: &mut [u8]) -> Result<usize, MsgError> {
        if buf.len() < ERROR_MSG_LEN {
            return Err(MsgError::BufferTooSmall {
                needed: ERROR_MSG_LEN,
                actual: buf.len(),
            });
        }
        let mut pos = self.base.encode_into(buf)?;
        for (text, width) in [
            (self.error.as_str(), ERROR_LEN),
            (self.origin.as_str(), ORIGIN_LEN),
            (self.reason.as_str(), REASON_LEN),
        ] {
            put_text(&mut buf[pos..pos + width], text);
            pos += width;
        }
        Ok(pos)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; ERROR_MSG_LEN];
        let _ = self.encode_into(&mut buf);
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, MsgError> {
        check_len(bytes, ERROR_MSG_LEN)?;
        let base = Msg::decode_header(bytes)?;
        let origin_at = MSG_LEN + ERROR_LEN;
        let reason_at = origin_at + ORIGIN_LEN;
        Ok(Self {
            base,
            error: get_text(&bytes[MSG_LEN..origin_at], "error")?,
            origin: get_text(&bytes[origin_at..reason_at], "origin")?,
            reason: get_text(&bytes[reason_at..ERROR_MSG_LEN], "reason")?,
        })
    }
}

impl Evt {
    /// Message header of a message event, plain or error-carrying.
    pub fn msg(&self) -> Option<&Msg> {
        self.payload::<Msg>()
            .or_else(|| self.payload::<ErrorMsg>().map(ErrorMsg::msg))
    }

    pub fn msg_mut(&mut self) -> Option<&mut Msg> {
        if self.payload::<Msg>().is_some() {
            return self.payload_mut::<Msg>();
        }
        self.payload_mut::<ErrorMsg>().map(ErrorMsg::msg_mut)
    }

    pub fn error_msg(&self) -> Option<&ErrorMsg> {
        self.payload::<ErrorMsg>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_sizes() {
        assert_eq!(MSG_LEN, 76);
        assert_eq!(ERROR_MSG_LEN, 124);
    }

    #[test]
    fn header_encodes_and_decodes() {
        let msg = Msg::with_route("SampleStartReq", "Node2", "Node1", 0x1234);
        let bytes = msg.encode();
        assert_eq!(bytes.len(), MSG_LEN);
        assert_eq!(&bytes[SEQ_OFFSET..LEN_OFFSET], &[0x34, 0x12]);

        let (decoded, rest) = Msg::decode(&bytes).unwrap();
        assert_eq!(decoded, msg);
        assert!(rest.is_empty());
    }

    #[test]
    fn length_is_checked_first() {
        let bytes = Msg::new("Ping").encode();
        let mut longer = bytes.clone();
        longer.extend_from_slice(&[0xFF; 4]);
        assert_eq!(
            Msg::decode(&longer).unwrap_err(),
            MsgError::LengthMismatch {
                declared: MSG_LEN,
                actual: MSG_LEN + 4
            }
        );
        assert!(matches!(
            Msg::decode(&bytes[..10]),
            Err(MsgError::Truncated { needed: MSG_LEN, .. })
        ));

        // A bogus length field is reported even when text fields are garbage.
        let mut bad = bytes;
        bad[..TYPE_LEN].fill(0xFF);
        bad[LEN_OFFSET] = 0xFF;
        assert!(matches!(
            Msg::decode(&bad),
            Err(MsgError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn invalid_text_is_rejected() {
        let mut bytes = Msg::new("Ping").encode();
        bytes[0] = 0xFF;
        assert_eq!(Msg::decode(&bytes).unwrap_err(), MsgError::InvalidText("type"));
    }

    #[test]
    fn error_msg_defaults_and_codec() {
        let msg = ErrorMsg::new("StartCfm");
        assert!(msg.is_success());
        assert_eq!(msg.origin(), MSG_UNDEF);
        assert_eq!(msg.msg().len(), ERROR_MSG_LEN);

        let mut failed = ErrorMsg::with_error("StartCfm", "TIMEOUT", "Node2", "UNSPEC");
        failed.msg_mut().set_seq(9);
        let decoded = ErrorMsg::decode(&failed.encode()).unwrap();
        assert_eq!(decoded, failed);
        assert!(!decoded.is_success());

        // A bare header is not a valid error message.
        assert!(ErrorMsg::decode(&Msg::new("StartCfm").encode()).is_err());
    }

    #[test]
    fn text_fields_truncate_to_leave_nul() {
        let msg = Msg::with_route("T", "0123456789abcdefXYZ", "", 0);
        assert_eq!(msg.to(), "0123456789abcde");
        let bytes = msg.encode();
        assert_eq!(bytes[TYPE_LEN + TO_LEN - 1], 0);
    }
}
