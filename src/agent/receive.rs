//! Demultiplexes an inbound datagram into media, STUN, or pass-through.
//!
//! Grounded in the RTP-vs-STUN heuristic used throughout the pack's ICE/RTP
//! demuxers (the top two bits of the first byte distinguish RTP's version
//! field, binary `10`, from STUN's always-zero top two bits) and in the
//! `stun` crate's own `is_message` validator, which the teacher's transport
//! layer leans on for the same purpose.

use stun::message::is_message;

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Classification {
    /// Looks like RTP/RTCP media: deliver to the application unparsed.
    Media,
    /// Valid STUN framing: hand to the connectivity-check/discovery engines.
    Stun,
    /// Neither: pass through to the application, which may recognise it.
    PassThrough,
}

/// Classifies one inbound datagram per the receive-path rules: the RTP
/// version-bits check first (cheap, no parse), then full STUN validation.
#[must_use]
pub(crate) fn classify(bytes: &[u8]) -> Classification {
    if !bytes.is_empty() && (bytes[0] & 0xC0) == 0x80 {
        return Classification::Media;
    }
    if is_message(bytes) {
        return Classification::Stun;
    }
    Classification::PassThrough
}

#[cfg(test)]
mod receive_test {
    use super::*;

    #[test]
    fn test_rtp_like_bytes_classified_as_media() {
        let bytes = [0x80, 0x00, 0x00, 0x00];
        assert_eq!(classify(&bytes), Classification::Media);
    }

    #[test]
    fn test_empty_datagram_is_pass_through() {
        assert_eq!(classify(&[]), Classification::PassThrough);
    }

    #[test]
    fn test_garbage_is_pass_through() {
        let bytes = [0x01, 0x02, 0x03];
        assert_eq!(classify(&bytes), Classification::PassThrough);
    }
}
