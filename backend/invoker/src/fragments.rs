//! Incremental UTF-8 decoding for pipe reads.
//!
//! Pipe reads land on arbitrary byte boundaries, so a multi-byte sequence can
//! be split across two reads. The carry keeps the incomplete tail until the
//! next read completes it; genuinely invalid bytes become U+FFFD.

/// Decoder state carried across reads of one invocation.
#[derive(Debug, Default)]
pub struct Utf8Carry {
    pending: Vec<u8>,
}

impl Utf8Carry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes and return whatever decodes cleanly so far.
    /// An incomplete trailing sequence stays pending; invalid bytes are
    /// replaced and skipped.
    pub fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);

        let mut out = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(s) => {
                    out.push_str(s);
                    self.pending.clear();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        // Incomplete sequence at the end of the buffer: keep
                        // it for the next read.
                        None => {
                            self.pending.drain(..valid);
                            break;
                        }
                        // Invalid bytes mid-buffer: replace and continue.
                        Some(len) => {
                            out.push('\u{FFFD}');
                            self.pending.drain(..valid + len);
                        }
                    }
                }
            }
        }
        out
    }

    /// Drain any leftover bytes at end of stream. A dangling partial
    /// sequence at EOF decodes lossily — there is no next read.
    pub fn flush(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let out = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_ascii_passes_through() {
        let mut carry = Utf8Carry::new();
        assert_eq!(carry.push(b"hello"), "hello");
        assert!(carry.flush().is_none());
    }

    #[test]
    fn split_multibyte_sequence_is_carried() {
        // "é" is 0xC3 0xA9.
        let mut carry = Utf8Carry::new();
        assert_eq!(carry.push(&[b'h', 0xC3]), "h");
        assert_eq!(carry.push(&[0xA9, b'!']), "é!");
        assert!(carry.flush().is_none());
    }

    #[test]
    fn split_four_byte_emoji_is_carried() {
        let bytes = "🎉".as_bytes();
        let mut carry = Utf8Carry::new();
        assert_eq!(carry.push(&bytes[..2]), "");
        assert_eq!(carry.push(&bytes[2..]), "🎉");
    }

    #[test]
    fn invalid_byte_becomes_replacement() {
        let mut carry = Utf8Carry::new();
        let out = carry.push(&[b'a', 0xFF, b'b']);
        assert_eq!(out, "a\u{FFFD}b");
    }

    #[test]
    fn dangling_partial_flushes_lossily() {
        let mut carry = Utf8Carry::new();
        assert_eq!(carry.push(&[0xC3]), "");
        assert_eq!(carry.flush().unwrap(), "\u{FFFD}");
    }
}
