//! Binary content sniffing.

/// Number of leading bytes inspected.
pub const PEEK_SIZE: usize = 1024;

/// Whether the start of `bytes` looks like binary data.
///
/// Only the first [`PEEK_SIZE`] bytes are inspected. They are binary if they
/// contain a NUL byte or are not valid UTF-8. A multi-byte sequence cut off at
/// the end of a full peek window does not count as invalid, since the caller
/// may only have read that far.
pub fn looks_binary(bytes: &[u8]) -> bool {
    let truncated = bytes.len() >= PEEK_SIZE;
    let head = &bytes[..bytes.len().min(PEEK_SIZE)];

    if head.contains(&0) {
        return true;
    }

    match std::str::from_utf8(head) {
        Ok(_) => false,
        // `error_len() == None` means the input ended mid-sequence.
        Err(err) => err.error_len().is_some() || !truncated,
    }
}
