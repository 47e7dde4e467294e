//! Chunk codec: lossless split/join of payloads into bounded pieces.
//!
//! The codec knows nothing about what a payload represents. Chunk boundaries
//! carry no meaning and there is no framing: the total length lives in the
//! info record written next to the chunks.

use thiserror::Error;

/// Errors from chunking parameters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("chunk size must be at least one byte")]
    ZeroChunkSize,
}

/// Split `payload` into `ceil(len / max_chunk_size)` ordered slices.
///
/// Every slice is non-empty and at most `max_chunk_size` bytes. An empty
/// payload yields no slices.
pub fn split(payload: &[u8], max_chunk_size: usize) -> Result<Vec<&[u8]>, CodecError> {
    if max_chunk_size == 0 {
        return Err(CodecError::ZeroChunkSize);
    }
    Ok(payload.chunks(max_chunk_size).collect())
}

/// Concatenate chunks in order.
pub fn join<B: AsRef<[u8]>>(chunks: &[B]) -> Vec<u8> {
    let len = chunks.iter().map(|c| c.as_ref().len()).sum();
    let mut out = Vec::with_capacity(len);
    for chunk in chunks {
        out.extend_from_slice(chunk.as_ref());
    }
    out
}

/// Split a string into slices of at most `max_chunk_size` bytes without
/// cutting through a UTF-8 sequence.
///
/// ASCII input splits exactly like [`split`]. A cut that would land inside a
/// multi-byte character moves back to the previous boundary; a character
/// wider than `max_chunk_size` becomes a slice of its own.
pub fn split_str(payload: &str, max_chunk_size: usize) -> Result<Vec<&str>, CodecError> {
    if max_chunk_size == 0 {
        return Err(CodecError::ZeroChunkSize);
    }

    let mut pieces = Vec::with_capacity(payload.len().div_ceil(max_chunk_size));
    let mut rest = payload;
    while !rest.is_empty() {
        let mut cut = max_chunk_size.min(rest.len());
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        if cut == 0 {
            cut = rest.chars().next().map_or(rest.len(), char::len_utf8);
        }
        let (head, tail) = rest.split_at(cut);
        pieces.push(head);
        rest = tail;
    }
    Ok(pieces)
}

/// Concatenate string chunks in order.
pub fn join_str<S: AsRef<str>>(chunks: &[S]) -> String {
    let len = chunks.iter().map(|c| c.as_ref().len()).sum();
    let mut out = String::with_capacity(len);
    for chunk in chunks {
        out.push_str(chunk.as_ref());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_payload_has_no_chunks() {
        assert_eq!(split(b"", 4), Ok(Vec::<&[u8]>::new()));
        assert_eq!(split_str("", 4), Ok(Vec::<&str>::new()));
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        assert_eq!(split(b"abc", 0), Err(CodecError::ZeroChunkSize));
        assert_eq!(split_str("abc", 0), Err(CodecError::ZeroChunkSize));
    }

    #[test]
    fn last_chunk_holds_the_remainder() -> Result<(), CodecError> {
        let chunks = split(b"abcdefghij", 4)?;
        assert_eq!(chunks, vec![&b"abcd"[..], &b"efgh"[..], &b"ij"[..]]);
        assert_eq!(join(&chunks), b"abcdefghij");
        Ok(())
    }

    #[test]
    fn exact_multiple_has_no_empty_tail() -> Result<(), CodecError> {
        assert_eq!(split(b"abcdef", 3)?.len(), 2);
        assert_eq!(split_str("abcdef", 3)?.len(), 2);
        Ok(())
    }

    #[test]
    fn split_str_respects_char_boundaries() -> Result<(), CodecError> {
        // "é" is two bytes, so a 3-byte window cannot take "aé" plus the next char.
        let chunks = split_str("aéaéaé", 3)?;
        assert!(chunks.iter().all(|c| c.len() <= 3));
        assert_eq!(join_str(&chunks), "aéaéaé");
        Ok(())
    }

    #[test]
    fn split_str_wide_char_gets_its_own_chunk() -> Result<(), CodecError> {
        let chunks = split_str("a🦀b", 2)?;
        assert_eq!(chunks, vec!["a", "🦀", "b"]);
        Ok(())
    }
}
