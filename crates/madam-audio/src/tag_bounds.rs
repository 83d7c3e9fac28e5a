//! Byte boundaries of the ID3 tags wrapped around an MPEG audio stream.

const ID3V1_LEN: usize = 128;

/// Total length of an ID3v2 tag at the start of `data`, header and footer
/// included. `None` if `data` does not start with a valid ID3v2 header.
pub(crate) fn id3v2_len(data: &[u8]) -> Option<usize> {
    let header = data.get(..10)?;
    if &header[..3] != b"ID3" || header[3] == 0xFF || header[4] == 0xFF {
        return None;
    }
    let size_bytes = &header[6..10];
    if size_bytes.iter().any(|b| b & 0x80 != 0) {
        return None;
    }
    let size = size_bytes.iter().fold(0usize, |acc, &b| (acc << 7) | b as usize);
    let footer = if header[3] >= 4 && header[5] & 0x10 != 0 { 10 } else { 0 };
    Some(10 + size + footer)
}

/// Offset just past every complete ID3v2 tag at the start of `data`.
///
/// Returns `Err` with the offset of a tag that claims more bytes than `data`
/// holds.
pub(crate) fn skip_id3v2(data: &[u8]) -> Result<usize, usize> {
    let mut offset = 0;
    while let Some(len) = id3v2_len(&data[offset..]) {
        if offset + len > data.len() {
            return Err(offset);
        }
        offset += len;
    }
    Ok(offset)
}

/// Offset where a trailing ID3v1 tag starts, or `data.len()` if there is
/// none. Only bytes from `from` onwards are considered.
pub(crate) fn id3v1_start(data: &[u8], from: usize) -> usize {
    if data.len() >= from + ID3V1_LEN && data[data.len() - ID3V1_LEN..].starts_with(b"TAG") {
        data.len() - ID3V1_LEN
    } else {
        data.len()
    }
}

/// The trailing ID3v1 tag of `data`, if any.
pub(crate) fn id3v1(data: &[u8], from: usize) -> Option<&[u8]> {
    let start = id3v1_start(data, from);
    (start < data.len()).then(|| &data[start..])
}
