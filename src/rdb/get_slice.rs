/// Borrows `length` bytes at `cursor`, failing with `UnexpectedEof` when the
/// buffer is shorter. Every RDB decode step goes through this so truncated
/// files surface as one error kind.
pub fn get_buffer_slice(buffer: &[u8], cursor: usize, length: usize) -> tokio::io::Result<&[u8]> {
    if cursor + length > buffer.len() {
        return Err(tokio::io::Error::new(
            tokio::io::ErrorKind::UnexpectedEof,
            "Not enough data in buffer",
        ));
    }

    Ok(&buffer[cursor..cursor + length])
}
