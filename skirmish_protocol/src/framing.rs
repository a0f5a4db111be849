// Newline-delimited text framing over any `Read`/`Write` stream.
//
// The wire format is plain UTF-8 text. The server writes whole lines ending
// in `\n`, except lobby countdown updates, which end in `\r` so a terminal
// client can overwrite them in place. Readers therefore split on either
// terminator and report which one ended the segment.
//
// Reads are byte-at-a-time on purpose: the server hands out cheap
// `&TcpStream` readers per request, and a buffered reader would swallow bytes
// belonging to the next line. A line longer than `MAX_LINE_LEN` is a protocol
// violation and the connection is treated as gone.

use std::io::{self, Read, Write};

use thiserror::Error;

/// Maximum accepted line length in bytes, terminator excluded.
pub const MAX_LINE_LEN: usize = 1024;

/// Errors produced while reading a line from a peer.
#[derive(Debug, Error)]
pub enum LineError {
    /// The peer closed the stream before a terminator arrived.
    #[error("connection closed by peer")]
    Closed,

    /// The peer sent more than `MAX_LINE_LEN` bytes without a terminator.
    #[error("line exceeds {MAX_LINE_LEN} bytes")]
    TooLong,

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl LineError {
    /// True for `WouldBlock`/`Interrupted` I/O errors, which only mean "try
    /// again later" on a non-blocking socket.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LineError::Io(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted)
        )
    }
}

/// How a segment read by `read_segment` was terminated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Terminator {
    Newline,
    CarriageReturn,
}

/// One piece of server output: the text plus the byte that ended it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub terminator: Terminator,
}

/// Write `text` followed by a single `\n` and flush.
pub fn write_line<W: Write>(writer: &mut W, text: &str) -> io::Result<()> {
    writer.write_all(text.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()
}

/// Write `text` verbatim (no terminator added) and flush. Used for
/// countdown updates, which carry their own trailing `\r`.
pub fn write_raw<W: Write>(writer: &mut W, text: &str) -> io::Result<()> {
    writer.write_all(text.as_bytes())?;
    writer.flush()
}

/// Read one `\n`-terminated line. A trailing `\r` (CRLF clients) is stripped;
/// invalid UTF-8 is replaced rather than rejected.
pub fn read_line<R: Read>(reader: &mut R) -> Result<String, LineError> {
    let mut buf = Vec::new();
    loop {
        match read_byte(reader)? {
            b'\n' => break,
            byte => push_bounded(&mut buf, byte)?,
        }
    }
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Read up to the next `\n` or `\r`, whichever comes first.
pub fn read_segment<R: Read>(reader: &mut R) -> Result<Segment, LineError> {
    let mut buf = Vec::new();
    let terminator = loop {
        match read_byte(reader)? {
            b'\n' => break Terminator::Newline,
            b'\r' => break Terminator::CarriageReturn,
            byte => push_bounded(&mut buf, byte)?,
        }
    };
    Ok(Segment {
        text: String::from_utf8_lossy(&buf).into_owned(),
        terminator,
    })
}

fn read_byte<R: Read>(reader: &mut R) -> Result<u8, LineError> {
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte) {
            Ok(0) => return Err(LineError::Closed),
            Ok(_) => return Ok(byte[0]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

fn push_bounded(buf: &mut Vec<u8>, byte: u8) -> Result<(), LineError> {
    if buf.len() >= MAX_LINE_LEN {
        return Err(LineError::TooLong);
    }
    buf.push(byte);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_lines_in_sequence() {
        let mut cursor = Cursor::new(b"Conan Orc\n1\n".to_vec());
        assert_eq!(read_line(&mut cursor).unwrap(), "Conan Orc");
        assert_eq!(read_line(&mut cursor).unwrap(), "1");
    }

    #[test]
    fn strips_crlf() {
        let mut cursor = Cursor::new(b"2\r\n".to_vec());
        assert_eq!(read_line(&mut cursor).unwrap(), "2");
    }

    #[test]
    fn eof_mid_line_is_closed() {
        let mut cursor = Cursor::new(b"partial".to_vec());
        assert!(matches!(read_line(&mut cursor), Err(LineError::Closed)));
    }

    #[test]
    fn eof_before_anything_is_closed() {
        let mut cursor = Cursor::new(Vec::new());
        assert!(matches!(read_line(&mut cursor), Err(LineError::Closed)));
    }

    #[test]
    fn overlong_line_rejected() {
        let mut data = vec![b'a'; MAX_LINE_LEN + 1];
        data.push(b'\n');
        let mut cursor = Cursor::new(data);
        assert!(matches!(read_line(&mut cursor), Err(LineError::TooLong)));
    }

    #[test]
    fn line_at_limit_accepted() {
        let mut data = vec![b'a'; MAX_LINE_LEN];
        data.push(b'\n');
        let mut cursor = Cursor::new(data);
        assert_eq!(read_line(&mut cursor).unwrap().len(), MAX_LINE_LEN);
    }

    #[test]
    fn segments_split_on_carriage_return() {
        let mut cursor = Cursor::new(b"Game starts in 3s...\rGame starts in 2s...\rGo\n".to_vec());
        let first = read_segment(&mut cursor).unwrap();
        assert_eq!(first.text, "Game starts in 3s...");
        assert_eq!(first.terminator, Terminator::CarriageReturn);
        let second = read_segment(&mut cursor).unwrap();
        assert_eq!(second.terminator, Terminator::CarriageReturn);
        let third = read_segment(&mut cursor).unwrap();
        assert_eq!(third.text, "Go");
        assert_eq!(third.terminator, Terminator::Newline);
    }

    #[test]
    fn write_line_appends_newline() {
        let mut out = Vec::new();
        write_line(&mut out, "hello").unwrap();
        assert_eq!(out, b"hello\n");
    }

    #[test]
    fn would_block_is_retryable() {
        let err = LineError::Io(io::Error::from(io::ErrorKind::WouldBlock));
        assert!(err.is_retryable());
        assert!(!LineError::Closed.is_retryable());
    }
}
