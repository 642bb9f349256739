//! Message framing for tsserver stdio
//!
//! Requests go out as one JSON document per line. Responses and events come
//! back as `Content-Length: N\r\n\r\n{json}` frames, where N counts the
//! trailing newline as well.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::session::error::SessionError;

/// Maximum frame size (16 MiB); navtrees of large files get big
const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

pub struct FrameReader<R> {
    reader: BufReader<R>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
        }
    }

    /// Read the next frame body. Returns `Ok(None)` on a clean EOF.
    pub async fn read_frame(&mut self) -> Result<Option<Vec<u8>>, SessionError> {
        let Some(content_length) = self.read_headers().await? else {
            return Ok(None);
        };

        if content_length > MAX_FRAME_BYTES {
            return Err(SessionError::InvalidFrame(format!(
                "Content-Length {content_length} exceeds maximum {MAX_FRAME_BYTES}"
            )));
        }

        let mut body = vec![0u8; content_length];
        self.reader.read_exact(&mut body).await?;
        Ok(Some(body))
    }

    async fn read_headers(&mut self) -> Result<Option<usize>, SessionError> {
        let mut content_length = None;
        let mut line = String::new();
        let mut saw_header = false;

        loop {
            line.clear();
            if self.reader.read_line(&mut line).await? == 0 {
                if !saw_header {
                    return Ok(None);
                }
                return Err(SessionError::InvalidFrame(
                    "unexpected EOF while reading headers".to_string(),
                ));
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                if saw_header {
                    break;
                }
                // stray blank line between frames
                continue;
            }
            saw_header = true;

            if let Some((key, value)) = trimmed.split_once(':')
                && key.eq_ignore_ascii_case("Content-Length")
            {
                let len = value.trim().parse::<usize>().map_err(|e| {
                    SessionError::InvalidFrame(format!("invalid Content-Length: {e}"))
                })?;
                content_length = Some(len);
            }
        }

        content_length
            .map(Some)
            .ok_or_else(|| SessionError::InvalidFrame("missing Content-Length header".to_string()))
    }
}

pub struct LineWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> LineWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write one request line and flush it
    pub async fn write_line(&mut self, body: &[u8]) -> Result<(), SessionError> {
        self.writer.write_all(body).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }
}
