//! DAP wire protocol codec
//!
//! DAP frames messages with HTTP-style headers followed by a JSON body:
//! ```text
//! Content-Length: <byte-length>\r\n
//! \r\n
//! <JSON body>
//! ```

use std::io;

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::common::Error;

/// Refuse bodies larger than this; no sane DAP message comes close.
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Read one DAP message from the stream and parse its JSON body
pub async fn read_message<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Value, Error> {
    let len = read_headers(reader).await?;

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await.map_err(eof_is_crash)?;

    serde_json::from_slice(&body)
        .map_err(|e| Error::DapProtocol(format!("Invalid JSON body: {}", e)))
}

/// Read headers up to the blank separator line, returning the Content-Length
async fn read_headers<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<usize, Error> {
    let mut content_length: Option<usize> = None;

    loop {
        let mut line = String::new();
        let bytes_read = reader.read_line(&mut line).await.map_err(eof_is_crash)?;
        if bytes_read == 0 {
            return Err(Error::AdapterCrashed);
        }

        // Blank line terminates the header block
        if line == "\r\n" || line == "\n" {
            break;
        }

        if let Some(value) = line.trim().strip_prefix("Content-Length:") {
            let len: usize = value.trim().parse().map_err(|_| {
                Error::DapProtocol(format!("Invalid Content-Length: {}", value.trim()))
            })?;
            if len > MAX_BODY_BYTES {
                return Err(Error::DapProtocol(format!(
                    "Content-Length too large: {} bytes",
                    len
                )));
            }
            content_length = Some(len);
        }
        // Other headers (Content-Type) are ignored
    }

    content_length
        .ok_or_else(|| Error::DapProtocol("Missing Content-Length header".to_string()))
}

/// Serialize and write one DAP message to the stream
pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    message: &Value,
) -> Result<(), Error> {
    let body = serde_json::to_string(message)?;
    let header = format!("Content-Length: {}\r\n\r\n", body.len());

    writer.write_all(header.as_bytes()).await?;
    writer.write_all(body.as_bytes()).await?;
    writer.flush().await?;

    Ok(())
}

fn eof_is_crash(e: io::Error) -> Error {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        Error::AdapterCrashed
    } else {
        Error::Io(e)
    }
}
