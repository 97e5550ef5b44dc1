//! Length-prefixed framing for stream transports.
//!
//! ```text
//! [u32 BE: len][payload bytes of len]
//! ```

use crate::config::ProtocolConfig;
use crate::error::{DnodeError, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Read a length-prefixed frame from an async reader.
///
/// Returns `None` on clean EOF (peer closed connection).
pub async fn read_frame<R: AsyncReadExt + Unpin>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(len_buf) as usize;

    if len > ProtocolConfig::MAX_MESSAGE_SIZE {
        return Err(DnodeError::MessageTooLarge {
            size: len,
            max: ProtocolConfig::MAX_MESSAGE_SIZE,
        });
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;

    Ok(Some(payload))
}

/// Write a length-prefixed frame to an async writer.
pub async fn write_frame<W: AsyncWriteExt + Unpin>(writer: &mut W, payload: &[u8]) -> Result<()> {
    if payload.len() > ProtocolConfig::MAX_MESSAGE_SIZE {
        return Err(DnodeError::MessageTooLarge {
            size: payload.len(),
            max: ProtocolConfig::MAX_MESSAGE_SIZE,
        });
    }

    let len = payload.len() as u32;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}
