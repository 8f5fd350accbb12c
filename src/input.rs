//! Input boundary: reads the dump document from a file or stdin.
//!
//! The size limit is enforced here, before the parser ever sees the text.

use std::fs;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Reads the whole dump into memory, rejecting anything over `max_bytes`.
pub fn read_document(path: Option<&Path>, max_bytes: u64) -> Result<String, anyhow::Error> {
    let text = match path {
        Some(path) => {
            let meta = fs::metadata(path)
                .map_err(|e| anyhow::anyhow!("cannot read {}: {}", path.display(), e))?;
            if meta.len() > max_bytes {
                return Err(anyhow::anyhow!(
                    "{} is {} bytes, over the {} byte limit",
                    path.display(),
                    meta.len(),
                    max_bytes
                ));
            }
            fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("cannot read {}: {}", path.display(), e))?
        }
        None => {
            let mut text = String::new();
            std::io::stdin()
                .lock()
                .take(max_bytes.saturating_add(1))
                .read_to_string(&mut text)
                .map_err(|e| anyhow::anyhow!("cannot read stdin: {}", e))?;
            if text.len() as u64 > max_bytes {
                return Err(anyhow::anyhow!("stdin is over the {} byte limit", max_bytes));
            }
            text
        }
    };

    debug!(bytes = text.len(), "read dump document");
    Ok(text)
}
