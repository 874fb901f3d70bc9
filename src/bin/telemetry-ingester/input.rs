use std::path::Path;

use anyhow::{Context as _, Result};
use tokio::fs::File;
use tokio::io::{AsyncBufRead, BufReader, stdin};

pub type DeviceStream = Box<dyn AsyncBufRead + Unpin + Send>;

/// Opens an already-connected device stream: stdin for `-`, otherwise a file or tty path.
pub async fn open(path: &Path) -> Result<DeviceStream> {
    if path == Path::new("-") {
        return Ok(Box::new(BufReader::new(stdin())));
    }

    let file = File::open(path)
        .await
        .with_context(|| format!("failed to open device stream: {}", path.display()))?;

    Ok(Box::new(BufReader::new(file)))
}
