//! JSON-lines output of decoded entries.

use crate::timetable::ScheduleEntry;
use anyhow::{Context, Result};
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;

/// Drain `rx`, writing one JSON object per line. Returns the number of
/// entries written once every sender has been dropped.
pub async fn write_json_lines<W>(mut rx: mpsc::Receiver<ScheduleEntry>, writer: W) -> Result<usize>
where
    W: AsyncWrite + Unpin,
{
    let mut writer = BufWriter::new(writer);
    let mut written = 0;

    while let Some(entry) = rx.recv().await {
        let mut line = serde_json::to_vec(&entry).context("Failed to serialize entry")?;
        line.push(b'\n');
        writer
            .write_all(&line)
            .await
            .context("Failed to write entry")?;
        written += 1;
    }

    writer.flush().await.context("Failed to flush output")?;
    Ok(written)
}
