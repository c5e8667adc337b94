//! JSON export — write a snapshot in the viewer's wire format.
//!
//! ```text
//! Snapshot → write_json() → {"queuemanagers": [...], "applications": [...], "connections": [...]}
//! ```

use std::io::Write;

use crate::topology::Snapshot;
use crate::Result;

/// Write `snapshot` as a single JSON document, followed by a newline.
pub fn write_json(snapshot: &Snapshot, writer: &mut dyn Write, pretty: bool) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut *writer, snapshot)?;
    } else {
        serde_json::to_writer(&mut *writer, snapshot)?;
    }
    writeln!(writer)?;
    Ok(())
}

/// Read a snapshot previously written by [`write_json`].
pub fn read_json(bytes: &[u8]) -> Result<Snapshot> {
    Ok(serde_json::from_slice(bytes)?)
}
