use crate::error::Error;
use crate::storage::Database;
use std::io::Write;
use tracing::debug;

const PAGE_SIZE: i64 = 1000;

/// Write every stored status as CSV, highest deletion score first.
/// The peer list goes into a single JSON column.
pub fn export_statuses<W: Write>(db: &Database, out: W) -> Result<usize, Error> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record([
        "path",
        "server_id",
        "deletion_score",
        "duplicate_score",
        "duplicate_count",
        "duplicates",
        "last_updated",
    ])?;

    let mut offset = 0;
    let mut rows = 0;
    loop {
        let page = db.list_statuses(offset, PAGE_SIZE)?;
        if page.is_empty() {
            break;
        }
        for status in &page {
            writer.write_record([
                status.path.clone(),
                status.server_id.map(|id| id.to_string()).unwrap_or_default(),
                format!("{:.2}", status.deletion_score),
                format!("{:.2}", status.duplicate_score),
                status.duplicates.len().to_string(),
                serde_json::to_string(&status.duplicates)?,
                status.last_updated.clone(),
            ])?;
            rows += 1;
        }
        offset += page.len() as i64;
    }

    writer.flush()?;
    debug!("Exported {} statuses", rows);
    Ok(rows)
}
