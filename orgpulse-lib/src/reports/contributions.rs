use crate::Result;
use crate::stats::Contributions;
use core::fmt::Write;

/// Render the per-contributor records as a JSON object keyed by username.
pub fn generate<W: Write>(records: &Contributions, writer: &mut W) -> Result<()> {
    write!(writer, "{}", serde_json::to_string_pretty(records)?)?;
    Ok(())
}
