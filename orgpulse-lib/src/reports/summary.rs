use crate::Result;
use crate::stats::OrganizationSummary;
use core::fmt::Write;

pub fn generate<W: Write>(summary: &OrganizationSummary, writer: &mut W) -> Result<()> {
    write!(writer, "{}", serde_json::to_string_pretty(summary)?)?;
    Ok(())
}
