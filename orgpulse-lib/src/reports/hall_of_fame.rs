use crate::Result;
use crate::stats::HallOfFame;
use core::fmt::Write;

pub fn generate<W: Write>(hall_of_fame: &HallOfFame, writer: &mut W) -> Result<()> {
    write!(writer, "{}", serde_json::to_string_pretty(hall_of_fame)?)?;
    Ok(())
}
