use serde_json::Value;
use std::io::{self, Write};

use super::SearchHit;

/// Line printed before every hit and after the last one
pub const SEPARATOR: &str = "--------------------------------------------------------------------------------------------------------------------------------";

/// Write the first `limit` hits as text blocks.
pub fn write_result_list<W: Write>(out: &mut W, results: &[SearchHit], limit: usize) -> io::Result<()> {
    for hit in results.iter().take(limit) {
        let source = &hit.source;
        writeln!(out, "{}", SEPARATOR)?;
        writeln!(out, "Score: {} \t Item ID: {}", score_text(hit.score), hit.id)?;
        writeln!(out, "Item Name: {}", field_text(&source.item_name))?;
        writeln!(
            out,
            "Fabric Type: {}\t Material: {} \t Color: {}\t Style: {}",
            field_text(&source.fabric_type),
            field_text(&source.material),
            field_text(&source.color),
            field_text(&source.style)
        )?;
    }
    writeln!(out, "{}", SEPARATOR)?;
    Ok(())
}

/// Print the first `limit` hits to stdout.
pub fn print_result_list(results: &[SearchHit], limit: usize) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_result_list(&mut out, results, limit)
}

/// Score rounded to four decimals, printed in its shortest form
/// (`0.5`, `1.0`, `0.1235`).
fn score_text(score: f64) -> String {
    let rounded = (score * 10_000.0).round() / 10_000.0;
    format!("{:?}", rounded)
}

fn field_text(field: &Option<Value>) -> String {
    match field {
        None | Some(Value::Null) => "None".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
