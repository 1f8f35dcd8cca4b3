use crate::api::Lifelog;
use crate::utils::OutputFormat;
use eyre::{Context, Result};
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

pub fn write_text<W: Write>(writer: &mut W, lifelogs: &[Lifelog]) -> std::io::Result<()> {
    for (i, log) in lifelogs.iter().enumerate() {
        if i > 0 {
            writeln!(writer)?;
        }
        writeln!(writer, "{}", log.text())?;
    }
    Ok(())
}

pub fn write_jsonl<W: Write>(writer: &mut W, lifelogs: &[Lifelog]) -> std::io::Result<()> {
    for log in lifelogs {
        serde_json::to_writer(&mut *writer, log)?;
        writeln!(writer)?;
    }
    Ok(())
}

/// Write every record to `path`, replacing whatever was there.
///
/// The content goes to a temporary file next to `path` first and is renamed
/// into place only once fully flushed.
pub fn write_output(path: &Path, lifelogs: &[Lifelog], format: OutputFormat) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let tmp = NamedTempFile::new_in(dir)
        .wrap_err_with(|| format!("Failed to create temporary file in {}", dir.display()))?;

    {
        let mut writer = BufWriter::new(tmp.as_file());
        let rendered = match format {
            OutputFormat::Text => write_text(&mut writer, lifelogs),
            OutputFormat::Jsonl => write_jsonl(&mut writer, lifelogs),
        };
        rendered.wrap_err("Failed to render lifelogs")?;
        writer.flush().wrap_err("Failed to flush output")?;
    }

    tmp.persist(path)
        .wrap_err_with(|| format!("Failed to write: {}", path.display()))?;
    Ok(())
}
