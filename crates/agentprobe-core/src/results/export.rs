use std::path::Path;

use serde::Serialize;

use super::TestResult;
use crate::error::AgentProbeError;

/// Column headers of the QA results sheet.
pub const CSV_HEADERS: [&str; 7] = [
    "#",
    "Pregunta",
    "Respuesta Esperada",
    "Respuesta del Agente",
    "Estado",
    "Razón",
    "Latencia (ms)",
];

// ---------------------------------------------------------------------------
// CSV export
// ---------------------------------------------------------------------------

/// Export QA results as CSV: a header row, then one row per result in run
/// order. Text columns are always quoted.
pub fn export_csv(results: &[TestResult]) -> Result<String, AgentProbeError> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::NonNumeric)
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADERS)?;

    for r in results {
        writer.write_record([
            r.index.to_string(),
            r.question.clone(),
            r.expected.clone(),
            r.response.clone(),
            r.status.to_string(),
            r.reason.clone(),
            r.latency_ms.to_string(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AgentProbeError::Io(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Write QA results as CSV to `path`.
pub async fn write_csv(results: &[TestResult], path: impl AsRef<Path>) -> Result<(), AgentProbeError> {
    let content = export_csv(results)?;
    tokio::fs::write(path.as_ref(), content).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// JSON export
// ---------------------------------------------------------------------------

/// Write any report as pretty-printed JSON to `path`.
pub async fn write_json<T: Serialize>(report: &T, path: impl AsRef<Path>) -> Result<(), AgentProbeError> {
    let content = serde_json::to_string_pretty(report)?;
    tokio::fs::write(path.as_ref(), content).await?;
    Ok(())
}
