use std::io::Write;
use std::path::Path;

use crate::error::{ExportError, Result};

/// Export any serializable data structure to pretty-printed JSON
pub fn export_json<T, P>(data: &T, output_path: P) -> Result<()>
where
    T: serde::Serialize,
    P: AsRef<Path>,
{
    let output_path = output_path.as_ref();
    let json_data = serde_json::to_string_pretty(data).map_err(ExportError::Json)?;

    let mut file = std::fs::File::create(output_path).map_err(|e| ExportError::WriteFailed {
        path: output_path.to_path_buf(),
        reason: e.to_string(),
    })?;
    file.write_all(json_data.as_bytes())?;

    Ok(())
}
