use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, ScoutError};
use crate::models::DigestData;
use crate::report::ReportBuilder;

/// Save a run's results as pretty-printed JSON next to the Markdown report.
pub fn save_digest_json(data: &DigestData, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir).map_err(|e| ScoutError::io(dir, e))?;

    let filename = format!("{}.json", ReportBuilder::file_stem(data.metadata.generated_at));
    let filepath = dir.join(filename);

    let json = serde_json::to_string_pretty(data)?;

    fs::write(&filepath, json).map_err(|e| ScoutError::io(&filepath, e))?;

    Ok(filepath)
}

/// Load a previously exported run.
pub fn load_digest_json(filepath: &Path) -> Result<DigestData> {
    let content = fs::read_to_string(filepath).map_err(|e| ScoutError::io(filepath, e))?;

    let data: DigestData = serde_json::from_str(&content).map_err(|e| {
        ScoutError::Parse(format!(
            "{} is not a valid digest file: {}",
            filepath.display(),
            e
        ))
    })?;

    if data.version != "1.0" {
        return Err(ScoutError::Parse(format!(
            "Unsupported digest file version: {}. Expected 1.0",
            data.version
        )));
    }

    Ok(data)
}
