//! Persistence of diagnostic artifacts produced by a generation run.
//!
//! The prompt text, the raw model output, and the invocation metrics are
//! written next to the rendered document so a run can be audited or
//! replayed later.
use log::*;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::{error::Result, generator::GeneratorOutput};

/// Write the prompt, model output, and model details files into `dir`.
/// Returns the created paths.
pub async fn save(
    dir: &Path,
    output: &GeneratorOutput,
    release: &str,
) -> Result<Vec<PathBuf>> {
    let timestamp = &output.details.timestamp;

    let prompt_file = dir.join(format!(
        "changelog-model-prompt-{}-{}.txt",
        release, timestamp
    ));
    fs::write(&prompt_file, &output.prompt.text).await?;
    info!("prompt saved to {}", prompt_file.display());

    let output_file = dir.join(format!(
        "changelog-model-output-{}-{}.json",
        release, timestamp
    ));
    fs::write(&output_file, serde_json::to_vec_pretty(&output.response)?)
        .await?;
    info!("model output saved to {}", output_file.display());

    let details_file = dir.join(format!(
        "changelog-model-details-{}-{}.json",
        release, timestamp
    ));
    fs::write(&details_file, serde_json::to_vec_pretty(&output.details)?)
        .await?;
    info!("model details saved to {}", details_file.display());

    Ok(vec![prompt_file, output_file, details_file])
}
