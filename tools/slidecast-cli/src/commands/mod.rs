pub mod check;
pub mod export;
pub mod frame;
pub mod info;
pub mod preview;

use std::path::Path;

use slidecast_common::error::SlidecastError;
use slidecast_timeline_model::Timeline;

/// Load and validate a timeline file, or build the default title slide.
pub fn load_timeline(path: Option<&Path>) -> anyhow::Result<Timeline> {
    let Some(path) = path else {
        return Ok(Timeline::with_title_slide());
    };

    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
    let timeline = Timeline::from_json(&content).map_err(|e| {
        SlidecastError::timeline(format!("Failed to parse {}: {e}", path.display()))
    })?;
    timeline
        .validate()
        .map_err(|e| SlidecastError::timeline(format!("{}: {e}", path.display())))?;

    tracing::debug!(
        path = %path.display(),
        slides = timeline.len(),
        "Loaded timeline"
    );
    Ok(timeline)
}
