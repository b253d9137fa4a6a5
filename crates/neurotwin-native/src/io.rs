//! Recording ingestion.
//!
//! Recordings are read from a JSON document:
//!
//! ```json
//! { "sample_rate": 250.0,
//!   "channels": [ { "name": "F3", "samples": [0.1, 0.2] } ] }
//! ```
//!
//! Every failure (unreadable file, malformed JSON, shape violations) is an
//! [`AnalysisError::InvalidRecording`] with the underlying cause attached.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use neurotwin_core::error::{AnalysisError, AnalysisResult};
use neurotwin_core::types::Recording;

#[derive(Deserialize)]
struct RecordingFile {
    sample_rate: f64,
    channels: Vec<ChannelFile>,
}

#[derive(Deserialize)]
struct ChannelFile {
    name: String,
    samples: Vec<f64>,
}

/// Parse a recording from its JSON text.
///
/// # Errors
///
/// [`AnalysisError::InvalidRecording`] for malformed JSON or an invalid
/// recording shape.
pub fn parse_recording(json: &str) -> AnalysisResult<Recording> {
    let file: RecordingFile = serde_json::from_str(json)
        .map_err(|e| AnalysisError::invalid_recording_with("malformed recording document", e))?;

    let (names, data) = file.channels.into_iter().map(|c| (c.name, c.samples)).unzip();
    Recording::new(names, file.sample_rate, data)
}

/// Load a recording from a JSON file.
///
/// # Errors
///
/// [`AnalysisError::InvalidRecording`] if the file cannot be read or parsed.
pub fn load_recording(path: impl AsRef<Path>) -> AnalysisResult<Recording> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .map_err(|e| AnalysisError::invalid_recording_with(format!("cannot read {}", path.display()), e))?;

    let recording = parse_recording(&text)?;
    info!(
        "Loaded {} channels x {} samples at {} Hz from {}",
        recording.n_channels(),
        recording.n_samples(),
        recording.sample_rate(),
        path.display()
    );
    Ok(recording)
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_parse_recording() {
        let rec = parse_recording(
            r#"{ "sample_rate": 128.0,
                 "channels": [ { "name": "F3", "samples": [1.0, 2.0, 3.0] },
                               { "name": "F4", "samples": [4.0, 5.0, 6.0] } ] }"#,
        )
        .unwrap();
        assert_eq!(rec.channel_names(), ["F3".to_string(), "F4".to_string()]);
        assert_eq!(rec.n_samples(), 3);
        assert_eq!(rec.channel("F4"), Some(&[4.0, 5.0, 6.0][..]));
    }

    #[test]
    fn test_malformed_json_keeps_cause() {
        let err = parse_recording("{ \"sample_rate\": ").unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidRecording { .. }));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_empty_recording_rejected() {
        assert!(matches!(
            parse_recording(r#"{ "sample_rate": 250.0, "channels": [] }"#),
            Err(AnalysisError::InvalidRecording { .. })
        ));
        assert!(parse_recording(r#"{ "sample_rate": 250.0, "channels": [ { "name": "Cz", "samples": [] } ] }"#)
            .is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = load_recording("/nonexistent/neurotwin/recording.json").unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidRecording { .. }));
        assert!(err.source().is_some());
    }
}
