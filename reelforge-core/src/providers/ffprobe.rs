use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;

use super::DurationProbe;
use crate::error::ProviderError;

/// Audio/video duration via `ffprobe -show_format`.
#[derive(Debug, Clone)]
pub struct FfprobeDurationProbe {
    ffprobe_path: String,
}

impl Default for FfprobeDurationProbe {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl FfprobeDurationProbe {
    pub fn new(ffprobe_path: impl Into<String>) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
        }
    }
}

/// `format.duration` is a decimal string in ffprobe's JSON output.
fn parse_format_duration(json: &Value) -> Option<f64> {
    let raw = &json["format"]["duration"];
    let seconds = match raw {
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Number(n) => n.as_f64()?,
        _ => return None,
    };
    (seconds.is_finite() && seconds > 0.0).then_some(seconds)
}

#[async_trait]
impl DurationProbe for FfprobeDurationProbe {
    async fn probe_seconds(&self, path: &Path) -> Result<f64, ProviderError> {
        let output = Command::new(&self.ffprobe_path)
            .args(["-v", "quiet", "-print_format", "json", "-show_format"])
            .arg(path)
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(ProviderError::Process(format!(
                "ffprobe exited with {} for {}",
                output.status,
                path.display()
            )));
        }

        let json: Value = serde_json::from_slice(&output.stdout).map_err(
            |err| {
                ProviderError::ParseError(format!(
                    "failed to parse ffprobe JSON: {err}"
                ))
            },
        )?;

        parse_format_duration(&json).ok_or_else(|| {
            ProviderError::ParseError(format!(
                "ffprobe reported no duration for {}",
                path.display()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn reads_string_durations() {
        let json = json!({ "format": { "duration": "4.000000" } });
        assert_eq!(parse_format_duration(&json), Some(4.0));
    }

    #[test]
    fn rejects_missing_or_zero_durations() {
        assert_eq!(parse_format_duration(&json!({ "format": {} })), None);
        let zero = json!({ "format": { "duration": "0.0" } });
        assert_eq!(parse_format_duration(&zero), None);
    }
}
