//! Parses latency samples out of profiler output.
//!
//! Accepted lines, one sample each:
//!
//! ```text
//! 12.5
//! 12.5 ms
//! Latency: 12.5 ms
//! [run 3] avg latency = 12.5
//! ```
//!
//! Everything else is ignored.

use fuseprobe_common::ProfileError;

use crate::profiler::ProfileSample;

/// Summarize every latency sample found in `output`.
pub fn parse_latency_output(output: &str) -> Result<ProfileSample, ProfileError> {
    let samples: Vec<f64> = output.lines().filter_map(parse_line).collect();
    if samples.is_empty() {
        let preview: String = output.trim().chars().take(80).collect();
        return Err(ProfileError::Parse(format!("no latency samples in output `{preview}`")));
    }
    ProfileSample::from_samples(&samples)
}

fn parse_line(line: &str) -> Option<f64> {
    let line = line.trim();
    if let Some(v) = parse_value(line) {
        return Some(v);
    }
    if !line.to_ascii_lowercase().contains("latency") {
        return None;
    }
    let (_, value) = line.rsplit_once([':', '='])?;
    parse_value(value)
}

fn parse_value(text: &str) -> Option<f64> {
    let text = text.trim();
    let text = text.strip_suffix("ms").unwrap_or(text).trim_end();
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_numbers() {
        let s = parse_latency_output("1.0\n3.0\n").unwrap();
        assert_eq!(s, ProfileSample::new(2.0, 1.0, 2));
    }

    #[test]
    fn test_labelled_lines_and_noise() {
        let out = "loading model...\nLatency: 4 ms\nwarmup done\n[run 2] avg latency = 6\n";
        let s = parse_latency_output(out).unwrap();
        assert_eq!(s.sample_count, 2);
        assert_eq!(s.mean_ms, 5.0);
    }

    #[test]
    fn test_no_samples() {
        assert!(matches!(parse_latency_output("error: device offline"), Err(ProfileError::Parse(_))));
        assert!(parse_latency_output("").is_err());
        assert!(parse_latency_output("latency: NaN").is_err());
    }
}
