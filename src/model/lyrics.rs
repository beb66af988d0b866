//! Timed lyrics

use serde::Deserialize;

use super::item::TICKS_PER_SECOND;

#[derive(Clone, Debug, PartialEq)]
pub struct LyricLine {
    pub text: String,
    /// Seconds from the start of the track
    pub start: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawLine {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    start: Option<i64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLyrics {
    Lines(Vec<RawLine>),
    Envelope {
        #[serde(rename = "Lyrics")]
        lyrics: Vec<RawLine>,
    },
}

/// Parse a lyrics payload into time-ordered lines.
///
/// Blank lines and lines without a start time are dropped. Malformed
/// payloads are logged and yield no lines.
pub fn parse_lyrics(raw: &str) -> Vec<LyricLine> {
    let raw_lines = match serde_json::from_str::<RawLyrics>(raw) {
        Ok(RawLyrics::Lines(lines)) | Ok(RawLyrics::Envelope { lyrics: lines }) => lines,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to parse lyrics");
            return Vec::new();
        }
    };

    let mut lines: Vec<LyricLine> = raw_lines
        .into_iter()
        .filter_map(|line| {
            let text = line.text?.trim().to_string();
            let start = line.start?;
            (!text.is_empty()).then(|| LyricLine {
                text,
                start: start as f64 / TICKS_PER_SECOND as f64,
            })
        })
        .collect();
    lines.sort_by(|a, b| a.start.total_cmp(&b.start));
    lines
}

/// Index of the line being sung at `position` seconds
pub fn current_line(lines: &[LyricLine], position: f64) -> Option<usize> {
    lines
        .partition_point(|line| line.start <= position)
        .checked_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sorts_and_drops_blank_lines() {
        let raw = r#"{"Lyrics": [
            {"Text": "second", "Start": 50000000},
            {"Text": "  ", "Start": 10000000},
            {"Text": "first", "Start": 20000000},
            {"Text": "untimed"}
        ]}"#;
        let lines = parse_lyrics(raw);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "first");
        assert_eq!(lines[0].start, 2.0);
        assert_eq!(lines[1].start, 5.0);
    }

    #[test]
    fn bare_array_and_garbage() {
        assert_eq!(parse_lyrics(r#"[{"Text": "la", "Start": 0}]"#).len(), 1);
        assert!(parse_lyrics("<html>").is_empty());
    }

    #[test]
    fn current_line_tracks_position() {
        let lines = parse_lyrics(r#"[{"Text": "a", "Start": 10000000}, {"Text": "b", "Start": 30000000}]"#);
        assert_eq!(current_line(&lines, 0.5), None);
        assert_eq!(current_line(&lines, 1.0), Some(0));
        assert_eq!(current_line(&lines, 2.9), Some(0));
        assert_eq!(current_line(&lines, 45.0), Some(1));
        assert_eq!(current_line(&[], 3.0), None);
    }
}
