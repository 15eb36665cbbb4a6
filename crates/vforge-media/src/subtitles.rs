//! Subtitle cue formatting.
//!
//! Transcripts carry no word timings, so cues follow a fixed cadence:
//! every 8 whitespace-delimited words become one 3-second cue.

use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

use crate::error::MediaResult;

/// Words grouped into one cue.
pub const WORDS_PER_CUE: usize = 8;
/// Screen time of one cue.
pub const CUE_DURATION: Duration = Duration::from_secs(3);

/// One timed caption entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    /// SRT sequence number, starting at 1
    pub index: usize,
    pub start: Duration,
    pub end: Duration,
    pub text: String,
}

impl Cue {
    fn write_srt(&self, out: &mut String) {
        // Writing into a String cannot fail
        let _ = write!(
            out,
            "{}\n{} --> {}\n{}\n\n",
            self.index,
            format_srt_timestamp(self.start),
            format_srt_timestamp(self.end),
            self.text
        );
    }
}

/// Split a transcript into fixed-cadence cues.
pub fn format_cues(transcript: &str) -> Vec<Cue> {
    let words: Vec<&str> = transcript.split_whitespace().collect();

    words
        .chunks(WORDS_PER_CUE)
        .enumerate()
        .map(|(i, chunk)| {
            let start = CUE_DURATION * i as u32;
            Cue {
                index: i + 1,
                start,
                end: start + CUE_DURATION,
                text: chunk.join(" "),
            }
        })
        .collect()
}

/// Format a duration as `HH:MM:SS,mmm`.
pub fn format_srt_timestamp(at: Duration) -> String {
    let total_ms = at.as_millis();
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let seconds = (total_ms % 60_000) / 1_000;
    let millis = total_ms % 1_000;
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}

/// Render cues as an SRT document.
pub fn to_srt(cues: &[Cue]) -> String {
    let mut out = String::new();
    for cue in cues {
        cue.write_srt(&mut out);
    }
    out
}

/// Format a transcript and write it as an SRT file.
pub async fn write_srt(path: &Path, transcript: &str) -> MediaResult<usize> {
    let cues = format_cues(transcript);
    tokio::fs::write(path, to_srt(&cues)).await?;
    Ok(cues.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_transcript() {
        assert!(format_cues("").is_empty());
        assert!(format_cues("   \n\t ").is_empty());
        assert_eq!(to_srt(&[]), "");
    }

    #[test]
    fn test_nine_words_make_two_cues() {
        let cues = format_cues("w1 w2 w3 w4 w5 w6 w7 w8 w9");
        assert_eq!(cues.len(), 2);

        assert_eq!(cues[0].index, 1);
        assert_eq!(cues[0].start, Duration::from_secs(0));
        assert_eq!(cues[0].end, Duration::from_secs(3));
        assert_eq!(cues[0].text, "w1 w2 w3 w4 w5 w6 w7 w8");

        assert_eq!(cues[1].index, 2);
        assert_eq!(cues[1].start, Duration::from_secs(3));
        assert_eq!(cues[1].end, Duration::from_secs(6));
        assert_eq!(cues[1].text, "w9");
    }

    #[test]
    fn test_whitespace_runs_are_collapsed() {
        let cues = format_cues("  hello \n\n world\t again ");
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text, "hello world again");
    }

    #[test]
    fn test_timestamp_format() {
        assert_eq!(format_srt_timestamp(Duration::from_secs(0)), "00:00:00,000");
        assert_eq!(format_srt_timestamp(Duration::from_secs(3)), "00:00:03,000");
        assert_eq!(format_srt_timestamp(Duration::from_millis(3_723_456)), "01:02:03,456");
    }

    #[test]
    fn test_srt_document() {
        let srt = to_srt(&format_cues("a b c d e f g h i"));
        assert_eq!(
            srt,
            "1\n00:00:00,000 --> 00:00:03,000\na b c d e f g h\n\n\
             2\n00:00:03,000 --> 00:00:06,000\ni\n\n"
        );
    }

    #[tokio::test]
    async fn test_write_srt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subs.srt");
        let count = write_srt(&path, "one two three").await.unwrap();
        assert_eq!(count, 1);
        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(content.starts_with("1\n00:00:00,000 --> 00:00:03,000\none two three"));
    }
}
