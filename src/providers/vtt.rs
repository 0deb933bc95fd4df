//! WebVTT caption parsing for the files yt-dlp points at.
//!
//! YouTube's auto-generated VTT tracks are "rolling": every cue repeats the
//! previous line and adds a new one, with word-level `<c>` timing tags inline.
//! Those repeats are folded away so each spoken line appears once. Manual tracks
//! are taken cue by cue: a repeated line there is a repeated line in the video.

use regex::Regex;
use std::sync::OnceLock;

use crate::transcript::TranscriptSegment;

fn cue_timing_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^((?:\d+:)?\d{2}:\d{2}\.\d{3})\s+-->\s+((?:\d+:)?\d{2}:\d{2}\.\d{3})")
            .expect("valid cue timing regex")
    })
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid tag regex"))
}

/// Parse a WebVTT document into segments.
///
/// `rolling` enables the auto-generated caption folding; pass `false` for
/// manually authored tracks.
pub fn parse(content: &str, rolling: bool) -> Vec<TranscriptSegment> {
    let mut segments: Vec<TranscriptSegment> = Vec::new();
    let mut previous_lines: Vec<String> = Vec::new();
    let mut lines = content.lines().peekable();

    while let Some(line) = lines.next() {
        let Some(captures) = cue_timing_pattern().captures(line.trim()) else {
            continue;
        };
        let (Some(start), Some(end)) = (parse_timestamp(&captures[1]), parse_timestamp(&captures[2]))
        else {
            continue;
        };

        let mut cue_lines = Vec::new();
        // Cue text ends at the first truly empty line; a lone space is an empty caption row
        while let Some(text) = lines.peek() {
            if text.is_empty() {
                break;
            }
            let cleaned = clean_line(text);
            if !cleaned.is_empty() && !(rolling && cue_lines.contains(&cleaned)) {
                cue_lines.push(cleaned);
            }
            lines.next();
        }

        if !rolling {
            if !cue_lines.is_empty() {
                segments.push(TranscriptSegment {
                    text: cue_lines.join(" "),
                    start,
                    duration: (end - start).max(0.0),
                });
            }
            continue;
        }

        // Rolling captions carry the previous cue's lines first
        let fresh: Vec<&String> = cue_lines
            .iter()
            .filter(|line| !previous_lines.contains(*line))
            .collect();

        if !cue_lines.is_empty() {
            previous_lines = cue_lines.clone();
        }

        if fresh.is_empty() {
            continue;
        }

        let text = fresh
            .iter()
            .map(|line| line.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        if let Some(last) = segments.last_mut() {
            if last.text == text {
                continue;
            }
            if text.starts_with(&last.text) && start - last.start <= 3.0 {
                last.duration = (end - last.start).max(last.duration);
                last.text = text;
                continue;
            }
        }

        segments.push(TranscriptSegment {
            text,
            start,
            duration: (end - start).max(0.0),
        });
    }

    segments
}

/// Parse `HH:MM:SS.mmm` or `MM:SS.mmm` into seconds
fn parse_timestamp(raw: &str) -> Option<f64> {
    let parts: Vec<&str> = raw.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (h.parse::<f64>().ok()?, m.parse::<f64>().ok()?, s.parse::<f64>().ok()?),
        [m, s] => (0.0, m.parse::<f64>().ok()?, s.parse::<f64>().ok()?),
        _ => return None,
    };
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Strip inline tags and decode the handful of entities YouTube emits
fn clean_line(line: &str) -> String {
    let stripped = tag_pattern().replace_all(line, "");
    let decoded = decode_entities(&stripped);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANUAL: &str = "WEBVTT
Kind: captions
Language: en

00:00:00.000 --> 00:00:02.500
We&#39;re no strangers

00:00:02.500 --> 00:00:05.000
to <i>love</i>
You know the rules

01:02:03.000 --> 01:02:04.000
&amp; so do I
";

    const ROLLING: &str = "WEBVTT\nKind: captions\nLanguage: en\n\n\
        00:00:00.160 --> 00:00:02.070 align:start position:0%\n \n\
        never<00:00:00.480><c> gonna</c><00:00:00.640><c> give</c>\n\n\
        00:00:02.070 --> 00:00:02.080 align:start position:0%\n\
        never gonna give\n\n\n\
        00:00:02.080 --> 00:00:04.630 align:start position:0%\n\
        never gonna give\n\
        you<00:00:02.400><c> up</c>\n\n\
        00:00:04.630 --> 00:00:04.640 align:start position:0%\n\
        you up\n\n";

    #[test]
    fn test_parse_manual_track() {
        let segments = parse(MANUAL, false);
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].text, "We're no strangers");
        assert_eq!(segments[0].start, 0.0);
        assert_eq!(segments[0].duration, 2.5);
        assert_eq!(segments[1].text, "to love You know the rules");
        assert_eq!(segments[2].text, "& so do I");
        assert_eq!(segments[2].start, 3723.0);
    }

    #[test]
    fn test_parse_rolling_auto_captions() {
        let segments = parse(ROLLING, true);
        let texts: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["never gonna give", "you up"]);
        assert!((segments[1].start - 2.08).abs() < 1e-9);
    }

    #[test]
    fn test_manual_track_keeps_repeated_and_extended_cues() {
        let chorus = "WEBVTT

00:00:00.000 --> 00:00:01.000
Never gonna give you up

00:00:01.000 --> 00:00:02.000
Never gonna give you up

00:00:02.000 --> 00:00:02.500
I

00:00:02.500 --> 00:00:04.000
I think so
";
        let segments = parse(chorus, false);
        let texts: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["Never gonna give you up", "Never gonna give you up", "I", "I think so"]
        );
        assert_eq!(segments[1].start, 1.0);
        assert_eq!(segments[3].duration, 1.5);

        // The same document read as a rolling track collapses
        assert_eq!(parse(chorus, true).len(), 2);
    }

    #[test]
    fn test_parse_short_timestamps() {
        assert_eq!(parse_timestamp("01:02.500"), Some(62.5));
        assert_eq!(parse_timestamp("garbage"), None);
    }

    #[test]
    fn test_parse_empty_document() {
        assert!(parse("WEBVTT\n\n", true).is_empty());
        assert!(parse("WEBVTT\n\n", false).is_empty());
    }
}
