use anyhow::{Context, Result, bail};
use regex::Regex;
use std::fmt::Write as _;
use std::sync::LazyLock;
use std::time::Duration;

use super::CaptionEvent;

static TIMESTAMP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+):([0-5]?\d):([0-5]?\d)(?:[,.](\d{1,3})\d*)?$").unwrap());

/// Parse an SRT document into cues, in document order.
///
/// Index lines are tolerated but not validated. Multi-line cue text is kept
/// with `\n` separators.
pub fn parse_srt(input: &str) -> Result<Vec<CaptionEvent>> {
    let mut cues = Vec::new();
    let mut lines = input.lines().peekable();

    while let Some(line) = lines.next() {
        let first = line.trim();
        if first.is_empty() {
            continue;
        }

        // Index line can be omitted by some producers
        let times = if first.contains("-->") {
            first
        } else {
            lines
                .next()
                .map(str::trim)
                .context("SRT cue is missing a timestamp line")?
        };

        let (start_raw, end_raw) = times
            .split_once("-->")
            .map(|(a, b)| (a.trim(), b.trim()))
            .context("SRT cue timestamp line must contain '-->'")?;

        let start = parse_timestamp(start_raw)
            .with_context(|| format!("Failed to parse SRT start timestamp '{start_raw}'"))?;
        let end = parse_timestamp(end_raw)
            .with_context(|| format!("Failed to parse SRT end timestamp '{end_raw}'"))?;

        if end < start {
            bail!("SRT cue ends before it starts: {start_raw} --> {end_raw}");
        }

        let mut text_lines = Vec::new();
        while let Some(next) = lines.peek() {
            if next.trim().is_empty() {
                break;
            }
            if let Some(text) = lines.next() {
                text_lines.push(text.trim().to_string());
            }
        }

        cues.push(CaptionEvent {
            start,
            end,
            text: text_lines.join("\n"),
        });
    }

    Ok(cues)
}

/// `H+:MM:SS` with an optional `,mmm` or `.mmm` fraction; digits past
/// milliseconds are dropped.
fn parse_timestamp(value: &str) -> Result<Duration> {
    // Some producers append position hints after the end time
    let value = value.split_whitespace().next().unwrap_or_default();
    let caps = TIMESTAMP
        .captures(value)
        .with_context(|| format!("Timestamp must look like HH:MM:SS,mmm, got '{value}'"))?;

    let hours: u64 = caps[1].parse().context("Invalid hours in timestamp")?;
    let minutes: u64 = caps[2].parse().context("Invalid minutes in timestamp")?;
    let seconds: u64 = caps[3].parse().context("Invalid seconds in timestamp")?;
    let millis = caps.get(4).map_or(0, |m| {
        let digits = m.as_str();
        // "5" is 500 ms, "05" is 50 ms
        digits.parse::<u32>().unwrap_or(0) * 10u32.pow(3 - digits.len() as u32)
    });

    let Some(total_seconds) = hours
        .checked_mul(3600)
        .and_then(|secs| secs.checked_add(minutes * 60 + seconds))
    else {
        bail!("Timestamp out of range: {value}");
    };
    Ok(Duration::new(total_seconds, millis * 1_000_000))
}

/// `HH:MM:SS,mmm`
pub fn format_timestamp(value: Duration) -> String {
    let total_millis = value.as_millis();
    let millis = total_millis % 1000;
    let total_seconds = total_millis / 1000;
    let seconds = total_seconds % 60;
    let minutes = (total_seconds / 60) % 60;
    let hours = total_seconds / 3600;
    format!("{hours:02}:{minutes:02}:{seconds:02},{millis:03}")
}

/// Serialize cues as an SRT document, indexed from 1.
pub fn render_srt(cues: &[CaptionEvent]) -> String {
    let mut out = String::new();
    for (index, cue) in cues.iter().enumerate() {
        let _ = writeln!(out, "{}", index + 1);
        let _ = writeln!(
            out,
            "{} --> {}",
            format_timestamp(cue.start),
            format_timestamp(cue.end)
        );
        let _ = writeln!(out, "{}", cue.text);
        out.push('\n');
    }
    out
}
