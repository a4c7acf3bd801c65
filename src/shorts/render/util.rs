use std::path::Path;

/// Minimum `-t` value; ffmpeg treats `-t 0` as an empty input.
const MIN_SECONDS: f64 = 0.001;

/// Seconds with millisecond precision, as passed to `-t`.
pub fn format_seconds(value: f64) -> String {
    format!("{:.3}", value.max(MIN_SECONDS))
}

/// Escape a path for use inside a single-quoted filtergraph argument.
pub fn escape_ffmpeg_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "\\\\")
        .replace('\'', "'\\''")
        .replace(':', "\\:")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_filter_metacharacters() {
        assert_eq!(
            escape_ffmpeg_path(Path::new("/tmp/job's dir/C:title.srt")),
            "/tmp/job'\\''s dir/C\\:title.srt"
        );
        assert_eq!(escape_ffmpeg_path(Path::new("/tmp/body.srt")), "/tmp/body.srt");
    }

    #[test]
    fn seconds_have_three_decimals() {
        assert_eq!(format_seconds(5.0), "5.000");
        assert_eq!(format_seconds(10.0 / 3.0), "3.333");
    }

    #[test]
    fn sub_millisecond_durations_never_round_to_zero() {
        assert_eq!(format_seconds(0.0004), "0.001");
        assert_eq!(format_seconds(0.0016), "0.002");
    }
}
