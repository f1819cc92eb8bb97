/// Human-readable elapsed time: `2m 5s` past a minute, `42.3s` below.
pub fn format_elapsed(seconds: f64) -> String {
    // Round first so 59.96 becomes a minute rather than "60.0s".
    let seconds = (seconds.max(0.0) * 10.0).round() / 10.0;
    if seconds < 60.0 {
        format!("{seconds:.1}s")
    } else {
        let whole = seconds as u64;
        format!("{}m {}s", whole / 60, whole % 60)
    }
}

/// Segment timestamp as `mm:ss.mmm`, from whisper.cpp centiseconds.
pub fn format_timestamp(centiseconds: i64) -> String {
    let millis = centiseconds.max(0) * 10;
    let minutes = millis / 60_000;
    let seconds = (millis % 60_000) / 1000;
    let millis = millis % 1000;
    format!("{minutes:02}:{seconds:02}.{millis:03}")
}
