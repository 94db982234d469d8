/// Playback clock formatting

/// Format seconds as `M:SS`
///
/// There is no hour field; minutes keep counting past 59. Non-finite input
/// formats as `0:00` and negative input is treated as zero.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "0:00".to_string();
    }

    let total = seconds.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}
