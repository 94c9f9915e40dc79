//! Pure derivations for rendering layers.

/// Format seconds as `mm:ss`. Minutes are not wrapped into hours.
pub fn format_mm_ss(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Elapsed share of the session as a percentage, clamped to `0.0..=100.0`.
pub fn progress_pct(remaining_secs: u64, total_secs: u64) -> f64 {
    if total_secs == 0 {
        return 0.0;
    }
    let elapsed = total_secs.saturating_sub(remaining_secs) as f64;
    (elapsed / total_secs as f64 * 100.0).clamp(0.0, 100.0)
}
