//! Terminal output rendering for profiles, diffs and verdicts.
//!
//! Provides human-readable summaries with colour cues for regressions
//! and improvements.

use super::DisplayUnit;
use crate::diff::{AggregateDelta, Diff, DiffEntry, EntryStatus, Metric, PercentDelta};
use crate::gate::{GateMode, Verdict};
use crate::parser::HostIoType;
use crate::profile::{Frame, Profile};
use colored::*;
use std::str::FromStr;

const RULE: &str = "---------------------------------------------------";
const CALL_SITE_WIDTH: usize = 44;

/// Render a summary of one profile: totals, hottest frames, hostio counts
///
/// # Arguments
/// * `profile` - Profile to summarise
/// * `unit` - Unit gas figures are shown in
/// * `top_n` - Number of frames listed
pub fn render_profile_summary(profile: &Profile, unit: DisplayUnit, top_n: usize) -> String {
    let mut out = String::new();

    out.push('\n');
    out.push_str(&"Profile Summary".bold().to_string());
    out.push('\n');
    out.push_str(RULE);
    out.push('\n');
    out.push_str(&format!("Transaction:  {}\n", profile.transaction_hash()));
    out.push_str(&format!(
        "Total {}:    {}\n",
        unit.label(),
        unit.scale(profile.total_gas())
    ));
    out.push_str(&format!("HostIO calls: {}\n", profile.total_hostio_calls()));
    out.push_str(&format!("Frames:       {}\n", profile.frame_count()));
    out.push_str(RULE);
    out.push('\n');

    let mut frames: Vec<&Frame> = profile.frames().filter(|f| f.self_gas() > 0).collect();
    frames.sort_by(|a, b| {
        b.self_gas()
            .cmp(&a.self_gas())
            .then_with(|| a.call_site().cmp(b.call_site()))
    });

    if !frames.is_empty() {
        let total = profile.total_gas().max(1) as f64;
        out.push_str(&format!(
            "\n{:<width$} {:>14} {:>14} {:>7}\n",
            "Hottest Call Sites",
            format!("self {}", unit.label()),
            format!("total {}", unit.label()),
            "%",
            width = CALL_SITE_WIDTH
        ));
        for frame in frames.iter().take(top_n) {
            let share = frame.self_gas() as f64 / total * 100.0;
            out.push_str(&format!(
                "{:<width$} {:>14} {:>14} {:>6.1}%\n",
                shorten_call_site(frame.call_site().as_str()),
                unit.scale(frame.self_gas()),
                unit.scale(frame.cumulative_gas()),
                share,
                width = CALL_SITE_WIDTH
            ));
        }
        if frames.len() > top_n {
            out.push_str(&format!("  (showing top {} of {} call sites)\n", top_n, frames.len()));
        }
    }

    if !profile.hostio_totals().is_empty() {
        out.push_str("\nHostIO Calls:\n");
        let mut totals: Vec<(&String, &u64)> = profile.hostio_totals().iter().collect();
        totals.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (name, count) in totals {
            let line = format!("  {:<24} {:>8}", name, count);
            if is_expensive(name) {
                out.push_str(&line.yellow().to_string());
            } else {
                out.push_str(&line);
            }
            out.push('\n');
        }
    }

    out
}

/// Render a diff: aggregate changes then the most significant entries
///
/// # Arguments
/// * `diff` - Diff to summarise
/// * `unit` - Unit gas figures are shown in (hostio counts are never scaled)
/// * `top_n` - Number of per call site entries listed
pub fn render_diff_summary(diff: &Diff, unit: DisplayUnit, top_n: usize) -> String {
    let mut out = String::new();

    out.push('\n');
    out.push_str(&"Profile Comparison Summary".bold().to_string());
    out.push('\n');
    out.push_str(RULE);
    out.push('\n');
    out.push_str(&format!("Baseline: {}\n", diff.baseline.transaction_hash));
    out.push_str(&format!("Current:  {}\n", diff.current.transaction_hash));
    out.push_str(RULE);
    out.push_str("\n\n");

    out.push_str(&render_aggregate(
        &format!("Total {}", unit.label()),
        &diff.gas,
        Some(unit),
    ));
    out.push_str(&render_aggregate("HostIO calls", &diff.hostio_calls, None));

    let changed: Vec<(&String, &AggregateDelta)> = diff
        .hostio_by_name
        .iter()
        .filter(|(_, delta)| delta.delta != 0)
        .collect();
    if !changed.is_empty() {
        out.push_str("\nHostIO Changes:\n");
        for (name, delta) in changed {
            out.push_str(&format!(
                "  {} {}: {} -> {} ({})\n",
                delta_symbol(delta.delta),
                name,
                delta.baseline,
                delta.current,
                delta.percent
            ));
        }
    }

    let moved: Vec<&DiffEntry> = diff.entries.iter().filter(|e| e.delta != 0).collect();
    if diff.is_identical() {
        out.push_str(&format!("\n{}\n", "Profiles are identical".dimmed()));
    } else if !moved.is_empty() {
        out.push_str(&format!(
            "\n{:<width$} {:<22} {:>12} {:>12} {:>10}\n",
            "Call Site",
            "Metric",
            "Baseline",
            "Current",
            "Delta",
            width = CALL_SITE_WIDTH
        ));
        for entry in moved.iter().take(top_n) {
            out.push_str(&render_entry(entry, unit));
            out.push('\n');
        }
        if moved.len() > top_n {
            out.push_str(&format!("  (showing top {} of {} changes)\n", top_n, moved.len()));
        }
    }

    out
}

/// Render the gate outcome, listing every violation with actual vs limit
pub fn render_verdict(verdict: &Verdict) -> String {
    let mut out = String::new();
    out.push('\n');
    out.push_str(RULE);
    out.push('\n');

    if verdict.passed() {
        let message = match verdict.mode {
            GateMode::Gated => format!("STATUS: PASSED ({} rules checked)", verdict.rules_evaluated),
            GateMode::DiffOnly => "STATUS: PASSED (no thresholds configured, diff only)".to_string(),
            GateMode::NoBaseline => "STATUS: PASSED (no baseline, capture only)".to_string(),
        };
        out.push_str(&message.green().bold().to_string());
        out.push('\n');
        return out;
    }

    out.push_str(
        &format!(
            "STATUS: REGRESSION DETECTED ({} violations)",
            verdict.violations.len()
        )
        .red()
        .bold()
        .to_string(),
    );
    out.push('\n');
    for violation in &verdict.violations {
        out.push_str(&format!("  x {}\n", violation));
    }
    out
}

fn render_aggregate(label: &str, delta: &AggregateDelta, unit: Option<DisplayUnit>) -> String {
    let (baseline, current) = match unit {
        Some(unit) => (unit.scale(delta.baseline), unit.scale(delta.current)),
        None => (delta.baseline, delta.current),
    };
    format!(
        "{} {}: {} -> {} ({})\n",
        delta_symbol(delta.delta),
        label,
        baseline,
        current,
        colour_percent(&delta.percent, delta.delta)
    )
}

fn render_entry(entry: &DiffEntry, unit: DisplayUnit) -> String {
    let (baseline, current) = match entry.metric {
        Metric::Gas => (unit.scale(entry.baseline), unit.scale(entry.current)),
        Metric::Hostio(_) => (entry.baseline, entry.current),
    };
    let metric = match entry.status {
        EntryStatus::Matched => entry.metric.to_string(),
        EntryStatus::Added => format!("{} (added)", entry.metric),
        EntryStatus::Removed => format!("{} (removed)", entry.metric),
    };
    let percent = format!("{:>10}", entry.percent.to_string());

    format!(
        "{:<width$} {:<22} {:>12} {:>12} {}",
        shorten_call_site(entry.call_site.as_str()),
        metric,
        baseline,
        current,
        colour_text(&percent, entry.delta),
        width = CALL_SITE_WIDTH
    )
}

fn colour_percent(percent: &PercentDelta, delta: i64) -> String {
    colour_text(&percent.to_string(), delta)
}

fn colour_text(text: &str, delta: i64) -> String {
    if delta > 0 {
        text.red().to_string()
    } else if delta < 0 {
        text.green().to_string()
    } else {
        text.to_string()
    }
}

fn delta_symbol(change: i64) -> &'static str {
    if change > 0 {
        "▲"
    } else if change < 0 {
        "▼"
    } else {
        "="
    }
}

fn is_expensive(name: &str) -> bool {
    HostIoType::from_str(name).is_ok_and(HostIoType::is_expensive)
}

/// Keep the last two labels of a long call site
fn shorten_call_site(call_site: &str) -> String {
    if call_site.len() <= CALL_SITE_WIDTH {
        return call_site.to_string();
    }
    let parts: Vec<&str> = call_site.split(';').collect();
    let tail = if parts.len() > 2 {
        format!("...;{};{}", parts[parts.len() - 2], parts[parts.len() - 1])
    } else {
        call_site.to_string()
    };
    if tail.chars().count() > CALL_SITE_WIDTH {
        let keep: String = tail
            .chars()
            .rev()
            .take(CALL_SITE_WIDTH - 3)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("...{}", keep)
    } else {
        tail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shorten_call_site_short_unchanged() {
        assert_eq!(shorten_call_site("root;main;transfer"), "root;main;transfer");
    }

    #[test]
    fn test_shorten_call_site_keeps_tail() {
        let long = format!("root;{};inner;storage_load", "a".repeat(60));
        assert_eq!(shorten_call_site(&long), "...;inner;storage_load");
    }

    #[test]
    fn test_shorten_call_site_single_long_label() {
        let long = "x".repeat(100);
        let short = shorten_call_site(&long);
        assert_eq!(short.chars().count(), CALL_SITE_WIDTH);
        assert!(short.starts_with("..."));
    }

    #[test]
    fn test_expensive_hostio() {
        assert!(is_expensive("storage_flush_cache"));
        assert!(!is_expensive("storage_load"));
        assert!(!is_expensive("custom"));
    }
}
