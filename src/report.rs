use std::fmt::Write;

use crate::models::{IssueRecord, PriorityLevel, PriorityLogEntry};

pub struct LevelSummary {
    pub level: PriorityLevel,
    pub count: usize,
}

pub fn summarize_by_level(issues: &[IssueRecord]) -> Vec<LevelSummary> {
    let levels = [
        PriorityLevel::Critical,
        PriorityLevel::High,
        PriorityLevel::Medium,
        PriorityLevel::Low,
        PriorityLevel::VeryLow,
    ];

    levels
        .iter()
        .map(|&level| LevelSummary {
            level,
            count: issues
                .iter()
                .filter(|issue| issue.priority_level == level)
                .count(),
        })
        .filter(|summary| summary.count > 0)
        .collect()
}

pub fn build_report(
    issues: &[IssueRecord],
    recent_logs: &[PriorityLogEntry],
    limit: usize,
) -> String {
    let mut sorted = issues.to_vec();
    sorted.sort_by(|a, b| {
        b.priority_score
            .partial_cmp(&a.priority_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut output = String::new();
    let _ = writeln!(output, "# Issue Priority Report");
    let _ = writeln!(output, "{} unresolved issues", issues.len());
    let _ = writeln!(output);
    let _ = writeln!(output, "## Priority Mix");

    let summaries = summarize_by_level(issues);
    if summaries.is_empty() {
        let _ = writeln!(output, "No unresolved issues.");
    } else {
        for summary in summaries.iter() {
            let _ = writeln!(output, "- {}: {}", summary.level.as_str(), summary.count);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Critical Issues");

    let critical: Vec<&IssueRecord> = sorted
        .iter()
        .filter(|issue| issue.priority_score >= 8.0)
        .collect();
    if critical.is_empty() {
        let _ = writeln!(output, "No critical issues.");
    } else {
        for issue in critical.iter().take(limit) {
            let _ = writeln!(
                output,
                "- [{}] {} at {} — score {:.2}",
                issue.category.as_str(),
                issue.title,
                issue.address,
                issue.priority_score
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Highest Priority Issues");

    if sorted.is_empty() {
        let _ = writeln!(output, "No unresolved issues.");
    } else {
        for issue in sorted.iter().take(limit) {
            let stale_marker = if issue.priority_stale { " (stale)" } else { "" };
            let _ = writeln!(
                output,
                "- [{}] {} — score {:.2}, {}{}",
                issue.category.as_str(),
                issue.title,
                issue.priority_score,
                issue.priority_level.as_str(),
                stale_marker
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Priority Changes");

    if recent_logs.is_empty() {
        let _ = writeln!(output, "No recorded priority changes.");
    } else {
        for entry in recent_logs.iter().take(limit) {
            let _ = writeln!(
                output,
                "- {} {:.2} -> {:.2} ({} -> {}) via {}",
                entry.issue_id,
                entry.old_score,
                entry.new_score,
                entry.old_level.as_str(),
                entry.new_level.as_str(),
                entry.trigger_reason.as_str()
            );
        }
    }

    output
}
