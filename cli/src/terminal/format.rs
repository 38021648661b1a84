use std::net::IpAddr;

use crate::terminal::colors;
use colored::*;
use subrank_common::models::{RiskTier, SubdomainEntry, TierBoundaries};

pub type Detail = (String, ColoredString);

pub fn tier_color(tier: RiskTier) -> Color {
    match tier {
        RiskTier::High => colors::HIGH_RISK,
        RiskTier::Medium => colors::MEDIUM_RISK,
        RiskTier::Low => colors::LOW_RISK,
    }
}

/// `9/10 HIGH`, colored by tier.
pub fn score_badge(score: u8, tiers: &TierBoundaries) -> ColoredString {
    let tier: RiskTier = tiers.tier_for(score);
    format!("{score}/10 {}", tier.to_string().to_uppercase())
        .color(tier_color(tier))
        .bold()
}

pub fn ips_to_detail(ips: &[IpAddr]) -> Vec<Detail> {
    ips.iter()
        .map(|ip| match ip {
            IpAddr::V4(v4) => ("IPv4".to_string(), v4.to_string().color(colors::IPV4_ADDR)),
            IpAddr::V6(v6) => ("IPv6".to_string(), v6.to_string().color(colors::IPV6_ADDR)),
        })
        .collect()
}

pub fn entry_details(entry: &SubdomainEntry) -> Vec<Detail> {
    let mut details: Vec<Detail> = ips_to_detail(&entry.ip);
    details.push(("Status".to_string(), status_to_colored(&entry.status)));
    details.push(("Reason".to_string(), entry.reason.as_str().normal()));
    details
}

/// The ranking block for one entry: `[idx] name badge`, then its details
/// as a one-level tree when `with_details` is set.
pub fn ranked_entry(idx: usize, entry: &SubdomainEntry, tiers: &TierBoundaries, with_details: bool) -> Vec<String> {
    let mut lines: Vec<String> = vec![format!(
        "{}{}{} {} {}",
        "[".color(colors::SEPARATOR),
        (idx + 1).to_string().color(colors::ACCENT),
        "]".color(colors::SEPARATOR),
        entry.name.color(colors::PRIMARY),
        score_badge(entry.risk_score, tiers)
    )];
    if !with_details {
        return lines;
    }

    let details: Vec<Detail> = entry_details(entry);
    let last: usize = details.len().saturating_sub(1);
    for (i, (key, value)) in details.into_iter().enumerate() {
        let branch: &str = if i == last { "└─" } else { "├─" };
        lines.push(format!(
            " {} {}{} {value}",
            branch.color(colors::SEPARATOR),
            format!("{key:.<DETAIL_KEY_WIDTH$}").color(colors::TEXT_DEFAULT),
            ":".color(colors::SEPARATOR),
        ));
    }
    lines
}

const DETAIL_KEY_WIDTH: usize = 7;

fn status_to_colored(status: &str) -> ColoredString {
    match status.split_whitespace().next().and_then(|c| c.parse::<u16>().ok()) {
        Some(code) if code < 400 => status.green(),
        Some(_) => status.yellow(),
        None => status.dimmed(),
    }
}
