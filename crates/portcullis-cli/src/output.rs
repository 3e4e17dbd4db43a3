//! Output formatting and display utilities
//!
//! Provides colored, formatted output for the CLI

use colored::Colorize;

use portcullis::{CvePolicy, FlatMap};

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red().bold(), msg);
}

/// Print a warning message
pub fn warning(msg: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), msg);
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue().bold(), msg);
}

/// Print a header
pub fn header(msg: &str) {
    println!("\n{}", msg.bold().underline());
}

/// Print a flat map as sorted `key = value` lines, or as a JSON object
pub fn print_flat(flat: &FlatMap, json: bool) -> Result<(), serde_json::Error> {
    if json {
        print_json(&flat.clone().into_inner())
    } else {
        print!("{}", flat);
        Ok(())
    }
}

/// Print a JSON document
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), serde_json::Error> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

/// One-line summary of each rule of a policy
pub fn rule_summaries(policy: &CvePolicy) -> Vec<String> {
    policy
        .rules
        .iter()
        .map(|rule| {
            let effect = if rule.condition.cves.effect.is_set() {
                rule.condition.cves.effect.as_str()
            } else {
                "unset"
            };
            let mut summary = format!(
                "{} (owner {}, CVE effect {}, {} vulnerability action(s))",
                rule.name,
                rule.owner,
                effect,
                rule.condition.vulnerabilities.len()
            );
            for vulnerability in &rule.condition.vulnerabilities {
                summary.push_str(&format!(
                    "; {} {} from {}",
                    if vulnerability.block { "block" } else { "alert" },
                    vulnerability.id,
                    vulnerability.minimum_severity.rating().name()
                ));
            }
            summary
        })
        .collect()
}

/// Print a validated policy
pub fn print_policy_summary(policy: &CvePolicy) {
    header("CVE policy");
    for line in rule_summaries(policy) {
        println!("  {} {}", "→".cyan(), line);
    }
    println!();
    success(&format!("{} rule(s) valid", policy.rules.len()));
}
