//! Department guidance lookup.
//!
//! Department labels arrive in whatever shape the caller's org uses
//! ("Sales", "human-resources", "ENG"). Lookup normalizes case and
//! separators, then resolves common aliases before matching.

use std::collections::HashMap;

/// External collaborator returning static guidance text for a department.
pub trait DepartmentPrompts: Send + Sync {
    fn lookup(&self, label: &str) -> Option<String>;
}

/// Lowercase a label and collapse separators to single spaces.
pub fn normalize_label(label: &str) -> String {
    label
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolve a normalized label to its canonical department name.
fn canonical(normalized: &str) -> &str {
    match normalized {
        "sales" | "sale" | "revenue" => "sales",
        "marketing" | "mktg" | "growth" => "marketing",
        "engineering" | "eng" | "dev" | "development" | "it" => "engineering",
        "finance" | "accounting" | "fin" => "finance",
        "hr" | "human resources" | "people" | "people ops" => "hr",
        "operations" | "ops" => "operations",
        "support" | "customer support" | "customer service" | "cs" => "support",
        other => other,
    }
}

/// In-memory department prompt table.
pub struct StaticDepartmentPrompts {
    prompts: HashMap<String, String>,
}

impl StaticDepartmentPrompts {
    /// Empty table; every lookup misses.
    pub fn new() -> Self {
        Self {
            prompts: HashMap::new(),
        }
    }

    /// Table pre-filled with guidance for the common departments.
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        table.insert(
            "sales",
            "Frame answers around pipeline stages, deal values, and close rates.",
        );
        table.insert(
            "marketing",
            "Frame answers around campaigns, channels, and conversion funnels.",
        );
        table.insert(
            "engineering",
            "Frame answers around sprints, issues, and delivery timelines.",
        );
        table.insert(
            "finance",
            "Frame answers around budgets, margins, and period-over-period movement.",
        );
        table.insert(
            "hr",
            "Frame answers around headcount, hiring funnels, and retention.",
        );
        table.insert(
            "operations",
            "Frame answers around throughput, capacity, and process bottlenecks.",
        );
        table.insert(
            "support",
            "Frame answers around ticket volume, response times, and satisfaction.",
        );
        table
    }

    /// Add or replace guidance under the normalized, canonical label.
    pub fn insert(&mut self, label: &str, text: impl Into<String>) {
        let normalized = normalize_label(label);
        self.prompts
            .insert(canonical(&normalized).to_string(), text.into());
    }
}

impl Default for StaticDepartmentPrompts {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl DepartmentPrompts for StaticDepartmentPrompts {
    fn lookup(&self, label: &str) -> Option<String> {
        let normalized = normalize_label(label);
        self.prompts.get(canonical(&normalized)).cloned()
    }
}
