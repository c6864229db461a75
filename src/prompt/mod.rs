//! System instruction assembly.
//!
//! Composition order is fixed: tier persona → request-kind output format →
//! department guidance → caller role → project context → structured-data
//! summary. Missing optional pieces are simply omitted, never placeholder'd.

pub mod departments;

pub use departments::{DepartmentPrompts, StaticDepartmentPrompts};

use std::sync::Arc;

use crate::request::{DataSummary, RequestContext, RequestKind, Tier};

/// Base persona and capability block per tier.
fn tier_persona(tier: Tier) -> &'static str {
    match tier {
        Tier::Cleaner => {
            "You are a data normalization assistant. You restructure uploaded files \
             into clean, consistently named tabular form. You do not analyze or \
             interpret the data."
        }
        Tier::Worker => {
            "You are a capable business data assistant. You answer questions about \
             the caller's data directly and concisely, producing charts, summaries, \
             and task lists on request."
        }
        Tier::Thinker => {
            "You are a senior analyst. You reason step by step about the caller's \
             data, surface root causes and trade-offs, quantify uncertainty, and \
             state the assumptions behind every projection."
        }
    }
}

/// Output-format addendum per request kind, where one exists.
fn kind_addendum(kind: RequestKind) -> Option<&'static str> {
    match kind {
        RequestKind::Chart => Some(
            "Respond with a chart specification: chart type, axes, series, and the \
             aggregation applied, followed by a one-sentence takeaway.",
        ),
        RequestKind::Table => Some(
            "Respond with a single markdown table. Name every column; do not add \
             prose outside the table except a one-line caption.",
        ),
        RequestKind::Gtd => Some(
            "Respond with a prioritized action list. Each item gets an owner (if \
             known), a verb-first title, and a suggested due window.",
        ),
        RequestKind::Forecast => Some(
            "Respond with a forecast: stated assumptions, the projected range \
             (low/expected/high), and the main risks to the projection.",
        ),
        RequestKind::Analysis => Some(
            "Respond with structured findings: what the data shows, why, and what \
             to do about it, each as its own section.",
        ),
        RequestKind::Tips => Some("Respond with at most five short, concrete suggestions."),
        RequestKind::Upload => Some(
            "Describe the normalized structure you produced: sheet or table names, \
             columns, and row counts.",
        ),
        RequestKind::General => None,
    }
}

/// Render the structured-data context summary.
fn render_data_summary(data: &DataSummary) -> String {
    match data {
        DataSummary::Board {
            name,
            item_count,
            fields,
        } => format!(
            "The caller is working with the board \"{name}\": {item_count} items with \
             fields: {}.",
            fields.join(", ")
        ),
        DataSummary::Table {
            name,
            row_count,
            columns,
        } => format!(
            "The caller is working with the table \"{name}\": {row_count} rows with \
             columns: {}.",
            columns.join(", ")
        ),
    }
}

/// Composes the tier-specific system instruction. Deterministic given its
/// inputs.
pub struct PromptAssembler {
    departments: Arc<dyn DepartmentPrompts>,
}

impl PromptAssembler {
    pub fn new(departments: Arc<dyn DepartmentPrompts>) -> Self {
        Self { departments }
    }

    /// Build the full system instruction for one request.
    pub fn build(&self, tier: Tier, kind: RequestKind, context: Option<&RequestContext>) -> String {
        let mut sections = vec![tier_persona(tier).to_string()];

        if let Some(addendum) = kind_addendum(kind) {
            sections.push(addendum.to_string());
        }

        if let Some(ctx) = context {
            if let Some(department) = &ctx.department {
                match self.departments.lookup(department) {
                    Some(guidance) => sections.push(guidance),
                    None => tracing::debug!(department, "no guidance for department"),
                }
            }
            if let Some(role) = &ctx.role {
                sections.push(format!("You are assisting a {role}."));
            }
            if let Some(notes) = &ctx.project_notes {
                sections.push(format!("Project context:\n{notes}"));
            }
            if let Some(data) = &ctx.data {
                sections.push(render_data_summary(data));
            }
        }

        sections.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assembler() -> PromptAssembler {
        PromptAssembler::new(Arc::new(StaticDepartmentPrompts::with_defaults()))
    }

    #[test]
    fn bare_request_is_persona_plus_addendum() {
        let built = assembler().build(Tier::Worker, RequestKind::Chart, None);
        assert!(built.starts_with("You are a capable business data assistant."));
        assert!(built.contains("chart specification"));
    }

    #[test]
    fn general_kind_has_no_addendum() {
        let built = assembler().build(Tier::Worker, RequestKind::General, None);
        assert_eq!(built, tier_persona(Tier::Worker));
    }

    #[test]
    fn full_context_composes_in_order() {
        let context = RequestContext::new()
            .with_department("Sales")
            .with_role("account manager")
            .with_project_notes("Q3 pipeline review")
            .with_data(DataSummary::Table {
                name: "deals".into(),
                row_count: 88,
                columns: vec!["stage".into(), "value".into()],
            });

        let built = assembler().build(Tier::Thinker, RequestKind::Analysis, Some(&context));

        let persona = built.find("senior analyst").unwrap();
        let addendum = built.find("structured findings").unwrap();
        let department = built.find("pipeline stages").unwrap();
        let role = built.find("assisting a account manager").unwrap();
        let notes = built.find("Q3 pipeline review").unwrap();
        let data = built.find("table \"deals\": 88 rows").unwrap();

        assert!(persona < addendum);
        assert!(addendum < department);
        assert!(department < role);
        assert!(role < notes);
        assert!(notes < data);
    }

    #[test]
    fn unknown_department_is_omitted_without_placeholder() {
        let context = RequestContext::new().with_department("astrology");
        let built = assembler().build(Tier::Worker, RequestKind::General, Some(&context));
        assert_eq!(built, tier_persona(Tier::Worker));
    }

    #[test]
    fn board_summary_renders_fields() {
        let context = RequestContext::new().with_data(DataSummary::Board {
            name: "Sprint 12".into(),
            item_count: 34,
            fields: vec!["status".into(), "assignee".into()],
        });
        let built = assembler().build(Tier::Worker, RequestKind::Gtd, Some(&context));
        assert!(built.contains("board \"Sprint 12\": 34 items"));
        assert!(built.contains("status, assignee"));
    }

    #[test]
    fn build_is_deterministic() {
        let context = RequestContext::new().with_department("finance");
        let a = assembler().build(Tier::Worker, RequestKind::Table, Some(&context));
        let b = assembler().build(Tier::Worker, RequestKind::Table, Some(&context));
        assert_eq!(a, b);
    }
}
