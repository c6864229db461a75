//! Complexity analyzer for tier routing.
//!
//! Scores free-text prompts plus structured context against three weighted
//! rule sets (high/medium/low), then maps the accumulated score to a tier and
//! a confidence. Pure function of its inputs: no I/O, no mutation.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

use crate::request::{RequestContext, Tier};

/// Derived complexity estimate for one request. Never persisted as-is; the
/// routing decision it informs is what gets logged.
#[derive(Debug, Clone)]
pub struct ComplexityScore {
    /// Accumulated score, unbounded above.
    pub score: u32,
    /// Tier this score maps to. The analyzer never selects `cleaner`; that
    /// tier is reserved for file uploads and decided upstream.
    pub tier: Tier,
    /// Confidence in the mapping, in `[0, 1]`.
    pub confidence: f32,
    /// One human-readable reason per contributing rule, in evaluation order.
    pub factors: Vec<String>,
}

// Pattern weights per rule set.
const HIGH_PATTERN_WEIGHT: u32 = 30;
const MEDIUM_PATTERN_WEIGHT: u32 = 15;
const LOW_PATTERN_WEIGHT: u32 = 5;

// Keyword increments per rule set. The low set contributes no score — a
// reference-behavior quirk kept for score compatibility; low keyword hits
// still surface in `factors`.
const HIGH_KEYWORD_WEIGHT: u32 = 5;
const MEDIUM_KEYWORD_WEIGHT: u32 = 3;
const LOW_KEYWORD_WEIGHT: u32 = 0;

// Data-volume brackets and bonuses.
const ROW_MEDIUM_THRESHOLD: usize = 100;
const ROW_HIGH_THRESHOLD: usize = 1_000;
const ROW_MEDIUM_BONUS: u32 = 10;
const ROW_HIGH_BONUS: u32 = 25;
const COLUMN_MEDIUM_THRESHOLD: usize = 8;
const COLUMN_HIGH_THRESHOLD: usize = 20;
const COLUMN_MEDIUM_BONUS: u32 = 8;
const COLUMN_HIGH_BONUS: u32 = 20;

// Prompt-shape bonuses.
const LONG_PROMPT_CHARS: usize = 500;
const LONG_PROMPT_BONUS: u32 = 10;
const FREE_QUESTION_MARKS: usize = 2;
const EXTRA_QUESTION_BONUS: u32 = 5;

// Score-to-tier cut points.
const THINKER_THRESHOLD: u32 = 50;
const WORKER_THRESHOLD: u32 = 20;

lazy_static! {
    static ref HIGH_PATTERNS: Vec<(Regex, &'static str)> = vec![
        (Regex::new(r"(?i)\broot.?cause\b").unwrap(), "root-cause analysis"),
        (
            Regex::new(r"(?i)\bcomprehensive\b.*\b(analysis|review|audit|assessment)\b").unwrap(),
            "comprehensive analysis",
        ),
        (
            Regex::new(r"(?i)\bcross.?(department|functional|team)\b").unwrap(),
            "cross-department scope",
        ),
        (
            Regex::new(r"(?i)\bforecast\b.*\b(revenue|sales|demand|growth|q[1-4])\b").unwrap(),
            "quantitative forecast",
        ),
        (
            Regex::new(r"(?i)\b(predict|projection|model)\b.*\b(next|future|quarter|year|q[1-4])\b")
                .unwrap(),
            "forward projection",
        ),
        (
            Regex::new(r"(?i)\bwhat.?if\b|\bscenario\b.*\b(analysis|planning)\b").unwrap(),
            "scenario reasoning",
        ),
        (
            Regex::new(r"(?i)\b(optimi[sz]e|reallocate|rebalance)\b.*\b(across|between|portfolio)\b")
                .unwrap(),
            "cross-cutting optimization",
        ),
        (Regex::new(r"(?i)\btrade.?offs?\b").unwrap(), "trade-off weighing"),
    ];
    static ref MEDIUM_PATTERNS: Vec<(Regex, &'static str)> = vec![
        (
            Regex::new(r"(?i)\b(create|generate|make|draw|build)\b.*\b(chart|graph|plot|dashboard)\b")
                .unwrap(),
            "chart construction",
        ),
        (
            Regex::new(r"(?i)\b(summari[sz]e|break.?down|group)\b.*\b(by|per|into)\b").unwrap(),
            "grouped summary",
        ),
        (
            Regex::new(r"(?i)\bcompare\b.*\b(to|with|against|versus|vs)\b").unwrap(),
            "comparison",
        ),
        (Regex::new(r"(?i)\btrends?\b|\bover time\b").unwrap(), "trend reading"),
        (
            Regex::new(r"(?i)\b(weekly|monthly|quarterly)\b.*\breport\b").unwrap(),
            "periodic report",
        ),
        (
            Regex::new(r"(?i)\bprioriti[sz]e\b|\bnext steps\b").unwrap(),
            "prioritization",
        ),
    ];
    static ref LOW_PATTERNS: Vec<(Regex, &'static str)> = vec![
        (
            Regex::new(r"(?i)^\s*(hi|hello|hey|thanks|thank you)\b").unwrap(),
            "greeting",
        ),
        (
            Regex::new(r"(?i)\b(list|show|display)\b.*\b(all|my|the)\b").unwrap(),
            "simple listing",
        ),
        (Regex::new(r"(?i)\bhow (do|can) i\b").unwrap(), "usage question"),
    ];
}

const HIGH_KEYWORDS: &[&str] = &[
    "why",
    "implications",
    "bottleneck",
    "correlation",
    "anomaly",
    "causality",
    "regression",
    "diagnose",
    "strategy",
];

const MEDIUM_KEYWORDS: &[&str] = &[
    "chart",
    "graph",
    "summarize",
    "compare",
    "trend",
    "report",
    "breakdown",
    "forecast",
    "average",
    "percentage",
];

const LOW_KEYWORDS: &[&str] = &[
    "list", "show", "rename", "open", "find", "status", "help",
];

/// Lowercased alphanumeric tokens of the prompt, deduplicated. Set-based so
/// the keyword scan is order-independent and each keyword counts once.
fn tokenize(prompt: &str) -> HashSet<String> {
    prompt
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Score a prompt (plus optional structured context) for complexity.
pub fn analyze(prompt: &str, context: Option<&RequestContext>) -> ComplexityScore {
    let mut score: u32 = 0;
    let mut factors = Vec::new();

    for (patterns, weight, label) in [
        (&*HIGH_PATTERNS, HIGH_PATTERN_WEIGHT, "high"),
        (&*MEDIUM_PATTERNS, MEDIUM_PATTERN_WEIGHT, "medium"),
        (&*LOW_PATTERNS, LOW_PATTERN_WEIGHT, "low"),
    ] {
        for (re, name) in patterns {
            if re.is_match(prompt) {
                score += weight;
                factors.push(format!("{label} pattern: {name}"));
            }
        }
    }

    let tokens = tokenize(prompt);
    for (keywords, weight, label) in [
        (HIGH_KEYWORDS, HIGH_KEYWORD_WEIGHT, "high"),
        (MEDIUM_KEYWORDS, MEDIUM_KEYWORD_WEIGHT, "medium"),
        (LOW_KEYWORDS, LOW_KEYWORD_WEIGHT, "low"),
    ] {
        for keyword in keywords {
            if tokens.contains(*keyword) {
                score += weight;
                factors.push(format!("{label} keyword: {keyword}"));
            }
        }
    }

    if let Some(data) = context.and_then(|c| c.data.as_ref()) {
        let rows = data.row_count();
        if rows >= ROW_HIGH_THRESHOLD {
            score += ROW_HIGH_BONUS;
            factors.push(format!("large data set: {rows} rows"));
        } else if rows >= ROW_MEDIUM_THRESHOLD {
            score += ROW_MEDIUM_BONUS;
            factors.push(format!("medium data set: {rows} rows"));
        }

        let columns = data.column_count();
        if columns >= COLUMN_HIGH_THRESHOLD {
            score += COLUMN_HIGH_BONUS;
            factors.push(format!("wide data set: {columns} columns"));
        } else if columns >= COLUMN_MEDIUM_THRESHOLD {
            score += COLUMN_MEDIUM_BONUS;
            factors.push(format!("moderately wide data set: {columns} columns"));
        }
    }

    let char_count = prompt.chars().count();
    if char_count > LONG_PROMPT_CHARS {
        score += LONG_PROMPT_BONUS;
        factors.push(format!("long prompt ({char_count} chars)"));
    }

    let question_marks = prompt.matches('?').count();
    if question_marks > FREE_QUESTION_MARKS {
        let extra = (question_marks - FREE_QUESTION_MARKS) as u32;
        score += extra * EXTRA_QUESTION_BONUS;
        factors.push(format!("multiple questions: {question_marks}"));
    }

    let (tier, confidence) = map_score(score);

    ComplexityScore {
        score,
        tier,
        confidence,
        factors,
    }
}

/// Map an accumulated score to a tier and confidence.
///
/// `cleaner` is never produced here; it is reserved for file-upload requests
/// and decided by the selector before the analyzer runs.
fn map_score(score: u32) -> (Tier, f32) {
    if score >= THINKER_THRESHOLD {
        // Confidence climbs from 0.6 toward 0.95 as the score grows past 50.
        let confidence = (0.6 + (score - THINKER_THRESHOLD) as f32 * 0.007).min(0.95);
        (Tier::Thinker, confidence)
    } else if score >= WORKER_THRESHOLD {
        // 0.5 at 20 climbing toward 0.9 at the thinker boundary.
        let confidence = (0.5 + (score - WORKER_THRESHOLD) as f32 * (0.4 / 30.0)).min(0.9);
        (Tier::Worker, confidence)
    } else {
        (Tier::Worker, 0.8)
    }
}
