//! Tier selection.
//!
//! Maps a request to its initial service tier. Deterministic, side-effect
//! free; precedence order is fixed and the first matching rule wins.

use crate::request::{Request, RequestKind, Tier};

use super::analyzer::{self, ComplexityScore};

/// Outcome of tier selection for one request.
#[derive(Debug, Clone)]
pub struct RoutingDecision {
    /// Initially selected tier. The engine may still escalate worker→thinker.
    pub tier: Tier,
    /// Analyzer output, or a synthesized score when a precedence rule fired
    /// before the analyzer ran.
    pub score: ComplexityScore,
    /// Human-readable reason for this decision.
    pub reason: String,
}

/// Select the initial tier for a request.
///
/// Precedence, first match wins:
/// 1. file upload present → `cleaner`
/// 2. `force_high_tier` → `thinker`
/// 3. kind is forecast or analysis → `thinker`
/// 4. otherwise the analyzer's tier
pub fn select(request: &Request) -> RoutingDecision {
    if request.file_upload.is_some() {
        return forced(Tier::Cleaner, "file upload: structure normalization");
    }

    if request.force_high_tier {
        return forced(Tier::Thinker, "caller forced high tier");
    }

    if matches!(request.kind, RequestKind::Forecast | RequestKind::Analysis) {
        return forced(
            Tier::Thinker,
            &format!("request kind '{}' requires deep reasoning", request.kind),
        );
    }

    let score = analyzer::analyze(&request.prompt, request.context.as_ref());
    let reason = format!("complexity score {}", score.score);
    RoutingDecision {
        tier: score.tier,
        score,
        reason,
    }
}

/// Decision for a precedence rule that bypasses the analyzer. The synthesized
/// score carries full confidence so the engine never second-guesses it.
fn forced(tier: Tier, reason: &str) -> RoutingDecision {
    RoutingDecision {
        tier,
        score: ComplexityScore {
            score: 0,
            tier,
            confidence: 1.0,
            factors: vec![reason.to_string()],
        },
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::FileUpload;
    use uuid::Uuid;

    fn request(kind: RequestKind, prompt: &str) -> Request {
        Request::new(Uuid::new_v4(), kind, prompt)
    }

    #[test]
    fn file_upload_always_routes_to_cleaner() {
        let req = request(
            RequestKind::Upload,
            "Perform a comprehensive cross-department root cause analysis",
        )
        .with_file_upload(FileUpload {
            filename: "export.csv".into(),
            mime_type: Some("text/csv".into()),
            size_bytes: Some(4_096),
        });

        let decision = select(&req);
        assert_eq!(decision.tier, Tier::Cleaner);
    }

    #[test]
    fn upload_wins_over_force_flag() {
        let req = request(RequestKind::Upload, "normalize this")
            .with_file_upload(FileUpload {
                filename: "f.xlsx".into(),
                mime_type: None,
                size_bytes: None,
            })
            .with_force_high_tier();

        assert_eq!(select(&req).tier, Tier::Cleaner);
    }

    #[test]
    fn force_flag_routes_to_thinker() {
        let req = request(RequestKind::General, "hi").with_force_high_tier();
        let decision = select(&req);
        assert_eq!(decision.tier, Tier::Thinker);
        assert!((decision.score.confidence - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn forecast_and_analysis_kinds_route_to_thinker() {
        assert_eq!(select(&request(RequestKind::Forecast, "numbers")).tier, Tier::Thinker);
        assert_eq!(select(&request(RequestKind::Analysis, "numbers")).tier, Tier::Thinker);
    }

    #[test]
    fn plain_chart_request_uses_the_analyzer() {
        let decision = select(&request(RequestKind::Chart, "create a chart of sales"));
        assert_eq!(decision.tier, Tier::Worker);
        assert!(decision.reason.contains("complexity score"));
    }

    #[test]
    fn selection_is_deterministic() {
        let req = request(RequestKind::General, "compare revenue with last quarter");
        let a = select(&req);
        let b = select(&req);
        assert_eq!(a.tier, b.tier);
        assert_eq!(a.score.score, b.score.score);
    }
}
