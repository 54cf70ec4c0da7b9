//! Pure scoring engine.
//!
//! Scoring rules:
//! - Correct answer: 100 base points.
//! - Speed bonus: up to 50 additional points, scaled linearly from 50
//!   (answered instantly) down to 0 (answered at the deadline).
//! - Wrong answers: 0 points.
//! - Answers measured under 1000 ms are flagged as suspicious; the flag is a
//!   display heuristic and never affects the score.

/// Points granted for a correct answer before the speed bonus.
const BASE_POINTS: u32 = 100;
/// Maximum speed bonus for an instant answer.
const MAX_SPEED_BONUS: f64 = 50.0;
/// Answers faster than this are flagged for UI display.
const SUSPICIOUS_THRESHOLD_MS: u64 = 1000;

/// Breakdown of a single scored answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreBreakdown {
    /// Whether the normalized choice matched the correct option.
    pub is_correct: bool,
    /// Correctness component of the score.
    pub base_points: u32,
    /// Speed component of the score.
    pub speed_bonus: u32,
    /// Total points awarded.
    pub points_awarded: u32,
    /// Response time clamped to the question window.
    pub elapsed_ms: u64,
    /// Latency heuristic flag; never affects the score.
    pub suspicious: bool,
}

/// Score one answer from the room's authoritative timestamps.
///
/// Deterministic and side-effect free. Option letters are normalized (trim,
/// uppercase, first character) so stray whitespace or casing from a client
/// never costs points. Elapsed time is clamped to `[0, limit]`, so an answer
/// that slips in after expiry can neither earn a bonus nor go negative.
pub fn compute_score(
    chosen_option: &str,
    correct_option: &str,
    time_limit_seconds: u32,
    question_start_ms: u64,
    submitted_at_ms: u64,
) -> ScoreBreakdown {
    let total_ms = u64::from(time_limit_seconds) * 1000;
    let elapsed_ms = submitted_at_ms.saturating_sub(question_start_ms).min(total_ms);

    let is_correct = normalize_option(chosen_option) == normalize_option(correct_option)
        && normalize_option(correct_option).is_some();
    let suspicious = elapsed_ms < SUSPICIOUS_THRESHOLD_MS;

    if !is_correct {
        return ScoreBreakdown {
            is_correct: false,
            base_points: 0,
            speed_bonus: 0,
            points_awarded: 0,
            elapsed_ms,
            suspicious,
        };
    }

    let fraction_remaining = if total_ms > 0 {
        (total_ms - elapsed_ms) as f64 / total_ms as f64
    } else {
        0.0
    };
    let speed_bonus = (MAX_SPEED_BONUS * fraction_remaining).round() as u32;

    ScoreBreakdown {
        is_correct: true,
        base_points: BASE_POINTS,
        speed_bonus,
        points_awarded: BASE_POINTS + speed_bonus,
        elapsed_ms,
        suspicious,
    }
}

/// First meaningful character of an option letter, uppercased.
fn normalize_option(option: &str) -> Option<char> {
    option.trim().chars().next().map(|c| c.to_ascii_uppercase())
}
