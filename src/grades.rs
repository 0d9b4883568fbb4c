/// Letter grades and their grade points, best first.
///
/// The order is the one the grade picker shows; it never changes at runtime.
pub const GRADE_SCALE: [(&str, i64); 8] = [
    ("O", 10),
    ("A+", 9),
    ("A", 8),
    ("B+", 7),
    ("B", 6),
    ("C+", 5),
    ("C", 4),
    ("F", 0),
];

/// Grade assigned to freshly added subjects.
pub const DEFAULT_GRADE: &str = "O";

/// Grade points for `grade`. Unknown symbols count as 0 points.
pub fn points_for(grade: &str) -> i64 {
    GRADE_SCALE
        .iter()
        .find(|(symbol, _)| *symbol == grade)
        .map(|(_, points)| *points)
        .unwrap_or(0)
}

pub fn is_known(grade: &str) -> bool {
    GRADE_SCALE.iter().any(|(symbol, _)| *symbol == grade)
}

/// 2-decimal rounding applied to every reported average (half away from zero).
pub fn round_2_decimals(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Credit-weighted grade point average.
///
/// Sums stay integral; the single division happens at the end. Zero total
/// credits yields 0.0 instead of dividing.
pub fn weighted_average(total_points: i64, total_credits: i64) -> f64 {
    if total_credits == 0 {
        return 0.0;
    }
    round_2_decimals(total_points as f64 / total_credits as f64)
}
