use crate::models::GameSession;

pub struct Scorer;

impl Scorer {
    /// Score for a won game.
    ///
    /// `attempts_left` is the number of guesses remaining after the winning
    /// guess was charged, so solving on the last attempt scores zero.
    /// Fractional results from the multiplier are truncated and the result
    /// saturates at `i32::MAX`.
    pub fn calculate_score(attempts_left: i32, points_per_attempt: i32, multiplier: f64) -> i32 {
        let base = i64::from(attempts_left.max(0)) * i64::from(points_per_attempt.max(0));
        let score = (base as f64 * multiplier.max(0.0)).floor();
        if score.is_nan() {
            0
        } else {
            score.min(f64::from(i32::MAX)) as i32
        }
    }

    /// Score using the configuration snapshotted on the session
    pub fn for_session(game: &GameSession) -> i32 {
        Self::calculate_score(
            game.attempts_left,
            game.points_per_attempt,
            game.score_multiplier,
        )
    }
}
