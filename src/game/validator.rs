use crate::models::GameSession;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuessError {
    #[error("this game has already finished")]
    GameFinished,
    #[error("guess must be between {min} and {max}")]
    OutOfRange { min: i32, max: i32 },
}

pub struct GuessValidator;

impl GuessValidator {
    /// Check that a guess may be applied to the game.
    ///
    /// Guesses outside the narrowed range are allowed (they just waste an
    /// attempt); guesses outside the level's full range are not.
    pub fn validate(game: &GameSession, guess: i32) -> Result<(), GuessError> {
        if game.completed {
            return Err(GuessError::GameFinished);
        }
        if !(game.range_min..=game.range_max).contains(&guess) {
            return Err(GuessError::OutOfRange {
                min: game.range_min,
                max: game.range_max,
            });
        }
        Ok(())
    }

    /// Session invariants that must hold after every transition
    pub fn is_consistent(game: &GameSession) -> bool {
        let range_holds_secret = game.current_range_low <= game.secret_number
            && game.secret_number <= game.current_range_high;
        let range_within_level =
            game.range_min <= game.current_range_low && game.current_range_high <= game.range_max;
        let attempts_valid = (0..=game.max_attempts).contains(&game.attempts_left);
        let terminal_valid = match (game.completed, game.won) {
            (false, won) => !won && game.score == 0 && game.end_time.is_none() && game.attempts_left > 0,
            (true, true) => game.end_time.is_some(),
            (true, false) => game.end_time.is_some() && game.score == 0 && game.attempts_left == 0,
        };

        range_holds_secret && range_within_level && attempts_valid && terminal_valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::session::tests::test_session;

    #[test]
    fn test_rejects_out_of_level_range() {
        let game = test_session(42);
        assert_eq!(
            GuessValidator::validate(&game, 0),
            Err(GuessError::OutOfRange { min: 1, max: 100 })
        );
        assert_eq!(
            GuessValidator::validate(&game, 101),
            Err(GuessError::OutOfRange { min: 1, max: 100 })
        );
        assert!(GuessValidator::validate(&game, 100).is_ok());
    }

    #[test]
    fn test_rejects_finished_game() {
        let mut game = test_session(42);
        game.completed = true;
        assert_eq!(
            GuessValidator::validate(&game, 42),
            Err(GuessError::GameFinished)
        );
    }

    #[test]
    fn test_fresh_session_is_consistent() {
        assert!(GuessValidator::is_consistent(&test_session(1)));
    }

    #[test]
    fn test_won_without_completion_is_inconsistent() {
        let mut game = test_session(10);
        game.won = true;
        assert!(!GuessValidator::is_consistent(&game));
    }
}
