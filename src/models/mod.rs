pub mod feedback;
pub mod game;
pub mod setting;
pub mod user;
pub mod word;

pub use feedback::Feedback;
pub use game::{
    GameScoreEntry, GameSession, GameStatus, GameView, Guess, GuessResult, Level,
    PlayerScoreEntry,
};
pub use setting::Setting;
pub use user::{User, UserStats};
pub use word::{Word, DEFAULT_WORD_ATTEMPTS};
