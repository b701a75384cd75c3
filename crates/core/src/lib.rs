#![forbid(unsafe_code)]

pub mod engine;
pub mod model;
pub mod time;

pub use engine::{GameError, Phase, QuizGame};
pub use model::{Category, Mode, PlayerId, Question, QuestionId, QuestionSet, Session, SessionId};
pub use time::Clock;
