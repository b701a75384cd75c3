mod category;
mod ids;
mod mode;
mod question;
mod session;

pub use category::{Category, UnknownCategory};
pub use ids::{PlayerId, QuestionId, SessionId};
pub use mode::{Mode, UnknownMode};
pub use question::{Question, QuestionSet, QuestionSetError};
pub use session::{Session, SessionError};
