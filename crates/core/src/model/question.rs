use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;

/// Immutable prompt/answer pair. The owning category lives on the storage
/// row, not on the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    prompt: String,
    answer: String,
}

impl Question {
    #[must_use]
    pub fn new(prompt: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            answer: answer.into(),
        }
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn answer(&self) -> &str {
        &self.answer
    }

    /// Grades a guess against the answer: case-insensitive,
    /// whitespace-sensitive exact match.
    #[must_use]
    pub fn grade(&self, guess: &str) -> bool {
        guess.to_lowercase() == self.answer.to_lowercase()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionSetError {
    #[error("question bank has {available} questions, {required} required")]
    NotEnoughQuestions { available: usize, required: usize },
}

/// Ordered set of exactly [`QuestionSet::SIZE`] questions drawn without
/// replacement from a category bank. Created fresh at game start and
/// dropped on reset; never persisted.
#[derive(Debug, Clone)]
pub struct QuestionSet {
    questions: Vec<Question>,
}

impl QuestionSet {
    pub const SIZE: usize = 10;

    /// Draws [`QuestionSet::SIZE`] questions from the bank via a partial
    /// Fisher-Yates prefix shuffle.
    ///
    /// # Errors
    ///
    /// Returns `QuestionSetError::NotEnoughQuestions` if the bank holds
    /// fewer than [`QuestionSet::SIZE`] questions.
    pub fn draw<R: Rng + ?Sized>(
        mut bank: Vec<Question>,
        rng: &mut R,
    ) -> Result<Self, QuestionSetError> {
        if bank.len() < Self::SIZE {
            return Err(QuestionSetError::NotEnoughQuestions {
                available: bank.len(),
                required: Self::SIZE,
            });
        }

        let (drawn, _rest) = bank.partial_shuffle(rng, Self::SIZE);
        Ok(Self {
            questions: drawn.to_vec(),
        })
    }

    /// Question for a 1-based round number.
    #[must_use]
    pub fn for_round(&self, round: u32) -> Option<&Question> {
        let index = usize::try_from(round.checked_sub(1)?).ok()?;
        self.questions.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank(n: usize) -> Vec<Question> {
        (0..n)
            .map(|i| Question::new(format!("q{i}"), format!("a{i}")))
            .collect()
    }

    #[test]
    fn grading_is_case_insensitive_but_whitespace_sensitive() {
        let q = Question::new("capital of France?", "Paris");
        assert!(q.grade("paris"));
        assert!(q.grade("PARIS"));
        assert!(!q.grade("paris "));
        assert!(!q.grade("pariss"));
    }

    #[test]
    fn draw_fails_on_short_bank() {
        let err = QuestionSet::draw(bank(9), &mut rand::rng()).unwrap_err();
        assert_eq!(
            err,
            QuestionSetError::NotEnoughQuestions {
                available: 9,
                required: 10
            }
        );
    }

    #[test]
    fn draw_takes_ten_distinct_questions() {
        let set = QuestionSet::draw(bank(25), &mut rand::rng()).unwrap();
        assert_eq!(set.len(), QuestionSet::SIZE);

        let mut prompts: Vec<&str> = (1..=10)
            .map(|round| set.for_round(round).unwrap().prompt())
            .collect();
        prompts.sort_unstable();
        prompts.dedup();
        assert_eq!(prompts.len(), QuestionSet::SIZE);
    }

    #[test]
    fn for_round_is_one_based() {
        let set = QuestionSet::draw(bank(10), &mut rand::rng()).unwrap();
        assert!(set.for_round(0).is_none());
        assert!(set.for_round(1).is_some());
        assert!(set.for_round(10).is_some());
        assert!(set.for_round(11).is_none());
    }
}
