use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use quiz_core::model::{Category, Question};
use storage::repository::QuestionRepository;

use crate::error::IngestError;

/// Parses a tab-separated question bank: one `prompt\tanswer` pair per line.
///
/// Lines without a tab are skipped rather than treated as errors, so a
/// hand-edited bank file never aborts a whole load.
pub fn parse_tsv<R: BufRead>(reader: R) -> io::Result<Vec<Question>> {
    let mut questions = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let Some((prompt, answer)) = line.split_once('\t') else {
            continue;
        };
        if prompt.is_empty() || answer.is_empty() {
            continue;
        }
        questions.push(Question::new(prompt, answer));
    }
    Ok(questions)
}

/// Loads question bank files into the question repository.
pub struct BankIngest {
    questions: Arc<dyn QuestionRepository>,
}

impl BankIngest {
    pub fn new(questions: Arc<dyn QuestionRepository>) -> Self {
        Self { questions }
    }

    /// Loads one bank file into `category`, returning how many questions
    /// were newly inserted. Reloading the same file is a no-op.
    pub async fn load_file(&self, path: &Path, category: Category) -> Result<u64, IngestError> {
        let file = File::open(path).map_err(|source| IngestError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let parsed = parse_tsv(BufReader::new(file)).map_err(|source| IngestError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(self.questions.insert_questions(category, &parsed).await?)
    }

    /// Loads every category's bank file from `dir`, skipping categories
    /// whose file is absent. Files are named after the category's storage
    /// name, e.g. `CSC_111.tsv`.
    pub async fn load_dir(&self, dir: &Path) -> Result<u64, IngestError> {
        let mut inserted = 0;
        for category in Category::ALL {
            let path = dir.join(format!("{}.tsv", category.as_str()));
            if path.exists() {
                inserted += self.load_file(&path, category).await?;
            }
        }
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn splits_on_the_first_tab_only() {
        let input = "What does TCP stand for?\tTransmission Control Protocol\n";
        let parsed = parse_tsv(Cursor::new(input)).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].prompt(), "What does TCP stand for?");
        assert_eq!(parsed[0].answer(), "Transmission Control Protocol");

        let tabby = "a\tb\tc\n";
        let parsed = parse_tsv(Cursor::new(tabby)).unwrap();
        assert_eq!(parsed[0].answer(), "b\tc");
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let input = "good\tanswer\nno tab here\n\t\nonly prompt\t\ngood2\tanswer2\n";
        let parsed = parse_tsv(Cursor::new(input)).unwrap();
        let prompts: Vec<&str> = parsed.iter().map(Question::prompt).collect();
        assert_eq!(prompts, ["good", "good2"]);
    }

    #[test]
    fn empty_input_yields_no_questions() {
        let parsed = parse_tsv(Cursor::new("")).unwrap();
        assert!(parsed.is_empty());
    }
}
