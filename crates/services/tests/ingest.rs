use std::fs;
use std::path::PathBuf;

use quiz_core::model::Category;
use services::BankIngest;
use services::error::IngestError;
use storage::repository::Storage;

struct TempDataDir(PathBuf);

impl TempDataDir {
    fn new(tag: &str) -> Self {
        let dir = std::env::temp_dir().join(format!("quiz-ingest-{tag}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        Self(dir)
    }
}

impl Drop for TempDataDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.0);
    }
}

#[tokio::test]
async fn reloading_a_bank_directory_is_idempotent() {
    let dir = TempDataDir::new("reload");
    fs::write(
        dir.0.join("CSC_111.tsv"),
        "q1\ta1\nq2\ta2\nmalformed line\nq3\ta3\n",
    )
    .unwrap();

    let storage = Storage::in_memory();
    let ingest = BankIngest::new(storage.questions.clone());

    assert_eq!(ingest.load_dir(&dir.0).await.unwrap(), 3);
    assert_eq!(ingest.load_dir(&dir.0).await.unwrap(), 0);

    let bank = storage
        .questions
        .questions_for_category(Category::Csc111)
        .await
        .unwrap();
    assert_eq!(bank.len(), 3);
}

#[tokio::test]
async fn absent_category_files_are_skipped() {
    let dir = TempDataDir::new("absent");
    fs::write(dir.0.join("CSC_211.tsv"), "q\ta\n").unwrap();

    let storage = Storage::in_memory();
    let ingest = BankIngest::new(storage.questions.clone());
    assert_eq!(ingest.load_dir(&dir.0).await.unwrap(), 1);

    assert!(
        storage
            .questions
            .questions_for_category(Category::Csc111)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn a_missing_file_reports_its_path() {
    let storage = Storage::in_memory();
    let ingest = BankIngest::new(storage.questions.clone());
    let missing = PathBuf::from("/nonexistent/CSC_111.tsv");

    let err = ingest
        .load_file(&missing, Category::Csc111)
        .await
        .unwrap_err();
    match err {
        IngestError::Io { path, .. } => assert!(path.contains("CSC_111.tsv")),
        other => panic!("unexpected error: {other}"),
    }
}
