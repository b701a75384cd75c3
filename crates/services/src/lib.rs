#![forbid(unsafe_code)]

pub mod error;
pub mod game_flow;
pub mod ingest;
pub mod ledger;

pub use quiz_core::Clock;

pub use error::{GameFlowError, IngestError, LedgerError};
pub use game_flow::{GameFlow, GameOutcome};
pub use ingest::{BankIngest, parse_tsv};
pub use ledger::ScoreLedger;
