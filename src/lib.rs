//! Terminal session core: per-command shell execution with working-directory
//! tracking, an append-only output log, bounded command history, and prefix
//! autocomplete. GUI-independent; hosts subscribe to [`SessionEvent`]s and
//! render the record log however they like.

pub mod autocomplete;
pub mod exec;
pub mod history;
pub mod session;

pub use autocomplete::{AutocompleteEngine, Candidate, CandidateSource, CompletionState};
pub use exec::environment::EnvironmentLoader;
pub use exec::{CommandExecutor, ExecutionResult, InterruptHandle};
pub use history::CommandHistory;
pub use session::events::SessionEvent;
pub use session::record::{OutputRecord, RecordKind};
pub use session::{Session, SessionConfig};
