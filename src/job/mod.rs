/*!
 * Translation jobs.
 *
 * A job takes a set of files, extracts their strings through a `FileCodec`,
 * translates them with the shared `TranslationEngine` and stores the
 * rewritten files in an `ArtifactStore`:
 *
 * - `models`: job state and requests
 * - `codec`: string extraction and rewrite per file format
 * - `store`: output storage
 * - `progress`: progress notification sinks
 * - `orchestrator`: scheduling, cancellation and bookkeeping
 */

pub use self::codec::{FileCodec, MsgArrCodec, PlainLinesCodec};
pub use self::models::{Job, JobFile, JobRequest, JobStatus};
pub use self::orchestrator::JobOrchestrator;
pub use self::progress::{BroadcastSink, LogSink, ProgressSink};
pub use self::store::{ArtifactStore, DirectoryStore, MemoryStore};

pub mod codec;
pub mod models;
pub mod orchestrator;
pub mod progress;
pub mod store;
