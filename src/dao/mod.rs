/// Database model definitions.
pub mod models;
/// Session, participant, and vote storage backends.
pub mod session_store;
/// Storage abstraction layer shared by every backend.
pub mod storage;
/// Seam to the external task records.
pub mod task_board;
