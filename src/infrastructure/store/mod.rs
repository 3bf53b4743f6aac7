//! Chunk persistence: SQLite pool, migrations, vec extension, similarity
//! queries.

pub mod extensions;
pub mod sqlite;

pub use sqlite::{SqliteChunkStore, VectorBackend};
