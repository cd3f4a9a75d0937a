//! Seam to the external task records. Finalized estimates are written here,
//! never to the vote rows.

use dashmap::DashMap;
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::storage::StorageResult;

/// Write-side capability onto the external task entity. Task CRUD itself
/// lives outside this service; the only thing estimation needs is to commit
/// a final story-points value for a task.
pub trait TaskBoard: Send + Sync {
    /// Record the finalized estimate on the task identified by `task_id`.
    fn set_story_points(
        &self,
        task_id: Uuid,
        story_points: u32,
    ) -> BoxFuture<'static, StorageResult<()>>;
}

/// In-memory task board used by the memory backend and by tests.
#[derive(Default)]
pub struct MemoryTaskBoard {
    estimates: DashMap<Uuid, u32>,
}

impl MemoryTaskBoard {
    /// Create an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Finalized estimate recorded for a task, if any.
    pub fn story_points(&self, task_id: Uuid) -> Option<u32> {
        self.estimates.get(&task_id).map(|entry| *entry.value())
    }
}

impl TaskBoard for MemoryTaskBoard {
    fn set_story_points(
        &self,
        task_id: Uuid,
        story_points: u32,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.estimates.insert(task_id, story_points);
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_board_overwrites_previous_estimate() {
        let board = MemoryTaskBoard::new();
        let task = Uuid::new_v4();

        board.set_story_points(task, 5).await.unwrap();
        board.set_story_points(task, 8).await.unwrap();

        assert_eq!(board.story_points(task), Some(8));
        assert_eq!(board.story_points(Uuid::new_v4()), None);
    }
}
