//! The task catalog and per-player task assignment.
//!
//! The catalog is static config: every entry binds a task name to a
//! room, a duration class, and a visual flag. Short tasks take 2 turns and
//! long tasks 3, so every task opens a multi-tick vulnerability window.

use airlock_types::{PlayerId, Task, TaskId, TaskKind};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::ShipError;
use crate::map::ShipMap;

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Display name.
    pub name: String,
    /// Room the task is performed in.
    pub room: String,
    /// Duration class.
    pub kind: TaskKind,
    /// Turns required.
    pub duration: u32,
    /// Whether the completing turn plays a visible animation.
    #[serde(default)]
    pub visual: bool,
}

/// The full task catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCatalog {
    /// All known tasks.
    pub specs: Vec<TaskSpec>,
}

impl TaskCatalog {
    /// The default catalog.
    ///
    /// Durations per class: short 2, long 3, common 2. Visual tasks produce
    /// visible proof and clear the performer when witnessed.
    pub fn standard() -> Self {
        let spec = |name: &str, room: &str, kind: TaskKind, visual: bool| TaskSpec {
            name: name.to_owned(),
            room: room.to_owned(),
            kind,
            duration: match kind {
                TaskKind::Short | TaskKind::Common => 2,
                TaskKind::Long => 3,
            },
            visual,
        };

        let specs = vec![
            spec("Download Data", "Cafeteria", TaskKind::Short, false),
            spec("Accept Diverted Power", "Electrical", TaskKind::Short, false),
            spec("Chart Course", "Navigation", TaskKind::Short, false),
            spec("Stabilize Steering", "Navigation", TaskKind::Short, false),
            spec("Clean O2 Filter", "O2", TaskKind::Short, false),
            spec("Prime Shields", "Shields", TaskKind::Short, false),
            spec("Upload Data", "Admin", TaskKind::Short, false),
            spec("Calibrate Distributor", "Electrical", TaskKind::Short, false),
            spec("Divert Power", "Electrical", TaskKind::Short, false),
            spec("Unlock Manifolds", "Reactor", TaskKind::Short, false),
            spec("Submit Scan", "Medbay", TaskKind::Short, true),
            spec("Empty Garbage", "Cafeteria", TaskKind::Long, true),
            spec("Clear Asteroids", "Weapons", TaskKind::Long, true),
            spec("Empty Chute", "O2", TaskKind::Long, false),
            spec("Align Engine Output", "Upper Engine", TaskKind::Long, false),
            spec("Fuel Engines", "Storage", TaskKind::Long, false),
            spec("Start Reactor", "Reactor", TaskKind::Long, false),
            spec("Inspect Sample", "Medbay", TaskKind::Long, false),
            spec("Fix Wiring", "Electrical", TaskKind::Common, false),
            spec("Swipe Card", "Admin", TaskKind::Common, false),
        ];
        Self { specs }
    }

    /// Draw `count` distinct tasks for one player.
    ///
    /// Instances get consecutive ids starting from `*next_id`, which is
    /// advanced past the draw.
    ///
    /// # Errors
    ///
    /// Returns [`ShipError::TaskRoomUnknown`] if a drawn spec is bound to a
    /// room missing from the map.
    pub fn draw<R: Rng>(
        &self,
        map: &ShipMap,
        player: PlayerId,
        count: usize,
        next_id: &mut u32,
        rng: &mut R,
    ) -> Result<Vec<Task>, ShipError> {
        let mut pool: Vec<&TaskSpec> = self.specs.iter().collect();
        pool.shuffle(rng);
        let mut tasks = Vec::with_capacity(count);
        for spec in pool.into_iter().take(count) {
            let room = map
                .room_id(&spec.room)
                .ok_or_else(|| ShipError::TaskRoomUnknown {
                    task: spec.name.clone(),
                    room: spec.room.clone(),
                })?;
            tasks.push(Task {
                id: TaskId(*next_id),
                name: spec.name.clone(),
                room,
                kind: spec.kind,
                max_duration: spec.duration,
                remaining: spec.duration,
                is_visual: spec.visual,
                assigned_to: player,
            });
            *next_id = next_id.saturating_add(1);
        }
        Ok(tasks)
    }
}
