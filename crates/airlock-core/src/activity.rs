//! Activity-log plumbing: the sink trait and record construction.

use airlock_events::{ActivityRecord, JsonlWriter, StateSnapshot};
use airlock_types::{Phase, PlayerId, Role};
use tracing::warn;

use crate::state::GameState;

/// Receives one record per resolved action. `Send` so a whole game can run
/// on a blocking thread.
pub trait ActivitySink: Send {
    /// Persist or collect one record.
    fn record(&mut self, record: &ActivityRecord);
}

/// Discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ActivitySink for NullSink {
    fn record(&mut self, _record: &ActivityRecord) {}
}

/// Collects records in memory. Used by tests and short interactive runs.
#[derive(Debug, Clone, Default)]
pub struct VecSink {
    /// Collected records, in resolution order.
    pub records: Vec<ActivityRecord>,
}

impl ActivitySink for VecSink {
    fn record(&mut self, record: &ActivityRecord) {
        self.records.push(record.clone());
    }
}

impl ActivitySink for JsonlWriter {
    fn record(&mut self, record: &ActivityRecord) {
        // A failed log line must never crash a tick.
        if let Err(err) = self.append(record) {
            warn!(%err, "activity log write failed");
        }
    }
}

/// Build an activity record for a resolved action, with the state snapshot
/// taken at record time.
pub fn make_record(state: &GameState, actor: PlayerId, action: impl Into<String>) -> ActivityRecord {
    let (completed, total) = state.task_progress();
    let task_pct = if total == 0 {
        0.0
    } else {
        let completed = u32::try_from(completed).unwrap_or(u32::MAX);
        let total = u32::try_from(total).unwrap_or(u32::MAX);
        f64::from(completed) / f64::from(total) * 100.0
    };
    let player = state.players.get(&actor);
    let round = (state.phase == Phase::Meeting).then(|| {
        state
            .config
            .discussion_rounds
            .saturating_sub(state.discussion_rounds_left)
    });
    ActivityRecord {
        timestep: state.timestep,
        phase: state.phase.to_string(),
        round,
        action: action.into(),
        player: player.map_or_else(String::new, |p| p.name.clone()),
        state: StateSnapshot {
            living_crew: state.living_count(Role::Crewmate),
            living_imps: state.living_count(Role::Impostor),
            task_pct,
            sabotage_active: !state.active_sabotages.is_empty(),
            player_alive: player.is_some_and(|p| p.alive),
            player_location: player
                .map_or_else(String::new, |p| state.map.room_name(p.room).to_owned()),
        },
    }
}
