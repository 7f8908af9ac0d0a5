//! Shared perception fixtures for runner tests.

use airlock_types::{
    Intent, MapBrief, MemoryView, Perception, Phase, PlayerId, Role, RoomView, RosterEntry,
    SelfView,
};
use rust_decimal::Decimal;

/// A minimal task-phase perception for one player in the Cafeteria.
pub fn minimal_perception(role: Role) -> Perception {
    Perception {
        tick: 3,
        max_timesteps: 50,
        phase: Phase::Task,
        meeting: None,
        self_state: SelfView {
            id: PlayerId(0),
            name: String::from("Player 1: red"),
            color: String::from("red"),
            role,
            alive: true,
            death_cause: None,
            death_timestep: None,
            room: String::from("Cafeteria"),
            previous_room: None,
            kill_cooldown: (role == Role::Impostor).then_some(0),
        },
        room: RoomView {
            room: String::from("Cafeteria"),
            visible_players: Vec::new(),
            dead_bodies: Vec::new(),
            lights_out: false,
        },
        roster: vec![
            RosterEntry {
                name: String::from("Player 1: red"),
                alive: true,
                death_cause: None,
                death_timestep: None,
            },
            RosterEntry {
                name: String::from("Player 2: blue"),
                alive: true,
                death_cause: None,
                death_timestep: None,
            },
        ],
        presence_log: Vec::new(),
        memory: MemoryView {
            verified: Vec::new(),
            hearsay: Vec::new(),
            own_claims: Vec::new(),
            intent: Intent::TaskExecution,
            task_commitment: Decimal::ZERO,
            crisis_role: None,
        },
        tasks: Vec::new(),
        comms_jammed: false,
        task_bar_pct: Some(0),
        active_sabotages: Vec::new(),
        critical_fix_room: None,
        danger_score: 0,
        action_history: Vec::new(),
        map_brief: MapBrief::default(),
        legal_actions: Vec::new(),
        deception: None,
    }
}
