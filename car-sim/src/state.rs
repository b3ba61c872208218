use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::dynamics::{Car, InputState, Telemetry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftDir {
    Up,
    Down,
    Neutral,
}

/// Driver-aid toggles; `None` leaves the current setting alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AidToggles {
    pub abs: Option<bool>,
    pub tc: Option<bool>,
    pub turbo: Option<bool>,
    pub manual: Option<bool>,
}

/// One-shot commands queued by clients, applied at the next tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Shift(ShiftDir),
    Aids(AidToggles),
}

pub struct SharedGameState {
    pub tick: u64,
    pub clients: HashMap<Uuid, UnboundedSender<String>>,
    pub input: InputState,
    pub commands: Vec<Command>,
}

impl Default for SharedGameState {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedGameState {
    pub fn new() -> Self {
        Self {
            tick: 0,
            clients: HashMap::new(),
            input: InputState::default(),
            commands: Vec::new(),
        }
    }

    pub fn register_client(&mut self, tx: UnboundedSender<String>) -> Uuid {
        let id = Uuid::new_v4();
        self.clients.insert(id, tx);
        id
    }

    pub fn remove_client(&mut self, id: &Uuid) {
        self.clients.remove(id);
        if self.clients.is_empty() {
            // nobody left holding the pedals
            self.input = InputState::default();
        }
    }

    pub fn update_input(&mut self, input: InputState) {
        self.input = input.clamped();
    }

    pub fn queue(&mut self, cmd: Command) {
        self.commands.push(cmd);
    }

    /// Push the latest input and all queued commands into the car.
    pub fn apply_to<H>(&mut self, car: &mut Car<H>)
    where
        H: Copy + PartialEq + std::fmt::Debug,
    {
        car.set_input(self.input);
        for cmd in self.commands.drain(..) {
            debug!(?cmd, "applying client command");
            match cmd {
                Command::Shift(ShiftDir::Up) => car.shift_up(),
                Command::Shift(ShiftDir::Down) => car.shift_down(),
                Command::Shift(ShiftDir::Neutral) => car.shift_to_neutral(),
                Command::Aids(t) => {
                    if let Some(v) = t.abs {
                        car.set_abs_enabled(v);
                    }
                    if let Some(v) = t.tc {
                        car.set_tc_enabled(v);
                    }
                    if let Some(v) = t.turbo {
                        car.set_turbo_enabled(v);
                    }
                    if let Some(v) = t.manual {
                        car.set_manual_transmission(v);
                    }
                }
            }
        }
    }

    /// Send a telemetry snapshot to every client. Closed channels are dropped.
    pub fn broadcast_snapshot(&mut self, telemetry: &Telemetry) {
        let json = match serde_json::to_string(telemetry) {
            Ok(j) => j,
            Err(e) => {
                warn!(error = %e, "telemetry serialization failed");
                return;
            }
        };
        self.clients.retain(|id, tx| {
            let alive = tx.send(json.clone()).is_ok();
            if !alive {
                debug!(%id, "dropping closed client channel");
            }
            alive
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::RapierWorld;
    use rapier3d::prelude::RigidBodyHandle;
    use tokio::sync::mpsc;

    #[test]
    fn commands_drain_into_car() {
        let mut state = SharedGameState::new();
        let mut car: Car<u32> = Car::default();
        state.update_input(InputState { throttle: 2.0, brake: 0.0, steering: 0.3, handbrake: 0.0 });
        state.queue(Command::Aids(AidToggles { abs: Some(true), manual: Some(true), ..Default::default() }));
        state.queue(Command::Shift(ShiftDir::Up));
        state.apply_to(&mut car);

        assert!(state.commands.is_empty());
        assert_eq!(car.input_target().throttle, 1.0);
        assert_eq!(car.input_target().steering, 0.3);
        assert!(car.abs_enabled());
        assert!(car.manual_transmission());
        assert!(!car.tc_enabled());
        assert!(car.is_shifting());
    }

    #[test]
    fn last_client_leaving_releases_input() {
        let mut state = SharedGameState::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = state.register_client(tx);
        state.update_input(InputState { throttle: 1.0, ..Default::default() });
        state.remove_client(&id);
        assert_eq!(state.input, InputState::default());
    }

    #[test]
    fn closed_clients_are_dropped_on_broadcast() {
        let mut state = SharedGameState::new();
        let (tx_open, mut rx_open) = mpsc::unbounded_channel();
        let (tx_closed, rx_closed) = mpsc::unbounded_channel();
        drop(rx_closed);
        state.register_client(tx_open);
        state.register_client(tx_closed);

        let car: Car<RigidBodyHandle> = Car::default();
        let telemetry = car.telemetry(&RapierWorld::new(), 7);
        state.broadcast_snapshot(&telemetry);

        assert_eq!(state.clients.len(), 1);
        let msg = rx_open.try_recv().unwrap();
        assert!(msg.contains(r#""type":"telemetry""#));
    }
}
