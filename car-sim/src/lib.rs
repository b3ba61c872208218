//! car_sim - four-wheel vehicle dynamics on top of rapier3d, plus the
//! websocket surface used to drive it remotely.

pub mod config;
pub mod dynamics;
pub mod net;
pub mod physics;
pub mod state;
