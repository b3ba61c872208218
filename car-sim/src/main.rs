use std::sync::Arc;

use anyhow::Context;
use rapier3d::prelude::RigidBodyHandle;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::info;
use tracing_subscriber::EnvFilter;

use car_sim::config::{ServerSettings, TICK_HZ};
use car_sim::dynamics::{Car, SetupParams};
use car_sim::net::start_websocket_server;
use car_sim::physics::RapierWorld;
use car_sim::state::SharedGameState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("starting car-sim server");

    let settings = ServerSettings::from_env();
    let sim = settings.sim_config()?;

    let mut physics = RapierWorld::new();
    let mut car: Car<RigidBodyHandle> = Car::new(sim.tuning);
    car.setup(&mut physics, SetupParams { config: sim.vehicle, ..Default::default() })
        .context("creating the car")?;

    let state = Arc::new(Mutex::new(SharedGameState::new()));
    let listener = TcpListener::bind(&settings.bind)
        .await
        .with_context(|| format!("binding websocket port {}", settings.bind))?;
    tokio::spawn(start_websocket_server(listener, Arc::clone(&state)));

    // Fixed timestep
    let dt = 1.0 / TICK_HZ as f32;
    let mut ticker = interval(Duration::from_secs_f32(dt));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let mut game = state.lock().await;
        game.apply_to(&mut car);

        car.tick(&mut physics, dt);
        physics.step(dt);

        game.tick += 1;
        let telemetry = car.telemetry(&physics, game.tick);
        if game.tick % TICK_HZ as u64 == 0 && car.log_telemetry() {
            telemetry.log();
        }
        game.broadcast_snapshot(&telemetry);
    }
}
