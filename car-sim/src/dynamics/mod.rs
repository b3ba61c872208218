//! dynamics - engine-agnostic vehicle simulation core (one `Car`, four wheels)

pub mod types;
pub mod tuning;
pub mod backend;
pub mod error;
pub mod input;
pub mod debug;
pub mod suspension;
pub mod tire;
pub mod brakes;
pub mod drivetrain;
pub mod steering;
pub mod aero;
pub mod telemetry;
pub mod vehicle;

pub use backend::{BodyState, ChassisDesc, ChassisShape, MassDesc, PhysicsBackend, RayHit};
pub use error::{BackendError, SetupError};
pub use input::InputState;
pub use telemetry::Telemetry;
pub use tuning::TuningParameters;
pub use types::{SurfaceType, VehicleConfig, Wheel, WheelId, WHEEL_COUNT};
pub use vehicle::{Car, SetupParams};
