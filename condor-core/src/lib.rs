//! condor-core: Pure decode + session library for Condor UDP telemetry.
//!
//! No sockets, no I/O — just algorithms. This crate is the core used by
//! `condor-listener` (capture CLI); the coordinate helper seam is the
//! `CoordinateConverter` trait so the process-backed implementation stays
//! out of the library.

pub mod ack;
pub mod airspace;
pub mod classify;
pub mod config;
pub mod convert;
pub mod engine;
pub mod flightplan;
pub mod identity;
pub mod session;
pub mod settings;
pub mod task;
pub mod telemetry;
pub mod types;
pub mod words;

// Re-export commonly used types at crate root
pub use classify::classify;
pub use convert::{CachedConverter, CoordinateConverter, GridCache};
pub use engine::{DecodedPacket, Engine, EngineEvent};
pub use flightplan::FlightPlanDocument;
pub use identity::{CookieIdentityMap, PilotIdentity};
pub use session::{SessionPhase, SessionState};
pub use telemetry::TelemetryRecord;
pub use types::*;
