//! Top-level packet engine: classify, decode, accumulate, emit events.
//!
//! Pure logic — no sockets, no files. Call `ingest()` with raw datagrams
//! and get back the decoded packet plus `EngineEvent` outputs that the
//! caller (listener CLI) writes to sinks. Per-packet failures are counted
//! and surfaced via `last_error`, never fatal: the stream continues.

use crate::ack::{decode_ack, AckRecord};
use crate::airspace::{decode_airspace_chunk, AirspaceChunk};
use crate::classify::classify;
use crate::convert::CoordinateConverter;
use crate::flightplan::FlightPlanDocument;
use crate::identity::{decode_identity, CookieIdentityMap, IdentityOutcome};
use crate::session::SessionState;
use crate::settings::{decode_settings, SettingsBundle};
use crate::task::{decode_task, TaskCore};
use crate::telemetry::{decode_telemetry, TelemetryRecord};
use crate::types::{CondorError, Cookie, PacketFamily};

// ---------------------------------------------------------------------------
// Engine outputs
// ---------------------------------------------------------------------------

/// One successfully decoded datagram.
#[derive(Debug, Clone)]
pub enum DecodedPacket {
    Telemetry(TelemetryRecord),
    Identity(IdentityOutcome),
    Task(TaskCore),
    Airspace(AirspaceChunk),
    Settings(SettingsBundle),
    Ack(AckRecord),
}

/// Events emitted by the engine for the caller to persist.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A telemetry tick, geo-enriched when conversion succeeded.
    Position(TelemetryRecord),
    /// The identity map changed for this cookie.
    IdentityUpdated { cookie: Cookie },
    /// The session just became complete; write this document once.
    FlightPlanReady(FlightPlanDocument),
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Stream-processing state for one run.
///
/// Pure state machine: call `ingest()` with datagrams, get back decoded
/// packets and `EngineEvent` outputs. The caller decides what to do with
/// events (write files, print, etc.).
pub struct Engine<C> {
    pub session: SessionState,
    pub identities: CookieIdentityMap,
    converter: Option<C>,

    // Counters
    pub packets_total: u64,
    pub packets_decoded: u64,
    pub decode_errors: u64,
    pub unknown_packets: u64,
    pub conversion_errors: u64,
    pub flight_plans_emitted: u64,

    /// Most recent per-packet failure, for the caller to log.
    pub last_error: Option<CondorError>,
}

impl<C: CoordinateConverter> Engine<C> {
    /// An engine without a converter decodes everything but leaves
    /// telemetry lon/lat unset.
    pub fn new(converter: Option<C>) -> Self {
        Engine {
            session: SessionState::new(),
            identities: CookieIdentityMap::new(),
            converter,
            packets_total: 0,
            packets_decoded: 0,
            decode_errors: 0,
            unknown_packets: 0,
            conversion_errors: 0,
            flight_plans_emitted: 0,
            last_error: None,
        }
    }

    /// Process one raw datagram. Returns the decoded packet and events to
    /// persist.
    pub fn ingest(&mut self, data: &[u8]) -> (Option<DecodedPacket>, Vec<EngineEvent>) {
        self.packets_total += 1;
        let mut events = Vec::new();

        let family = classify(data);
        let result = match family {
            PacketFamily::Telemetry => {
                decode_telemetry(data).map(|mut rec| {
                    self.enrich(&mut rec);
                    events.push(EngineEvent::Position(rec.clone()));
                    DecodedPacket::Telemetry(rec)
                })
            }
            PacketFamily::IdentityFull | PacketFamily::IdentityDelta => {
                decode_identity(data).map(|outcome| {
                    if let IdentityOutcome::Update(update) = &outcome {
                        if self.identities.upsert(update) {
                            events.push(EngineEvent::IdentityUpdated {
                                cookie: update.cookie,
                            });
                        }
                    }
                    DecodedPacket::Identity(outcome)
                })
            }
            PacketFamily::TaskCore => decode_task(data).map(|task| {
                if let Some(doc) = self.session.set_task(task.clone()) {
                    self.flight_plans_emitted += 1;
                    events.push(EngineEvent::FlightPlanReady(doc));
                }
                DecodedPacket::Task(task)
            }),
            PacketFamily::AirspaceListA | PacketFamily::AirspaceListB => {
                decode_airspace_chunk(data).map(|chunk| {
                    if let Some(doc) = self.session.accept_airspace_chunk(chunk.clone()) {
                        self.flight_plans_emitted += 1;
                        events.push(EngineEvent::FlightPlanReady(doc));
                    }
                    DecodedPacket::Airspace(chunk)
                })
            }
            PacketFamily::Settings => decode_settings(data).map(|settings| {
                if let Some(doc) = self.session.set_settings(settings.clone()) {
                    self.flight_plans_emitted += 1;
                    events.push(EngineEvent::FlightPlanReady(doc));
                }
                DecodedPacket::Settings(settings)
            }),
            PacketFamily::Ack => decode_ack(data).map(DecodedPacket::Ack),
            PacketFamily::Unknown => {
                self.unknown_packets += 1;
                return (None, events);
            }
        };

        match result {
            Ok(packet) => {
                self.packets_decoded += 1;
                (Some(packet), events)
            }
            Err(e) => {
                self.decode_errors += 1;
                self.last_error = Some(e);
                (None, events)
            }
        }
    }

    /// Tear down, returning the converter so the caller can shut it down.
    pub fn into_converter(self) -> Option<C> {
        self.converter
    }

    /// Attach lon/lat via the converter; degrade to `None` on failure.
    fn enrich(&mut self, rec: &mut TelemetryRecord) {
        let Some(converter) = self.converter.as_mut() else {
            return;
        };
        match converter.xy_to_lon_lat(rec.pos_x, rec.pos_y) {
            Ok((lon, lat)) => {
                rec.lon = Some(lon);
                rec.lat = Some(lat);
            }
            Err(e) => {
                self.conversion_errors += 1;
                self.last_error = Some(e);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
