// Flight data router - fans flight-events snapshots out to consumers
use crate::application::camera_animator::CameraAnimator;
use crate::application::channel_manager::ChannelManager;
use crate::application::timeline_mapper::TimelineMapper;
use crate::domain::telemetry::FlightEventRecord;
use crate::domain::topic::Topic;
use crate::domain::trajectory::{TrajectoryStore, ALTITUDE_SERIES};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

/// Turns flight-events snapshots into trajectory appends, camera retargets,
/// and timeline markers. Subscribes to the manager's per-message
/// notifications and always reads the latest snapshot, so a burst of
/// messages resolves to the freshest data.
pub struct FlightDataRouter {
    manager: Arc<ChannelManager>,
    trajectory: Arc<RwLock<TrajectoryStore>>,
    camera: Arc<CameraAnimator>,
    timeline: Arc<TimelineMapper>,
    /// Records consumed from the cumulative feed. Tracked separately from
    /// the store's length: the store drops malformed positions, and a
    /// dropped record is still a consumed record.
    ingested: Mutex<usize>,
}

impl FlightDataRouter {
    pub fn new(
        manager: Arc<ChannelManager>,
        trajectory: Arc<RwLock<TrajectoryStore>>,
        camera: Arc<CameraAnimator>,
        timeline: Arc<TimelineMapper>,
    ) -> Self {
        Self {
            manager,
            trajectory,
            camera,
            timeline,
            ingested: Mutex::new(0),
        }
    }

    pub async fn run(self) {
        let mut notifications = self.manager.subscribe();
        loop {
            match notifications.recv().await {
                Ok(Topic::FlightEvents) => self.ingest_latest(),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "notification stream lagged, catching up on latest");
                    self.ingest_latest();
                }
                Err(RecvError::Closed) => return,
            }
        }
    }

    fn ingest_latest(&self) {
        let Some(snapshot) = self.manager.latest_snapshot(Topic::FlightEvents) else {
            return;
        };
        match serde_json::from_value::<FlightEventRecord>(snapshot) {
            Ok(record) => self.ingest(&record),
            Err(err) => {
                tracing::warn!(%err, "flight-events snapshot does not match the record schema");
            }
        }
    }

    /// Apply one flight-events payload. The feed re-sends the cumulative
    /// record list each frame, so only the tail beyond what is already
    /// consumed is appended; a shorter list means a new mission and resets
    /// the buffer.
    pub fn ingest(&self, record: &FlightEventRecord) {
        let latest = {
            let mut ingested = self.ingested.lock();
            let mut trajectory = self.trajectory.write();
            if record.flight_records.len() < *ingested {
                tracing::info!(
                    consumed = *ingested,
                    incoming = record.flight_records.len(),
                    "flight record list shrank, resetting trajectory for new mission"
                );
                trajectory.reset();
                *ingested = 0;
            }
            for sample in &record.flight_records[*ingested..] {
                trajectory.append(sample.position());
                trajectory.append_scalar(ALTITUDE_SERIES, sample.altitude);
            }
            *ingested = record.flight_records.len();
            trajectory.latest()
        };

        if let Some(position) = latest {
            self.camera.retarget(position);
        }
        self.timeline.set_events(&record.event_records);
    }
}
