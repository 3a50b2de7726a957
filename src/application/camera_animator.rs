// Camera animator - eased fly-to runs with generation-based cancellation
use crate::domain::camera::{
    observation_point, CameraWaypoint, Orientation, CAMERA_ORIENTATION, FLY_DURATION,
    FRAME_INTERVAL,
};
use crate::domain::telemetry::Position3D;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// The latest committed camera pose, as handed to the render surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CameraFrame {
    pub position: Position3D,
    pub orientation: Orientation,
}

impl CameraFrame {
    fn at(position: Position3D) -> Self {
        Self {
            position,
            orientation: CAMERA_ORIENTATION,
        }
    }
}

#[derive(Default)]
struct CameraState {
    /// Anchor of the next run: the last position a run committed as its
    /// terminal point, and when. Not advanced by a superseded run, so a
    /// retarget mid-flight restarts from the prior waypoint's start.
    committed: Option<(Position3D, Instant)>,
    /// Raw target of the most recent retarget, before the observation
    /// offset. An identical sample does not start a new run.
    last_target: Option<Position3D>,
    frame: Option<CameraFrame>,
}

/// Produces a temporally smooth camera position between the previously
/// committed point and a newly arrived target.
///
/// Each retarget bumps a generation counter; every scheduled frame compares
/// its generation against the current one and exits silently when superseded
/// or torn down. Fresher data always wins over an in-flight run.
pub struct CameraAnimator {
    state: Mutex<CameraState>,
    generation: AtomicU64,
}

impl CameraAnimator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(CameraState::default()),
            generation: AtomicU64::new(0),
        })
    }

    /// Point the camera at a new trajectory sample.
    ///
    /// The first target ever is committed immediately with no animation.
    /// Later targets start a fly-to run from the last committed point,
    /// superseding any run in flight.
    pub fn retarget(self: &Arc<Self>, sample: Position3D) {
        let now = Instant::now();
        let destination = observation_point(sample);

        let waypoint = {
            let mut state = self.state.lock();
            if state.last_target == Some(sample) {
                return;
            }
            state.last_target = Some(sample);

            match state.committed {
                None => {
                    state.frame = Some(CameraFrame::at(destination));
                    state.committed = Some((destination, now));
                    return;
                }
                Some((start, start_time)) => CameraWaypoint {
                    start,
                    end: destination,
                    start_time,
                    end_time: now + FLY_DURATION,
                },
            }
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let animator = Arc::clone(self);
        tokio::spawn(async move {
            animator.animate(waypoint, generation).await;
        });
    }

    /// One cooperative animation run. Re-arms itself each frame until the
    /// run passes its end time, then snaps to the terminal position exactly.
    async fn animate(self: Arc<Self>, waypoint: CameraWaypoint, generation: u64) {
        loop {
            if self.generation.load(Ordering::SeqCst) != generation {
                return;
            }
            let now = Instant::now();
            let raw_progress = waypoint.progress_at(now);
            {
                let mut state = self.state.lock();
                // Recheck under the lock so a superseded run never commits a
                // late frame.
                if self.generation.load(Ordering::SeqCst) != generation {
                    return;
                }
                if raw_progress > 1.0 {
                    state.frame = Some(CameraFrame::at(waypoint.end));
                    state.committed = Some((waypoint.end, now));
                    return;
                }
                state.frame = Some(CameraFrame::at(waypoint.position_at(raw_progress)));
            }
            tokio::time::sleep(FRAME_INTERVAL).await;
        }
    }

    /// Latest committed or interpolated camera pose.
    pub fn current_frame(&self) -> Option<CameraFrame> {
        self.state.lock().frame
    }

    /// Invalidate every scheduled frame loop. Called on teardown so a stale
    /// run can never write to a torn-down camera.
    pub fn shutdown(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    #[cfg(test)]
    pub(crate) fn run_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}
