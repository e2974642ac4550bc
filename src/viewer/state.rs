use crate::domain::{Epoch, LocationFix};
use crate::path::{ProgressSplit, RoutePath, split};
use std::sync::Arc;
use tracing::info;

/// What a viewer learns from the server, whether pushed or polled.
#[derive(Clone, Debug, PartialEq)]
pub enum ViewerEvent {
    State { epoch: Epoch, has_location: bool },
    Location(LocationFix),
    Reset { timestamp: i64, epoch: Epoch },
}

#[derive(Clone, Debug, PartialEq)]
pub enum ViewerUpdate {
    Unchanged,
    EpochAdopted(Epoch),
    /// Every locally derived state was discarded; the whole route is upcoming again.
    HardReset { previous: Epoch, current: Epoch },
    Progressed(ProgressSplit),
}

/// A viewer's local copy of the tracking state. The server is the source of truth: any epoch other than the local
/// one wipes the fix and the split.
#[derive(Debug)]
pub struct ViewerState {
    path: Arc<RoutePath>,
    local_epoch: Option<Epoch>,
    fix: Option<LocationFix>,
    progress: ProgressSplit,
}

impl ViewerState {
    pub fn new(path: Arc<RoutePath>) -> Self {
        let progress = split(&path, 0.0);
        ViewerState {
            path,
            local_epoch: None,
            fix: None,
            progress,
        }
    }

    pub fn local_epoch(&self) -> Option<Epoch> {
        self.local_epoch
    }

    pub fn fix(&self) -> Option<&LocationFix> {
        self.fix.as_ref()
    }

    pub fn progress(&self) -> &ProgressSplit {
        &self.progress
    }

    pub fn handle(&mut self, event: ViewerEvent) -> ViewerUpdate {
        match event {
            ViewerEvent::State { epoch, .. } | ViewerEvent::Reset { epoch, .. } => self.observe_epoch(epoch),
            ViewerEvent::Location(fix) => self.apply_fix(fix),
        }
    }

    pub fn observe_epoch(&mut self, epoch: Epoch) -> ViewerUpdate {
        match self.local_epoch {
            None => {
                self.local_epoch = Some(epoch);
                ViewerUpdate::EpochAdopted(epoch)
            }
            Some(local) if local == epoch => ViewerUpdate::Unchanged,
            Some(previous) => {
                self.hard_reset(epoch);
                ViewerUpdate::HardReset { previous, current: epoch }
            }
        }
    }

    /// Projects a fix onto the path. Delivering the same fix again changes nothing.
    pub fn apply_fix(&mut self, fix: LocationFix) -> ViewerUpdate {
        if self.fix.as_ref() == Some(&fix) {
            return ViewerUpdate::Unchanged;
        }

        let distance_km = self.path.project_distance(fix.coord());
        self.progress = split(&self.path, distance_km);
        self.fix = Some(fix);
        ViewerUpdate::Progressed(self.progress.clone())
    }

    fn hard_reset(&mut self, epoch: Epoch) {
        info!(epoch = %epoch, "🧹 Epoch changed, clearing local progress");
        self.local_epoch = Some(epoch);
        self.fix = None;
        self.progress = split(&self.path, 0.0);
    }
}
