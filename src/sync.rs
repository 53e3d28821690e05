//! Ordering between the compute writes and the draw that reads them.
//!
//! Each frame the simulation stage opens a new write epoch and gets a
//! [`PendingWrites`] token. The only way to turn it into the
//! [`VisibleWrites`] the renderer needs is [`FrameFence::barrier`], so a draw
//! cannot be recorded against writes that were never fenced. The renderer
//! then checks that the token belongs to the latest epoch, which rules out
//! drawing last frame's data after a new dispatch has been recorded.
//!
//! On the GPU side the barrier is the end of the compute pass: compute and
//! render passes share one command encoder, and wgpu inserts the
//! storage-to-vertex dependency between them.

use crate::error::SyncError;

/// Writes recorded by a dispatch that no draw may read yet.
#[derive(Debug)]
#[must_use = "compute writes must pass through FrameFence::barrier before a draw"]
pub struct PendingWrites {
    epoch: u64,
}

impl PendingWrites {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// Writes that have passed the barrier and may be read by a draw.
#[derive(Debug)]
pub struct VisibleWrites {
    epoch: u64,
}

impl VisibleWrites {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// Frame-level fence counter.
#[derive(Debug, Default)]
pub struct FrameFence {
    latest: u64,
    drawn: u64,
}

impl FrameFence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the next write epoch.
    pub fn begin_writes(&mut self) -> PendingWrites {
        self.latest += 1;
        PendingWrites { epoch: self.latest }
    }

    /// Make `writes` visible to subsequent reads.
    pub fn barrier(&self, writes: PendingWrites) -> VisibleWrites {
        VisibleWrites {
            epoch: writes.epoch,
        }
    }

    /// Start a draw over `writes`. Fails unless they are the latest epoch.
    pub fn begin_reads(&mut self, writes: &VisibleWrites) -> Result<u64, SyncError> {
        if writes.epoch != self.latest {
            return Err(SyncError::Stale {
                observed: writes.epoch,
                latest: self.latest,
            });
        }
        self.drawn = writes.epoch;
        Ok(writes.epoch)
    }

    /// Epoch of the most recent dispatch.
    pub fn latest(&self) -> u64 {
        self.latest
    }

    /// Epoch observed by the most recent draw, zero before the first.
    pub fn last_drawn(&self) -> u64 {
        self.drawn
    }
}
