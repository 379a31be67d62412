use std::io;
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};

use drm::control::{connector, Device as _, ResourceHandles};

/// A DRM card opened through a lease fd.
pub struct Card(OwnedFd);

impl From<OwnedFd> for Card {
    fn from(fd: OwnedFd) -> Self {
        Self(fd)
    }
}

impl AsFd for Card {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.0.as_fd()
    }
}

impl drm::Device for Card {}
impl drm::control::Device for Card {}

impl Card {
    /// Connectors of `res` that are visible through this card, with their current state.
    pub fn connectors(&self, res: &ResourceHandles) -> io::Result<Vec<connector::Info>> {
        res.connectors()
            .iter()
            .map(|&con| self.get_connector(con, false))
            .collect()
    }
}
