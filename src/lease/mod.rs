//! Acquiring a DRM lease from a Wayland compositor.
//!
//! The compositor advertises lease-capable GPUs as `wp_drm_lease_device_v1` globals. Each device
//! then advertises the connectors a client may lease. [`negotiate`] picks one connector with a
//! [`ConnectorSelector`], submits a lease request for it and hands back the leased DRM fd.
//! [`Lease::acquire`] does the whole dance against the real compositor and queries the mode
//! resources of the leased card.

use std::fmt;
use std::io;
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};

use drm::control::{Device as _, ResourceHandles};
use wayrs_client::global::BindError;
use wayrs_client::ConnectError;

use crate::card::Card;

mod select;
pub mod wayland;

pub use select::{ConnectorSelector, Selection};
pub use wayland::WaylandLease;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to establish Wayland connection: {0}")]
    Connection(#[source] ConnectError),
    #[error("failed to bind wp_drm_lease_device_v1: {0}")]
    Bind(#[source] BindError),
    #[error("wayland io error: {0}")]
    Io(#[from] io::Error),
    #[error("no wp_drm_lease_device_v1 globals available")]
    NoDevice,
    #[error("failed to find any devices with a matching connector")]
    NoConnector,
    #[error("failed to acquire drm lease: {0}")]
    LeaseDenied(Denial),
    #[error("error acquiring DRM resources: {0}")]
    ResourceQuery(#[source] io::Error),
}

/// Why the compositor did not hand out a lease fd.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// The compositor sent `finished` instead of a fd.
    Finished,
    /// The round trip completed without any lease event.
    NoResponse,
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finished => f.write_str("fd -1, lease finished by the compositor"),
            Self::NoResponse => f.write_str("fd -1, no response from the compositor"),
        }
    }
}

/// A lease-capable GPU advertised by the compositor.
#[derive(Debug)]
pub struct LeaseDevice<D, C> {
    pub handle: D,
    /// In advertisement order.
    pub connectors: Vec<LeaseConnector<C>>,
}

impl<D, C> LeaseDevice<D, C> {
    pub fn new(handle: D) -> Self {
        Self {
            handle,
            connectors: Vec::new(),
        }
    }

    /// Connectors that were not withdrawn by the compositor.
    pub fn available_connectors(&self) -> impl Iterator<Item = (usize, &LeaseConnector<C>)> {
        self.connectors
            .iter()
            .enumerate()
            .filter(|(_, con)| !con.withdrawn)
    }
}

/// A leasable output. Everything except the handle is informational.
#[derive(Debug)]
pub struct LeaseConnector<C> {
    pub handle: C,
    pub name: Option<String>,
    pub description: Option<String>,
    pub connector_id: Option<u32>,
    pub withdrawn: bool,
}

impl<C> LeaseConnector<C> {
    pub fn new(handle: C) -> Self {
        Self {
            handle,
            name: None,
            description: None,
            connector_id: None,
            withdrawn: false,
        }
    }
}

impl<C> fmt::Display for LeaseConnector<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name.as_deref().unwrap_or("<unnamed>"))?;
        if let Some(id) = self.connector_id {
            write!(f, " (id {id})")?;
        }
        if let Some(desc) = &self.description {
            write!(f, " \"{desc}\"")?;
        }
        Ok(())
    }
}

/// Answer of the compositor to a submitted lease request.
#[derive(Debug)]
pub enum LeaseOutcome {
    Granted(OwnedFd),
    Denied(Denial),
}

/// The protocol side of the negotiation.
///
/// [`WaylandLease`] is the real implementation. Each method performs exactly one blocking round
/// trip with the compositor.
pub trait LeaseProtocol {
    type Device: Copy + Eq + fmt::Debug;
    type Connector: Copy + Eq + fmt::Debug;

    /// Wait until all bound devices have advertised their connectors.
    fn enumerate(&mut self) -> Result<&[LeaseDevice<Self::Device, Self::Connector>]>;

    /// Request a lease on `connector` and wait for the compositor's answer.
    fn submit(&mut self, device: Self::Device, connector: Self::Connector)
        -> Result<LeaseOutcome>;
}

/// Run the lease handshake and return the leased DRM fd.
pub fn negotiate<P, S>(proto: &mut P, selector: &S) -> Result<OwnedFd>
where
    P: LeaseProtocol,
    S: ConnectorSelector,
{
    let devices = proto.enumerate()?;
    if devices.is_empty() {
        log::error!("lease: no available wp_drm_lease_device_v1 globals");
        return Err(Error::NoDevice);
    }
    log::debug!("lease: {} lease device(s) advertised", devices.len());

    let Some((device, connector)) = selector.select(devices).and_then(|(d, c)| {
        let device = devices.get(d)?;
        Some((device.handle, device.connectors.get(c)?))
    }) else {
        log::error!("lease: failed to find any devices with connectors");
        return Err(Error::NoConnector);
    };
    log::info!("lease: requesting connector {connector}");
    let connector = connector.handle;

    match proto.submit(device, connector)? {
        LeaseOutcome::Granted(fd) => Ok(fd),
        LeaseOutcome::Denied(denial) => {
            log::error!("lease: failed to acquire drm lease: {denial}");
            Err(Error::LeaseDenied(denial))
        }
    }
}

/// A granted lease together with the mode resources of the leased card.
///
/// Dropping this struct revokes the lease and releases every protocol object the negotiation
/// bound.
pub struct Lease {
    card: Card,
    resources: ResourceHandles,
    wayland: WaylandLease,
}

impl Lease {
    /// Connect to the compositor and lease the connector picked by `selector`.
    pub fn acquire<S: ConnectorSelector>(selector: &S) -> Result<Self> {
        let mut wayland = WaylandLease::connect()?;
        let card = Card::from(negotiate(&mut wayland, selector)?);
        let resources = card.resource_handles().map_err(|e| {
            log::error!(
                "lease: error acquiring DRM resources (os error {})",
                e.raw_os_error().unwrap_or_default()
            );
            Error::ResourceQuery(e)
        })?;
        Ok(Self {
            card,
            resources,
            wayland,
        })
    }

    pub fn card(&self) -> &Card {
        &self.card
    }

    pub fn resources(&self) -> &ResourceHandles {
        &self.resources
    }

    /// The protocol connection, for watching the lease while it is held.
    pub fn wayland(&mut self) -> &mut WaylandLease {
        &mut self.wayland
    }
}

impl AsFd for Lease {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.card.as_fd()
    }
}
