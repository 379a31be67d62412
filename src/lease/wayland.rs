use std::io;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};

use wayrs_client::global::GlobalExt;
use wayrs_client::protocol::wl_registry::GlobalArgs;
use wayrs_client::{Connection, EventCtx, IoMode};
use wayrs_protocols::drm_lease_v1::*;

use super::*;

type AdvertisedDevice = LeaseDevice<WpDrmLeaseDeviceV1, WpDrmLeaseConnectorV1>;

/// `wp_drm_lease_v1` client.
///
/// Owns the compositor connection and every object bound on it. Dropping it destroys the lease
/// (if one was submitted) and releases all devices and connectors. A device the compositor has
/// released is forgotten together with its connectors as soon as the event is dispatched.
pub struct WaylandLease {
    conn: Connection<State>,
    state: State,
}

#[derive(Default)]
struct State {
    devices: Vec<AdvertisedDevice>,
    session: Session,
}

#[derive(Default)]
struct Session {
    device: Option<WpDrmLeaseDeviceV1>,
    connector: Option<WpDrmLeaseConnectorV1>,
    lease: Option<WpDrmLeaseV1>,
    fd: Option<OwnedFd>,
    finished: bool,
}

impl WaylandLease {
    /// Connect to the compositor and bind all advertised lease devices.
    pub fn connect() -> Result<Self> {
        let mut conn = Connection::<State>::connect().map_err(Error::Connection)?;
        conn.blocking_roundtrip()?;

        let globals: Vec<GlobalArgs> = conn
            .globals()
            .iter()
            .filter(|g| g.is::<WpDrmLeaseDeviceV1>())
            .cloned()
            .collect();

        let mut state = State::default();
        for global in &globals {
            let wl = global
                .bind_with_cb(&mut conn, 1, wp_drm_lease_device_cb)
                .map_err(Error::Bind)?;
            state.devices.push(LeaseDevice::new(wl));
        }
        conn.dispatch_events(&mut state);
        log::debug!("lease: bound {} lease device(s)", state.devices.len());

        Ok(Self { conn, state })
    }

    /// Whether the compositor has revoked the lease.
    pub fn finished(&self) -> bool {
        self.state.session.finished
    }

    /// Process whatever the compositor has sent, without blocking.
    pub fn poll(&mut self) -> io::Result<()> {
        match self.conn.recv_events(IoMode::NonBlocking) {
            Ok(()) => (),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
            Err(e) => return Err(e),
        }
        self.conn.dispatch_events(&mut self.state);
        self.conn.flush(IoMode::Blocking)
    }

    fn roundtrip(&mut self) -> io::Result<()> {
        self.conn.blocking_roundtrip()?;
        self.conn.dispatch_events(&mut self.state);
        Ok(())
    }
}

impl AsRawFd for WaylandLease {
    fn as_raw_fd(&self) -> RawFd {
        self.conn.as_raw_fd()
    }
}

impl LeaseProtocol for WaylandLease {
    type Device = WpDrmLeaseDeviceV1;
    type Connector = WpDrmLeaseConnectorV1;

    fn enumerate(&mut self) -> Result<&[AdvertisedDevice]> {
        self.roundtrip()?;
        Ok(&self.state.devices)
    }

    fn submit(
        &mut self,
        device: WpDrmLeaseDeviceV1,
        connector: WpDrmLeaseConnectorV1,
    ) -> Result<LeaseOutcome> {
        let request = device.create_lease_request(&mut self.conn);
        request.request_connector(&mut self.conn, connector);
        let lease = request.submit_with_cb(&mut self.conn, wp_drm_lease_cb);
        self.state.session = Session {
            device: Some(device),
            connector: Some(connector),
            lease: Some(lease),
            ..Session::default()
        };

        self.roundtrip()?;

        let session = &mut self.state.session;
        Ok(match session.fd.take() {
            Some(fd) => LeaseOutcome::Granted(fd),
            None if session.finished => LeaseOutcome::Denied(Denial::Finished),
            None => LeaseOutcome::Denied(Denial::NoResponse),
        })
    }
}

impl Drop for WaylandLease {
    fn drop(&mut self) {
        if let Some(lease) = self.state.session.lease.take() {
            lease.destroy(&mut self.conn);
        }
        for device in self.state.devices.drain(..) {
            for con in device.connectors {
                con.handle.destroy(&mut self.conn);
            }
            device.handle.release(&mut self.conn);
        }
        if let Err(e) = self.conn.flush(IoMode::Blocking) {
            log::warn!("lease: failed to release protocol objects: {e}");
        }
    }
}

fn wp_drm_lease_device_cb(ctx: EventCtx<State, WpDrmLeaseDeviceV1>) {
    use wp_drm_lease_device_v1::Event;
    match ctx.event {
        // Only the fd delivered with the lease is used.
        Event::DrmFd(fd) => drop(fd),
        Event::Connector(wl) => {
            let Some(device) = ctx
                .state
                .devices
                .iter_mut()
                .find(|d| d.handle == ctx.proxy)
            else {
                log::warn!("lease: connector event for unknown device {:?}", ctx.proxy);
                return;
            };
            device.connectors.push(LeaseConnector::new(wl));
            ctx.conn.set_callback_for(wl, wp_drm_lease_connector_cb);
        }
        Event::Done => (),
        // Destructor: the proxy is dead once this callback returns.
        Event::Released => {
            let Some(i) = ctx.state.devices.iter().position(|d| d.handle == ctx.proxy) else {
                return;
            };
            let device = ctx.state.devices.remove(i);
            log::info!(
                "lease: device {:?} released by the compositor, dropping {} connector(s)",
                ctx.proxy,
                device.connectors.len()
            );
            for con in device.connectors {
                con.handle.destroy(ctx.conn);
            }
        }
        _ => (),
    }
}

fn wp_drm_lease_connector_cb(ctx: EventCtx<State, WpDrmLeaseConnectorV1>) {
    let Some(con) = ctx
        .state
        .devices
        .iter_mut()
        .flat_map(|d| d.connectors.iter_mut())
        .find(|c| c.handle == ctx.proxy)
    else {
        return;
    };

    use wp_drm_lease_connector_v1::Event;
    match ctx.event {
        Event::Name(name) => con.name = Some(name.to_string_lossy().into_owned()),
        Event::Description(desc) => con.description = Some(desc.to_string_lossy().into_owned()),
        Event::ConnectorId(id) => con.connector_id = Some(id),
        Event::Done => log::debug!("lease: connector {con} advertised"),
        Event::Withdrawn => {
            log::info!("lease: connector {con} withdrawn");
            con.withdrawn = true;
        }
        _ => (),
    }
}

fn wp_drm_lease_cb(ctx: EventCtx<State, WpDrmLeaseV1>) {
    use wp_drm_lease_v1::Event;
    match ctx.event {
        Event::LeaseFd(fd) => ctx.state.session.fd = Some(fd),
        Event::Finished => {
            let session = &mut ctx.state.session;
            if let (Some(device), Some(connector)) = (session.device, session.connector) {
                log::info!("lease: lease of {connector:?} on {device:?} finished");
            }
            session.finished = true;
        }
        _ => (),
    }
}
