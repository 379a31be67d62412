use super::LeaseDevice;

/// Picks the connector to lease.
pub trait ConnectorSelector {
    /// Returns `(device index, connector index)`, or `None` if nothing is suitable.
    fn select<D, C>(&self, devices: &[LeaseDevice<D, C>]) -> Option<(usize, usize)>;
}

/// Built-in selection policies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    /// The first device (in discovery order) that has a connector, and its first connector.
    #[default]
    First,
    /// The first connector advertised under this name, e.g. `DP-2`.
    Named(String),
}

impl ConnectorSelector for Selection {
    fn select<D, C>(&self, devices: &[LeaseDevice<D, C>]) -> Option<(usize, usize)> {
        devices.iter().enumerate().find_map(|(d, device)| {
            let mut cons = device.available_connectors();
            let c = match self {
                Self::First => cons.next()?.0,
                Self::Named(name) => {
                    cons.find(|(_, con)| con.name.as_deref() == Some(name.as_str()))?
                        .0
                }
            };
            Some((d, c))
        })
    }
}
