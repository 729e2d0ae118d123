use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use dubbo_boot_core::Settings;

/// Where the RPC and management routers are bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerPlan {
    /// Management shares the main port; both routers run on one listener.
    Shared(SocketAddr),
    Split {
        server: SocketAddr,
        management: SocketAddr,
    },
}

/// The management address only applies on a port of its own. On the main
/// port it is ignored and the routers are merged.
pub fn plan_listeners(settings: &Settings) -> ListenerPlan {
    let host = settings
        .server
        .address
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    let server = SocketAddr::new(host, settings.server.port);

    let management_port = settings.management.effective_port(&settings.server);
    if management_port == settings.server.port {
        return ListenerPlan::Shared(server);
    }

    ListenerPlan::Split {
        server,
        management: SocketAddr::new(
            settings.management.address.unwrap_or(host),
            management_port,
        ),
    }
}
