//! mDNS browser for Cast renderers.
//!
//! Browses `_googlecast._tcp.local.` continuously and turns resolve/remove
//! events into [`DiscoveryListener`] callbacks.
//!
//! # Key Design Points
//!
//! - Friendly name comes from TXT `fn`, falling back to the instance label
//! - The browser remembers full name → info, since a removal event only
//!   carries the full name
//! - A bad record is logged and skipped; the loop ends only on cancellation
//!   or when the daemon closes the channel

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use mdns_sd::{ResolvedService, ScopedIp, ServiceDaemon, ServiceEvent};
use tokio_util::sync::CancellationToken;

use super::listener::DiscoveryListener;
use super::DiscoveryError;
use crate::device::DeviceInfo;
use crate::protocol_constants::{
    CAST_SERVICE_TYPE, DEFAULT_CAST_PORT, TXT_DEVICE_ID, TXT_FRIENDLY_NAME, TXT_MODEL,
};

/// Fields of a resolved Cast advertisement, decoupled from `mdns-sd` types.
#[derive(Debug, Clone, Default)]
struct CastAdvert<'a> {
    fullname: &'a str,
    friendly_name: Option<&'a str>,
    id: Option<&'a str>,
    model: Option<&'a str>,
    address: Option<IpAddr>,
    port: u16,
}

/// Turns a resolved `_googlecast._tcp` service into [`DeviceInfo`].
///
/// Returns `None` when the service has no usable address.
pub fn parse_cast_service(service: &ResolvedService) -> Option<DeviceInfo> {
    // Prefer IPv4; fall back to whatever the daemon resolved.
    let address = service
        .addresses
        .iter()
        .find_map(|addr| match addr {
            ScopedIp::V4(v4) => Some(IpAddr::V4(*v4.addr())),
            _ => None,
        })
        .or_else(|| service.addresses.iter().next().map(|a| a.to_ip_addr()));

    device_info_from_advert(&CastAdvert {
        fullname: &service.fullname,
        friendly_name: service.get_property_val_str(TXT_FRIENDLY_NAME),
        id: service.get_property_val_str(TXT_DEVICE_ID),
        model: service.get_property_val_str(TXT_MODEL),
        address,
        port: service.port,
    })
}

fn device_info_from_advert(advert: &CastAdvert<'_>) -> Option<DeviceInfo> {
    let address = advert.address?;
    let non_empty = |value: Option<&str>| {
        value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(ToString::to_string)
    };

    let friendly_name = non_empty(advert.friendly_name)
        .unwrap_or_else(|| instance_label(advert.fullname));
    if friendly_name.is_empty() {
        return None;
    }

    Some(DeviceInfo {
        id: non_empty(advert.id).unwrap_or_else(|| advert.fullname.to_string()),
        friendly_name,
        host: address.to_string(),
        port: if advert.port == 0 {
            DEFAULT_CAST_PORT
        } else {
            advert.port
        },
        model: non_empty(advert.model),
    })
}

/// Extracts the instance label from a DNS-SD full name.
///
/// `Kitchen-speaker._googlecast._tcp.local.` → `Kitchen-speaker`
fn instance_label(fullname: &str) -> String {
    let trimmed = fullname.trim();
    trimmed
        .strip_suffix(CAST_SERVICE_TYPE)
        .map(|label| label.trim_end_matches('.'))
        .filter(|label| !label.is_empty())
        .unwrap_or_else(|| trimmed.split('.').next().unwrap_or(trimmed))
        .to_string()
}

/// Services seen so far, keyed by DNS-SD full name.
#[derive(Default)]
struct KnownServices {
    by_fullname: HashMap<String, DeviceInfo>,
}

impl KnownServices {
    fn resolved(&mut self, fullname: &str, info: DeviceInfo, listener: &dyn DiscoveryListener) {
        match self.by_fullname.insert(fullname.to_string(), info.clone()) {
            None => listener.on_device_added(&info.id, &info),
            Some(previous) => {
                // A rename leaves the old friendly name behind otherwise.
                if previous.friendly_name != info.friendly_name {
                    listener.on_device_removed(&previous.id, &previous);
                }
                listener.on_device_updated(&info.id, &info);
            }
        }
    }

    fn removed(&mut self, fullname: &str, listener: &dyn DiscoveryListener) {
        match self.by_fullname.remove(fullname) {
            Some(info) => listener.on_device_removed(&info.id, &info),
            None => log::debug!("[mDNS] Removal for unknown service {}", fullname),
        }
    }
}

/// Long-running browser bound to one mDNS daemon.
pub struct MdnsBrowser {
    daemon: ServiceDaemon,
    service_type: String,
    listener: Arc<dyn DiscoveryListener>,
}

impl MdnsBrowser {
    /// Creates the mDNS daemon. Browsing starts with [`run`](Self::run).
    pub fn new(
        service_type: impl Into<String>,
        listener: Arc<dyn DiscoveryListener>,
    ) -> Result<Self, DiscoveryError> {
        let daemon = ServiceDaemon::new().map_err(|e| DiscoveryError::MdnsDaemon(e.to_string()))?;
        Ok(Self {
            daemon,
            service_type: service_type.into(),
            listener,
        })
    }

    /// Browses until `cancel` fires or the daemon closes the event channel.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), DiscoveryError> {
        let receiver = self
            .daemon
            .browse(&self.service_type)
            .map_err(|e| DiscoveryError::Browse(e.to_string()))?;
        log::info!("[mDNS] Browsing for {}", self.service_type);

        let mut known = KnownServices::default();
        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                event = receiver.recv_async() => event,
            };

            match event {
                Ok(ServiceEvent::ServiceResolved(service)) => {
                    log::trace!("[mDNS] Service resolved: {}", service.fullname);
                    match parse_cast_service(&service) {
                        Some(info) => known.resolved(&service.fullname, info, self.listener.as_ref()),
                        None => log::warn!(
                            "[mDNS] Skipping unusable record for {}",
                            service.fullname
                        ),
                    }
                }
                Ok(ServiceEvent::ServiceRemoved(_, fullname)) => {
                    log::trace!("[mDNS] Service removed: {}", fullname);
                    known.removed(&fullname, self.listener.as_ref());
                }
                Ok(_) => {}
                Err(e) => {
                    log::warn!("[mDNS] Event channel closed: {}", e);
                    break;
                }
            }
        }

        log::debug!("[mDNS] Browse loop for {} ended", self.service_type);
        Ok(())
    }

    /// Stops browsing and shuts the daemon down. Errors are logged only.
    pub fn shutdown(&self) {
        if let Err(e) = self.daemon.stop_browse(&self.service_type) {
            log::debug!("[mDNS] Failed to stop browse: {:?}", e);
        }
        if let Err(e) = self.daemon.shutdown() {
            log::warn!("[mDNS] Failed to shut down daemon: {:?}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use parking_lot::Mutex;

    use super::*;

    const KITCHEN_FULLNAME: &str = "Google-Home-Mini-1a2b._googlecast._tcp.local.";

    fn advert<'a>() -> CastAdvert<'a> {
        CastAdvert {
            fullname: KITCHEN_FULLNAME,
            friendly_name: Some("Kitchen"),
            id: Some("1a2b3c"),
            model: Some("Google Home Mini"),
            address: Some(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20))),
            port: 8009,
        }
    }

    #[derive(Default)]
    struct RecordingListener {
        events: Mutex<Vec<String>>,
    }

    impl DiscoveryListener for RecordingListener {
        fn on_device_added(&self, id: &str, info: &DeviceInfo) {
            self.events.lock().push(format!("added {} {}", id, info.friendly_name));
        }

        fn on_device_updated(&self, id: &str, info: &DeviceInfo) {
            self.events.lock().push(format!("updated {} {}", id, info.friendly_name));
        }

        fn on_device_removed(&self, id: &str, info: &DeviceInfo) {
            self.events.lock().push(format!("removed {} {}", id, info.friendly_name));
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Parsing
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn parses_txt_fields() {
        let info = device_info_from_advert(&advert()).unwrap();
        assert_eq!(info.friendly_name, "Kitchen");
        assert_eq!(info.id, "1a2b3c");
        assert_eq!(info.host, "192.168.1.20");
        assert_eq!(info.port, 8009);
        assert_eq!(info.model.as_deref(), Some("Google Home Mini"));
    }

    #[test]
    fn friendly_name_falls_back_to_instance_label() {
        let info = device_info_from_advert(&CastAdvert {
            friendly_name: Some("   "),
            ..advert()
        })
        .unwrap();
        assert_eq!(info.friendly_name, "Google-Home-Mini-1a2b");
    }

    #[test]
    fn id_falls_back_to_fullname() {
        let info = device_info_from_advert(&CastAdvert {
            id: None,
            ..advert()
        })
        .unwrap();
        assert_eq!(info.id, KITCHEN_FULLNAME);
    }

    #[test]
    fn zero_port_uses_cast_default() {
        let info = device_info_from_advert(&CastAdvert { port: 0, ..advert() }).unwrap();
        assert_eq!(info.port, DEFAULT_CAST_PORT);
    }

    #[test]
    fn missing_address_is_rejected() {
        assert!(device_info_from_advert(&CastAdvert {
            address: None,
            ..advert()
        })
        .is_none());
    }

    #[test]
    fn instance_label_handles_foreign_suffix() {
        assert_eq!(instance_label("Speaker._other._tcp.local."), "Speaker");
        assert_eq!(instance_label(KITCHEN_FULLNAME), "Google-Home-Mini-1a2b");
    }

    // ─────────────────────────────────────────────────────────────────────
    // Event bookkeeping
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn first_resolve_adds_then_updates() {
        let listener = RecordingListener::default();
        let mut known = KnownServices::default();
        let info = device_info_from_advert(&advert()).unwrap();

        known.resolved(KITCHEN_FULLNAME, info.clone(), &listener);
        known.resolved(KITCHEN_FULLNAME, info, &listener);

        assert_eq!(
            *listener.events.lock(),
            vec!["added 1a2b3c Kitchen", "updated 1a2b3c Kitchen"]
        );
    }

    #[test]
    fn removal_uses_remembered_info() {
        let listener = RecordingListener::default();
        let mut known = KnownServices::default();
        known.resolved(
            KITCHEN_FULLNAME,
            device_info_from_advert(&advert()).unwrap(),
            &listener,
        );

        known.removed(KITCHEN_FULLNAME, &listener);
        known.removed(KITCHEN_FULLNAME, &listener);

        assert_eq!(
            *listener.events.lock(),
            vec!["added 1a2b3c Kitchen", "removed 1a2b3c Kitchen"]
        );
    }

    #[test]
    fn rename_removes_old_name() {
        let listener = RecordingListener::default();
        let mut known = KnownServices::default();
        known.resolved(
            KITCHEN_FULLNAME,
            device_info_from_advert(&advert()).unwrap(),
            &listener,
        );
        let renamed = device_info_from_advert(&CastAdvert {
            friendly_name: Some("Pantry"),
            ..advert()
        })
        .unwrap();

        known.resolved(KITCHEN_FULLNAME, renamed, &listener);

        assert_eq!(
            *listener.events.lock(),
            vec![
                "added 1a2b3c Kitchen",
                "removed 1a2b3c Kitchen",
                "updated 1a2b3c Pantry"
            ]
        );
    }
}
