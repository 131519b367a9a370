//! Fixed protocol constants that should NOT be changed.
//!
//! These values are defined by external specifications (Cast v2, DNS-SD) or
//! by the URL contract between this server and the renderers it drives.

// ─────────────────────────────────────────────────────────────────────────────
// Application Identity
// ─────────────────────────────────────────────────────────────────────────────

/// Service identifier reported by the health endpoint.
pub const SERVICE_ID: &str = "castloop";

// ─────────────────────────────────────────────────────────────────────────────
// Discovery (DNS-SD)
// ─────────────────────────────────────────────────────────────────────────────

/// Cast renderer mDNS service type (note: trailing dot is required by mdns-sd).
pub const CAST_SERVICE_TYPE: &str = "_googlecast._tcp.local.";

/// TXT record key carrying the renderer's friendly name.
pub const TXT_FRIENDLY_NAME: &str = "fn";

/// TXT record key carrying the renderer's stable device id.
pub const TXT_DEVICE_ID: &str = "id";

/// TXT record key carrying the renderer's model name.
pub const TXT_MODEL: &str = "md";

// ─────────────────────────────────────────────────────────────────────────────
// Cast v2 Protocol
// ─────────────────────────────────────────────────────────────────────────────

/// Default Cast v2 control port.
pub const DEFAULT_CAST_PORT: u16 = 8009;

/// Platform receiver destination every connection starts with.
pub const CAST_RECEIVER_DESTINATION: &str = "receiver-0";

// ─────────────────────────────────────────────────────────────────────────────
// Media Endpoint
// ─────────────────────────────────────────────────────────────────────────────

/// Path of the looped media resource served to renderers.
pub const STREAM_PATH: &str = "/stream";

/// MIME type announced when loading the looped media.
pub const DEFAULT_CONTENT_TYPE: &str = "audio/aac";

/// Address used to ask the OS for the outbound-facing source IP.
///
/// The UDP socket is connected but never written to, so the target does not
/// need to be reachable.
pub const IP_PROBE_TARGET: (&str, u16) = ("10.255.255.255", 1);

// ─────────────────────────────────────────────────────────────────────────────
// Session Timing
// ─────────────────────────────────────────────────────────────────────────────

/// Interval between watchdog status polls (milliseconds).
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Pause after the renderer reports active, before polling starts (milliseconds).
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 2000;

/// Pause after quitting the renderer's current app (milliseconds).
pub const DEFAULT_QUIT_SETTLE_MS: u64 = 1000;

/// Upper bound on waiting for a renderer to report active (milliseconds).
pub const DEFAULT_ACTIVATION_TIMEOUT_MS: u64 = 30_000;

/// Upper bound on waiting for a renderer to accept commands (milliseconds).
pub const DEFAULT_READY_TIMEOUT_MS: u64 = 10_000;

/// Volume applied when a play request does not specify one (0.0 - 1.0).
pub const DEFAULT_VOLUME: f32 = 0.1;
