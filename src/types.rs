use std::fmt;

use serde::Deserialize;

/// The two kinds of device notification the daemon subscribes to.
///
/// - `Arrival`: a matching device appeared (or was already present at
///   startup).
/// - `Removal`: a matching device went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Arrival,
    Removal,
}

impl EventKind {
    pub const ALL: [EventKind; 2] = [EventKind::Arrival, EventKind::Removal];

    /// Value exported to scripts in `HIDKITD_EVENT`.
    pub fn as_env_value(self) -> &'static str {
        match self {
            EventKind::Arrival => "connect",
            EventKind::Removal => "disconnect",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Arrival => f.write_str("arrival"),
            EventKind::Removal => f.write_str("removal"),
        }
    }
}

/// How the action runner treats a launched script.
///
/// - `Detached`: hand the process to its own task and return immediately,
///   so a slow script never delays later device events (default).
/// - `Wait`: wait for the script to exit before the next device is
///   processed. Script runtime adds directly to event latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScriptMode {
    #[default]
    Detached,
    Wait,
}
