//! Policy enumerations consumed by the connection, RPC, replication and
//! ownership layers.
//!
//! These are plain configuration values. Interpretation happens by matching
//! over the closed set of variants in the module that consumes them
//! ([`crate::rpc`], [`crate::ownership`], the driver's state sync pass).
//! Peers must agree on the semantics of every variant, so the mapping tables
//! below are part of the wire contract.

use serde::{Deserialize, Serialize};

/// How the peer resolves which server to contact when connecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStrategy {
    /// Connect to the master server of a fixed, configured region
    ToMaster,
    /// Connect to an explicitly named region
    ToRegion,
    /// Ping all regions and connect to the one with the lowest round trip
    ToBest,
}

impl ConnectionStrategy {
    /// Whether this strategy has to ping regions before connecting.
    pub fn pings_regions(self) -> bool {
        matches!(self, ConnectionStrategy::ToBest)
    }
}

/// Verbosity of the networking layer's own logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkLogLevel {
    /// Only errors. Some of them are expected at runtime (e.g. failed joins).
    #[default]
    ErrorsOnly,
    /// Workflow, calls and results.
    Informational,
    /// Everything. Debugging only.
    Full,
}

impl NetworkLogLevel {
    /// The `tracing` level name this verbosity maps to.
    pub fn as_tracing_level(self) -> &'static str {
        match self {
            NetworkLogLevel::ErrorsOnly => "error",
            NetworkLogLevel::Informational => "info",
            NetworkLogLevel::Full => "trace",
        }
    }

    /// Filter directive scoping the level to this crate's log target.
    pub fn filter_directive(self) -> String {
        format!("roomloop_core={}", self.as_tracing_level())
    }
}

/// Target selection for remote procedure calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RpcFanout {
    /// Everyone else; the caller executes immediately. Not buffered.
    All,
    /// Everyone else; the caller does not execute. Not buffered.
    Others,
    /// The master client only. The call is lost if the master leaves first.
    MasterOnly,
    /// Like `All`, and replayed to players joining later.
    AllBuffered,
    /// Like `Others`, and replayed to players joining later.
    OthersBuffered,
    /// Everyone including the caller, relayed by the server so every client
    /// sees calls in the same order. The caller executes on the echo.
    AllViaServer,
    /// Like `AllViaServer`, and replayed to players joining later.
    AllBufferedViaServer,
}

/// The (executes-locally, buffered, server-relayed) triple of an [`RpcFanout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcRouting {
    pub executes_locally: bool,
    pub buffered: bool,
    pub server_relayed: bool,
}

impl RpcRouting {
    const fn new(executes_locally: bool, buffered: bool, server_relayed: bool) -> Self {
        Self {
            executes_locally,
            buffered,
            server_relayed,
        }
    }

    /// Tuple form, handy for table comparisons.
    pub fn as_tuple(self) -> (bool, bool, bool) {
        (self.executes_locally, self.buffered, self.server_relayed)
    }
}

impl RpcFanout {
    pub const ALL: [RpcFanout; 7] = [
        RpcFanout::All,
        RpcFanout::Others,
        RpcFanout::MasterOnly,
        RpcFanout::AllBuffered,
        RpcFanout::OthersBuffered,
        RpcFanout::AllViaServer,
        RpcFanout::AllBufferedViaServer,
    ];

    /// Routing triple for this target.
    pub const fn routing(self) -> RpcRouting {
        match self {
            RpcFanout::All => RpcRouting::new(true, false, false),
            RpcFanout::Others => RpcRouting::new(false, false, false),
            RpcFanout::MasterOnly => RpcRouting::new(false, false, false),
            RpcFanout::AllBuffered => RpcRouting::new(true, true, false),
            RpcFanout::OthersBuffered => RpcRouting::new(false, true, false),
            RpcFanout::AllViaServer => RpcRouting::new(true, false, true),
            RpcFanout::AllBufferedViaServer => RpcRouting::new(true, true, true),
        }
    }

    pub fn is_buffered(self) -> bool {
        self.routing().buffered
    }

    pub fn is_server_relayed(self) -> bool {
        self.routing().server_relayed
    }
}

/// Whether and how control of a networked object can change hands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnershipPolicy {
    /// Ownership never changes. Instantiated objects stay with their creator,
    /// scene objects stay with the master client.
    #[default]
    Fixed,
    /// Anyone can take ownership; the current owner cannot object.
    Takeover,
    /// Ownership can be requested; the current owner has to agree.
    Request,
}

impl OwnershipPolicy {
    /// Whether a transfer under this policy needs the current owner's consent.
    pub fn requires_consent(self) -> bool {
        matches!(self, OwnershipPolicy::Request)
    }

    /// Whether any transfer is possible at all.
    pub fn allows_transfer(self) -> bool {
        !matches!(self, OwnershipPolicy::Fixed)
    }
}

/// Per-object state replication mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// The object is not synchronized.
    Off,
    /// Reliable channel; only changed values are sent.
    #[default]
    ReliableDeltaCompressed,
    /// Unreliable channel; full state every pass.
    Unreliable,
    /// Unreliable channel; state is only sent when it changed.
    UnreliableOnChange,
}

impl SyncMode {
    pub fn is_enabled(self) -> bool {
        !matches!(self, SyncMode::Off)
    }

    pub fn is_reliable(self) -> bool {
        matches!(self, SyncMode::ReliableDeltaCompressed)
    }

    pub fn uses_delta_compression(self) -> bool {
        matches!(self, SyncMode::ReliableDeltaCompressed)
    }

    /// Whether an unchanged object is skipped in a sync pass.
    pub fn sends_only_on_change(self) -> bool {
        matches!(
            self,
            SyncMode::ReliableDeltaCompressed | SyncMode::UnreliableOnChange
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_fanout_routing_table() {
        let expected = [
            (RpcFanout::All, (true, false, false)),
            (RpcFanout::Others, (false, false, false)),
            (RpcFanout::MasterOnly, (false, false, false)),
            (RpcFanout::AllBuffered, (true, true, false)),
            (RpcFanout::OthersBuffered, (false, true, false)),
            (RpcFanout::AllViaServer, (true, false, true)),
            (RpcFanout::AllBufferedViaServer, (true, true, true)),
        ];

        for (fanout, triple) in expected {
            assert_eq!(fanout.routing().as_tuple(), triple, "{fanout:?}");
        }
        assert_eq!(RpcFanout::ALL.len(), expected.len());
    }

    #[test]
    fn test_ownership_policy_consent_matrix() {
        assert!(!OwnershipPolicy::Fixed.allows_transfer());
        assert!(OwnershipPolicy::Takeover.allows_transfer());
        assert!(!OwnershipPolicy::Takeover.requires_consent());
        assert!(OwnershipPolicy::Request.allows_transfer());
        assert!(OwnershipPolicy::Request.requires_consent());
    }

    #[test]
    fn test_sync_mode_properties() {
        assert!(!SyncMode::Off.is_enabled());
        assert!(SyncMode::ReliableDeltaCompressed.is_reliable());
        assert!(SyncMode::ReliableDeltaCompressed.uses_delta_compression());
        assert!(!SyncMode::Unreliable.is_reliable());
        assert!(!SyncMode::Unreliable.sends_only_on_change());
        assert!(SyncMode::UnreliableOnChange.sends_only_on_change());
    }

    #[test]
    fn test_policy_serde_names() {
        let strategy: ConnectionStrategy = serde_json::from_str("\"to_best\"").unwrap();
        assert_eq!(strategy, ConnectionStrategy::ToBest);
        assert!(strategy.pings_regions());

        let fanout = serde_json::to_string(&RpcFanout::AllBufferedViaServer).unwrap();
        assert_eq!(fanout, "\"all_buffered_via_server\"");
    }

    #[test]
    fn test_network_log_level_directive() {
        assert_eq!(NetworkLogLevel::default(), NetworkLogLevel::ErrorsOnly);
        assert_eq!(
            NetworkLogLevel::Informational.filter_directive(),
            "roomloop_core=info"
        );
        assert_eq!(NetworkLogLevel::Full.as_tracing_level(), "trace");
    }
}
