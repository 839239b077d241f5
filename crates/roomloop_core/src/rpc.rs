//! RPC routing: turns an [`RpcFanout`] into a concrete delivery plan and keeps
//! the buffer of calls replayed to late joiners.

use crate::error::RpcError;
use crate::policy::RpcFanout;
use crate::types::{ActorNumber, ViewId};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A remote procedure call on a networked object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcCall {
    pub view: ViewId,
    pub method: String,
    pub sender: ActorNumber,
    pub fanout: RpcFanout,
    #[serde(default)]
    pub args: serde_json::Value,
}

impl RpcCall {
    pub fn new(view: ViewId, method: impl Into<String>, sender: ActorNumber, fanout: RpcFanout) -> Self {
        Self {
            view,
            method: method.into(),
            sender,
            fanout,
            args: serde_json::Value::Null,
        }
    }
}

/// Who receives the call over the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteTargets {
    /// Nobody; the call is local only
    None,
    /// Every other player in the room
    Others,
    /// One specific player
    Actor(ActorNumber),
    /// Everyone including the sender, in server order
    EveryoneViaServer,
}

/// Resolved delivery of one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcPlan {
    /// The sender runs the call right away, before anything is sent
    pub execute_now: bool,
    /// The sender runs the call when the server echoes it back
    pub execute_on_echo: bool,
    pub remote: RemoteTargets,
    /// The server keeps the call for players joining later
    pub buffered: bool,
}

/// Stateless resolver from fan-out policy to [`RpcPlan`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RpcRouter;

impl RpcRouter {
    /// Resolves `call` for a room whose master client is `master`.
    pub fn plan(call: &RpcCall, master: Option<ActorNumber>) -> Result<RpcPlan, RpcError> {
        let routing = call.fanout.routing();

        let plan = match call.fanout {
            RpcFanout::All | RpcFanout::AllBuffered => RpcPlan {
                execute_now: true,
                execute_on_echo: false,
                remote: RemoteTargets::Others,
                buffered: routing.buffered,
            },
            RpcFanout::Others | RpcFanout::OthersBuffered => RpcPlan {
                execute_now: false,
                execute_on_echo: false,
                remote: RemoteTargets::Others,
                buffered: routing.buffered,
            },
            RpcFanout::AllViaServer | RpcFanout::AllBufferedViaServer => RpcPlan {
                execute_now: false,
                execute_on_echo: true,
                remote: RemoteTargets::EveryoneViaServer,
                buffered: routing.buffered,
            },
            RpcFanout::MasterOnly => {
                let master = master.ok_or_else(|| RpcError::NoMasterClient {
                    method: call.method.clone(),
                })?;
                if master == call.sender {
                    // The master calling itself never touches the network
                    RpcPlan {
                        execute_now: true,
                        execute_on_echo: false,
                        remote: RemoteTargets::None,
                        buffered: false,
                    }
                } else {
                    RpcPlan {
                        execute_now: false,
                        execute_on_echo: false,
                        remote: RemoteTargets::Actor(master),
                        buffered: false,
                    }
                }
            }
        };

        debug!(
            "RPC {} on {} via {:?} -> {:?}",
            call.method, call.view, call.fanout, plan.remote
        );
        Ok(plan)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct BufferedRpc {
    sequence: u64,
    call: RpcCall,
}

/// Buffered calls kept for late joiners, in the order they were issued.
///
/// A sender's calls stay buffered until that sender leaves the room.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct RpcBuffer {
    entries: Vec<BufferedRpc>,
    next_sequence: u64,
}

impl RpcBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps `call` if its fan-out is buffered. Returns whether it was kept.
    pub fn record(&mut self, call: RpcCall) -> bool {
        if !call.fanout.is_buffered() {
            return false;
        }
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.entries.push(BufferedRpc { sequence, call });
        true
    }

    /// Calls a player joining now must receive, oldest first.
    pub fn replay_for(&self, joiner: ActorNumber) -> Vec<&RpcCall> {
        self.entries
            .iter()
            .filter(|entry| entry.call.sender != joiner)
            .map(|entry| &entry.call)
            .collect()
    }

    /// Drops every call buffered by `actor`. Returns how many were dropped.
    pub fn on_player_left(&mut self, actor: ActorNumber) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.call.sender != actor);
        before - self.entries.len()
    }

    /// Drops every call buffered for `view`, e.g. when it is destroyed.
    pub fn clear_view(&mut self, view: ViewId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.call.view != view);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCAL: ActorNumber = ActorNumber(1);
    const MASTER: ActorNumber = ActorNumber(2);

    fn call(fanout: RpcFanout) -> RpcCall {
        RpcCall::new(ViewId(1001), "Fire", LOCAL, fanout)
    }

    #[test]
    fn test_plans_agree_with_routing_triples() {
        for fanout in RpcFanout::ALL {
            let plan = RpcRouter::plan(&call(fanout), Some(MASTER)).unwrap();
            let routing = fanout.routing();
            assert_eq!(
                plan.execute_now || plan.execute_on_echo,
                routing.executes_locally,
                "{fanout:?}"
            );
            assert_eq!(plan.buffered, routing.buffered, "{fanout:?}");
            assert_eq!(
                plan.remote == RemoteTargets::EveryoneViaServer,
                routing.server_relayed,
                "{fanout:?}"
            );
        }
    }

    #[test]
    fn test_via_server_executes_on_echo_only() {
        let plan = RpcRouter::plan(&call(RpcFanout::AllViaServer), Some(MASTER)).unwrap();
        assert!(!plan.execute_now);
        assert!(plan.execute_on_echo);
    }

    #[test]
    fn test_master_only_routing() {
        let remote = RpcRouter::plan(&call(RpcFanout::MasterOnly), Some(MASTER)).unwrap();
        assert_eq!(remote.remote, RemoteTargets::Actor(MASTER));
        assert!(!remote.execute_now);

        let local = RpcRouter::plan(&call(RpcFanout::MasterOnly), Some(LOCAL)).unwrap();
        assert_eq!(local.remote, RemoteTargets::None);
        assert!(local.execute_now);

        let missing = RpcRouter::plan(&call(RpcFanout::MasterOnly), None);
        assert!(matches!(missing, Err(RpcError::NoMasterClient { .. })));
    }

    #[test]
    fn test_buffer_keeps_only_buffered_calls_in_order() {
        let mut buffer = RpcBuffer::new();
        assert!(!buffer.record(call(RpcFanout::All)));
        assert!(buffer.record(RpcCall::new(ViewId(1), "A", LOCAL, RpcFanout::AllBuffered)));
        assert!(buffer.record(RpcCall::new(ViewId(2), "B", MASTER, RpcFanout::OthersBuffered)));
        assert!(buffer.record(RpcCall::new(ViewId(1), "C", LOCAL, RpcFanout::AllBufferedViaServer)));

        let joiner = ActorNumber(9);
        let methods: Vec<&str> = buffer
            .replay_for(joiner)
            .iter()
            .map(|c| c.method.as_str())
            .collect();
        assert_eq!(methods, vec!["A", "B", "C"]);

        let for_master: Vec<&str> = buffer
            .replay_for(MASTER)
            .iter()
            .map(|c| c.method.as_str())
            .collect();
        assert_eq!(for_master, vec!["A", "C"]);
    }

    #[test]
    fn test_buffer_drops_calls_of_leaving_player_and_destroyed_view() {
        let mut buffer = RpcBuffer::new();
        buffer.record(RpcCall::new(ViewId(1), "A", LOCAL, RpcFanout::AllBuffered));
        buffer.record(RpcCall::new(ViewId(2), "B", MASTER, RpcFanout::AllBuffered));
        buffer.record(RpcCall::new(ViewId(2), "C", LOCAL, RpcFanout::AllBuffered));

        assert_eq!(buffer.on_player_left(LOCAL), 2);
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.clear_view(ViewId(2)), 1);
        assert!(buffer.is_empty());
    }
}
