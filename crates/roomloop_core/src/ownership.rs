//! Ownership arbitration for networked objects.
//!
//! Only the owner of an object authors its replicated state. Who may change
//! the owner is decided by the object's [`OwnershipPolicy`]:
//!
//! - `Fixed`: nobody. Instantiated objects stay with their creator, scene
//!   objects (no explicit owner) stay with whoever is master client.
//! - `Takeover`: anyone, immediately.
//! - `Request`: the request is parked until the current owner answers it.

use crate::error::OwnershipError;
use crate::policy::{OwnershipPolicy, SyncMode};
use crate::types::{ActorNumber, ViewId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// A replicated object as far as ownership is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkedObject {
    pub view: ViewId,
    /// Player that instantiated the object; `None` for scene objects
    pub creator: Option<ActorNumber>,
    /// Explicit owner; `None` means the master client controls it
    pub owner: Option<ActorNumber>,
    pub policy: OwnershipPolicy,
    pub sync: SyncMode,
}

impl NetworkedObject {
    /// An object instantiated (and owned) by `creator`.
    pub fn instantiated(view: ViewId, creator: ActorNumber, policy: OwnershipPolicy) -> Self {
        Self {
            view,
            creator: Some(creator),
            owner: Some(creator),
            policy,
            sync: SyncMode::default(),
        }
    }

    /// An object that is part of the scene and belongs to the master client.
    pub fn scene(view: ViewId, policy: OwnershipPolicy) -> Self {
        Self {
            view,
            creator: None,
            owner: None,
            policy,
            sync: SyncMode::default(),
        }
    }

    /// Player currently in control, resolving scene objects to `master`.
    pub fn effective_owner(&self, master: Option<ActorNumber>) -> Option<ActorNumber> {
        self.owner.or(master)
    }
}

/// Why a request did not transfer ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// The object's policy is `Fixed`
    FixedOwnership,
    /// The owner declined the request
    Denied,
}

/// Result of a request or of the owner's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OwnershipOutcome {
    Transferred {
        view: ViewId,
        from: Option<ActorNumber>,
        to: ActorNumber,
    },
    /// Waiting for `owner` to consent
    Pending {
        view: ViewId,
        requester: ActorNumber,
        owner: Option<ActorNumber>,
    },
    Rejected {
        view: ViewId,
        reason: RejectReason,
    },
    AlreadyOwner,
}

/// Owner-side decision hook for `Request` objects.
pub trait OwnershipConsent {
    /// Returns true to hand `view` over to `requester`.
    fn on_ownership_request(&self, view: ViewId, owner: ActorNumber, requester: ActorNumber) -> bool;
}

impl<F> OwnershipConsent for F
where
    F: Fn(ViewId, ActorNumber, ActorNumber) -> bool,
{
    fn on_ownership_request(&self, view: ViewId, owner: ActorNumber, requester: ActorNumber) -> bool {
        self(view, owner, requester)
    }
}

/// Tracks owners and parked requests of all known networked objects.
#[derive(Debug, Default, Clone)]
pub struct OwnershipArbiter {
    objects: HashMap<ViewId, NetworkedObject>,
    pending: HashMap<ViewId, Vec<ActorNumber>>,
}

impl OwnershipArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, object: NetworkedObject) -> Result<(), OwnershipError> {
        if self.objects.contains_key(&object.view) {
            return Err(OwnershipError::DuplicateObject(object.view));
        }
        debug!("Registered {} with {:?} ownership", object.view, object.policy);
        self.objects.insert(object.view, object);
        Ok(())
    }

    pub fn unregister(&mut self, view: ViewId) -> Option<NetworkedObject> {
        self.pending.remove(&view);
        self.objects.remove(&view)
    }

    pub fn get(&self, view: ViewId) -> Option<&NetworkedObject> {
        self.objects.get(&view)
    }

    pub fn owner_of(&self, view: ViewId, master: Option<ActorNumber>) -> Option<ActorNumber> {
        self.objects
            .get(&view)
            .and_then(|object| object.effective_owner(master))
    }

    /// Requesters waiting on `view`, oldest first.
    pub fn pending_requests(&self, view: ViewId) -> &[ActorNumber] {
        self.pending.get(&view).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `requester` asks for control of `view`.
    pub fn request(
        &mut self,
        view: ViewId,
        requester: ActorNumber,
        master: Option<ActorNumber>,
    ) -> Result<OwnershipOutcome, OwnershipError> {
        let object = self
            .objects
            .get_mut(&view)
            .ok_or(OwnershipError::UnknownObject(view))?;

        let current = object.effective_owner(master);
        if current == Some(requester) {
            return Ok(OwnershipOutcome::AlreadyOwner);
        }

        match object.policy {
            OwnershipPolicy::Fixed => {
                debug!("Refused {} to {}: ownership is fixed", view, requester);
                Ok(OwnershipOutcome::Rejected {
                    view,
                    reason: RejectReason::FixedOwnership,
                })
            }
            OwnershipPolicy::Takeover => {
                object.owner = Some(requester);
                self.pending.remove(&view);
                info!("🔀 {} taken over by {}", view, requester);
                Ok(OwnershipOutcome::Transferred {
                    view,
                    from: current,
                    to: requester,
                })
            }
            OwnershipPolicy::Request => {
                let queue = self.pending.entry(view).or_default();
                if !queue.contains(&requester) {
                    queue.push(requester);
                }
                debug!("{} requested {}, waiting for {:?}", requester, view, current);
                Ok(OwnershipOutcome::Pending {
                    view,
                    requester,
                    owner: current,
                })
            }
        }
    }

    /// The owner of `view` answers the request made by `requester`.
    pub fn respond(
        &mut self,
        view: ViewId,
        responder: ActorNumber,
        requester: ActorNumber,
        approve: bool,
        master: Option<ActorNumber>,
    ) -> Result<OwnershipOutcome, OwnershipError> {
        let object = self
            .objects
            .get_mut(&view)
            .ok_or(OwnershipError::UnknownObject(view))?;

        let current = object.effective_owner(master);
        if current != Some(responder) {
            return Err(OwnershipError::NotOwner { view, responder });
        }

        let Some(position) = self
            .pending
            .get(&view)
            .and_then(|queue| queue.iter().position(|actor| *actor == requester))
        else {
            return Err(OwnershipError::NoPendingRequest { view, requester });
        };

        if !approve {
            if let Some(queue) = self.pending.get_mut(&view) {
                queue.remove(position);
                if queue.is_empty() {
                    self.pending.remove(&view);
                }
            }
            debug!("{} denied {} to {}", responder, view, requester);
            return Ok(OwnershipOutcome::Rejected {
                view,
                reason: RejectReason::Denied,
            });
        }

        object.owner = Some(requester);
        // Requests addressed to the previous owner are void now
        self.pending.remove(&view);
        info!("🔀 {} handed {} to {}", responder, view, requester);
        Ok(OwnershipOutcome::Transferred {
            view,
            from: current,
            to: requester,
        })
    }

    /// Asks the current owner through `consent` and applies the answer.
    pub fn resolve_with<C: OwnershipConsent>(
        &mut self,
        view: ViewId,
        requester: ActorNumber,
        master: Option<ActorNumber>,
        consent: &C,
    ) -> Result<OwnershipOutcome, OwnershipError> {
        let owner = self
            .owner_of(view, master)
            .ok_or(OwnershipError::UnknownObject(view))?;
        let approve = consent.on_ownership_request(view, owner, requester);
        self.respond(view, owner, requester, approve, master)
    }

    /// Cleans up after `actor` left the room.
    ///
    /// Objects it explicitly owned fall back to the master client and every
    /// request made by or waiting on it is dropped. `master` is the master
    /// client as of before the departure; if `actor` was master, requests
    /// addressed to it through scene objects are dropped too. Returns the
    /// views whose owner changed.
    pub fn on_player_left(&mut self, actor: ActorNumber, master: Option<ActorNumber>) -> Vec<ViewId> {
        let was_master = master == Some(actor);
        let mut reverted = Vec::new();
        let mut orphaned = Vec::new();
        for object in self.objects.values_mut() {
            if object.owner == Some(actor) {
                object.owner = None;
                reverted.push(object.view);
                orphaned.push(object.view);
            } else if was_master && object.owner.is_none() {
                orphaned.push(object.view);
            }
        }

        for view in &orphaned {
            self.pending.remove(view);
        }
        self.pending.retain(|_, queue| {
            queue.retain(|requester| *requester != actor);
            !queue.is_empty()
        });

        reverted.sort_unstable();
        if !reverted.is_empty() {
            info!("🔀 {} objects of {} reverted to the master client", reverted.len(), actor);
        }
        reverted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    const A: ActorNumber = ActorNumber(1);
    const B: ActorNumber = ActorNumber(2);
    const MASTER: ActorNumber = ActorNumber(3);

    fn arbiter_with(object: NetworkedObject) -> OwnershipArbiter {
        let mut arbiter = OwnershipArbiter::new();
        arbiter.register(object).unwrap();
        arbiter
    }

    #[test]
    fn test_fixed_rejects_every_transfer() {
        let view = ViewId(1);
        let mut arbiter = arbiter_with(NetworkedObject::instantiated(view, A, OwnershipPolicy::Fixed));

        let outcome = arbiter.request(view, B, Some(MASTER)).unwrap();
        assert_eq!(
            outcome,
            OwnershipOutcome::Rejected {
                view,
                reason: RejectReason::FixedOwnership
            }
        );
        assert_eq!(arbiter.owner_of(view, Some(MASTER)), Some(A));
        assert!(arbiter.pending_requests(view).is_empty());
    }

    #[test]
    fn test_takeover_transfers_unconditionally() {
        let view = ViewId(2);
        let mut arbiter = arbiter_with(NetworkedObject::instantiated(view, A, OwnershipPolicy::Takeover));

        let outcome = arbiter.request(view, B, Some(MASTER)).unwrap();
        assert_eq!(
            outcome,
            OwnershipOutcome::Transferred {
                view,
                from: Some(A),
                to: B
            }
        );
        assert_eq!(arbiter.owner_of(view, Some(MASTER)), Some(B));
    }

    #[test]
    fn test_request_waits_for_consent() {
        let view = ViewId(3);
        let mut arbiter = arbiter_with(NetworkedObject::instantiated(view, A, OwnershipPolicy::Request));

        let outcome = arbiter.request(view, B, Some(MASTER)).unwrap();
        assert_eq!(
            outcome,
            OwnershipOutcome::Pending {
                view,
                requester: B,
                owner: Some(A)
            }
        );
        assert_eq!(arbiter.owner_of(view, Some(MASTER)), Some(A));
        assert_eq!(arbiter.pending_requests(view), &[B]);

        let granted = arbiter.respond(view, A, B, true, Some(MASTER)).unwrap();
        assert!(matches!(granted, OwnershipOutcome::Transferred { to, .. } if to == B));
        assert_eq!(arbiter.owner_of(view, Some(MASTER)), Some(B));
        assert!(arbiter.pending_requests(view).is_empty());
    }

    #[test]
    fn test_request_denied_keeps_owner() {
        let view = ViewId(4);
        let mut arbiter = arbiter_with(NetworkedObject::instantiated(view, A, OwnershipPolicy::Request));
        arbiter.request(view, B, None).unwrap();

        let denied = arbiter.respond(view, A, B, false, None).unwrap();
        assert_eq!(
            denied,
            OwnershipOutcome::Rejected {
                view,
                reason: RejectReason::Denied
            }
        );
        assert_eq!(arbiter.owner_of(view, None), Some(A));
        assert!(matches!(
            arbiter.respond(view, A, B, true, None),
            Err(OwnershipError::NoPendingRequest { .. })
        ));
    }

    #[test]
    fn test_only_owner_may_answer() {
        let view = ViewId(5);
        let mut arbiter = arbiter_with(NetworkedObject::instantiated(view, A, OwnershipPolicy::Request));
        arbiter.request(view, B, Some(MASTER)).unwrap();

        let result = arbiter.respond(view, MASTER, B, true, Some(MASTER));
        assert_eq!(
            result,
            Err(OwnershipError::NotOwner {
                view,
                responder: MASTER
            })
        );
    }

    #[test]
    fn test_scene_objects_belong_to_master() {
        let view = ViewId(6);
        let mut arbiter = arbiter_with(NetworkedObject::scene(view, OwnershipPolicy::Request));
        assert_eq!(arbiter.owner_of(view, Some(MASTER)), Some(MASTER));

        assert_eq!(
            arbiter.request(view, MASTER, Some(MASTER)).unwrap(),
            OwnershipOutcome::AlreadyOwner
        );

        let consent_calls = Cell::new(0);
        let outcome = arbiter
            .resolve_with(view, A, Some(MASTER), &|_view, owner, _requester| {
                consent_calls.set(consent_calls.get() + 1);
                owner == MASTER
            })
            .unwrap_err();
        // No request was made yet, so there is nothing to answer
        assert!(matches!(outcome, OwnershipError::NoPendingRequest { .. }));

        arbiter.request(view, A, Some(MASTER)).unwrap();
        let outcome = arbiter
            .resolve_with(view, A, Some(MASTER), &|_view, owner, _requester| {
                consent_calls.set(consent_calls.get() + 1);
                owner == MASTER
            })
            .unwrap();
        assert_eq!(
            outcome,
            OwnershipOutcome::Transferred {
                view,
                from: Some(MASTER),
                to: A
            }
        );
        assert_eq!(consent_calls.get(), 2);
    }

    #[test]
    fn test_player_leaving_reverts_objects_and_drops_requests() {
        let mut arbiter = OwnershipArbiter::new();
        arbiter
            .register(NetworkedObject::instantiated(ViewId(7), A, OwnershipPolicy::Request))
            .unwrap();
        arbiter
            .register(NetworkedObject::instantiated(ViewId(8), B, OwnershipPolicy::Request))
            .unwrap();
        arbiter.request(ViewId(7), B, Some(MASTER)).unwrap();
        arbiter.request(ViewId(8), A, Some(MASTER)).unwrap();

        let reverted = arbiter.on_player_left(A, Some(MASTER));
        assert_eq!(reverted, vec![ViewId(7)]);
        assert_eq!(arbiter.owner_of(ViewId(7), Some(MASTER)), Some(MASTER));
        assert!(arbiter.pending_requests(ViewId(7)).is_empty());
        assert!(arbiter.pending_requests(ViewId(8)).is_empty());
        assert_eq!(arbiter.owner_of(ViewId(8), Some(MASTER)), Some(B));
    }

    #[test]
    fn test_master_leaving_drops_requests_addressed_to_it() {
        let scene_view = ViewId(50);
        let mut arbiter = arbiter_with(NetworkedObject::scene(scene_view, OwnershipPolicy::Request));
        arbiter
            .register(NetworkedObject::instantiated(ViewId(51), B, OwnershipPolicy::Request))
            .unwrap();
        arbiter.request(scene_view, A, Some(MASTER)).unwrap();
        arbiter.request(ViewId(51), A, Some(MASTER)).unwrap();

        let reverted = arbiter.on_player_left(MASTER, Some(MASTER));
        assert!(reverted.is_empty());
        assert!(arbiter.pending_requests(scene_view).is_empty());
        assert_eq!(arbiter.pending_requests(ViewId(51)), &[A]);

        // The next master has nothing to approve
        assert!(matches!(
            arbiter.respond(scene_view, B, A, true, Some(B)),
            Err(OwnershipError::NoPendingRequest { .. })
        ));
        assert_eq!(arbiter.owner_of(scene_view, Some(B)), Some(B));
    }

    #[test]
    fn test_non_master_leaving_keeps_scene_requests() {
        let view = ViewId(52);
        let mut arbiter = arbiter_with(NetworkedObject::scene(view, OwnershipPolicy::Request));
        arbiter.request(view, A, Some(MASTER)).unwrap();

        arbiter.on_player_left(B, Some(MASTER));
        assert_eq!(arbiter.pending_requests(view), &[A]);
    }

    #[test]
    fn test_failed_answers_leave_no_pending_entry() {
        let view = ViewId(53);
        let mut arbiter = arbiter_with(NetworkedObject::instantiated(view, A, OwnershipPolicy::Request));

        for requester in [B, MASTER, B] {
            assert!(matches!(
                arbiter.respond(view, A, requester, true, None),
                Err(OwnershipError::NoPendingRequest { .. })
            ));
        }
        assert!(arbiter.pending.is_empty());

        arbiter.request(view, B, None).unwrap();
        arbiter.respond(view, A, B, false, None).unwrap();
        assert!(arbiter.pending.is_empty());
    }

    #[test]
    fn test_duplicate_and_unknown_objects() {
        let view = ViewId(9);
        let mut arbiter = arbiter_with(NetworkedObject::scene(view, OwnershipPolicy::Fixed));
        assert_eq!(
            arbiter.register(NetworkedObject::scene(view, OwnershipPolicy::Fixed)),
            Err(OwnershipError::DuplicateObject(view))
        );
        assert!(arbiter.unregister(view).is_some());
        assert_eq!(
            arbiter.request(view, A, None),
            Err(OwnershipError::UnknownObject(view))
        );
    }
}
