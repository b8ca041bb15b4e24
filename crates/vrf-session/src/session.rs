//! Ephemeral signing-session registry: the `not_found -> active ->
//! {exhausted | expired} -> not_found` state machine from `spec.md` §4.
//!
//! The teacher's worker kept one session's `WrapKeySeed` alive behind a
//! `MessagePort` and a use counter; the handler files that drove it
//! (`handle_dispense_session_key.rs`, `handle_check_session_status.rs`,
//! `handle_clear_session.rs`) are the grounding for the state transitions
//! below, reimplemented as an explicit registry rather than thread_local
//! globals plus free handler functions.

use crate::channel::WrapKeySeedChannel;
use crate::config::{VRF_SESSION_DEFAULT_MAX_USES, VRF_SESSION_DEFAULT_TTL_MS, WRAP_KEY_SEED_SIZE};
use crate::error::{VrfResult, VrfSessionError};
use crate::types::{SessionStatus, SigningSessionHandle};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_millis() as u64
}

/// Caller-supplied overlay on the session defaults in `config.rs`. Resolves
/// `spec.md` §9(1): TTL/max-uses are policy, set per mint call, not baked
/// into the protocol.
#[derive(Debug, Clone, Copy)]
pub struct VrfSessionPolicy {
    pub ttl_ms: u64,
    pub max_uses: u32,
}

impl Default for VrfSessionPolicy {
    fn default() -> Self {
        Self {
            ttl_ms: VRF_SESSION_DEFAULT_TTL_MS,
            max_uses: VRF_SESSION_DEFAULT_MAX_USES,
        }
    }
}

struct SigningSession {
    wrap_key_seed: [u8; WRAP_KEY_SEED_SIZE],
    wrap_key_salt_b64u: String,
    created_at_ms: u64,
    expires_at_ms: u64,
    remaining_uses: u32,
    channel: Box<dyn WrapKeySeedChannel>,
}

impl SigningSession {
    fn is_expired(&self, now: u64) -> bool {
        now >= self.expires_at_ms
    }

    fn is_exhausted(&self) -> bool {
        self.remaining_uses == 0
    }
}

/// Owns every minted ephemeral signing session. One registry per running
/// [`crate::manager::VRFKeyManager`]; a session never outlives the seed that
/// created it.
#[derive(Default)]
pub struct SigningSessionRegistry {
    sessions: HashMap<String, SigningSession>,
}

impl SigningSessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a new session: deliver the seed once immediately (so the
    /// signer has it for the confirmation that triggered minting), record
    /// the session, and return only the public handle.
    pub fn mint(
        &mut self,
        session_id: String,
        wrap_key_seed: &[u8; WRAP_KEY_SEED_SIZE],
        wrap_key_salt_b64u: String,
        policy: VrfSessionPolicy,
        channel: Box<dyn WrapKeySeedChannel>,
    ) -> VrfResult<SigningSessionHandle> {
        channel.send_wrap_key_seed(wrap_key_seed)?;

        let now = now_ms();
        let session = SigningSession {
            wrap_key_seed: *wrap_key_seed,
            wrap_key_salt_b64u: wrap_key_salt_b64u.clone(),
            created_at_ms: now,
            expires_at_ms: now + policy.ttl_ms,
            remaining_uses: policy.max_uses,
            channel,
        };
        let handle = SigningSessionHandle {
            session_id: session_id.clone(),
            wrap_key_salt_b64u,
            expires_at_ms: session.expires_at_ms,
            remaining_uses: session.remaining_uses,
        };
        self.sessions.insert(session_id, session);
        Ok(handle)
    }

    /// Dispense (re-send) the seed for a warm session instead of requiring
    /// a fresh WebAuthn ceremony. The seed is the one captured at `mint`
    /// time; dispensing never needs PRF.first again, that's the point of a
    /// warm session. `uses` is the number of dispenses this call consumes
    /// (normally 1, but a caller signing a batch in one request may consume
    /// more than one in a single call). Eagerly exhausts: the use is
    /// consumed whether or not the subsequent signing attempt succeeds,
    /// matching the teacher's handler, since a failed downstream attempt
    /// still spent a dispense.
    pub fn dispense(&mut self, session_id: &str, uses: u32) -> VrfResult<SigningSessionHandle> {
        let now = now_ms();
        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| VrfSessionError::SessionNotFound(session_id.to_string()))?;

        if session.is_expired(now) {
            self.sessions.remove(session_id);
            return Err(VrfSessionError::SessionExpired(session_id.to_string()));
        }
        if session.is_exhausted() {
            self.sessions.remove(session_id);
            return Err(VrfSessionError::SessionExhausted(session_id.to_string()));
        }

        session.channel.send_wrap_key_seed(&session.wrap_key_seed)?;
        session.remaining_uses = session.remaining_uses.saturating_sub(uses.max(1));

        let handle = SigningSessionHandle {
            session_id: session_id.to_string(),
            wrap_key_salt_b64u: session.wrap_key_salt_b64u.clone(),
            expires_at_ms: session.expires_at_ms,
            remaining_uses: session.remaining_uses,
        };
        if session.remaining_uses == 0 {
            self.sessions.remove(session_id);
        }
        Ok(handle)
    }

    /// Check session status without consuming a use. Lazily evicts expired
    /// sessions as a side effect of checking.
    pub fn status(&mut self, session_id: &str) -> SessionStatus {
        let now = now_ms();
        let expired = match self.sessions.get(session_id) {
            Some(s) => s.is_expired(now),
            None => return SessionStatus::NotFound,
        };
        if expired {
            self.sessions.remove(session_id);
            return SessionStatus::Expired;
        }
        match self.sessions.get(session_id) {
            Some(s) if s.is_exhausted() => SessionStatus::Exhausted,
            Some(_) => SessionStatus::Active,
            None => SessionStatus::NotFound,
        }
    }

    /// Idempotent: clearing a session that doesn't exist is not an error.
    pub fn clear(&mut self, session_id: &str) {
        self.sessions.remove(session_id);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MpscWrapKeySeedChannel;
    use std::sync::mpsc::channel as mpsc_channel;

    fn recording_channel() -> (Box<dyn WrapKeySeedChannel>, std::sync::mpsc::Receiver<[u8; WRAP_KEY_SEED_SIZE]>) {
        let (tx, rx) = mpsc_channel();
        (Box::new(MpscWrapKeySeedChannel::new(tx)), rx)
    }

    #[test]
    fn mint_then_status_is_active() {
        let mut reg = SigningSessionRegistry::new();
        let (chan, rx) = recording_channel();
        let handle = reg
            .mint("s1".into(), &[1u8; 32], "salt".into(), VrfSessionPolicy::default(), chan)
            .unwrap();
        assert_eq!(handle.remaining_uses, VRF_SESSION_DEFAULT_MAX_USES);
        assert!(rx.recv().is_ok());
        assert_eq!(reg.status("s1"), SessionStatus::Active);
    }

    #[test]
    fn dispense_decrements_remaining_uses_eagerly() {
        let mut reg = SigningSessionRegistry::new();
        let (chan, _rx) = recording_channel();
        reg.mint(
            "s1".into(),
            &[1u8; 32],
            "salt".into(),
            VrfSessionPolicy { ttl_ms: 60_000, max_uses: 2 },
            chan,
        )
        .unwrap();

        let h1 = reg.dispense("s1", 1).unwrap();
        assert_eq!(h1.remaining_uses, 1);
        assert_eq!(reg.status("s1"), SessionStatus::Active);

        let h2 = reg.dispense("s1", 1).unwrap();
        assert_eq!(h2.remaining_uses, 0);
        // eagerly exhausted: session is gone even though the 2nd dispense succeeded
        assert_eq!(reg.status("s1"), SessionStatus::NotFound);
    }

    #[test]
    fn dispense_applies_a_multi_use_count_in_one_call() {
        let mut reg = SigningSessionRegistry::new();
        let (chan, _rx) = recording_channel();
        reg.mint(
            "s1".into(),
            &[1u8; 32],
            "salt".into(),
            VrfSessionPolicy { ttl_ms: 60_000, max_uses: 5 },
            chan,
        )
        .unwrap();

        let h1 = reg.dispense("s1", 3).unwrap();
        assert_eq!(h1.remaining_uses, 2);
    }

    #[test]
    fn dispense_unknown_session_is_not_found() {
        let mut reg = SigningSessionRegistry::new();
        let err = reg.dispense("missing", 1).unwrap_err();
        assert!(matches!(err, VrfSessionError::SessionNotFound(_)));
    }

    #[test]
    fn status_lazily_expires_session() {
        let mut reg = SigningSessionRegistry::new();
        let (chan, _rx) = recording_channel();
        reg.mint(
            "s1".into(),
            &[1u8; 32],
            "salt".into(),
            VrfSessionPolicy { ttl_ms: 0, max_uses: 5 },
            chan,
        )
        .unwrap();

        std::thread::sleep(std::time::Duration::from_millis(5));
        assert_eq!(reg.status("s1"), SessionStatus::Expired);
        assert_eq!(reg.status("s1"), SessionStatus::NotFound);
    }

    #[test]
    fn clear_is_idempotent() {
        let mut reg = SigningSessionRegistry::new();
        reg.clear("never-existed");
        let (chan, _rx) = recording_channel();
        reg.mint("s1".into(), &[1u8; 32], "salt".into(), VrfSessionPolicy::default(), chan)
            .unwrap();
        reg.clear("s1");
        reg.clear("s1");
        assert_eq!(reg.status("s1"), SessionStatus::NotFound);
    }
}
