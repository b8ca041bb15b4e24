//! Delivery of a `WrapKeySeed` to the signer side of the process, replacing
//! the teacher's `MessagePort`/`WRAP_KEY_SEED_PORTS` thread_local map (a
//! browser-worker-to-worker primitive with no native equivalent). Here the
//! host wires up one [`WrapKeySeedChannel`] per minted session; this crate
//! never inspects or stores the seed once it has been handed off.

use crate::config::WRAP_KEY_SEED_SIZE;
use crate::error::{VrfResult, VrfSessionError};
use std::sync::mpsc::Sender;

/// A one-shot-per-use delivery channel to whatever signer component is
/// authorized to hold the `WrapKeySeed`. Implementations must never log or
/// persist the seed bytes.
pub trait WrapKeySeedChannel: Send {
    fn send_wrap_key_seed(&self, seed: &[u8; WRAP_KEY_SEED_SIZE]) -> VrfResult<()>;
}

/// Delivers the seed over a `std::sync::mpsc` channel to an in-process
/// signer task. The simplest real implementation, suitable when the signer
/// runs as another task in the same process (e.g. a dedicated tokio task
/// holding the only copy of decrypted key material).
pub struct MpscWrapKeySeedChannel {
    sender: Sender<[u8; WRAP_KEY_SEED_SIZE]>,
}

impl MpscWrapKeySeedChannel {
    pub fn new(sender: Sender<[u8; WRAP_KEY_SEED_SIZE]>) -> Self {
        Self { sender }
    }
}

impl WrapKeySeedChannel for MpscWrapKeySeedChannel {
    fn send_wrap_key_seed(&self, seed: &[u8; WRAP_KEY_SEED_SIZE]) -> VrfResult<()> {
        self.sender
            .send(*seed)
            .map_err(|_| VrfSessionError::SessionPortNotAttached("signer channel closed".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;

    #[test]
    fn mpsc_channel_delivers_seed() {
        let (tx, rx) = channel();
        let chan = MpscWrapKeySeedChannel::new(tx);
        chan.send_wrap_key_seed(&[1u8; WRAP_KEY_SEED_SIZE]).unwrap();
        assert_eq!(rx.recv().unwrap(), [1u8; WRAP_KEY_SEED_SIZE]);
    }

    #[test]
    fn send_after_receiver_dropped_errors() {
        let (tx, rx) = channel();
        drop(rx);
        let chan = MpscWrapKeySeedChannel::new(tx);
        assert!(chan.send_wrap_key_seed(&[0u8; WRAP_KEY_SEED_SIZE]).is_err());
    }
}
