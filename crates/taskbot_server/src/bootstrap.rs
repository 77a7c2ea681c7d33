//! Session bootstrap: owns the session state and reacts to session events.
//!
//! # Responsibility
//! - Publish `SessionState` changes to every status page subscriber.
//! - Request a numeric pairing code when the deployment is configured for it.
//!
//! # Invariants
//! - Only this type writes session state.
//! - A failed pairing code request leaves the QR artifact visible.
//! - A late pairing code never overrides `Ready`.

use crate::config::PairingMode;
use crate::transport::Transport;
use log::{info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use taskbot_core::{PairingArtifact, SessionState};
use tokio::sync::watch;

#[derive(Clone)]
pub struct SessionBootstrap {
    state: Arc<watch::Sender<SessionState>>,
    pairing: PairingMode,
    code_requested: Arc<AtomicBool>,
}

impl SessionBootstrap {
    /// Creates the bootstrap in `Starting` state plus a receiver for readers.
    pub fn new(pairing: PairingMode) -> (Self, watch::Receiver<SessionState>) {
        let (state, receiver) = watch::channel(SessionState::Starting);
        let bootstrap = Self {
            state: Arc::new(state),
            pairing,
            code_requested: Arc::new(AtomicBool::new(false)),
        };
        (bootstrap, receiver)
    }

    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn is_ready(&self) -> bool {
        self.state.borrow().is_ready()
    }

    /// Shows a fresh QR payload and, in code mode, starts one pairing code
    /// request in the background.
    pub fn on_qr<T: Transport>(&self, transport: &T, payload: String) {
        let published = self.state.send_if_modified(|state| match state {
            SessionState::Ready | SessionState::Pairing(PairingArtifact::Code(_)) => false,
            SessionState::Starting | SessionState::Pairing(PairingArtifact::Qr(_)) => {
                *state = SessionState::Pairing(PairingArtifact::Qr(payload));
                true
            }
        });
        if published {
            info!("event=session_pairing module=bootstrap status=ok artifact=qr");
        }

        if let PairingMode::Code { phone_number } = &self.pairing {
            if !self.code_requested.swap(true, Ordering::SeqCst) {
                let bootstrap = self.clone();
                let transport = transport.clone();
                let phone_number = phone_number.clone();
                tokio::spawn(async move {
                    bootstrap
                        .request_pairing_code(&transport, &phone_number)
                        .await;
                });
            }
        }
    }

    /// Requests a pairing code and publishes it; on failure keeps the QR.
    pub async fn request_pairing_code<T: Transport>(&self, transport: &T, phone_number: &str) {
        match transport.request_pairing_code(phone_number).await {
            Ok(code) => {
                let published = self.state.send_if_modified(|state| {
                    if state.is_ready() {
                        return false;
                    }
                    *state = SessionState::Pairing(PairingArtifact::Code(code));
                    true
                });
                if published {
                    info!("event=session_pairing module=bootstrap status=ok artifact=code");
                }
            }
            Err(err) => {
                // Allow the next QR refresh to try again.
                self.code_requested.store(false, Ordering::SeqCst);
                warn!(
                    "event=session_pairing module=bootstrap status=error artifact=code fallback=qr error={err}"
                );
            }
        }
    }

    pub fn on_ready(&self) {
        self.state.send_replace(SessionState::Ready);
        info!("event=session_ready module=bootstrap status=ok");
    }

    pub fn on_disconnected(&self, reason: &str) {
        self.state.send_replace(SessionState::Starting);
        self.code_requested.store(false, Ordering::SeqCst);
        warn!("event=session_disconnected module=bootstrap status=starting reason={reason}");
    }
}
