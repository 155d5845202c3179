//! Location gate: suspends a send until the user supplies or declines a
//! device location.

use confab_core::LocationFix;

/// A send held back because the backend asked for the device location.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingLocationRequest {
    /// Conversation the held message belongs to
    pub conversation_id: String,
    /// Local id of the optimistic user message that triggered the request
    pub message_id: String,
    /// Exact text to resend once a location is known
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum GateState {
    #[default]
    Armed,
    Pending(PendingLocationRequest),
}

/// Holds at most one pending location request plus the fix supplied for the
/// rest of the session.
#[derive(Debug, Default)]
pub struct LocationGate {
    state: GateState,
    location: Option<LocationFix>,
}

impl LocationGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &GateState {
        &self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, GateState::Pending(_))
    }

    pub fn pending(&self) -> Option<&PendingLocationRequest> {
        match &self.state {
            GateState::Pending(request) => Some(request),
            GateState::Armed => None,
        }
    }

    /// The fix attached to every send once supplied.
    pub fn location(&self) -> Option<LocationFix> {
        self.location
    }

    /// Parks `request` until the user answers.
    ///
    /// Refused when a location is already known or another request is still
    /// pending; both are backend contract violations and are only logged.
    ///
    /// # Returns
    ///
    /// `true` when the gate moved to `Pending`.
    pub fn request_location(&mut self, request: PendingLocationRequest) -> bool {
        if self.location.is_some() {
            tracing::warn!(
                "[LocationGate] Location requested although one was already supplied; ignoring"
            );
            return false;
        }
        if self.is_pending() {
            tracing::warn!("[LocationGate] Location requested while a request is pending; ignoring");
            return false;
        }

        tracing::info!(
            "[LocationGate] Holding message {} until a location is supplied",
            request.message_id
        );
        self.state = GateState::Pending(request);
        true
    }

    /// Records `fix` for the remainder of the session and re-arms the gate.
    ///
    /// # Returns
    ///
    /// The request to resend, if one was pending.
    pub fn supply(&mut self, fix: LocationFix) -> Option<PendingLocationRequest> {
        self.location = Some(fix);
        let pending = self.take_pending();
        if pending.is_none() {
            tracing::debug!("[LocationGate] Location recorded with nothing pending");
        }
        pending
    }

    /// Drops the pending request without resending.
    pub fn decline(&mut self) -> Option<PendingLocationRequest> {
        let pending = self.take_pending();
        if let Some(request) = &pending {
            tracing::info!(
                "[LocationGate] Location declined; message {} stays unanswered",
                request.message_id
            );
        }
        pending
    }

    fn take_pending(&mut self) -> Option<PendingLocationRequest> {
        match std::mem::take(&mut self.state) {
            GateState::Pending(request) => Some(request),
            GateState::Armed => None,
        }
    }
}
