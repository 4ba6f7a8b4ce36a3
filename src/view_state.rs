//! Per-view display state.
//!
//! Every page moves through the same four states. A [`ViewSlot`] owns the
//! current state together with a generation counter: each fetch takes a
//! [`RequestToken`] when it starts and its outcome is applied only if no newer
//! fetch was started in the meantime, so an earlier request that resolves late
//! can never overwrite a newer result.
//!
//! HTTP handlers own one slot per request and render only once it has
//! settled, so a rendered page never shows `Loading` and a token is never
//! superseded there. Both matter to callers that keep a slot across several
//! fetches.

use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum ViewState<T> {
    /// Nothing requested yet (search view without a query).
    Idle,
    Loading,
    Error(String),
    Populated(T),
}

impl<T> ViewState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, ViewState::Loading)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken(u64);

#[derive(Debug)]
pub struct ViewSlot<T> {
    generation: u64,
    state: ViewState<T>,
}

impl<T> Default for ViewSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ViewSlot<T> {
    pub fn new() -> Self {
        Self {
            generation: 0,
            state: ViewState::Idle,
        }
    }

    /// Starts a fetch: moves to `Loading` and hands out the newest token.
    pub fn begin(&mut self) -> RequestToken {
        self.generation += 1;
        self.state = ViewState::Loading;
        RequestToken(self.generation)
    }

    /// Applies a fetch outcome. Returns `false` and leaves the state alone when
    /// `token` has been superseded by a later `begin`.
    pub fn settle(&mut self, token: RequestToken, outcome: Result<T, String>) -> bool {
        if token.0 != self.generation {
            debug!(
                "Discarding stale result (token {}, latest {})",
                token.0, self.generation
            );
            return false;
        }
        self.state = match outcome {
            Ok(value) => ViewState::Populated(value),
            Err(message) => ViewState::Error(message),
        };
        true
    }

    /// Back to `Idle`; any fetch still in flight becomes stale.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.state = ViewState::Idle;
    }

    pub fn state(&self) -> &ViewState<T> {
        &self.state
    }

    pub fn into_state(self) -> ViewState<T> {
        self.state
    }
}
