use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::narrator::{Narration, Narrator};
use super::types::{ScenarioStep, Session, Side, TravelerIdentity};
use crate::error::{EngineError, EngineResult};

/// The only component allowed to mutate a [`Session`].
///
/// Every operation is atomic: when it returns an error the session is left
/// exactly as it was. The engine never retries and holds no locks; callers
/// serialize access to a given session themselves.
#[derive(Clone)]
pub struct PathEngine {
    narrator: Arc<dyn Narrator>,
    timeout: Option<Duration>,
}

impl PathEngine {
    pub fn new(narrator: impl Narrator + 'static) -> Self {
        Self::from_shared(Arc::new(narrator))
    }

    pub fn from_shared(narrator: Arc<dyn Narrator>) -> Self {
        Self {
            narrator,
            timeout: None,
        }
    }

    /// Give up on a narration after `timeout`. The elapsed call is reported
    /// as a generation failure.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create a session for `traveler` and request its opening scenario.
    ///
    /// The session is returned even when narration fails; it then has an
    /// empty history and [`start`](Self::start) can be retried on it.
    pub async fn begin(&self, traveler: TravelerIdentity) -> (Session, EngineResult<()>) {
        let mut session = Session::new(traveler);
        let outcome = self.start(&mut session).await;
        (session, outcome)
    }

    /// Request the opening scenario for a session that has not started yet.
    pub async fn start(&self, session: &mut Session) -> EngineResult<()> {
        ensure_active(session, "start")?;
        if !session.history().is_empty() {
            return Err(EngineError::invalid_state(
                "start",
                "the journey has already begun",
            ));
        }

        let narration = self.narrate(session.traveler(), &[]).await?;
        session.push_step(ScenarioStep::pending(narration));

        info!(session_id = %session.id(), "Traveler entered the garden");
        Ok(())
    }

    /// Record the traveler's choice at the current fork.
    ///
    /// This does not generate the next scenario; call
    /// [`advance`](Self::advance) for that.
    pub fn choose(&self, session: &mut Session, side: Side) -> EngineResult<()> {
        ensure_active(session, "choose")?;
        if !side.is_resolved() {
            return Err(EngineError::invalid_state(
                "choose",
                "a choice must be left or right",
            ));
        }

        let island = session.history().len();
        match session.current_step() {
            None => {
                return Err(EngineError::invalid_state(
                    "choose",
                    "there is no scenario to choose from yet",
                ))
            }
            Some(step) if step.chosen_side.is_resolved() => {
                return Err(EngineError::invalid_state(
                    "choose",
                    format!(
                        "the {} path was already chosen at island {}",
                        step.chosen_side, island
                    ),
                ))
            }
            Some(_) => {}
        }

        session.resolve_current(side);
        debug!(session_id = %session.id(), island, side = %side, "Path chosen");
        Ok(())
    }

    /// Narrate the next island after a resolved choice and append it.
    pub async fn advance(&self, session: &mut Session) -> EngineResult<()> {
        ensure_active(session, "advance")?;
        match session.current_step() {
            None => {
                return Err(EngineError::invalid_state(
                    "advance",
                    "the journey has not begun",
                ))
            }
            Some(step) if !step.chosen_side.is_resolved() => {
                return Err(EngineError::invalid_state(
                    "advance",
                    "a choice is still pending at the current island",
                ))
            }
            Some(_) => {}
        }

        let narration = self.narrate(session.traveler(), session.history()).await?;
        session.push_step(ScenarioStep::pending(narration));

        info!(
            session_id = %session.id(),
            island = session.history().len(),
            "Traveler reached a new island"
        );
        Ok(())
    }

    /// End the journey. Ending an ended session does nothing.
    pub fn end(&self, session: &mut Session) -> EngineResult<()> {
        if session.is_ended() {
            debug!(session_id = %session.id(), "Session already ended");
            return Ok(());
        }
        session.mark_ended();
        info!(
            session_id = %session.id(),
            islands = session.history().len(),
            "Journey ended"
        );
        Ok(())
    }

    async fn narrate(
        &self,
        traveler: &TravelerIdentity,
        history: &[ScenarioStep],
    ) -> EngineResult<Narration> {
        let call = self.narrator.generate(traveler, history);
        let draft = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                EngineError::generation(format!(
                    "narration timed out after {}ms",
                    limit.as_millis()
                ))
            })??,
            None => call.await?,
        };

        draft.validate().map_err(|e| {
            warn!(error = %e, islands = history.len(), "Narrator returned an unusable draft");
            e
        })
    }
}

fn ensure_active(session: &Session, operation: &'static str) -> EngineResult<()> {
    if session.is_ended() {
        return Err(EngineError::invalid_state(
            operation,
            "the journey has ended",
        ));
    }
    Ok(())
}
