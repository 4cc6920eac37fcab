//! Debate machine — drives round dispatch, evaluation, and assisted mode.
//!
//! Single-instance, single-debate-at-a-time. Within a round the three
//! debating roles are dispatched concurrently with an all-succeed/any-fails
//! join; evaluation is strictly sequential after the join. Any dispatch or
//! parse failure suspends the machine on exactly one pending assist — a
//! human supplying a substitute is the only resume path; there is no
//! automatic retry or timeout escalation out of `Assisted`.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::compiler::extract_evaluation;
use crate::gateway::DispatchGateway;
use crate::prompts::{
    build_orchestrator_prompt, build_participant_prompt, round_context, round_instructions,
};
use crate::role::{ParticipantRole, DEBATE_ROLES};
use crate::session::{
    DebateSession, DebateSnapshot, MachineState, PendingAssist, ResponseRecord, MAX_ROUNDS,
};

/// Errors from machine operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MachineError {
    /// `start_debate` called while a debate is in progress.
    #[error("a debate is already active")]
    DebateActive,
    /// An operation needing a session ran before any debate started.
    #[error("no debate has been started")]
    NoDebate,
    /// Sequencing invariant violated: a later round ran without the previous
    /// round's evaluation. Internal-fatal; should not occur.
    #[error("round {0} has no evaluation document")]
    MissingEvaluation(u8),
    /// `resolve_assisted` called with no pending assist.
    #[error("no pending assistance to resolve")]
    NotAssisted,
}

/// Receiver for the snapshot emitted on every state transition.
///
/// Publish failures are logged by the machine and never propagate into the
/// debate — status delivery is best-effort.
#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn publish(&self, snapshot: DebateSnapshot) -> anyhow::Result<()>;
}

/// Sink that discards every snapshot.
pub struct NullSink;

#[async_trait]
impl StatusSink for NullSink {
    async fn publish(&self, _snapshot: DebateSnapshot) -> anyhow::Result<()> {
        Ok(())
    }
}

enum RoundOutcome {
    Assisted,
    Next,
    Done,
}

/// The orchestration core: owns the session, talks to the gateway, emits
/// status to the sink.
pub struct DebateMachine {
    gateway: Arc<dyn DispatchGateway>,
    sink: Arc<dyn StatusSink>,
    session: Option<DebateSession>,
}

impl DebateMachine {
    pub fn new(gateway: Arc<dyn DispatchGateway>, sink: Arc<dyn StatusSink>) -> Self {
        Self {
            gateway,
            sink,
            session: None,
        }
    }

    /// Current machine state (`Idle` before the first debate).
    pub fn state(&self) -> MachineState {
        self.session
            .as_ref()
            .map(|s| s.state)
            .unwrap_or(MachineState::Idle)
    }

    /// The pending assist, when suspended.
    pub fn pending_assist(&self) -> Option<&PendingAssist> {
        self.session.as_ref().and_then(|s| s.pending.as_ref())
    }

    /// The current session, if a debate has been started.
    pub fn session(&self) -> Option<&DebateSession> {
        self.session.as_ref()
    }

    /// Snapshot of the current session, if any.
    pub fn snapshot(&self) -> Option<DebateSnapshot> {
        self.session.as_ref().map(|s| s.snapshot())
    }

    /// Start a debate on `topic`, rejecting overlap with an active one.
    ///
    /// Runs rounds until the debate completes or an automated step fails
    /// into `Assisted`; returns the state the machine came to rest in.
    pub async fn start_debate(&mut self, topic: &str) -> Result<MachineState, MachineError> {
        if self.state().is_active() {
            return Err(MachineError::DebateActive);
        }
        let mut session = DebateSession::new(topic);
        session.state = MachineState::RoundSend(1);
        session.status = "Debate started".to_string();
        info!(topic, debate_id = %session.debate.id, "debate started");
        self.session = Some(session);
        self.emit().await;
        self.run_from_send(1, None).await
    }

    /// Supply a human response for the pending assist and resume.
    ///
    /// A substitute orchestrator reply is parsed exactly as an automated one
    /// would be; a substitute participant response re-enters the round it
    /// preempted. Fails with `NotAssisted` (state unchanged) when nothing is
    /// pending.
    pub async fn resolve_assisted(&mut self, text: &str) -> Result<MachineState, MachineError> {
        let pending = match self.session.as_mut() {
            Some(s) if s.state == MachineState::Assisted => {
                s.take_pending().ok_or(MachineError::NotAssisted)?
            }
            _ => return Err(MachineError::NotAssisted),
        };
        info!(
            kind = pending.kind(),
            round = pending.round(),
            "resolving assisted request"
        );

        match pending {
            PendingAssist::ParticipantSend { round, role, .. } => {
                self.run_from_send(round, Some((role, text.to_string()))).await
            }
            PendingAssist::OrchestratorSend { round, prompt }
            | PendingAssist::OrchestratorParse { round, prompt } => {
                {
                    let session = self.session_mut()?;
                    session.state = MachineState::RoundEvaluate(round);
                    session.status = format!("Evaluating round {} (human-supplied)", round);
                }
                self.emit().await;
                match self.apply_evaluation(round, prompt, text).await? {
                    RoundOutcome::Assisted => Ok(MachineState::Assisted),
                    RoundOutcome::Done => Ok(MachineState::Done),
                    RoundOutcome::Next => self.run_from_send(round + 1, None).await,
                }
            }
        }
    }

    fn session_mut(&mut self) -> Result<&mut DebateSession, MachineError> {
        self.session.as_mut().ok_or(MachineError::NoDebate)
    }

    async fn emit(&self) {
        if let Some(session) = &self.session {
            if let Err(e) = self.sink.publish(session.snapshot()).await {
                warn!(error = %e, "status publish failed");
            }
        }
    }

    async fn run_from_send(
        &mut self,
        start_round: u8,
        substitute: Option<(ParticipantRole, String)>,
    ) -> Result<MachineState, MachineError> {
        let mut round = start_round;
        let mut substitute = substitute;
        loop {
            if let Some(state) = self.dispatch_round(round, substitute.take()).await? {
                return Ok(state);
            }
            match self.evaluate_round(round).await? {
                RoundOutcome::Assisted => return Ok(MachineState::Assisted),
                RoundOutcome::Done => return Ok(MachineState::Done),
                RoundOutcome::Next => round += 1,
            }
        }
    }

    /// Dispatch one round to all three debating roles concurrently.
    ///
    /// Returns `Some(Assisted)` when any dispatch failed (nothing stored),
    /// `None` when all three responses were recorded. `substitute` skips
    /// dispatch for one role and uses the given text instead — the resume
    /// path after a `PARTICIPANT_SEND` assist.
    async fn dispatch_round(
        &mut self,
        round: u8,
        substitute: Option<(ParticipantRole, String)>,
    ) -> Result<Option<MachineState>, MachineError> {
        let (topic, previous) = {
            let session = self.session_mut()?;
            session.state = MachineState::RoundSend(round);
            session.status = format!("Dispatching round {}", round);
            session.round_mut(round);
            let previous = session.previous_evaluation(round).cloned();
            if round > 1 && previous.is_none() {
                return Err(MachineError::MissingEvaluation(round - 1));
            }
            (session.debate.topic.clone(), previous)
        };
        self.emit().await;

        let prompts: Vec<(ParticipantRole, String)> = DEBATE_ROLES
            .iter()
            .map(|&role| {
                let instructions = round_instructions(role, round, previous.as_ref());
                let bullets = round_context(role, round, previous.as_ref());
                let prompt =
                    build_participant_prompt(&topic, round, role, &instructions, &bullets);
                (role, prompt)
            })
            .collect();

        debug!(round, "dispatching to {} participants", prompts.len());
        let results = join_all(prompts.iter().map(|(role, prompt)| {
            let gateway = Arc::clone(&self.gateway);
            let substituted = substitute
                .as_ref()
                .filter(|(r, _)| r == role)
                .map(|(_, text)| text.clone());
            async move {
                match substituted {
                    Some(text) => Ok(text),
                    None => gateway.send_prompt(*role, prompt).await,
                }
            }
        }))
        .await;

        // All-succeed/any-fails join: one failure aborts the whole round with
        // zero stored records, because evaluation needs all three inputs to
        // score fairly. First failing role in dispatch order carries the
        // assist.
        for ((role, prompt), result) in prompts.iter().zip(&results) {
            if let Err(e) = result {
                warn!(%role, round, error = %e, "participant dispatch failed, entering assisted mode");
                let session = self.session_mut()?;
                session.enter_assisted(PendingAssist::ParticipantSend {
                    round,
                    role: *role,
                    prompt: prompt.clone(),
                });
                session.status =
                    format!("Assisted mode triggered: PARTICIPANT_SEND ({})", role);
                self.emit().await;
                return Ok(Some(MachineState::Assisted));
            }
        }

        {
            let session = self.session_mut()?;
            let record = session.round_mut(round);
            for ((role, _), result) in prompts.iter().zip(results) {
                if let Ok(text) = result {
                    record.responses.insert(*role, ResponseRecord::new(text));
                }
            }
            session.status = format!("Round {} responses collected", round);
        }
        self.emit().await;
        Ok(None)
    }

    /// Send the round's responses to the orchestrator and store its verdict.
    async fn evaluate_round(&mut self, round: u8) -> Result<RoundOutcome, MachineError> {
        let prompt = {
            let session = self.session_mut()?;
            session.state = MachineState::RoundEvaluate(round);
            session.status = format!("Evaluating round {}", round);
            let responses = session
                .round(round)
                .map(|r| r.responses.clone())
                .unwrap_or_default();
            build_orchestrator_prompt(&session.debate.topic, round, &responses)
        };
        self.emit().await;

        match self
            .gateway
            .send_prompt(ParticipantRole::Orchestrator, &prompt)
            .await
        {
            Ok(reply) => self.apply_evaluation(round, prompt, &reply).await,
            Err(e) => {
                warn!(round, error = %e, "orchestrator delivery failed, entering assisted mode");
                let session = self.session_mut()?;
                session.enter_assisted(PendingAssist::OrchestratorSend { round, prompt });
                session.status = "Assisted mode triggered: ORCHESTRATOR_SEND".to_string();
                self.emit().await;
                Ok(RoundOutcome::Assisted)
            }
        }
    }

    /// Parse an orchestrator reply (automated or human-supplied) and advance.
    ///
    /// On parse failure the pending assist carries `prompt` — the original
    /// request — so a human can regenerate a compliant reply.
    async fn apply_evaluation(
        &mut self,
        round: u8,
        prompt: String,
        reply: &str,
    ) -> Result<RoundOutcome, MachineError> {
        match extract_evaluation(reply) {
            Ok(doc) => {
                let done = {
                    let session = self.session_mut()?;
                    let synthesis = doc.synthesis.clone();
                    session.round_mut(round).evaluation = Some(doc);
                    if round < MAX_ROUNDS {
                        session.status = format!("Round {} evaluated", round);
                        false
                    } else {
                        session.debate.synthesis = Some(synthesis);
                        session.state = MachineState::Done;
                        session.status = "Debate complete".to_string();
                        true
                    }
                };
                info!(round, done, "evaluation stored");
                self.emit().await;
                Ok(if done {
                    RoundOutcome::Done
                } else {
                    RoundOutcome::Next
                })
            }
            Err(e) => {
                warn!(round, error = %e, "orchestrator reply failed to parse, entering assisted mode");
                let session = self.session_mut()?;
                session.enter_assisted(PendingAssist::OrchestratorParse { round, prompt });
                session.status = "Assisted mode triggered: ORCHESTRATOR_PARSE".to_string();
                self.emit().await;
                Ok(RoundOutcome::Assisted)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, VecDeque};
    use std::sync::Mutex;

    use super::*;
    use crate::compiler::format_evaluation;
    use crate::document::sample_document;
    use crate::gateway::DispatchError;
    use crate::prompts::{seed_instructions, SEED_CONTEXT};

    /// Gateway scripted per role: pops the next canned result on each call
    /// and records every prompt it saw. Unscripted calls fail loudly.
    struct ScriptedGateway {
        responses: Mutex<BTreeMap<ParticipantRole, VecDeque<Result<String, DispatchError>>>>,
        log: Mutex<Vec<(ParticipantRole, String)>>,
    }

    impl ScriptedGateway {
        fn new() -> Self {
            Self {
                responses: Mutex::new(BTreeMap::new()),
                log: Mutex::new(Vec::new()),
            }
        }

        fn script(&self, role: ParticipantRole, result: Result<&str, DispatchError>) {
            self.responses
                .lock()
                .unwrap()
                .entry(role)
                .or_default()
                .push_back(result.map(String::from));
        }

        fn calls_for(&self, role: ParticipantRole) -> Vec<String> {
            self.log
                .lock()
                .unwrap()
                .iter()
                .filter(|(r, _)| *r == role)
                .map(|(_, p)| p.clone())
                .collect()
        }
    }

    #[async_trait]
    impl DispatchGateway for ScriptedGateway {
        async fn send_prompt(
            &self,
            role: ParticipantRole,
            prompt: &str,
        ) -> Result<String, DispatchError> {
            self.log.lock().unwrap().push((role, prompt.to_string()));
            self.responses
                .lock()
                .unwrap()
                .get_mut(&role)
                .and_then(|queue| queue.pop_front())
                .unwrap_or_else(|| Err(DispatchError::DeliveryFailed("unscripted call".to_string())))
        }
    }

    /// Sink that records every snapshot it is handed.
    struct RecordingSink {
        snapshots: Mutex<Vec<DebateSnapshot>>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self {
                snapshots: Mutex::new(Vec::new()),
            }
        }

        fn states(&self) -> Vec<MachineState> {
            self.snapshots.lock().unwrap().iter().map(|s| s.state).collect()
        }

        fn last(&self) -> Option<DebateSnapshot> {
            self.snapshots.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl StatusSink for RecordingSink {
        async fn publish(&self, snapshot: DebateSnapshot) -> anyhow::Result<()> {
            self.snapshots.lock().unwrap().push(snapshot);
            Ok(())
        }
    }

    fn script_round(gateway: &ScriptedGateway, round: u8) {
        gateway.script(ParticipantRole::Debater, Ok("Yes..."));
        gateway.script(ParticipantRole::Critic, Ok("No..."));
        gateway.script(ParticipantRole::Researcher, Ok("Mixed..."));
        let reply = format_evaluation(&sample_document(round));
        gateway.script(ParticipantRole::Orchestrator, Ok(&reply));
    }

    fn machine_with(
        gateway: Arc<ScriptedGateway>,
        sink: Arc<RecordingSink>,
    ) -> DebateMachine {
        DebateMachine::new(gateway, sink)
    }

    #[tokio::test]
    async fn test_three_clean_rounds_reach_done() {
        let gateway = Arc::new(ScriptedGateway::new());
        let sink = Arc::new(RecordingSink::new());
        for round in 1u8..=3 {
            script_round(&gateway, round);
        }
        let mut machine = machine_with(gateway.clone(), sink.clone());

        let state = machine.start_debate("Should AI models be open-sourced?").await.unwrap();
        assert_eq!(state, MachineState::Done);

        let session = machine.session().unwrap();
        assert_eq!(session.debate.rounds.len(), 3);
        for round in &session.debate.rounds {
            assert_eq!(round.responses.len(), 3);
            assert!(round.evaluation.is_some());
            assert!(round.is_complete());
        }
        assert!(session.debate.synthesis.is_some());
        assert!(session.pending.is_none());

        let last = sink.last().unwrap();
        assert_eq!(last.state, MachineState::Done);
        assert_eq!(last.status, "Debate complete");
        // Round 1 dispatch was announced before anything else ran.
        assert_eq!(sink.states()[0], MachineState::RoundSend(1));
    }

    #[tokio::test]
    async fn test_single_participant_failure_aborts_round() {
        let gateway = Arc::new(ScriptedGateway::new());
        let sink = Arc::new(RecordingSink::new());
        gateway.script(ParticipantRole::Debater, Ok("Yes..."));
        gateway.script(ParticipantRole::Critic, Err(DispatchError::Timeout));
        gateway.script(ParticipantRole::Researcher, Ok("Mixed..."));
        let mut machine = machine_with(gateway.clone(), sink.clone());

        let state = machine.start_debate("open weights").await.unwrap();
        assert_eq!(state, MachineState::Assisted);

        // Zero stored records even though two dispatches succeeded.
        let session = machine.session().unwrap();
        assert_eq!(session.debate.rounds.len(), 1);
        assert!(session.debate.rounds[0].responses.is_empty());

        let pending = machine.pending_assist().unwrap();
        assert_eq!(pending.kind(), "PARTICIPANT_SEND");
        let expected_prompt = build_participant_prompt(
            "open weights",
            1,
            ParticipantRole::Critic,
            seed_instructions(ParticipantRole::Critic),
            &[SEED_CONTEXT.to_string()],
        );
        assert_eq!(
            pending,
            &PendingAssist::ParticipantSend {
                round: 1,
                role: ParticipantRole::Critic,
                prompt: expected_prompt,
            }
        );
    }

    #[tokio::test]
    async fn test_participant_resume_substitutes_failed_role() {
        let gateway = Arc::new(ScriptedGateway::new());
        let sink = Arc::new(RecordingSink::new());
        // First attempt: critic fails.
        gateway.script(ParticipantRole::Debater, Ok("Yes..."));
        gateway.script(ParticipantRole::Critic, Err(DispatchError::Timeout));
        gateway.script(ParticipantRole::Researcher, Ok("Mixed..."));
        // Re-execution after resume: fresh dispatch for the other two only.
        gateway.script(ParticipantRole::Debater, Ok("Yes, still..."));
        gateway.script(ParticipantRole::Researcher, Ok("Mixed, still..."));
        let reply = format_evaluation(&sample_document(1));
        gateway.script(ParticipantRole::Orchestrator, Ok(&reply));
        let mut machine = machine_with(gateway.clone(), sink.clone());

        let state = machine.start_debate("open weights").await.unwrap();
        assert_eq!(state, MachineState::Assisted);

        let state = machine.resolve_assisted("No, manually typed...").await.unwrap();
        // Round 1 completed with the substitute; round 2 then fails on an
        // unscripted gateway and suspends again.
        assert_eq!(state, MachineState::Assisted);

        let session = machine.session().unwrap();
        let round1 = session.round(1).unwrap();
        assert_eq!(round1.responses.len(), 3);
        assert_eq!(
            round1.responses[&ParticipantRole::Critic].text,
            "No, manually typed..."
        );
        assert!(round1.evaluation.is_some());
        // The failed role was not re-dispatched for round 1; its only other
        // call is the round-2 dispatch.
        let critic_calls = gateway.calls_for(ParticipantRole::Critic);
        assert_eq!(critic_calls.len(), 2);
        assert!(critic_calls[0].contains("ROUND: 1"));
        assert!(critic_calls[1].contains("ROUND: 2"));
        // The two non-failed roles were freshly dispatched on resume.
        assert_eq!(gateway.calls_for(ParticipantRole::Debater).len(), 3);
    }

    #[tokio::test]
    async fn test_orchestrator_delivery_failure() {
        let gateway = Arc::new(ScriptedGateway::new());
        let sink = Arc::new(RecordingSink::new());
        gateway.script(ParticipantRole::Debater, Ok("Yes..."));
        gateway.script(ParticipantRole::Critic, Ok("No..."));
        gateway.script(ParticipantRole::Researcher, Ok("Mixed..."));
        gateway.script(
            ParticipantRole::Orchestrator,
            Err(DispatchError::DeliveryFailed("tab crashed".to_string())),
        );
        let mut machine = machine_with(gateway, sink);

        let state = machine.start_debate("open weights").await.unwrap();
        assert_eq!(state, MachineState::Assisted);
        let pending = machine.pending_assist().unwrap();
        assert_eq!(pending.kind(), "ORCHESTRATOR_SEND");
        assert_eq!(pending.round(), 1);
        // The responses from the successful join stay stored.
        assert_eq!(machine.session().unwrap().round(1).unwrap().responses.len(), 3);
    }

    #[tokio::test]
    async fn test_markerless_reply_pends_original_prompt() {
        let gateway = Arc::new(ScriptedGateway::new());
        let sink = Arc::new(RecordingSink::new());
        gateway.script(ParticipantRole::Debater, Ok("Yes..."));
        gateway.script(ParticipantRole::Critic, Ok("No..."));
        gateway.script(ParticipantRole::Researcher, Ok("Mixed..."));
        // Delivery succeeded; the reply just has no markers.
        gateway.script(ParticipantRole::Orchestrator, Ok("I cannot produce JSON."));
        let mut machine = machine_with(gateway.clone(), sink);

        let topic = "Should AI models be open-sourced?";
        let state = machine.start_debate(topic).await.unwrap();
        assert_eq!(state, MachineState::Assisted);

        let pending = machine.pending_assist().unwrap();
        assert_eq!(pending.kind(), "ORCHESTRATOR_PARSE");

        // Pending text equals the exact prompt sent to the orchestrator,
        // not the malformed reply.
        let responses = machine
            .session()
            .unwrap()
            .round(1)
            .unwrap()
            .responses
            .clone();
        let expected = build_orchestrator_prompt(topic, 1, &responses);
        assert_eq!(pending.prompt(), expected);
        assert_eq!(gateway.calls_for(ParticipantRole::Orchestrator), vec![expected]);
    }

    #[tokio::test]
    async fn test_resolve_not_assisted_rejected() {
        let gateway = Arc::new(ScriptedGateway::new());
        let sink = Arc::new(RecordingSink::new());
        let mut machine = machine_with(gateway.clone(), sink.clone());

        // Before any debate.
        assert_eq!(
            machine.resolve_assisted("text").await.unwrap_err(),
            MachineError::NotAssisted
        );
        assert_eq!(machine.state(), MachineState::Idle);

        // After a completed debate.
        for round in 1u8..=3 {
            script_round(&gateway, round);
        }
        machine.start_debate("open weights").await.unwrap();
        assert_eq!(
            machine.resolve_assisted("text").await.unwrap_err(),
            MachineError::NotAssisted
        );
        assert_eq!(machine.state(), MachineState::Done);
    }

    #[tokio::test]
    async fn test_round2_parse_resolved_proceeds_to_round3() {
        let gateway = Arc::new(ScriptedGateway::new());
        let sink = Arc::new(RecordingSink::new());
        script_round(&gateway, 1);
        // Round 2: responses fine, orchestrator reply unusable.
        gateway.script(ParticipantRole::Debater, Ok("Yes..."));
        gateway.script(ParticipantRole::Critic, Ok("No..."));
        gateway.script(ParticipantRole::Researcher, Ok("Mixed..."));
        gateway.script(ParticipantRole::Orchestrator, Ok("nonsense reply"));
        // Round 3 completes normally once resumed.
        script_round(&gateway, 3);
        let mut machine = machine_with(gateway.clone(), sink.clone());

        let state = machine.start_debate("open weights").await.unwrap();
        assert_eq!(state, MachineState::Assisted);
        assert_eq!(machine.pending_assist().unwrap().kind(), "ORCHESTRATOR_PARSE");
        assert_eq!(machine.pending_assist().unwrap().round(), 2);

        // Human supplies a compliant document; the machine moves on to
        // round 3 using that document's packets.
        let substitute = format_evaluation(&sample_document(2));
        let state = machine.resolve_assisted(&substitute).await.unwrap();
        assert_eq!(state, MachineState::Done);

        let round3_prompts = gateway.calls_for(ParticipantRole::Debater);
        let round3_prompt = round3_prompts.last().unwrap();
        assert!(round3_prompt.contains("ROUND: 3"));
        assert!(round3_prompt.contains("press harder on costs, debater"));
        assert!(round3_prompt.contains("- adoption is accelerating"));

        let session = machine.session().unwrap();
        assert_eq!(session.debate.rounds.len(), 3);
        assert!(session.round(2).unwrap().evaluation.is_some());
    }

    #[tokio::test]
    async fn test_second_parse_failure_suspends_again() {
        let gateway = Arc::new(ScriptedGateway::new());
        let sink = Arc::new(RecordingSink::new());
        gateway.script(ParticipantRole::Debater, Ok("Yes..."));
        gateway.script(ParticipantRole::Critic, Ok("No..."));
        gateway.script(ParticipantRole::Researcher, Ok("Mixed..."));
        gateway.script(ParticipantRole::Orchestrator, Ok("nonsense"));
        let mut machine = machine_with(gateway, sink);

        machine.start_debate("open weights").await.unwrap();
        let before = machine.pending_assist().unwrap().prompt().to_string();

        // A substitute that also fails to parse re-enters Assisted with the
        // same original prompt.
        let state = machine.resolve_assisted("still nonsense").await.unwrap();
        assert_eq!(state, MachineState::Assisted);
        let pending = machine.pending_assist().unwrap();
        assert_eq!(pending.kind(), "ORCHESTRATOR_PARSE");
        assert_eq!(pending.prompt(), before);
    }

    #[tokio::test]
    async fn test_start_rejects_overlap() {
        let gateway = Arc::new(ScriptedGateway::new());
        let sink = Arc::new(RecordingSink::new());
        gateway.script(ParticipantRole::Debater, Err(DispatchError::Timeout));
        gateway.script(ParticipantRole::Critic, Ok("No..."));
        gateway.script(ParticipantRole::Researcher, Ok("Mixed..."));
        let mut machine = machine_with(gateway, sink);

        machine.start_debate("first topic").await.unwrap();
        assert_eq!(machine.state(), MachineState::Assisted);
        assert_eq!(
            machine.start_debate("second topic").await.unwrap_err(),
            MachineError::DebateActive
        );
        // The suspended debate is untouched.
        assert_eq!(machine.session().unwrap().debate.topic, "first topic");
    }

    #[tokio::test]
    async fn test_new_debate_after_done_resets_history() {
        let gateway = Arc::new(ScriptedGateway::new());
        let sink = Arc::new(RecordingSink::new());
        for round in 1u8..=3 {
            script_round(&gateway, round);
        }
        let mut machine = machine_with(gateway.clone(), sink);

        machine.start_debate("first topic").await.unwrap();
        let first_id = machine.session().unwrap().debate.id.clone();

        for round in 1u8..=3 {
            script_round(&gateway, round);
        }
        let state = machine.start_debate("second topic").await.unwrap();
        assert_eq!(state, MachineState::Done);
        let session = machine.session().unwrap();
        assert_ne!(session.debate.id, first_id);
        assert_eq!(session.debate.topic, "second topic");
        assert_eq!(session.debate.rounds.len(), 3);
    }
}
