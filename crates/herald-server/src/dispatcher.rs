//! Per-request state machine: resolve, check arity, authorize, execute.
//!
//! `handle` never fails past its boundary. Every terminal outcome, success or
//! rejection, is queued to the originating session as a [`Response`] and also
//! returned to the caller.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use herald_core::{CommandError, SessionId};
use metrics::{counter, histogram};
use tracing::{debug, error, instrument, warn};

use crate::command::Payload;
use crate::hub::Hub;
use crate::protocol::Response;
use crate::registry::CommandRegistry;
use crate::session::Session;

/// Result of dispatching one payload: response detail or the rejection.
pub type Outcome = Result<Vec<String>, CommandError>;

/// Metric label used for opcodes that are not registered.
const UNKNOWN_OPCODE_LABEL: &str = "unknown";

/// Requests slower than this are logged at `warn`.
const SLOW_COMMAND: Duration = Duration::from_millis(250);

/// Validate a payload length against a command's declared bounds.
pub fn check_arity(
    opcode: &str,
    min: usize,
    max: Option<usize>,
    actual: usize,
) -> Result<(), CommandError> {
    if actual < min || max.is_some_and(|m| actual > m) {
        return Err(CommandError::Arity {
            opcode: opcode.to_owned(),
            min,
            max,
            actual,
        });
    }
    Ok(())
}

/// Routes payloads from sessions to registered commands.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<CommandRegistry>,
    hub: Arc<Hub>,
}

impl Dispatcher {
    /// Dispatch into `registry` against the shared `hub`.
    pub fn new(registry: Arc<CommandRegistry>, hub: Arc<Hub>) -> Self {
        Self { registry, hub }
    }

    /// The shared registries.
    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    /// The command registry.
    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    /// Register a newly accepted session.
    pub fn on_connect(&self, session: Arc<Session>) {
        self.hub.connect(session);
    }

    /// Purge a session from every topic and from the connected set.
    pub fn on_disconnect(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.hub.disconnect(id)
    }

    /// Handle one decoded payload from `session`.
    #[instrument(skip_all, fields(session_id = %session.id(), opcode))]
    pub async fn handle(&self, session: &Arc<Session>, parts: Vec<String>) -> Outcome {
        let payload = Payload::new(parts);
        let opcode = payload.opcode().unwrap_or_default().to_owned();
        let _ = tracing::Span::current().record("opcode", opcode.as_str());

        let label = if self.registry.has_command(&opcode) {
            opcode.clone()
        } else {
            UNKNOWN_OPCODE_LABEL.to_owned()
        };
        counter!("commands_total", "opcode" => label.clone()).increment(1);

        let start = Instant::now();
        let outcome = self.run(&opcode, &payload, session).await;
        let duration = start.elapsed();
        histogram!("command_duration_seconds", "opcode" => label.clone())
            .record(duration.as_secs_f64());

        match &outcome {
            Ok(detail) => debug!(detail_len = detail.len(), "command executed"),
            Err(err) => {
                counter!(
                    "command_errors_total",
                    "opcode" => label,
                    "error_type" => err.code()
                )
                .increment(1);
                if err.is_internal() {
                    error!(error = %err, "internal failure while executing command");
                } else {
                    debug!(code = err.code(), error = %err, "command rejected");
                }
            }
        }

        if duration >= SLOW_COMMAND {
            warn!(
                duration_ms = duration.as_secs_f64() * 1000.0,
                "slow command"
            );
        }

        if !session.respond(Response::from_outcome(&opcode, &outcome)) {
            warn!("failed to enqueue response (channel full or closed)");
        }
        outcome
    }

    async fn run(&self, opcode: &str, payload: &Payload, session: &Arc<Session>) -> Outcome {
        let command = self.registry.resolve(opcode)?;
        check_arity(
            opcode,
            command.minimal_args(),
            command.maximal_args(),
            payload.len(),
        )?;
        if !command.can_execute(session) {
            return Err(CommandError::Authorization {
                opcode: opcode.to_owned(),
                reason: command.denial_reason(session),
            });
        }

        match AssertUnwindSafe(command.execute(payload, session, &self.hub))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(&*panic);
                error!(panic = %message, "command panicked during execution");
                Err(CommandError::Internal {
                    message: format!("command '{opcode}' panicked: {message}"),
                })
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic")
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use herald_core::errors::{
        ARITY_ERROR, AUTHORIZATION_ERROR, EXECUTION_ERROR, INTERNAL_ERROR, UNKNOWN_COMMAND,
    };
    use herald_core::logging::capture_logs;
    use proptest::prelude::*;
    use tokio::sync::mpsc;
    use tracing::Level;

    use crate::auth::StaticTokenAuthenticator;
    use crate::command::{Command, CommandKind};
    use crate::commands::FanOut;
    use crate::commands::test_helpers::{authenticated, connected, drain, messages};
    use crate::protocol::Outbound;

    fn parts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    fn dispatcher(fanout: FanOut) -> Dispatcher {
        let auth = StaticTokenAuthenticator::new([("token1", "alice"), ("token2", "bob")]);
        let registry = CommandRegistry::standard(Arc::new(auth), fanout);
        Dispatcher::new(Arc::new(registry), Arc::new(Hub::new()))
    }

    fn responses(rx: &mut mpsc::Receiver<Outbound>) -> Vec<Response> {
        drain(rx)
            .into_iter()
            .filter_map(|item| match item {
                Outbound::Response(r) => Some(r),
                Outbound::Message { .. } => None,
            })
            .collect()
    }

    /// Counts executions; declared bounds come from the constructor.
    struct CountingCommand {
        min: usize,
        max: Option<usize>,
        runs: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Command for CountingCommand {
        fn minimal_args(&self) -> usize {
            self.min
        }

        fn maximal_args(&self) -> Option<usize> {
            self.max
        }

        fn kind(&self) -> CommandKind {
            CommandKind::Authentication
        }

        async fn execute(
            &self,
            _payload: &Payload,
            _session: &Arc<Session>,
            _hub: &Hub,
        ) -> Result<Vec<String>, CommandError> {
            let _ = self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    /// Declares one element but reads two.
    struct MisdeclaredCommand;

    #[async_trait]
    impl Command for MisdeclaredCommand {
        fn minimal_args(&self) -> usize {
            1
        }

        fn maximal_args(&self) -> Option<usize> {
            Some(1)
        }

        fn kind(&self) -> CommandKind {
            CommandKind::Authentication
        }

        async fn execute(
            &self,
            payload: &Payload,
            _session: &Arc<Session>,
            _hub: &Hub,
        ) -> Result<Vec<String>, CommandError> {
            let topic = payload.arg(1)?;
            Ok(vec![topic.to_owned()])
        }
    }

    struct PanickingCommand;

    #[async_trait]
    impl Command for PanickingCommand {
        fn minimal_args(&self) -> usize {
            1
        }

        fn maximal_args(&self) -> Option<usize> {
            None
        }

        fn kind(&self) -> CommandKind {
            CommandKind::Authentication
        }

        async fn execute(
            &self,
            _payload: &Payload,
            _session: &Arc<Session>,
            _hub: &Hub,
        ) -> Result<Vec<String>, CommandError> {
            panic!("boom");
        }
    }

    // ── Arity ───────────────────────────────────────────────────────

    #[test]
    fn check_arity_bounds() {
        assert!(check_arity("SUB", 2, Some(2), 2).is_ok());
        assert!(check_arity("PUB", 2, None, 50).is_ok());
        assert_matches!(
            check_arity("SUB", 2, Some(2), 1),
            Err(CommandError::Arity { min: 2, max: Some(2), actual: 1, .. })
        );
        assert_matches!(
            check_arity("SUB", 2, Some(2), 3),
            Err(CommandError::Arity { actual: 3, .. })
        );
    }

    proptest! {
        #[test]
        fn execution_attempted_iff_arity_holds(
            min in 1usize..5,
            extra in proptest::option::of(0usize..4),
            n in 1usize..10,
        ) {
            let max = extra.map(|e| min + e);
            let runs = Arc::new(AtomicUsize::new(0));
            let mut registry = CommandRegistry::new();
            registry.register("X", CountingCommand { min, max, runs: runs.clone() });
            let dispatcher = Dispatcher::new(Arc::new(registry), Arc::new(Hub::new()));

            let mut payload = vec!["X".to_owned()];
            payload.extend((1..n).map(|i| format!("a{i}")));

            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let outcome = rt.block_on(async {
                let (session, _rx) = connected(dispatcher.hub());
                dispatcher.handle(&session, payload).await
            });

            let in_range = n >= min && max.is_none_or(|m| n <= m);
            prop_assert_eq!(runs.load(Ordering::SeqCst), usize::from(in_range));
            if in_range {
                prop_assert!(outcome.is_ok());
            } else {
                prop_assert_eq!(outcome.unwrap_err().code(), ARITY_ERROR);
            }
            prop_assert_eq!(dispatcher.hub().topic_count(), 0);
        }
    }

    #[tokio::test]
    async fn arity_error_mutates_nothing() {
        let d = dispatcher(FanOut::ExcludeSender);
        let (s1, mut rx) = authenticated(d.hub());
        let err = d.handle(&s1, parts(&["SUB", "room1", "extra"])).await.unwrap_err();
        assert_eq!(err.code(), ARITY_ERROR);
        assert_eq!(d.hub().topic_count(), 0);

        let resp = responses(&mut rx);
        assert_eq!(resp.len(), 1);
        assert_eq!(resp[0].opcode, "SUB");
        assert_eq!(resp[0].error_code(), Some(ARITY_ERROR));
    }

    // ── Resolution ──────────────────────────────────────────────────

    #[tokio::test]
    async fn unknown_opcode_is_reported_and_mutates_nothing() {
        let d = dispatcher(FanOut::ExcludeSender);
        let (s1, mut rx) = connected(d.hub());
        let err = d.handle(&s1, parts(&["FLY", "room1"])).await.unwrap_err();
        assert_matches!(err, CommandError::UnknownCommand { ref opcode } if opcode == "FLY");
        assert!(!s1.is_authenticated());
        assert_eq!(d.hub().topic_count(), 0);
        assert_eq!(d.hub().session_count(), 1);

        let resp = responses(&mut rx);
        assert_eq!(resp[0].error_code(), Some(UNKNOWN_COMMAND));
    }

    #[tokio::test]
    async fn empty_payload_is_unknown_command() {
        let d = dispatcher(FanOut::ExcludeSender);
        let (s1, mut rx) = connected(d.hub());
        let err = d.handle(&s1, Vec::new()).await.unwrap_err();
        assert_eq!(err.code(), UNKNOWN_COMMAND);
        let resp = responses(&mut rx);
        assert!(resp[0].opcode.is_empty());
    }

    // ── Authorization ───────────────────────────────────────────────

    #[tokio::test]
    async fn command_kind_requires_authentication() {
        let d = dispatcher(FanOut::ExcludeSender);
        let (s1, mut rx) = connected(d.hub());
        for payload in [
            parts(&["SUB", "room1"]),
            parts(&["UNSUB", "room1"]),
            parts(&["PUB", "room1", "x"]),
            parts(&["NICK", "alice"]),
            parts(&["TOPICS"]),
        ] {
            let err = d.handle(&s1, payload).await.unwrap_err();
            assert_eq!(err.code(), AUTHORIZATION_ERROR);
        }
        assert_eq!(d.hub().topic_count(), 0);
        assert!(
            responses(&mut rx)
                .iter()
                .all(|r| r.error_code() == Some(AUTHORIZATION_ERROR))
        );
    }

    #[tokio::test]
    async fn authentication_kind_allowed_unauthenticated() {
        let d = dispatcher(FanOut::ExcludeSender);
        let (s1, _rx) = connected(d.hub());
        assert_eq!(d.handle(&s1, parts(&["PING"])).await.unwrap(), vec!["PONG"]);
        assert_eq!(
            d.handle(&s1, parts(&["AUTH", "token1"])).await.unwrap(),
            vec!["alice"]
        );
        assert!(s1.is_authenticated());
    }

    #[tokio::test]
    async fn second_auth_fails_without_changing_principal() {
        let d = dispatcher(FanOut::ExcludeSender);
        let (s1, _rx) = connected(d.hub());
        let _ = d.handle(&s1, parts(&["AUTH", "token1"])).await.unwrap();
        let err = d.handle(&s1, parts(&["AUTH", "token2"])).await.unwrap_err();
        assert_matches!(err, CommandError::Execution { code, .. } if code == EXECUTION_ERROR);
        assert!(s1.is_authenticated());
        assert_eq!(
            s1.attribute(crate::session::PRINCIPAL_ATTRIBUTE).as_deref(),
            Some("alice")
        );
    }

    #[tokio::test]
    async fn failed_auth_keeps_session_unauthenticated() {
        let d = dispatcher(FanOut::ExcludeSender);
        let (s1, mut rx) = connected(d.hub());
        let err = d.handle(&s1, parts(&["AUTH", "bad"])).await.unwrap_err();
        assert_eq!(err.code(), "AUTH_FAILED");
        assert!(!s1.is_authenticated());
        assert_eq!(responses(&mut rx)[0].error_code(), Some("AUTH_FAILED"));
    }

    // ── Scenarios ───────────────────────────────────────────────────

    async fn two_followers(
        d: &Dispatcher,
    ) -> (
        (Arc<Session>, mpsc::Receiver<Outbound>),
        (Arc<Session>, mpsc::Receiver<Outbound>),
    ) {
        let (s1, rx1) = connected(d.hub());
        let _ = d.handle(&s1, parts(&["AUTH", "token1"])).await.unwrap();
        assert!(s1.is_authenticated());
        let _ = d.handle(&s1, parts(&["SUB", "room1"])).await.unwrap();
        assert_eq!(d.hub().followers("room1"), vec![s1.id().clone()]);

        let (s2, rx2) = connected(d.hub());
        let _ = d.handle(&s2, parts(&["AUTH", "token2"])).await.unwrap();
        let _ = d.handle(&s2, parts(&["SUB", "room1"])).await.unwrap();
        assert_eq!(
            d.hub().followers("room1"),
            vec![s1.id().clone(), s2.id().clone()]
        );
        ((s1, rx1), (s2, rx2))
    }

    #[tokio::test]
    async fn publish_excludes_sender_by_default() {
        let d = dispatcher(FanOut::ExcludeSender);
        let ((s1, mut rx1), (_s2, mut rx2)) = two_followers(&d).await;
        let _ = drain(&mut rx1);
        let _ = drain(&mut rx2);

        let detail = d.handle(&s1, parts(&["PUB", "room1", "hello"])).await.unwrap();
        assert_eq!(detail, vec!["room1", "1"]);
        assert_eq!(messages(&mut rx2), vec![vec!["hello"]]);

        let own = drain(&mut rx1);
        assert_eq!(own.len(), 1);
        assert_matches!(&own[0], Outbound::Response(r) if r.opcode == "PUB" && r.success);
    }

    #[tokio::test]
    async fn publish_includes_sender_when_echo_enabled() {
        let d = dispatcher(FanOut::IncludeSender);
        let ((s1, mut rx1), (_s2, mut rx2)) = two_followers(&d).await;
        let _ = drain(&mut rx1);
        let _ = drain(&mut rx2);

        let detail = d.handle(&s1, parts(&["PUB", "room1", "hello"])).await.unwrap();
        assert_eq!(detail, vec!["room1", "2"]);
        assert_eq!(messages(&mut rx1), vec![vec!["hello"]]);
        assert_eq!(messages(&mut rx2), vec![vec!["hello"]]);
    }

    #[tokio::test]
    async fn publish_after_follower_disconnects() {
        let d = dispatcher(FanOut::ExcludeSender);
        let ((s1, mut rx1), (s2, rx2)) = two_followers(&d).await;
        let _ = drain(&mut rx1);

        let _ = d.on_disconnect(s2.id());
        drop(rx2);
        assert_eq!(d.hub().followers("room1"), vec![s1.id().clone()]);
        assert!(d.hub().is_consistent());

        let detail = d.handle(&s1, parts(&["PUB", "room1", "hello"])).await.unwrap();
        assert_eq!(detail, vec!["room1", "0"]);
        assert_eq!(s2.drop_count(), 0);
        let resp = responses(&mut rx1);
        assert!(resp[0].success);
    }

    #[tokio::test]
    async fn responses_follow_issue_order() {
        let d = dispatcher(FanOut::ExcludeSender);
        let (s1, mut rx) = connected(d.hub());
        for payload in [
            parts(&["PING"]),
            parts(&["AUTH", "token1"]),
            parts(&["SUB", "a"]),
            parts(&["SUB", "b"]),
            parts(&["TOPICS"]),
        ] {
            let _ = d.handle(&s1, payload).await;
        }
        let resp = responses(&mut rx);
        let opcodes: Vec<&str> = resp.iter().map(|r| r.opcode.as_str()).collect();
        assert_eq!(opcodes, vec!["PING", "AUTH", "SUB", "SUB", "TOPICS"]);
        assert_eq!(resp[4].detail, vec!["a", "b"]);
    }

    // ── Failure isolation ───────────────────────────────────────────

    #[tokio::test]
    async fn contract_violation_is_logged_and_sanitized() {
        let (logs, _guard) = capture_logs();
        let mut registry = CommandRegistry::new();
        registry.register("BAD", MisdeclaredCommand);
        let d = Dispatcher::new(Arc::new(registry), Arc::new(Hub::new()));
        let (s1, mut rx) = connected(d.hub());

        let err = d.handle(&s1, parts(&["BAD"])).await.unwrap_err();
        assert_matches!(err, CommandError::ContractViolation { index: 1, len: 1, .. });

        let resp = responses(&mut rx);
        let body = resp[0].error.as_ref().unwrap();
        assert_eq!(body.code, INTERNAL_ERROR);
        assert_eq!(body.message, "Internal error");
        assert!(logs.has_event(Level::ERROR, "internal failure"));
    }

    #[tokio::test]
    async fn panic_in_execute_is_contained() {
        let (logs, _guard) = capture_logs();
        let mut registry = CommandRegistry::new();
        registry.register("BOOM", PanickingCommand);
        registry.register("PING", crate::commands::PingCommand);
        let d = Dispatcher::new(Arc::new(registry), Arc::new(Hub::new()));
        let (s1, mut rx) = connected(d.hub());

        let err = d.handle(&s1, parts(&["BOOM"])).await.unwrap_err();
        assert_matches!(err, CommandError::Internal { ref message } if message.contains("boom"));
        assert!(logs.has_event(Level::ERROR, "panicked"));

        assert!(d.handle(&s1, parts(&["PING"])).await.is_ok());
        let resp = responses(&mut rx);
        assert_eq!(resp[0].error_code(), Some(INTERNAL_ERROR));
        assert!(resp[1].success);
    }

    #[tokio::test]
    async fn full_response_channel_still_returns_outcome() {
        let d = dispatcher(FanOut::ExcludeSender);
        let (s1, _rx) = Session::channel(1);
        d.on_connect(s1.clone());
        assert!(d.handle(&s1, parts(&["PING"])).await.is_ok());
        assert!(d.handle(&s1, parts(&["PING"])).await.is_ok());
        assert_eq!(s1.drop_count(), 1);
    }

    #[test]
    fn panic_message_variants() {
        let s: Box<dyn std::any::Any + Send> = Box::new("static");
        assert_eq!(panic_message(&*s), "static");
        let owned: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(&*owned), "owned");
        let other: Box<dyn std::any::Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(&*other), "unknown panic");
    }
}
