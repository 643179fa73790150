//! Single-outstanding-command state machine.
//!
//! ```text
//!          begin                    matching reply
//!   Idle ─────────▶ AwaitingReply ─────────────────▶ Idle  (Replied)
//!                        │   deadline passes
//!                        ├──────────────────────────▶ Idle  (TimedOut)
//!                        │   abandon
//!                        └──────────────────────────▶ Idle  (Abandoned)
//! ```
//!
//! Every transition back to `Idle` posts exactly one [`CommandOutcome`],
//! which is handed to exactly one consumer: a thread blocked in
//! [`Correlator::wait`] or a later [`Correlator::take_outcome`] call.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use xremote_protocol::{Reply, Request, RequestId, Validator};

use crate::error::{PeerError, Result};

/// The command currently awaiting a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outstanding {
    pub request: Request,
    pub deadline: Instant,
}

impl Outstanding {
    pub fn id(&self) -> RequestId {
        self.request.id
    }

    pub fn command(&self) -> &str {
        &self.request.command
    }

    pub fn timeout(&self) -> Duration {
        self.request.timeout()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandState {
    Idle,
    AwaitingReply(Outstanding),
}

/// How an outstanding command ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Replied(Reply),
    TimedOut(Outstanding),
    Abandoned(Outstanding),
}

impl CommandOutcome {
    pub fn id(&self) -> RequestId {
        match self {
            CommandOutcome::Replied(reply) => reply.id,
            CommandOutcome::TimedOut(outstanding) | CommandOutcome::Abandoned(outstanding) => {
                outstanding.id()
            }
        }
    }

    /// The reply, or the matching error for a command that got none.
    pub fn into_result(self) -> Result<Reply> {
        match self {
            CommandOutcome::Replied(reply) => Ok(reply),
            CommandOutcome::TimedOut(outstanding) => Err(PeerError::Timeout {
                id: outstanding.id(),
                timeout: outstanding.timeout(),
                command: outstanding.request.command,
            }),
            CommandOutcome::Abandoned(outstanding) => Err(PeerError::Abandoned {
                id: outstanding.id(),
                command: outstanding.request.command,
            }),
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: CommandState,
    finished: Option<CommandOutcome>,
}

/// Tracks the outstanding command of one channel.
///
/// All methods take `&self`; the state sits behind a mutex so a receiving
/// thread can deliver replies while another thread waits.
#[derive(Debug)]
pub struct Correlator {
    validator: Validator,
    inner: Mutex<Inner>,
    changed: Condvar,
}

impl Correlator {
    pub fn new() -> Self {
        Self::with_validator(Validator::new())
    }

    /// Use `validator` to check delivered replies.
    pub fn with_validator(validator: Validator) -> Self {
        Self {
            validator,
            inner: Mutex::new(Inner {
                state: CommandState::Idle,
                finished: None,
            }),
            changed: Condvar::new(),
        }
    }

    /// Record `request` as outstanding, its deadline counted from now.
    ///
    /// Fails with [`PeerError::CommandOutstanding`] while another command is
    /// awaiting its reply; the recorded command is left untouched.
    ///
    /// The previous command's outcome, if nobody claimed it, is handed back
    /// here instead of being dropped.
    pub fn begin(&self, request: &Request) -> Result<Option<CommandOutcome>> {
        self.begin_at(request, Instant::now())
    }

    /// [`Correlator::begin`] with an explicit start time.
    pub fn begin_at(&self, request: &Request, now: Instant) -> Result<Option<CommandOutcome>> {
        let mut inner = self.lock();
        if Self::expire_locked(&mut inner, now) {
            self.changed.notify_all();
        }

        if let CommandState::AwaitingReply(current) = &inner.state {
            return Err(PeerError::CommandOutstanding {
                id: current.id(),
                command: current.command().to_string(),
            });
        }

        let unclaimed = inner.finished.take();
        if let Some(stale) = &unclaimed {
            tracing::warn!(id = %stale.id(), "previous command finished unclaimed");
        }

        tracing::debug!(id = %request.id, command = %request.command, "command outstanding");
        inner.state = CommandState::AwaitingReply(Outstanding {
            request: request.clone(),
            deadline: now + request.timeout(),
        });
        Ok(unclaimed)
    }

    /// Offer a received reply.
    ///
    /// A reply that answers the outstanding request completes it and its id
    /// is returned. Anything else is rejected and the command stays
    /// outstanding.
    pub fn deliver_reply(&self, text: &str) -> Result<RequestId> {
        self.deliver_reply_at(text, Instant::now())
    }

    /// [`Correlator::deliver_reply`] at an explicit time.
    pub fn deliver_reply_at(&self, text: &str, now: Instant) -> Result<RequestId> {
        let mut inner = self.lock();
        Self::expire_locked(&mut inner, now);

        let CommandState::AwaitingReply(outstanding) = &inner.state else {
            tracing::warn!("reply received while no command is outstanding");
            return Err(PeerError::UnsolicitedReply(
                "no command is outstanding".to_string(),
            ));
        };

        let reply = match self.validator.validate_reply_to(&outstanding.request, text) {
            Ok(reply) => reply,
            Err(err) => {
                tracing::warn!(
                    id = %outstanding.id(),
                    code = %err.code,
                    reason = %err.message,
                    "reply rejected"
                );
                return Err(PeerError::ReplyRejected(err));
            }
        };

        let id = reply.id;
        tracing::debug!(%id, code = %reply.return_code, "reply accepted");
        Self::finish_locked(&mut inner, CommandOutcome::Replied(reply));
        self.changed.notify_all();
        Ok(id)
    }

    /// Block until the command `id` completes, times out or is abandoned.
    ///
    /// Returns [`PeerError::NotOutstanding`] when `id` is neither outstanding
    /// nor waiting to be claimed.
    pub fn wait(&self, id: RequestId) -> Result<Reply> {
        let mut inner = self.lock();
        loop {
            if inner.finished.as_ref().is_some_and(|outcome| outcome.id() == id) {
                if let Some(outcome) = inner.finished.take() {
                    return outcome.into_result();
                }
            }

            let deadline = match &inner.state {
                CommandState::AwaitingReply(outstanding) if outstanding.id() == id => {
                    outstanding.deadline
                }
                _ => return Err(PeerError::NotOutstanding),
            };

            let now = Instant::now();
            if now >= deadline {
                if Self::expire_locked(&mut inner, now) {
                    self.changed.notify_all();
                }
                continue;
            }

            let (guard, _) = self
                .changed
                .wait_timeout(inner, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            inner = guard;
        }
    }

    /// Time out the outstanding command if its deadline has passed.
    ///
    /// Returns true when a command was timed out by this call.
    pub fn expire_overdue(&self) -> bool {
        self.expire_overdue_at(Instant::now())
    }

    /// [`Correlator::expire_overdue`] at an explicit time.
    pub fn expire_overdue_at(&self, now: Instant) -> bool {
        let mut inner = self.lock();
        let expired = Self::expire_locked(&mut inner, now);
        if expired {
            self.changed.notify_all();
        }
        expired
    }

    /// Drop the outstanding command without a reply.
    ///
    /// Returns the dropped command, or `None` when idle.
    pub fn abandon(&self) -> Option<Outstanding> {
        let mut inner = self.lock();
        let CommandState::AwaitingReply(outstanding) =
            std::mem::replace(&mut inner.state, CommandState::Idle)
        else {
            return None;
        };

        tracing::info!(id = %outstanding.id(), command = %outstanding.command(), "command abandoned");
        Self::finish_locked(&mut inner, CommandOutcome::Abandoned(outstanding.clone()));
        self.changed.notify_all();
        Some(outstanding)
    }

    /// Claim the outcome of the last finished command, if not yet claimed.
    pub fn take_outcome(&self) -> Option<CommandOutcome> {
        self.current().finished.take()
    }

    /// Name of the outstanding command, if any.
    ///
    /// `None` means a request may be sent now.
    pub fn current_command(&self) -> Option<String> {
        match &self.current().state {
            CommandState::AwaitingReply(outstanding) => Some(outstanding.command().to_string()),
            CommandState::Idle => None,
        }
    }

    pub fn outstanding_id(&self) -> Option<RequestId> {
        match &self.current().state {
            CommandState::AwaitingReply(outstanding) => Some(outstanding.id()),
            CommandState::Idle => None,
        }
    }

    /// Deadline of the outstanding command, if any.
    pub fn deadline(&self) -> Option<Instant> {
        match &self.current().state {
            CommandState::AwaitingReply(outstanding) => Some(outstanding.deadline),
            CommandState::Idle => None,
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> CommandState {
        self.current().state.clone()
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.current().state, CommandState::Idle)
    }

    /// Lock with any passed deadline already applied.
    fn current(&self) -> MutexGuard<'_, Inner> {
        let mut inner = self.lock();
        if Self::expire_locked(&mut inner, Instant::now()) {
            self.changed.notify_all();
        }
        inner
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn expire_locked(inner: &mut Inner, now: Instant) -> bool {
        let overdue = matches!(
            &inner.state,
            CommandState::AwaitingReply(outstanding) if now >= outstanding.deadline
        );
        if !overdue {
            return false;
        }

        if let CommandState::AwaitingReply(outstanding) =
            std::mem::replace(&mut inner.state, CommandState::Idle)
        {
            tracing::info!(
                id = %outstanding.id(),
                command = %outstanding.command(),
                timeout = ?outstanding.timeout(),
                "command timed out"
            );
            Self::finish_locked(inner, CommandOutcome::TimedOut(outstanding));
        }
        true
    }

    fn finish_locked(inner: &mut Inner, outcome: CommandOutcome) {
        inner.state = CommandState::Idle;
        inner.finished = Some(outcome);
    }
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use xremote_protocol::{CommandRc, ReplyBuilder, RequestBuilder};

    use super::*;

    fn request(id: u64, command: &str, timeout_secs: u32) -> Request {
        RequestBuilder::new(command)
            .timeout_secs(timeout_secs)
            .build_with_id(RequestId::new(id).unwrap())
            .unwrap()
            .request
    }

    fn reply_text(request: &Request) -> String {
        ReplyBuilder::for_request(request).build().unwrap()
    }

    fn reply_with_id(id: u64, command: &str) -> String {
        ReplyBuilder::new(RequestId::new(id).unwrap(), command)
            .build()
            .unwrap()
    }

    #[test]
    fn ping_reply_completes_command() {
        let correlator = Correlator::new();
        let ping = request(1, "ping", 5);

        correlator.begin(&ping).unwrap();
        assert_eq!(correlator.current_command().as_deref(), Some("ping"));

        assert_eq!(correlator.deliver_reply(&reply_text(&ping)).unwrap(), ping.id);
        assert!(correlator.is_idle());

        let reply = correlator.wait(ping.id).unwrap();
        assert_eq!(reply.return_code, CommandRc::Ok);
        assert_eq!(reply.reason, "");
    }

    #[test]
    fn second_begin_is_rejected_without_touching_first() {
        let correlator = Correlator::new();
        let first = request(1, "zoom_to", 30);
        correlator.begin(&first).unwrap();
        let before = correlator.state();

        let err = correlator.begin(&request(2, "ping", 5)).unwrap_err();
        assert!(matches!(
            err,
            PeerError::CommandOutstanding { ref command, .. } if command == "zoom_to"
        ));
        assert_eq!(correlator.state(), before);
        assert_eq!(correlator.outstanding_id(), Some(first.id));
    }

    #[test]
    fn mismatched_reply_keeps_command_outstanding() {
        let correlator = Correlator::new();
        let seven = request(7, "ping", 5);
        correlator.begin(&seven).unwrap();

        let err = correlator.deliver_reply(&reply_with_id(8, "ping")).unwrap_err();
        match err {
            PeerError::ReplyRejected(inner) => {
                assert_eq!(inner.code, xremote_protocol::ValidateRc::BodyContent)
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(correlator.outstanding_id(), Some(seven.id));
        assert!(correlator.take_outcome().is_none());

        correlator.deliver_reply(&reply_text(&seven)).unwrap();
        assert!(correlator.is_idle());
    }

    #[test]
    fn malformed_reply_is_rejected() {
        let correlator = Correlator::new();
        correlator.begin(&request(1, "ping", 5)).unwrap();

        let err = correlator.deliver_reply("<envelope><reply").unwrap_err();
        assert!(matches!(err, PeerError::ReplyRejected(ref inner) if inner.is_xml()));
        assert!(!correlator.is_idle());
    }

    #[test]
    fn reply_while_idle_is_unsolicited() {
        let correlator = Correlator::new();
        let err = correlator
            .deliver_reply(&reply_with_id(1, "ping"))
            .unwrap_err();
        assert!(matches!(err, PeerError::UnsolicitedReply(_)));
    }

    #[test]
    fn timeout_returns_to_idle_and_is_reported_once() {
        let correlator = Correlator::new();
        let start = Instant::now();
        let ping = request(3, "ping", 5);
        correlator.begin_at(&ping, start).unwrap();

        assert!(!correlator.expire_overdue_at(start + Duration::from_secs(4)));
        assert!(correlator.expire_overdue_at(start + Duration::from_secs(5)));
        assert!(!correlator.expire_overdue_at(start + Duration::from_secs(6)));
        assert!(correlator.is_idle());

        let err = correlator.wait(ping.id).unwrap_err();
        assert!(matches!(err, PeerError::Timeout { id, .. } if id == ping.id));
        assert!(matches!(correlator.wait(ping.id), Err(PeerError::NotOutstanding)));
        assert!(correlator.take_outcome().is_none());
    }

    #[test]
    fn late_reply_after_timeout_is_unsolicited() {
        let correlator = Correlator::new();
        let start = Instant::now();
        let ping = request(4, "ping", 1);
        correlator.begin_at(&ping, start).unwrap();

        let err = correlator
            .deliver_reply_at(&reply_text(&ping), start + Duration::from_secs(2))
            .unwrap_err();
        assert!(matches!(err, PeerError::UnsolicitedReply(_)));
        assert!(matches!(
            correlator.take_outcome(),
            Some(CommandOutcome::TimedOut(_))
        ));
    }

    #[test]
    fn abandon_forces_idle() {
        let correlator = Correlator::new();
        assert!(correlator.abandon().is_none());

        let ping = request(5, "ping", 5);
        correlator.begin(&ping).unwrap();
        let dropped = correlator.abandon().unwrap();
        assert_eq!(dropped.id(), ping.id);
        assert!(correlator.current_command().is_none());

        assert!(matches!(
            correlator.wait(ping.id),
            Err(PeerError::Abandoned { .. })
        ));
        correlator.begin(&request(6, "ping", 5)).unwrap();
    }

    #[test]
    fn wait_blocks_until_reply_from_other_thread() {
        let correlator = Arc::new(Correlator::new());
        let ping = request(9, "ping", 5);
        correlator.begin(&ping).unwrap();

        let receiver = {
            let correlator = Arc::clone(&correlator);
            let text = reply_text(&ping);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                correlator.deliver_reply(&text).unwrap();
            })
        };

        let reply = correlator.wait(ping.id).unwrap();
        assert_eq!(reply.id, ping.id);
        receiver.join().unwrap();
        assert!(correlator.take_outcome().is_none());
    }

    #[test]
    fn wait_times_out_on_its_own() {
        let correlator = Correlator::new();
        let ping = request(10, "ping", 1);
        correlator.begin(&ping).unwrap();

        let started = Instant::now();
        let err = correlator.wait(ping.id).unwrap_err();
        assert!(matches!(err, PeerError::Timeout { .. }));
        assert!(started.elapsed() >= Duration::from_secs(1));
        assert!(correlator.is_idle());
    }

    #[test]
    fn abandon_wakes_waiter() {
        let correlator = Arc::new(Correlator::new());
        let ping = request(11, "ping", 30);
        correlator.begin(&ping).unwrap();

        let waiter = {
            let correlator = Arc::clone(&correlator);
            thread::spawn(move || correlator.wait(ping.id))
        };

        thread::sleep(Duration::from_millis(50));
        correlator.abandon().unwrap();
        let result = waiter.join().unwrap();
        assert!(matches!(result, Err(PeerError::Abandoned { .. })));
    }

    #[test]
    fn queries_see_passed_deadline() {
        let correlator = Correlator::new();
        let ping = request(12, "ping", 1);
        correlator
            .begin_at(&ping, Instant::now() - Duration::from_secs(10))
            .unwrap();

        assert!(correlator.current_command().is_none());
        assert!(correlator.is_idle());
        assert_eq!(correlator.state(), CommandState::Idle);
        assert!(correlator.deadline().is_none());
        assert!(matches!(
            correlator.take_outcome(),
            Some(CommandOutcome::TimedOut(ref outstanding)) if outstanding.id() == ping.id
        ));
    }

    #[test]
    fn overdue_timeout_is_handed_to_next_begin() {
        let correlator = Correlator::new();
        let first = request(13, "zoom_to", 1);
        correlator
            .begin_at(&first, Instant::now() - Duration::from_secs(10))
            .unwrap();

        let unclaimed = correlator.begin(&request(14, "ping", 5)).unwrap();
        assert!(matches!(
            unclaimed,
            Some(CommandOutcome::TimedOut(ref outstanding)) if outstanding.id() == first.id
        ));
        assert_eq!(correlator.current_command().as_deref(), Some("ping"));
    }

    #[test]
    fn claimed_outcome_is_not_handed_back() {
        let correlator = Correlator::new();
        let ping = request(15, "ping", 5);
        correlator.begin(&ping).unwrap();
        correlator.deliver_reply(&reply_text(&ping)).unwrap();
        assert!(correlator.wait(ping.id).is_ok());

        assert!(correlator.begin(&request(16, "ping", 5)).unwrap().is_none());
    }

    #[test]
    fn wait_for_unknown_id_fails() {
        let correlator = Correlator::new();
        correlator.begin(&request(1, "ping", 5)).unwrap();
        let err = correlator.wait(RequestId::new(2).unwrap()).unwrap_err();
        assert!(matches!(err, PeerError::NotOutstanding));
    }
}
