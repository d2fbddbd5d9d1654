//! The polling loop.
//!
//! Cycle flow:
//! fetch → check → newest record changed? → format → notify → advance cursor
//!
//! All loop state lives in [`PollState`], which each cycle takes by value
//! and hands back. Nothing escapes a cycle as an error: failures become
//! (de-duplicated) chat notifications and the loop sleeps either way.

use crate::client::{Notifier, StatusSource};
use crate::models::{BOT_STARTED_MESSAGE, BotError, FAILURE_PREFIX, ResponseError, Result};
use crate::pipeline::{check_response, parse_status};
use chrono::Utc;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// State carried from one cycle to the next.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollState {
    /// Lower bound (Unix seconds) for the next query
    pub cursor: i64,
    /// Last submission record we notified about
    pub previous: Option<Value>,
    /// Last error notification text delivered
    pub last_error: Option<String>,
    /// Last "no updates" text reported
    pub last_info: Option<String>,
}

impl PollState {
    pub fn new(cursor: i64) -> Self {
        Self {
            cursor,
            ..Self::default()
        }
    }

    /// Fresh state with the cursor at the current time.
    pub fn starting_now() -> Self {
        Self::new(Utc::now().timestamp())
    }
}

/// Which path a cycle took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Newest submission changed and the verdict was sent
    Notified,
    /// Newest submission is the one already reported
    Unchanged,
    /// The API returned no homework
    NoUpdates,
    /// The cycle failed; the error was reported or suppressed as a repeat
    Failed,
}

/// Drives the fetch/notify cycle at a fixed period.
pub struct Poller<S, N> {
    source: S,
    notifier: N,
    retry_period: Duration,
}

impl<S: StatusSource, N: Notifier> Poller<S, N> {
    pub fn new(source: S, notifier: N, retry_period: Duration) -> Self {
        Self {
            source,
            notifier,
            retry_period,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn retry_period(&self) -> Duration {
        self.retry_period
    }

    /// Poll forever. Returns only if the task is dropped.
    pub async fn run(&self, mut state: PollState) {
        info!(
            cursor = state.cursor,
            retry_period_secs = self.retry_period.as_secs(),
            "Starting homework status polling"
        );
        loop {
            (state, _) = self.tick(state).await;
        }
    }

    /// One cycle followed by the fixed delay, whatever the outcome.
    pub async fn tick(&self, state: PollState) -> (PollState, CycleOutcome) {
        let result = self.cycle(state).await;
        tokio::time::sleep(self.retry_period).await;
        result
    }

    /// Run one cycle and route its error, if any.
    pub async fn cycle(&self, mut state: PollState) -> (PollState, CycleOutcome) {
        let outcome = match self.process(&mut state).await {
            Ok(outcome) => outcome,
            Err(err) => match err.no_updates_date() {
                Some(current_date) => {
                    self.report_no_updates(&mut state, &err).await;
                    state.cursor = current_date;
                    CycleOutcome::NoUpdates
                }
                None => {
                    self.report_failure(&mut state, &err).await;
                    CycleOutcome::Failed
                }
            },
        };
        debug!(?outcome, cursor = state.cursor, "Cycle finished");
        (state, outcome)
    }

    async fn process(&self, state: &mut PollState) -> Result<CycleOutcome> {
        let response = self.source.get_api_answer(state.cursor).await?;
        let checked = check_response(&response)?;

        let outcome = match checked.newest() {
            Some(newest) if state.previous.as_ref() != Some(newest) => {
                let message = parse_status(newest)?;
                self.notifier.send_message(&message).await?;
                info!(%message, "Homework status change reported");
                state.previous = Some(newest.clone());
                CycleOutcome::Notified
            }
            _ => {
                debug!("Newest homework unchanged, nothing to send");
                CycleOutcome::Unchanged
            }
        };

        state.cursor = checked.current_date;
        Ok(outcome)
    }

    async fn report_no_updates(&self, state: &mut PollState, err: &BotError) {
        let message = err.to_string();
        if state.last_info.as_deref() == Some(message.as_str()) {
            debug!(%message, "Repeated no-updates condition suppressed");
            return;
        }

        info!(%message, "No homework updates");
        match self.notifier.send_message(BOT_STARTED_MESSAGE).await {
            Ok(()) => state.last_info = Some(message),
            Err(e) => warn!(error = %e, "Startup notice not delivered, will retry next cycle"),
        }
    }

    async fn report_failure(&self, state: &mut PollState, err: &BotError) {
        let message = format!("{FAILURE_PREFIX}: {err}");
        if state.last_error.as_deref() == Some(message.as_str()) {
            debug!(error = %err, "Repeated error suppressed");
            return;
        }

        error!(error = %err, http_status = ?err.http_status(), "Polling cycle failed");
        match self.notifier.send_message(&message).await {
            Ok(()) => state.last_error = Some(message),
            Err(e) => warn!(error = %e, "Error report not delivered, will retry next cycle"),
        }
    }
}

/// Fetch once and format the newest submission, without notifying.
pub async fn latest_status<S>(source: &S, from_date: i64) -> Result<String>
where
    S: StatusSource + ?Sized,
{
    let response = source.get_api_answer(from_date).await?;
    let checked = check_response(&response)?;
    let newest = checked
        .newest()
        .ok_or(ResponseError::EmptyHomeworks {
            current_date: checked.current_date,
        })?;
    Ok(parse_status(newest)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    const ENDPOINT: &str = "https://example.test/homework_statuses/";

    #[derive(Clone)]
    enum Reply {
        Json(Value),
        Status(u16),
    }

    /// Replays scripted replies; the last one repeats forever.
    struct FakeSource {
        replies: Mutex<VecDeque<Reply>>,
        cursors: Mutex<Vec<i64>>,
    }

    impl FakeSource {
        fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().collect()),
                cursors: Mutex::new(Vec::new()),
            }
        }

        fn cursors(&self) -> Vec<i64> {
            self.cursors.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StatusSource for FakeSource {
        async fn get_api_answer(&self, from_date: i64) -> Result<Value> {
            self.cursors.lock().unwrap().push(from_date);
            let mut replies = self.replies.lock().unwrap();
            let reply = if replies.len() > 1 {
                replies.pop_front().unwrap()
            } else {
                replies.front().cloned().unwrap()
            };
            match reply {
                Reply::Json(value) => Ok(value),
                Reply::Status(code) => Err(BotError::api_request(
                    ENDPOINT,
                    Some(code),
                    format!("unexpected HTTP status {code}"),
                )),
            }
        }
    }

    #[derive(Default)]
    struct FakeNotifier {
        sent: Mutex<Vec<String>>,
        broken: AtomicBool,
    }

    impl FakeNotifier {
        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }

        fn set_broken(&self, broken: bool) {
            self.broken.store(broken, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Notifier for FakeNotifier {
        async fn send_message(&self, text: &str) -> Result<()> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(BotError::SendMessage("chat unavailable".to_string()));
            }
            self.sent.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    fn poller(replies: impl IntoIterator<Item = Reply>) -> Poller<FakeSource, FakeNotifier> {
        Poller::new(
            FakeSource::new(replies),
            FakeNotifier::default(),
            Duration::from_secs(600),
        )
    }

    fn answer(homeworks: Value, current_date: i64) -> Reply {
        Reply::Json(json!({"homeworks": homeworks, "current_date": current_date}))
    }

    fn homework(name: &str, status: &str) -> Value {
        json!({"homework_name": name, "status": status})
    }

    async fn run_cycles(
        poller: &Poller<FakeSource, FakeNotifier>,
        mut state: PollState,
        cycles: usize,
    ) -> (PollState, Vec<CycleOutcome>) {
        let mut outcomes = Vec::new();
        for _ in 0..cycles {
            let (next, outcome) = poller.cycle(state).await;
            state = next;
            outcomes.push(outcome);
        }
        (state, outcomes)
    }

    #[tokio::test]
    async fn test_new_submission_is_reported_and_cursor_advances() {
        let poller = poller([answer(json!([homework("proj1", "approved")]), 200)]);

        let (state, outcome) = poller.cycle(PollState::new(100)).await;

        assert_eq!(outcome, CycleOutcome::Notified);
        assert_eq!(
            poller.notifier().sent(),
            vec!["Изменился статус проверки работы \"proj1\". Работа проверена: ревьюеру всё понравилось. Ура!"]
        );
        assert_eq!(state.cursor, 200);
        assert_eq!(state.previous, Some(homework("proj1", "approved")));
        assert_eq!(poller.source().cursors(), vec![100]);
    }

    #[tokio::test]
    async fn test_unchanged_submission_is_sent_once() {
        let poller = poller([
            answer(json!([homework("proj1", "reviewing")]), 200),
            answer(json!([homework("proj1", "reviewing")]), 300),
        ]);

        let (state, outcomes) = run_cycles(&poller, PollState::new(100), 2).await;

        assert_eq!(outcomes, vec![CycleOutcome::Notified, CycleOutcome::Unchanged]);
        assert_eq!(poller.notifier().sent().len(), 1);
        assert_eq!(state.cursor, 300);
        assert_eq!(poller.source().cursors(), vec![100, 200]);
    }

    #[tokio::test]
    async fn test_status_change_is_reported_again() {
        let poller = poller([
            answer(json!([homework("proj1", "reviewing")]), 200),
            answer(json!([homework("proj1", "rejected")]), 300),
        ]);

        let (_, outcomes) = run_cycles(&poller, PollState::new(100), 2).await;

        assert_eq!(outcomes, vec![CycleOutcome::Notified, CycleOutcome::Notified]);
        let sent = poller.notifier().sent();
        assert!(sent[0].ends_with("Работа взята на проверку ревьюером."));
        assert!(sent[1].ends_with("Работа проверена: у ревьюера есть замечания."));
    }

    #[tokio::test]
    async fn test_only_newest_submission_counts() {
        let poller = poller([answer(
            json!([homework("proj2", "reviewing"), homework("proj1", "approved")]),
            200,
        )]);

        poller.cycle(PollState::new(0)).await;

        let sent = poller.notifier().sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("\"proj2\""));
    }

    #[tokio::test]
    async fn test_empty_list_sends_startup_notice_once() {
        let poller = poller([answer(json!([]), 500)]);

        let (state, outcomes) = run_cycles(&poller, PollState::new(100), 5).await;

        assert!(outcomes.iter().all(|o| *o == CycleOutcome::NoUpdates));
        assert_eq!(poller.notifier().sent(), vec![BOT_STARTED_MESSAGE]);
        assert_eq!(state.cursor, 500);
        assert!(state.last_info.is_some());
        assert!(state.last_error.is_none());
    }

    #[tokio::test]
    async fn test_server_error_reported_once_and_cursor_kept() {
        let poller = poller([Reply::Status(500)]);

        let (state, outcomes) = run_cycles(&poller, PollState::new(100), 3).await;

        assert_eq!(outcomes, vec![CycleOutcome::Failed; 3]);
        let sent = poller.notifier().sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].starts_with(FAILURE_PREFIX));
        assert!(sent[0].contains("500"));
        assert_eq!(state.cursor, 100);
        assert_eq!(poller.source().cursors(), vec![100, 100, 100]);
    }

    #[tokio::test]
    async fn test_distinct_errors_are_each_reported() {
        let poller = poller([
            Reply::Status(500),
            Reply::Json(json!({"current_date": 1})),
            Reply::Status(500),
        ]);

        run_cycles(&poller, PollState::new(100), 3).await;

        let sent = poller.notifier().sent();
        assert_eq!(sent.len(), 3);
        assert!(sent[1].contains("\"homeworks\""));
    }

    #[tokio::test]
    async fn test_missing_homeworks_never_reaches_extractor() {
        let poller = poller([Reply::Json(json!({"current_date": 1, "items": []}))]);

        let (state, outcome) = poller.cycle(PollState::new(100)).await;

        assert_eq!(outcome, CycleOutcome::Failed);
        assert!(state.previous.is_none());
        assert_eq!(state.cursor, 100);
        let sent = poller.notifier().sent();
        assert_eq!(sent.len(), 1);
        assert!(!sent[0].contains("Изменился статус"));
    }

    #[tokio::test]
    async fn test_undocumented_status_fails_without_remembering_record() {
        let poller = poller([answer(json!([homework("proj1", "lost")]), 200)]);

        let (state, outcome) = poller.cycle(PollState::new(100)).await;

        assert_eq!(outcome, CycleOutcome::Failed);
        assert!(state.previous.is_none());
        assert_eq!(state.cursor, 100);
        assert!(poller.notifier().sent()[0].contains("lost"));
    }

    #[tokio::test]
    async fn test_broken_notifier_does_not_lose_the_update() {
        let poller = poller([answer(json!([homework("proj1", "approved")]), 200)]);
        poller.notifier().set_broken(true);

        let (state, outcome) = poller.cycle(PollState::new(100)).await;
        assert_eq!(outcome, CycleOutcome::Failed);
        assert!(state.previous.is_none());
        assert!(state.last_error.is_none());

        poller.notifier().set_broken(false);
        let (state, outcome) = poller.cycle(state).await;
        assert_eq!(outcome, CycleOutcome::Notified);
        assert_eq!(poller.notifier().sent().len(), 1);
        assert_eq!(state.cursor, 200);
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_path_waits_the_retry_period() {
        let poller = poller([
            answer(json!([homework("proj1", "approved")]), 200),
            answer(json!([]), 300),
            Reply::Status(502),
        ]);
        let mut state = PollState::new(100);

        for expected in [
            CycleOutcome::Notified,
            CycleOutcome::NoUpdates,
            CycleOutcome::Failed,
        ] {
            let started = tokio::time::Instant::now();
            let (next, outcome) = poller.tick(state).await;
            state = next;
            assert_eq!(outcome, expected);
            assert!(started.elapsed() >= poller.retry_period());
        }
    }

    #[tokio::test]
    async fn test_latest_status_does_not_notify() {
        let source = FakeSource::new([answer(json!([homework("proj9", "rejected")]), 10)]);

        let message = latest_status(&source, 0).await.unwrap();
        assert!(message.contains("\"proj9\""));

        let source = FakeSource::new([answer(json!([]), 10)]);
        let err = latest_status(&source, 0).await.unwrap_err();
        assert!(err.is_informational());
    }
}
