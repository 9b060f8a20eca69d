//! # Announcer
//!
//! Broadcasts a rotating list of announcements on a fixed interval. Loads after
//! [`webbridge`](super::webbridge) so announcements reach the web panel too.
//!
//! ```toml
//! [announcer]
//! enabled = true
//! interval-seconds = 300
//! messages = ["&aWelcome!", "&eVote for us"]
//! ```
//!
//! The broadcast loop runs as a tokio task owned by the unit. It is aborted on
//! disable and restarted with the new interval and messages on refresh.

use crate::framework::messages::colorize;
use crate::framework::{UnitBehavior, UnitConfig, UnitDescriptor, UnitError, UnitScope};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

pub const ID: &str = "announcer";

const DEFAULT_INTERVAL: Duration = Duration::from_secs(300);
const HISTORY_LIMIT: usize = 50;

pub struct Announcer {
    interval: Duration,
    messages: Vec<String>,
    history: Arc<Mutex<Vec<String>>>,
    task: Option<JoinHandle<()>>,
}

impl Announcer {
    pub fn new() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            messages: Vec::new(),
            history: Arc::default(),
            task: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Announcements sent so far, oldest first.
    pub fn broadcasts(&self) -> Vec<String> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Spawns the broadcast loop and swaps it in for the running one.
    ///
    /// A failed spawn leaves the previous loop running.
    fn start(&mut self, scope: &UnitScope<'_>) -> Result<(), UnitError> {
        if self.messages.is_empty() {
            self.stop();
            scope.log_warning("No messages configured, nothing to announce");
            return Ok(());
        }

        let interval = self.interval;
        let messages: Vec<String> = self.messages.iter().map(|m| colorize(m)).collect();
        let history = Arc::clone(&self.history);
        let handle = scope.spawn(Box::pin(async move {
            let mut ticker = tokio::time::interval(interval);
            // the first tick completes immediately
            ticker.tick().await;
            for message in messages.iter().cycle() {
                ticker.tick().await;
                info!(unit = ID, "{message}");
                let mut history = history.lock().unwrap_or_else(PoisonError::into_inner);
                history.push(message.clone());
                if history.len() > HISTORY_LIMIT {
                    history.remove(0);
                }
            }
        }))?;

        if let Some(previous) = self.task.replace(handle) {
            previous.abort();
        }
        scope.log_info(&format!(
            "Announcing {} messages every {:.1}s",
            self.messages.len(),
            interval.as_secs_f64()
        ));
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Default for Announcer {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitBehavior for Announcer {
    fn descriptor(&self) -> UnitDescriptor {
        UnitDescriptor::new(ID)
            .priority(150)
            .depends_on([super::webbridge::ID])
    }

    fn load_config(&mut self, config: &UnitConfig) {
        let seconds = config.get_double("interval-seconds", DEFAULT_INTERVAL.as_secs_f64());
        self.interval = Duration::try_from_secs_f64(seconds)
            .ok()
            .filter(|interval| !interval.is_zero())
            .unwrap_or(DEFAULT_INTERVAL);
        self.messages = config.get_string_list("messages");
    }

    fn enable(&mut self, scope: &mut UnitScope<'_>) -> Result<(), UnitError> {
        self.start(scope)
    }

    fn disable(&mut self, _scope: &mut UnitScope<'_>) -> Result<(), UnitError> {
        self.stop();
        Ok(())
    }

    fn refresh(&mut self, scope: &mut UnitScope<'_>) -> Result<(), UnitError> {
        self.start(scope)
    }

    fn description(&self) -> &str {
        "Broadcasts rotating announcements"
    }
}

impl Drop for Announcer {
    fn drop(&mut self) {
        self.stop();
    }
}
