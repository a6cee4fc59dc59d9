use std::time::Duration;

use precedence_broker::{BrokerError, TopicLister};
use precedence_core::error::PrecedenceError;
use precedence_core::TopicSet;
use regex::Regex;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::error::MonitorError;
use crate::pipeline::{PipelineHandle, PipelineLauncher};
use crate::shutdown_requested;

/// Result of one discovery tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing new; the running pipeline (if any) was left alone.
    Idle,
    /// The listing was interrupted; try again next tick.
    Skipped,
    Started(TopicSet),
    Restarted(TopicSet),
}

/// Single owner of the accumulated topic set and the running pipeline.
///
/// The set only grows. When a listing reveals new matching topics, the
/// current pipeline is stopped before a new one starts over the full set.
pub struct TopicMonitor<L, P: PipelineLauncher> {
    lister: L,
    launcher: P,
    pattern: Regex,
    topics: TopicSet,
    running: Option<P::Handle>,
}

/// Compiles `pattern` so it must match a whole topic name.
pub fn compile_topic_pattern(pattern: &str) -> Result<Regex, PrecedenceError> {
    Regex::new(&format!("^(?:{pattern})$"))
        .map_err(|e| PrecedenceError::InvalidPattern(format!("{pattern}: {e}")))
}

impl<L, P> TopicMonitor<L, P>
where
    L: TopicLister,
    P: PipelineLauncher,
{
    pub fn new(lister: L, launcher: P, pattern: &str) -> Result<Self, PrecedenceError> {
        Ok(Self {
            lister,
            launcher,
            pattern: compile_topic_pattern(pattern)?,
            topics: TopicSet::new(),
            running: None,
        })
    }

    pub fn topics(&self) -> &TopicSet {
        &self.topics
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub async fn tick(&mut self) -> Result<TickOutcome, MonitorError> {
        let listed = match self.lister.list_topics().await {
            Ok(listed) => listed,
            Err(BrokerError::Interrupted) => {
                warn!("topic listing interrupted; retrying next tick");
                return Ok(TickOutcome::Skipped);
            }
            Err(e) => return Err(MonitorError::ListTopics(e)),
        };

        let fresh: Vec<String> = listed
            .into_iter()
            .filter(|topic| self.pattern.is_match(topic) && !self.topics.contains(topic))
            .collect();
        let mut restarted = false;
        if !fresh.is_empty() {
            info!("discovered new input topics {fresh:?}");
            self.topics = self.topics.with_added(fresh);
            if let Some(handle) = self.running.take() {
                handle.stop().await.map_err(MonitorError::PipelineStop)?;
                restarted = true;
            }
        }

        if self.running.is_none() && !self.topics.is_empty() {
            let handle = self
                .launcher
                .launch(&self.topics)
                .map_err(MonitorError::PipelineStart)?;
            self.running = Some(handle);
            let topics = self.topics.clone();
            return Ok(if restarted {
                TickOutcome::Restarted(topics)
            } else {
                TickOutcome::Started(topics)
            });
        }
        Ok(TickOutcome::Idle)
    }

    /// Ticks immediately, then every `period`, until `shutdown` flips.
    ///
    /// The running pipeline is stopped before returning, also when a tick
    /// fails.
    pub async fn run(
        &mut self,
        period: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), MonitorError> {
        let mut interval = tokio::time::interval(period.max(Duration::from_millis(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = shutdown_requested(&mut shutdown) => break,
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        if let Err(stop) = self.shutdown().await {
                            error!("failed to stop pipeline after monitor failure: {stop}");
                        }
                        return Err(e);
                    }
                }
            }
        }
        self.shutdown().await
    }

    /// Stops the running pipeline, if any.
    pub async fn shutdown(&mut self) -> Result<(), MonitorError> {
        match self.running.take() {
            Some(handle) => handle.stop().await.map_err(MonitorError::PipelineStop),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use precedence_broker::memory::ScriptedTopicLister;
    use precedence_broker::BrokerError;
    use precedence_core::TopicSet;
    use tokio::sync::watch;

    use super::{compile_topic_pattern, TickOutcome, TopicMonitor};
    use crate::error::{MonitorError, PipelineError};
    use crate::pipeline::{PipelineHandle, PipelineLauncher};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Start(TopicSet),
        Stop(TopicSet),
    }

    #[derive(Clone, Default)]
    struct RecordingLauncher {
        events: Arc<Mutex<Vec<Event>>>,
        fail: bool,
    }

    struct RecordingHandle {
        topics: TopicSet,
        events: Arc<Mutex<Vec<Event>>>,
    }

    #[async_trait]
    impl PipelineHandle for RecordingHandle {
        async fn stop(self) -> Result<(), PipelineError> {
            self.events
                .lock()
                .expect("events lock")
                .push(Event::Stop(self.topics));
            Ok(())
        }
    }

    impl PipelineLauncher for RecordingLauncher {
        type Handle = RecordingHandle;

        fn launch(&mut self, topics: &TopicSet) -> Result<RecordingHandle, PipelineError> {
            if self.fail {
                return Err(PipelineError::Subscribe(BrokerError::Subscribe(
                    "no brokers".to_string(),
                )));
            }
            self.events
                .lock()
                .expect("events lock")
                .push(Event::Start(topics.clone()));
            Ok(RecordingHandle {
                topics: topics.clone(),
                events: self.events.clone(),
            })
        }
    }

    impl RecordingLauncher {
        fn events(&self) -> Vec<Event> {
            self.events.lock().expect("events lock").clone()
        }
    }

    fn set(names: &[&str]) -> TopicSet {
        names.iter().copied().collect()
    }

    #[tokio::test]
    async fn starts_then_restarts_once_per_growth() {
        let lister = ScriptedTopicLister::from_listings(&[&["a"], &["a", "b"], &["a", "b"]]);
        let launcher = RecordingLauncher::default();
        let mut monitor =
            TopicMonitor::new(lister, launcher.clone(), ".*").expect("pattern compiles");

        assert_eq!(
            monitor.tick().await.expect("tick 1"),
            TickOutcome::Started(set(&["a"]))
        );
        assert_eq!(
            monitor.tick().await.expect("tick 2"),
            TickOutcome::Restarted(set(&["a", "b"]))
        );
        assert_eq!(monitor.tick().await.expect("tick 3"), TickOutcome::Idle);

        assert_eq!(
            launcher.events(),
            vec![
                Event::Start(set(&["a"])),
                Event::Stop(set(&["a"])),
                Event::Start(set(&["a", "b"])),
            ]
        );
        assert!(monitor.is_running());
    }

    #[tokio::test]
    async fn nothing_starts_until_a_topic_matches() {
        let lister = ScriptedTopicLister::from_listings(&[
            &["__consumer_offsets", "other"],
            &["other", "dbserver.inventory.orders"],
        ]);
        let launcher = RecordingLauncher::default();
        let mut monitor = TopicMonitor::new(lister, launcher.clone(), r"dbserver\.inventory\..*")
            .expect("pattern compiles");

        assert_eq!(monitor.tick().await.expect("tick"), TickOutcome::Idle);
        assert!(!monitor.is_running());
        assert_eq!(
            monitor.tick().await.expect("tick"),
            TickOutcome::Started(set(&["dbserver.inventory.orders"]))
        );
    }

    #[tokio::test]
    async fn interrupted_listing_is_skipped_other_failures_are_fatal() {
        let lister = ScriptedTopicLister::new([
            Err(BrokerError::Interrupted),
            Ok(vec!["a".to_string()]),
            Err(BrokerError::ListTopics("broker down".to_string())),
        ]);
        let launcher = RecordingLauncher::default();
        let mut monitor = TopicMonitor::new(lister, launcher.clone(), ".*").expect("pattern");

        assert_eq!(monitor.tick().await.expect("skip"), TickOutcome::Skipped);
        assert_eq!(
            monitor.tick().await.expect("start"),
            TickOutcome::Started(set(&["a"]))
        );
        let err = monitor.tick().await.expect_err("fatal listing error");
        assert!(matches!(err, MonitorError::ListTopics(_)));
        assert_eq!(monitor.topics(), &set(&["a"]));
    }

    #[tokio::test]
    async fn launch_failure_is_reported() {
        let lister = ScriptedTopicLister::from_listings(&[&["a"]]);
        let launcher = RecordingLauncher {
            fail: true,
            ..RecordingLauncher::default()
        };
        let mut monitor = TopicMonitor::new(lister, launcher, ".*").expect("pattern");
        let err = monitor.tick().await.expect_err("launch fails");
        assert!(matches!(err, MonitorError::PipelineStart(_)));
        assert!(!monitor.is_running());
    }

    #[test]
    fn pattern_must_match_whole_topic_name() {
        let pattern = compile_topic_pattern("db\\.t").expect("compiles");
        assert!(pattern.is_match("db.t"));
        assert!(!pattern.is_match("db.t2"));
        assert!(!pattern.is_match("xdb.t"));
        let alternation = compile_topic_pattern("a|b").expect("compiles");
        assert!(alternation.is_match("b"));
        assert!(!alternation.is_match("ab"));
        assert!(compile_topic_pattern("(").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn run_ticks_on_schedule_and_stops_pipeline_on_shutdown() {
        let lister = ScriptedTopicLister::from_listings(&[&["a"], &["a"], &["a", "b"]]);
        let launcher = RecordingLauncher::default();
        let mut monitor = TopicMonitor::new(lister, launcher.clone(), ".*").expect("pattern");
        let (shutdown, rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            monitor.run(Duration::from_secs(60), rx).await
        });
        tokio::time::sleep(Duration::from_secs(130)).await;
        shutdown.send(true).expect("monitor listening");
        task.await.expect("join").expect("clean shutdown");

        assert_eq!(
            launcher.events(),
            vec![
                Event::Start(set(&["a"])),
                Event::Stop(set(&["a"])),
                Event::Start(set(&["a", "b"])),
                Event::Stop(set(&["a", "b"])),
            ]
        );
    }
}
