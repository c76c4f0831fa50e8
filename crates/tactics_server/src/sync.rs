//! Where turns come from.
//!
//! A game loop asks each [`TurnSource`] whether the turn for an index is
//! ready and, once all say yes, takes the pieces and merges them. Local
//! sources hold what this process submitted; remote sources poll the
//! server over a [`Channel`], at most once per cooldown.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use tactics_core::turn::Turn;

use crate::error::Result;
use crate::network::{Channel, Request, Response};

/// Turns submitted by this process, keyed by index.
#[derive(Debug, Default)]
pub struct LocalSource {
    turns: BTreeMap<u64, Turn>,
}

impl LocalSource {
    /// Create an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the local turn for an index, replacing any earlier one.
    pub fn submit(&mut self, turn_index: u64, turn: Turn) {
        self.turns.insert(turn_index, turn);
    }

    /// Whether a turn has been submitted for this index.
    #[must_use]
    pub fn is_ready(&self, turn_index: u64) -> bool {
        self.turns.contains_key(&turn_index)
    }

    /// Remove and return the turn for this index.
    pub fn take_turn(&mut self, turn_index: u64) -> Option<Turn> {
        self.turns.remove(&turn_index)
    }
}

/// Complete turns fetched from the server.
pub struct RemoteSource {
    channel: Box<dyn Channel>,
    cooldown: Duration,
    last_poll: Option<Instant>,
    received: BTreeMap<u64, Turn>,
}

impl std::fmt::Debug for RemoteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteSource")
            .field("cooldown", &self.cooldown)
            .field("last_poll", &self.last_poll)
            .field("received", &self.received.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl RemoteSource {
    /// Poll over `channel`, waiting `cooldown` between polls.
    #[must_use]
    pub fn new(channel: Box<dyn Channel>, cooldown: Duration) -> Self {
        Self {
            channel,
            cooldown,
            last_poll: None,
            received: BTreeMap::new(),
        }
    }

    /// Whether the complete turn for this index has arrived.
    ///
    /// Pending responses are drained first. If the turn is still missing
    /// and the cooldown has passed since the last poll, a new poll is sent.
    ///
    /// # Errors
    ///
    /// Returns an error if the poll cannot be sent.
    pub fn is_ready(&mut self, turn_index: u64, now: Instant) -> Result<bool> {
        self.drain();
        if self.received.contains_key(&turn_index) {
            return Ok(true);
        }

        let due = self
            .last_poll
            .map_or(true, |last| now.saturating_duration_since(last) >= self.cooldown);
        if due {
            self.channel.send(Request::TurnPoll { turn_index })?;
            self.last_poll = Some(now);
            tracing::trace!(turn = turn_index, "Turn poll sent");
        }
        Ok(false)
    }

    /// Remove and return the turn for this index.
    pub fn take_turn(&mut self, turn_index: u64) -> Option<Turn> {
        self.received.remove(&turn_index)
    }

    fn drain(&mut self) {
        while let Some(response) = self.channel.try_recv() {
            match response {
                Response::TurnPoll {
                    turn: Some(turn),
                    turn_index,
                } => {
                    tracing::debug!(turn = turn_index, "Turn received");
                    self.received.insert(turn_index, turn);
                }
                Response::TurnPoll { turn: None, .. } => {}
                Response::Error { message } => {
                    tracing::warn!(%message, "Server error while polling");
                }
                other => tracing::debug!(?other, "Ignoring unexpected response"),
            }
        }
    }
}

/// One contributor to each turn.
#[derive(Debug)]
pub enum TurnSource {
    /// Orders entered in this process.
    Local(LocalSource),
    /// Orders merged by the server.
    Remote(RemoteSource),
}

impl TurnSource {
    /// Whether this source can supply the turn for an index.
    ///
    /// # Errors
    ///
    /// Returns an error if a remote poll cannot be sent.
    pub fn is_ready(&mut self, turn_index: u64, now: Instant) -> Result<bool> {
        match self {
            Self::Local(source) => Ok(source.is_ready(turn_index)),
            Self::Remote(source) => source.is_ready(turn_index, now),
        }
    }

    /// Remove and return the turn for an index.
    pub fn take_turn(&mut self, turn_index: u64) -> Option<Turn> {
        match self {
            Self::Local(source) => source.take_turn(turn_index),
            Self::Remote(source) => source.take_turn(turn_index),
        }
    }

    /// Hand a locally entered turn to this source. Remote sources ignore it.
    pub fn submit_local(&mut self, turn_index: u64, turn: &Turn) {
        if let Self::Local(source) = self {
            source.submit(turn_index, turn.clone());
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use crate::error::ServerError;

    /// Scripted channel: records sends and replays queued responses.
    #[derive(Clone, Default)]
    pub(crate) struct ScriptedChannel {
        pub sent: Arc<Mutex<Vec<Request>>>,
        pub inbox: Arc<Mutex<VecDeque<Response>>>,
        pub closed: bool,
    }

    impl ScriptedChannel {
        pub fn push(&self, response: Response) {
            self.inbox.lock().unwrap().push_back(response);
        }

        pub fn sent_count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    impl Channel for ScriptedChannel {
        fn send(&mut self, request: Request) -> Result<()> {
            if self.closed {
                return Err(ServerError::ChannelClosed);
            }
            self.sent.lock().unwrap().push(request);
            Ok(())
        }

        fn try_recv(&mut self) -> Option<Response> {
            self.inbox.lock().unwrap().pop_front()
        }
    }

    #[test]
    fn test_local_source_ready_after_submit() {
        let mut source = LocalSource::new();
        assert!(!source.is_ready(0));
        source.submit(0, Turn::for_players([0]));
        assert!(source.is_ready(0));
        assert!(!source.is_ready(1));
        assert_eq!(source.take_turn(0), Some(Turn::for_players([0])));
        assert!(!source.is_ready(0));
    }

    #[test]
    fn test_remote_polls_respect_cooldown() {
        let channel = ScriptedChannel::default();
        let mut source = RemoteSource::new(Box::new(channel.clone()), Duration::from_secs(5));
        let start = Instant::now();

        assert!(!source.is_ready(0, start).unwrap());
        assert_eq!(channel.sent_count(), 1);

        assert!(!source.is_ready(0, start + Duration::from_secs(1)).unwrap());
        assert_eq!(channel.sent_count(), 1);

        assert!(!source.is_ready(0, start + Duration::from_secs(5)).unwrap());
        assert_eq!(channel.sent_count(), 2);
    }

    #[test]
    fn test_remote_turn_arrives() {
        let channel = ScriptedChannel::default();
        let mut source = RemoteSource::new(Box::new(channel.clone()), Duration::from_secs(5));
        let start = Instant::now();
        assert!(!source.is_ready(0, start).unwrap());

        channel.push(Response::TurnPoll {
            turn: Some(Turn::for_players([0, 1])),
            turn_index: 0,
        });
        assert!(source.is_ready(0, start).unwrap());
        // ready without another poll
        assert_eq!(channel.sent_count(), 1);
        assert_eq!(source.take_turn(0), Some(Turn::for_players([0, 1])));
    }

    #[test]
    fn test_remote_keeps_turns_for_later_indices() {
        let channel = ScriptedChannel::default();
        channel.push(Response::TurnPoll {
            turn: Some(Turn::for_players([1])),
            turn_index: 4,
        });
        channel.push(Response::Error {
            message: "ignored".to_string(),
        });
        let mut source = RemoteSource::new(Box::new(channel.clone()), Duration::ZERO);
        let now = Instant::now();
        assert!(!source.is_ready(3, now).unwrap());
        assert!(source.is_ready(4, now).unwrap());
    }

    #[test]
    fn test_remote_send_failure_surfaces() {
        let channel = ScriptedChannel {
            closed: true,
            ..ScriptedChannel::default()
        };
        let mut source = TurnSource::Remote(RemoteSource::new(Box::new(channel), Duration::ZERO));
        assert!(matches!(
            source.is_ready(0, Instant::now()),
            Err(ServerError::ChannelClosed)
        ));
    }

    #[test]
    fn test_remote_ignores_local_submissions() {
        let channel = ScriptedChannel::default();
        let mut source = TurnSource::Remote(RemoteSource::new(Box::new(channel), Duration::ZERO));
        source.submit_local(0, &Turn::for_players([0]));
        assert!(source.take_turn(0).is_none());
    }
}
