use std::path::PathBuf;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, bounded};

use crate::deck::SlideId;
use crate::session::{RevealPhase, Session};

pub const NOTES_PLACEHOLDER: &str = "No notes for this slide.";
pub const END_OF_DECK_TITLE: &str = "End of deck";

/// One entry per slide in the presenter overview strip.
#[derive(Debug, Clone)]
pub struct SlidePreview {
    pub id: SlideId,
    pub image: Option<PathBuf>,
    pub has_more_steps: bool,
}

/// Read-only projection of the session pushed to the presenter window.
/// The receiver re-renders from the latest snapshot; duplicates are harmless.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub current: usize,
    pub phase: RevealPhase,
    pub timer_started: Option<Instant>,
    pub notes: String,
    pub next_image: Option<PathBuf>,
    pub next_title: String,
    pub slides: Vec<SlidePreview>,
}

impl Snapshot {
    pub fn project(session: &Session) -> Self {
        let deck = session.deck();
        let current = session.current();
        let slide = session.current_slide();

        let notes = slide
            .notes
            .clone()
            .unwrap_or_else(|| NOTES_PLACEHOLDER.to_string());

        let next = deck.slide(current + 1);
        let next_image = next.and_then(|s| s.image.clone());
        let next_title = match next {
            Some(s) => s
                .title
                .clone()
                .unwrap_or_else(|| format!("Slide {}", s.id)),
            None => END_OF_DECK_TITLE.to_string(),
        };

        let slides = deck
            .slides
            .iter()
            .map(|s| SlidePreview {
                id: s.id.clone(),
                image: s.image.clone(),
                has_more_steps: s.has_more_steps(),
            })
            .collect();

        Self {
            current,
            phase: session.phase(),
            timer_started: session.timer_started(),
            notes,
            next_image,
            next_title,
            slides,
        }
    }
}

/// Commands the presenter window sends back to the main window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Next,
    Prev,
    ResetTimer,
    StartTimer,
    Goto(usize),
}

/// Route a presenter command into the session. The presenter window is
/// cooperative but not trusted: out-of-range goto targets are rejected by
/// `jump_to` rather than taken at face value.
pub fn apply_command(session: &mut Session, command: Command, now: Instant) {
    match command {
        Command::Next => session.advance(now),
        Command::Prev => session.retreat(now),
        Command::ResetTimer => session.reset_timer(),
        Command::StartTimer => session.start_timer(now),
        Command::Goto(index) => session.jump_to(index, now),
    }
}

/// Main-window side: pushes snapshots on every state change and on a fixed
/// cadence so a briefly occluded presenter window catches up.
pub struct SyncPublisher {
    tx: Sender<Snapshot>,
    interval: Duration,
    last_push: Option<Instant>,
    last_seen: Option<(u64, Option<Instant>)>,
}

impl SyncPublisher {
    /// Publish if the session changed since the last push or the cadence
    /// interval elapsed. Both triggers share one snapshot-construction path.
    pub fn maybe_publish(&mut self, session: &Session, now: Instant) {
        let state = (session.epoch(), session.timer_started());
        let changed = self.last_seen != Some(state);
        let due = self
            .last_push
            .is_none_or(|t| now.saturating_duration_since(t) >= self.interval);
        if changed || due {
            self.publish(session, now);
        }
    }

    pub fn publish(&mut self, session: &Session, now: Instant) {
        self.last_push = Some(now);
        self.last_seen = Some((session.epoch(), session.timer_started()));
        // Fire and forget: a full or disconnected channel is not an error.
        let _ = self.tx.try_send(Snapshot::project(session));
    }
}

/// Main-window side: commands arriving from the presenter window.
pub struct CommandInbox {
    rx: Receiver<Command>,
}

impl CommandInbox {
    pub fn drain(&self) -> Vec<Command> {
        self.rx.try_iter().collect()
    }
}

/// Presenter-window side of the bus.
pub struct NotesEndpoint {
    rx: Receiver<Snapshot>,
    cmd_tx: Sender<Command>,
    latest: Option<Snapshot>,
}

impl NotesEndpoint {
    /// Drain pending pushes and return the most recent snapshot.
    pub fn latest(&mut self) -> Option<&Snapshot> {
        while let Ok(snapshot) = self.rx.try_recv() {
            self.latest = Some(snapshot);
        }
        self.latest.as_ref()
    }

    pub fn send(&self, command: Command) {
        let _ = self.cmd_tx.try_send(command);
    }
}

/// Build the two-direction bus. The transport is plain channels so the
/// protocol is testable without any window.
pub fn channel(interval: Duration) -> (SyncPublisher, CommandInbox, NotesEndpoint) {
    let (snap_tx, snap_rx) = bounded(8);
    let (cmd_tx, cmd_rx) = bounded(32);
    (
        SyncPublisher {
            tx: snap_tx,
            interval,
            last_push: None,
            last_seen: None,
        },
        CommandInbox { rx: cmd_rx },
        NotesEndpoint {
            rx: snap_rx,
            cmd_tx,
            latest: None,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::Deck;

    const INTERVAL: Duration = Duration::from_secs(1);

    fn session() -> Session {
        let deck = Deck::from_str(
            "slides:\n  - id: 1\n    title: One\n    notes: Opening line.\n  - id: 2\n    top_messages: [a]\n  - id: 3\n",
        )
        .unwrap();
        Session::new(deck, Duration::from_millis(800))
    }

    #[test]
    fn test_snapshot_projection() {
        let s = session();
        let snap = Snapshot::project(&s);
        assert_eq!(snap.current, 0);
        assert_eq!(snap.phase, RevealPhase::Initial);
        assert_eq!(snap.notes, "Opening line.");
        assert_eq!(snap.next_title, "Slide 2");
        assert_eq!(snap.slides.len(), 3);
        assert!(!snap.slides[0].has_more_steps);
        assert!(snap.slides[1].has_more_steps);
    }

    #[test]
    fn test_snapshot_placeholders() {
        let mut s = session();
        let now = Instant::now();
        s.jump_to(2, now);
        let snap = Snapshot::project(&s);
        assert_eq!(snap.notes, NOTES_PLACEHOLDER);
        assert_eq!(snap.next_title, END_OF_DECK_TITLE);
        assert!(snap.next_image.is_none());
    }

    #[test]
    fn test_publish_on_change_without_waiting() {
        let (mut publisher, _inbox, mut endpoint) = channel(INTERVAL);
        let mut s = session();
        let now = Instant::now();

        publisher.maybe_publish(&s, now);
        assert_eq!(endpoint.latest().unwrap().phase, RevealPhase::Initial);

        s.advance(now);
        publisher.maybe_publish(&s, now + Duration::from_millis(5));
        assert_eq!(endpoint.latest().unwrap().phase, RevealPhase::Revealing);
    }

    #[test]
    fn test_no_push_when_unchanged_and_not_due() {
        let (mut publisher, _inbox, mut endpoint) = channel(INTERVAL);
        let s = session();
        let now = Instant::now();

        publisher.maybe_publish(&s, now);
        endpoint.latest();
        publisher.maybe_publish(&s, now + Duration::from_millis(200));
        assert!(endpoint.rx.try_recv().is_err());
    }

    #[test]
    fn test_cadence_push_when_idle() {
        let (mut publisher, _inbox, mut endpoint) = channel(INTERVAL);
        let s = session();
        let now = Instant::now();

        publisher.maybe_publish(&s, now);
        endpoint.latest();
        publisher.maybe_publish(&s, now + INTERVAL);
        assert!(endpoint.rx.try_recv().is_ok());
    }

    #[test]
    fn test_timer_change_triggers_push() {
        let (mut publisher, _inbox, mut endpoint) = channel(INTERVAL);
        let mut s = session();
        let now = Instant::now();

        publisher.maybe_publish(&s, now);
        s.start_timer(now);
        publisher.maybe_publish(&s, now + Duration::from_millis(10));
        assert_eq!(endpoint.latest().unwrap().timer_started, Some(now));
    }

    #[test]
    fn test_duplicate_delivery_is_idempotent() {
        let (mut publisher, _inbox, mut endpoint) = channel(INTERVAL);
        let s = session();
        let now = Instant::now();

        publisher.publish(&s, now);
        publisher.publish(&s, now);
        publisher.publish(&s, now);
        let snap = endpoint.latest().unwrap();
        assert_eq!(snap.current, 0);
        assert!(endpoint.rx.try_recv().is_err(), "drained to latest");
    }

    #[test]
    fn test_push_after_receiver_dropped_is_silent() {
        let (mut publisher, _inbox, endpoint) = channel(INTERVAL);
        drop(endpoint);
        let s = session();
        publisher.publish(&s, Instant::now());
    }

    #[test]
    fn test_commands_round_trip() {
        let (_publisher, inbox, endpoint) = channel(INTERVAL);
        endpoint.send(Command::Next);
        endpoint.send(Command::Goto(2));
        assert_eq!(inbox.drain(), vec![Command::Next, Command::Goto(2)]);
        assert!(inbox.drain().is_empty());
    }

    #[test]
    fn test_goto_out_of_range_rejected() {
        let mut s = session();
        let now = Instant::now();
        s.advance(now);
        let before = (s.current(), s.phase());
        apply_command(&mut s, Command::Goto(99), now);
        assert_eq!((s.current(), s.phase()), before);
    }

    #[test]
    fn test_start_timer_command_noop_when_running() {
        let mut s = session();
        let now = Instant::now();
        apply_command(&mut s, Command::StartTimer, now);
        apply_command(&mut s, Command::StartTimer, now + Duration::from_secs(9));
        assert_eq!(s.timer_started(), Some(now));
        apply_command(&mut s, Command::ResetTimer, now);
        assert!(s.timer_started().is_none());
    }
}
