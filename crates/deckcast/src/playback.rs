use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
    /// Start was denied by platform policy; resumes on the next interaction.
    Deferred,
}

/// Playback clock for a video slide. The renderer owns the actual frames;
/// this tracks the observable position so the clip's natural end can feed
/// back into navigation.
#[derive(Debug)]
pub struct Playback {
    duration: Option<Duration>,
    state: PlaybackState,
    position: Duration,
    playing_since: Option<Instant>,
}

impl Playback {
    pub fn new(duration: Option<Duration>) -> Self {
        Self {
            duration,
            state: PlaybackState::Idle,
            position: Duration::ZERO,
            playing_since: None,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    /// Entering the slide: rewind and play. When autoplay is denied the clip
    /// waits for the next user interaction instead of erroring.
    pub fn start(&mut self, now: Instant, autoplay_allowed: bool) {
        self.position = Duration::ZERO;
        if autoplay_allowed {
            self.state = PlaybackState::Playing;
            self.playing_since = Some(now);
        } else {
            self.state = PlaybackState::Deferred;
            self.playing_since = None;
        }
    }

    /// Any click or keypress while deferred starts the clip.
    /// Returns true if the interaction was consumed.
    pub fn on_interaction(&mut self, now: Instant) -> bool {
        if self.state == PlaybackState::Deferred {
            self.state = PlaybackState::Playing;
            self.playing_since = Some(now);
            true
        } else {
            false
        }
    }

    /// Space on a video slide toggles play/pause, preserving position.
    pub fn toggle(&mut self, now: Instant) {
        match self.state {
            PlaybackState::Playing => {
                self.position = self.position(now);
                self.playing_since = None;
                self.state = PlaybackState::Paused;
            }
            PlaybackState::Paused | PlaybackState::Deferred => {
                self.playing_since = Some(now);
                self.state = PlaybackState::Playing;
            }
            PlaybackState::Idle => {}
        }
    }

    pub fn position(&self, now: Instant) -> Duration {
        match self.playing_since {
            Some(since) => self.position + now.saturating_duration_since(since),
            None => self.position,
        }
    }

    /// True exactly once when the clip reaches its natural end. Clips with
    /// unknown length never end on their own.
    pub fn poll_ended(&mut self, now: Instant) -> bool {
        let Some(duration) = self.duration else {
            return false;
        };
        if self.state != PlaybackState::Playing {
            return false;
        }
        if self.position(now) >= duration {
            self.position = duration;
            self.playing_since = None;
            self.state = PlaybackState::Idle;
            true
        } else {
            false
        }
    }

    /// Leaving the slide.
    pub fn stop(&mut self) {
        self.state = PlaybackState::Idle;
        self.playing_since = None;
        self.position = Duration::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLIP: Duration = Duration::from_secs(30);

    #[test]
    fn test_autoplay_starts_immediately() {
        let mut p = Playback::new(Some(CLIP));
        let now = Instant::now();
        p.start(now, true);
        assert_eq!(p.state(), PlaybackState::Playing);
        assert_eq!(p.position(now + Duration::from_secs(3)), Duration::from_secs(3));
    }

    #[test]
    fn test_denied_autoplay_defers_to_interaction() {
        let mut p = Playback::new(Some(CLIP));
        let now = Instant::now();
        p.start(now, false);
        assert_eq!(p.state(), PlaybackState::Deferred);
        assert_eq!(p.position(now + Duration::from_secs(5)), Duration::ZERO);

        assert!(p.on_interaction(now + Duration::from_secs(5)));
        assert_eq!(p.state(), PlaybackState::Playing);
        assert!(!p.on_interaction(now + Duration::from_secs(6)));
    }

    #[test]
    fn test_toggle_preserves_position() {
        let mut p = Playback::new(Some(CLIP));
        let now = Instant::now();
        p.start(now, true);
        p.toggle(now + Duration::from_secs(10)); // pause
        assert_eq!(p.state(), PlaybackState::Paused);
        assert_eq!(p.position(now + Duration::from_secs(60)), Duration::from_secs(10));
        p.toggle(now + Duration::from_secs(60)); // resume
        assert_eq!(p.position(now + Duration::from_secs(65)), Duration::from_secs(15));
    }

    #[test]
    fn test_natural_end_fires_once() {
        let mut p = Playback::new(Some(CLIP));
        let now = Instant::now();
        p.start(now, true);
        assert!(!p.poll_ended(now + Duration::from_secs(29)));
        assert!(p.poll_ended(now + Duration::from_secs(31)));
        assert!(!p.poll_ended(now + Duration::from_secs(32)));
        assert_eq!(p.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_unknown_duration_never_ends() {
        let mut p = Playback::new(None);
        let now = Instant::now();
        p.start(now, true);
        assert!(!p.poll_ended(now + Duration::from_secs(3600)));
        assert_eq!(p.state(), PlaybackState::Playing);
    }

    #[test]
    fn test_paused_clip_does_not_end() {
        let mut p = Playback::new(Some(CLIP));
        let now = Instant::now();
        p.start(now, true);
        p.toggle(now + Duration::from_secs(10));
        assert!(!p.poll_ended(now + Duration::from_secs(120)));
    }
}
