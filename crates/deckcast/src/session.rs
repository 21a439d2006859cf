use std::time::{Duration, Instant};

use crate::deck::{Deck, Slide, SlideKind};

/// Ordinal reveal phases of a single slide. A slide opts into the upper
/// levels through its content blocks; the machine clamps past levels the
/// slide does not support instead of stalling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RevealPhase {
    Initial = 0,
    Revealing = 1,
    Revealed = 2,
    Secondary = 3,
    Tertiary = 4,
}

/// A scheduled Revealing -> Revealed promotion. The epoch is compared at
/// fire time so a promotion superseded by faster manual input is a no-op.
#[derive(Debug, Clone, Copy)]
struct PendingPromotion {
    epoch: u64,
    due: Instant,
}

/// Single source of truth for slide position and reveal phase.
///
/// All operations take `now` explicitly; nothing in here reads the clock,
/// which keeps the timed promotion testable with synthetic instants.
pub struct Session {
    deck: Deck,
    current: usize,
    phase: RevealPhase,
    epoch: u64,
    pending: Option<PendingPromotion>,
    phase_entered: Option<Instant>,
    timer_started: Option<Instant>,
    reveal_delay: Duration,
}

impl Session {
    pub fn new(deck: Deck, reveal_delay: Duration) -> Self {
        // Video slides show immediately, even as the opening slide.
        let phase = match deck.slides[0].kind() {
            SlideKind::Video => RevealPhase::Revealed,
            SlideKind::Image => RevealPhase::Initial,
        };
        Self {
            deck,
            current: 0,
            phase,
            epoch: 0,
            pending: None,
            phase_entered: None,
            timer_started: None,
            reveal_delay,
        }
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn current_slide(&self) -> &Slide {
        &self.deck.slides[self.current]
    }

    pub fn phase(&self) -> RevealPhase {
        self.phase
    }

    /// Bumped on every observable phase or slide change; lets callers detect
    /// changes without diffing state.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn timer_started(&self) -> Option<Instant> {
        self.timer_started
    }

    /// 0..=1 progress through the Revealing entry animation.
    pub fn revealing_progress(&self, now: Instant) -> f32 {
        if self.phase != RevealPhase::Revealing {
            return 1.0;
        }
        match self.phase_entered {
            Some(entered) => {
                let elapsed = now.saturating_duration_since(entered).as_secs_f32();
                (elapsed / self.reveal_delay.as_secs_f32()).clamp(0.0, 1.0)
            }
            None => 1.0,
        }
    }

    /// Deadline of the pending promotion, for frame scheduling. A promotion
    /// left behind by a superseded phase does not count.
    pub fn next_due(&self) -> Option<Instant> {
        self.pending
            .filter(|p| p.epoch == self.epoch)
            .map(|p| p.due)
    }

    // A superseded promotion is not cancelled here; it is disarmed by the
    // epoch comparison when it comes due.
    fn set_phase(&mut self, phase: RevealPhase, now: Instant) {
        self.phase = phase;
        self.phase_entered = Some(now);
        self.epoch += 1;
    }

    fn schedule_promotion(&mut self, now: Instant) {
        self.pending = Some(PendingPromotion {
            epoch: self.epoch,
            due: now + self.reveal_delay,
        });
    }

    /// Advance one reveal step, crossing to the next slide when the current
    /// one has nothing left to disclose.
    pub fn advance(&mut self, now: Instant) {
        // The talk timer starts implicitly with the first navigation.
        if self.timer_started.is_none() {
            self.timer_started = Some(now);
        }

        let slide = self.current_slide();
        let kind = slide.kind();
        let has_secondary = slide.has_secondary();
        let has_tertiary = slide.has_tertiary();

        if kind == SlideKind::Video {
            self.goto_next_slide(now);
            return;
        }

        match self.phase {
            RevealPhase::Initial => {
                self.set_phase(RevealPhase::Revealing, now);
                self.schedule_promotion(now);
            }
            // Explicit input preempts the promotion timer.
            RevealPhase::Revealing => self.set_phase(RevealPhase::Revealed, now),
            RevealPhase::Revealed => {
                if has_secondary {
                    self.set_phase(RevealPhase::Secondary, now);
                } else {
                    self.goto_next_slide(now);
                }
            }
            RevealPhase::Secondary => {
                if has_tertiary {
                    self.set_phase(RevealPhase::Tertiary, now);
                } else {
                    self.goto_next_slide(now);
                }
            }
            RevealPhase::Tertiary => self.goto_next_slide(now),
        }
    }

    /// Step back one reveal level, or cross to the previous slide at its
    /// furthest supported phase. Revealing and Revealed both collapse to
    /// Initial; the pair is not a strict inverse of `advance`.
    pub fn retreat(&mut self, now: Instant) {
        match self.phase {
            RevealPhase::Tertiary => self.set_phase(RevealPhase::Secondary, now),
            RevealPhase::Secondary => self.set_phase(RevealPhase::Revealed, now),
            RevealPhase::Revealed | RevealPhase::Revealing => {
                self.set_phase(RevealPhase::Initial, now)
            }
            RevealPhase::Initial => {
                if self.current == 0 {
                    return;
                }
                self.current -= 1;
                let phase = furthest_phase(&self.deck.slides[self.current]);
                self.set_phase(phase, now);
            }
        }
    }

    /// Move to the next slide, entering it Revealed (video) or Revealing
    /// with a scheduled promotion (image). Clamped at the last slide.
    pub fn goto_next_slide(&mut self, now: Instant) {
        if self.current + 1 >= self.deck.len() {
            return;
        }
        self.current += 1;
        match self.current_slide().kind() {
            SlideKind::Video => self.set_phase(RevealPhase::Revealed, now),
            SlideKind::Image => {
                self.set_phase(RevealPhase::Revealing, now);
                self.schedule_promotion(now);
            }
        }
    }

    /// Presenter-driven scrubbing: lands directly on Revealed, bypassing the
    /// phased entry. Out-of-range targets leave the state untouched.
    pub fn jump_to(&mut self, index: usize, now: Instant) {
        if index >= self.deck.len() {
            return;
        }
        self.current = index;
        self.set_phase(RevealPhase::Revealed, now);
    }

    /// The video slide's clip reached its natural end.
    pub fn video_ended(&mut self, now: Instant) {
        self.advance(now);
    }

    /// Fire a due promotion if it is still authoritative. Returns true when
    /// the phase changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let Some(pending) = self.pending else {
            return false;
        };
        if pending.epoch != self.epoch {
            // Superseded by manual input since it was scheduled.
            self.pending = None;
            return false;
        }
        if now < pending.due {
            return false;
        }
        self.pending = None;
        self.set_phase(RevealPhase::Revealed, now);
        true
    }

    pub fn start_timer(&mut self, now: Instant) {
        if self.timer_started.is_none() {
            self.timer_started = Some(now);
        }
    }

    pub fn reset_timer(&mut self) {
        self.timer_started = None;
    }
}

fn furthest_phase(slide: &Slide) -> RevealPhase {
    if slide.has_tertiary() {
        RevealPhase::Tertiary
    } else if slide.has_secondary() {
        RevealPhase::Secondary
    } else {
        RevealPhase::Revealed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::Deck;

    const DELAY: Duration = Duration::from_millis(800);

    fn deck(yaml: &str) -> Deck {
        Deck::from_str(yaml).unwrap()
    }

    fn plain_deck(count: usize) -> Deck {
        let mut yaml = String::from("slides:\n");
        for i in 0..count {
            yaml.push_str(&format!("  - id: {}\n    title: Slide {}\n", i + 1, i + 1));
        }
        deck(&yaml)
    }

    fn session(deck: Deck) -> Session {
        Session::new(deck, DELAY)
    }

    fn t0() -> Instant {
        Instant::now()
    }

    #[test]
    fn test_plain_slide_crosses_in_three_advances() {
        let mut s = session(plain_deck(3));
        let now = t0();
        assert_eq!((s.current(), s.phase()), (0, RevealPhase::Initial));
        s.advance(now);
        assert_eq!(s.phase(), RevealPhase::Revealing);
        s.advance(now);
        assert_eq!(s.phase(), RevealPhase::Revealed);
        s.advance(now);
        assert_eq!((s.current(), s.phase()), (1, RevealPhase::Revealing));
    }

    #[test]
    fn test_plain_slide_never_exposes_upper_phases() {
        let mut s = session(plain_deck(2));
        let now = t0();
        for _ in 0..10 {
            s.advance(now);
            assert!(s.phase() <= RevealPhase::Revealed);
        }
    }

    #[test]
    fn test_secondary_only_skips_tertiary() {
        let mut s = session(deck(
            "slides:\n  - id: 1\n    top_messages: [a]\n  - id: 2\n    title: Next\n",
        ));
        let now = t0();
        s.advance(now); // Revealing
        s.advance(now); // Revealed
        s.advance(now);
        assert_eq!(s.phase(), RevealPhase::Secondary);
        s.advance(now);
        assert_eq!((s.current(), s.phase()), (1, RevealPhase::Revealing));
    }

    #[test]
    fn test_tertiary_slide_full_ladder() {
        let mut s = session(deck(
            "slides:\n  - id: 1\n    users:\n      - image: a.png\n        title: A\n    why_them:\n      title: Why\n  - id: 2\n    title: Next\n",
        ));
        let now = t0();
        s.advance(now);
        s.advance(now);
        s.advance(now);
        assert_eq!(s.phase(), RevealPhase::Secondary);
        s.advance(now);
        assert_eq!(s.phase(), RevealPhase::Tertiary);
        s.advance(now);
        assert_eq!((s.current(), s.phase()), (1, RevealPhase::Revealing));
    }

    #[test]
    fn test_retreat_mirrors_advance_within_slide() {
        let mut s = session(deck(
            "slides:\n  - id: 1\n    top_messages: [a]\n    why_them:\n      title: Why\n",
        ));
        let now = t0();
        s.advance(now);
        s.advance(now);
        s.advance(now);
        s.advance(now);
        assert_eq!(s.phase(), RevealPhase::Tertiary);
        s.retreat(now);
        assert_eq!(s.phase(), RevealPhase::Secondary);
        s.retreat(now);
        assert_eq!(s.phase(), RevealPhase::Revealed);
        s.retreat(now);
        assert_eq!(s.phase(), RevealPhase::Initial);
    }

    #[test]
    fn test_revealing_collapses_to_initial_on_retreat() {
        let mut s = session(plain_deck(2));
        let now = t0();
        s.advance(now);
        assert_eq!(s.phase(), RevealPhase::Revealing);
        s.retreat(now);
        assert_eq!(s.phase(), RevealPhase::Initial);
    }

    #[test]
    fn test_backward_crossing_lands_on_furthest_phase() {
        let mut s = session(deck(
            "slides:\n  - id: 1\n    top_messages: [a]\n  - id: 2\n    title: Next\n",
        ));
        let now = t0();
        s.jump_to(1, now);
        s.retreat(now); // Revealed -> Initial
        s.retreat(now); // cross back
        assert_eq!((s.current(), s.phase()), (0, RevealPhase::Secondary));
    }

    #[test]
    fn test_backward_crossing_plain_slide_lands_revealed() {
        let mut s = session(plain_deck(2));
        let now = t0();
        s.jump_to(1, now);
        s.retreat(now);
        s.retreat(now);
        assert_eq!((s.current(), s.phase()), (0, RevealPhase::Revealed));
    }

    #[test]
    fn test_retreat_clamped_at_first_slide() {
        let mut s = session(plain_deck(2));
        let now = t0();
        s.retreat(now);
        assert_eq!((s.current(), s.phase()), (0, RevealPhase::Initial));
    }

    #[test]
    fn test_promotion_fires_when_due() {
        let mut s = session(plain_deck(2));
        let now = t0();
        s.advance(now);
        assert_eq!(s.phase(), RevealPhase::Revealing);
        assert!(!s.tick(now + DELAY / 2));
        assert_eq!(s.phase(), RevealPhase::Revealing);
        assert!(s.tick(now + DELAY));
        assert_eq!(s.phase(), RevealPhase::Revealed);
    }

    #[test]
    fn test_stale_promotion_is_noop() {
        let mut s = session(plain_deck(2));
        let now = t0();
        s.advance(now); // Revealing, promotion scheduled
        s.advance(now + Duration::from_millis(100)); // manual preempt -> Revealed
        assert_eq!(s.phase(), RevealPhase::Revealed);
        let epoch = s.epoch();
        assert!(!s.tick(now + DELAY + Duration::from_millis(1)));
        assert_eq!(s.phase(), RevealPhase::Revealed);
        assert_eq!(s.epoch(), epoch, "stale timer must not mutate state");
    }

    #[test]
    fn test_promotion_only_fires_once() {
        let mut s = session(plain_deck(2));
        let now = t0();
        s.advance(now);
        assert!(s.tick(now + DELAY));
        assert!(!s.tick(now + DELAY * 2));
    }

    #[test]
    fn test_jump_to_lands_revealed() {
        let mut s = session(plain_deck(5));
        let now = t0();
        s.jump_to(3, now);
        assert_eq!((s.current(), s.phase()), (3, RevealPhase::Revealed));
    }

    #[test]
    fn test_jump_to_out_of_range_unchanged() {
        let mut s = session(plain_deck(3));
        let now = t0();
        s.advance(now);
        let before = (s.current(), s.phase(), s.epoch());
        s.jump_to(3, now);
        assert_eq!((s.current(), s.phase(), s.epoch()), before);
    }

    #[test]
    fn test_last_slide_is_terminal() {
        let mut s = session(plain_deck(2));
        let now = t0();
        s.jump_to(1, now);
        for _ in 0..5 {
            s.advance(now);
        }
        assert_eq!(s.current(), 1);
    }

    #[test]
    fn test_video_slide_enters_revealed() {
        let mut s = session(deck(
            "slides:\n  - id: 1\n    title: Intro\n  - id: video\n    video: demo.mp4\n  - id: 2\n    title: After\n",
        ));
        let now = t0();
        s.jump_to(0, now);
        s.advance(now);
        assert_eq!((s.current(), s.phase()), (1, RevealPhase::Revealed));
    }

    #[test]
    fn test_video_end_is_implicit_advance() {
        let mut s = session(deck(
            "slides:\n  - id: video\n    video: demo.mp4\n  - id: 2\n    title: After\n",
        ));
        let now = t0();
        assert_eq!(s.phase(), RevealPhase::Revealed);
        s.video_ended(now);
        assert_eq!((s.current(), s.phase()), (1, RevealPhase::Revealing));
    }

    #[test]
    fn test_first_advance_starts_timer() {
        let mut s = session(plain_deck(2));
        let now = t0();
        assert!(s.timer_started().is_none());
        s.advance(now);
        assert_eq!(s.timer_started(), Some(now));
    }

    #[test]
    fn test_start_timer_noop_when_running() {
        let mut s = session(plain_deck(2));
        let now = t0();
        s.start_timer(now);
        s.start_timer(now + Duration::from_secs(5));
        assert_eq!(s.timer_started(), Some(now));
        s.reset_timer();
        assert!(s.timer_started().is_none());
    }

    #[test]
    fn test_eleven_slide_scenario() {
        // Slide 3 (index 2) has secondary but no tertiary content.
        let mut yaml = String::from("slides:\n");
        for i in 0..11 {
            yaml.push_str(&format!("  - id: {}\n", i + 1));
            if i == 2 {
                yaml.push_str("    top_messages: [focus]\n");
            }
        }
        let mut s = session(deck(&yaml));
        let now = t0();
        s.jump_to(2, now);
        s.retreat(now); // Revealed -> Initial, stay on index 2
        assert_eq!((s.current(), s.phase()), (2, RevealPhase::Initial));

        s.advance(now);
        assert_eq!((s.current(), s.phase()), (2, RevealPhase::Revealing));
        s.advance(now);
        assert_eq!((s.current(), s.phase()), (2, RevealPhase::Revealed));
        s.advance(now);
        assert_eq!((s.current(), s.phase()), (2, RevealPhase::Secondary));
        s.advance(now);
        assert_eq!((s.current(), s.phase()), (3, RevealPhase::Revealing));
    }

    #[test]
    fn test_revealing_progress_tracks_delay() {
        let mut s = session(plain_deck(2));
        let now = t0();
        s.advance(now);
        assert_eq!(s.revealing_progress(now), 0.0);
        assert!((s.revealing_progress(now + DELAY / 2) - 0.5).abs() < 0.01);
        assert_eq!(s.revealing_progress(now + DELAY * 2), 1.0);
    }
}
