//! Tone Synthesis
//!
//! Declarative per-event scores (tones, melodies, vibration patterns) and the
//! synthesizer that renders them on the audio graph when no sprite asset is
//! available.

use super::context::AudioResourceManager;
use super::events::FeedbackEvent;
use crate::platform::ToneRequest;
use std::sync::Arc;
use std::time::Duration;

/// Note frequencies used by the event scores.
pub mod frequencies {
    pub const A4: f32 = 440.00;
    pub const C5: f32 = 523.25;
    pub const E5: f32 = 659.25;
    pub const G5: f32 = 783.99;
    pub const A5: f32 = 880.00;
    pub const C6: f32 = 1046.50;
    pub const E6: f32 = 1318.51;
    /// Short UI click
    pub const CLICK: f32 = 1000.00;
    /// Near-silent probe used for silent-mode detection
    pub const PROBE: f32 = 20.00;
}

/// Attack time of every envelope.
pub const ATTACK: Duration = Duration::from_millis(10);

/// Gain the exponential release approaches, as a fraction of peak.
pub const RELEASE_FLOOR: f32 = 0.001;

/// Gain automation for one oscillator or sprite segment.
///
/// Linear ramp from 0 to `peak` over [`ATTACK`], then an exponential decay
/// that reaches `peak * RELEASE_FLOOR` at `length`. Silence after `length`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub attack: Duration,
    pub peak: f32,
    pub length: Duration,
}

impl Envelope {
    pub fn new(peak: f32, length: Duration) -> Self {
        Self {
            attack: ATTACK.min(length),
            peak: peak.clamp(0.0, 1.0),
            length,
        }
    }

    /// Gain at `t` after the start.
    pub fn gain_at(&self, t: Duration) -> f32 {
        if t >= self.length {
            return 0.0;
        }
        if t < self.attack {
            return self.peak * (t.as_secs_f32() / self.attack.as_secs_f32());
        }

        let release = (self.length - self.attack).as_secs_f32();
        if release <= 0.0 {
            return self.peak;
        }
        let progress = (t - self.attack).as_secs_f32() / release;
        self.peak * RELEASE_FLOOR.powf(progress)
    }
}

/// One note of a melody.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MelodyNote {
    pub frequency_hz: f32,
    pub duration_ms: u64,
    /// Start delay relative to the first note
    pub delay_ms: u64,
}

impl MelodyNote {
    pub const fn new(frequency_hz: f32, duration_ms: u64, delay_ms: u64) -> Self {
        Self {
            frequency_hz,
            duration_ms,
            delay_ms,
        }
    }
}

const fn note(frequency_hz: f32, duration_ms: u64, delay_ms: u64) -> MelodyNote {
    MelodyNote::new(frequency_hz, duration_ms, delay_ms)
}

/// Score for one event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventSoundConfig {
    Tone {
        frequency_hz: f32,
        duration_ms: u64,
        volume: f32,
    },
    Melody {
        notes: &'static [MelodyNote],
        volume: f32,
    },
}

use frequencies::*;

const REST_COMPLETE: &[MelodyNote] = &[note(A5, 150, 0), note(A5, 150, 200), note(E6, 300, 400)];
const WORKOUT_START: &[MelodyNote] = &[note(C5, 150, 0), note(G5, 250, 170)];
const WORKOUT_COMPLETE: &[MelodyNote] = &[note(G5, 200, 0), note(C6, 200, 220), note(E6, 500, 440)];
const PERSONAL_RECORD: &[MelodyNote] = &[
    note(C5, 120, 0),
    note(E5, 120, 130),
    note(G5, 120, 260),
    note(C6, 400, 390),
];

impl EventSoundConfig {
    /// Static score for an event.
    pub fn for_event(event: FeedbackEvent) -> Self {
        match event {
            FeedbackEvent::RestComplete => EventSoundConfig::Melody {
                notes: REST_COMPLETE,
                volume: 0.6,
            },
            FeedbackEvent::WorkoutStart => EventSoundConfig::Melody {
                notes: WORKOUT_START,
                volume: 0.5,
            },
            FeedbackEvent::WorkoutComplete => EventSoundConfig::Melody {
                notes: WORKOUT_COMPLETE,
                volume: 0.6,
            },
            FeedbackEvent::PersonalRecord => EventSoundConfig::Melody {
                notes: PERSONAL_RECORD,
                volume: 0.7,
            },
            FeedbackEvent::ButtonClick => EventSoundConfig::Tone {
                frequency_hz: CLICK,
                duration_ms: 40,
                volume: 0.15,
            },
            FeedbackEvent::TestSound => EventSoundConfig::Tone {
                frequency_hz: A4,
                duration_ms: 400,
                volume: 0.5,
            },
        }
    }
}

/// On/off vibration pattern in milliseconds for an event.
pub fn vibration_pattern(event: FeedbackEvent) -> &'static [u32] {
    match event {
        FeedbackEvent::RestComplete => &[200, 100, 200],
        FeedbackEvent::WorkoutStart => &[100, 50, 100],
        FeedbackEvent::WorkoutComplete => &[300, 100, 300, 100, 300],
        FeedbackEvent::PersonalRecord => &[100, 50, 100, 50, 100, 50, 400],
        FeedbackEvent::ButtonClick => &[10],
        FeedbackEvent::TestSound => &[200],
    }
}

/// Renders tones and melodies on the managed audio graph.
pub struct ToneSynthesizer {
    resources: Arc<AudioResourceManager>,
    master_volume: f32,
}

impl ToneSynthesizer {
    pub fn new(resources: Arc<AudioResourceManager>, master_volume: f32) -> Self {
        Self {
            resources,
            master_volume: master_volume.clamp(0.0, 1.0),
        }
    }

    /// Play a single tone. Returns `false` if the graph is not ready or synthesis fails.
    pub fn play_tone(&self, frequency_hz: f32, duration: Duration, volume: f32) -> bool {
        self.start(&[ToneRequest {
            frequency_hz,
            start_delay: Duration::ZERO,
            envelope: Envelope::new(volume * self.master_volume, duration),
        }])
    }

    /// Play a melody. Only the first note plays where concurrent tones glitch.
    /// Succeeds if the first note started, even if a later one fails.
    pub fn play_melody(&self, notes: &[MelodyNote], volume: f32) -> bool {
        let notes = if self.resources.profile().can_play_multiple {
            notes
        } else {
            &notes[..notes.len().min(1)]
        };
        if notes.is_empty() {
            return false;
        }

        let requests: Vec<ToneRequest> = notes
            .iter()
            .map(|n| ToneRequest {
                frequency_hz: n.frequency_hz,
                start_delay: Duration::from_millis(n.delay_ms),
                envelope: Envelope::new(
                    volume * self.master_volume,
                    Duration::from_millis(n.duration_ms),
                ),
            })
            .collect();

        self.start(&requests)
    }

    /// Play the configured score for `event`.
    pub fn play_event(&self, event: FeedbackEvent) -> bool {
        match EventSoundConfig::for_event(event) {
            EventSoundConfig::Tone {
                frequency_hz,
                duration_ms,
                volume,
            } => self.play_tone(frequency_hz, Duration::from_millis(duration_ms), volume),
            EventSoundConfig::Melody { notes, volume } => self.play_melody(notes, volume),
        }
    }

    fn start(&self, requests: &[ToneRequest]) -> bool {
        let Some(graph) = self.resources.ready_graph() else {
            tracing::debug!("Tone synthesis skipped: audio graph not ready");
            return false;
        };

        // Once a note is sounding the event has been heard.
        let mut started = 0;
        for request in requests {
            match graph.start_tone(*request) {
                Ok(()) => started += 1,
                Err(e) => {
                    tracing::warn!("Tone synthesis failed at {} Hz: {}", request.frequency_hz, e);
                    break;
                }
            }
        }

        if started > 0 && started < requests.len() {
            tracing::debug!("Melody cut short after {} of {} notes", started, requests.len());
        }
        started > 0
    }
}
