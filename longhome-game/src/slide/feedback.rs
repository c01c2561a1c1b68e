//! Turns slide events and the control spectrum into presentation requests.
//!
//! The core never plays anything itself; presentation layers drain the
//! queued [`EffectRequest`]s after each tick.
use serde::{Deserialize, Serialize};

use crate::events::{Event, EventKind};
use crate::slide::{ControlLevel, ControlSpectrum, SlideOutcome, SlideState};

/// Audio cues the slide layer may ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackCue {
    SlideStart,
    WindRush,
    EdgeScrape,
    ControlWarning,
    PanicBreathing,
    ExitChime,
    ArrestScrape,
    SlideSettle,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum EffectRequest {
    CameraShake { intensity: f32, duration: f32 },
    AudioCue { cue: FeedbackCue, volume: f32 },
    Haptic { strength: f32, duration: f32 },
}

/// Collects effect requests for one slide.
#[derive(Debug, Clone, PartialEq)]
pub struct SlideFeedback {
    terminal_speed: f32,
    requests: Vec<EffectRequest>,
}

impl SlideFeedback {
    /// Wind volume saturates at `terminal_speed`.
    #[must_use]
    pub fn new(terminal_speed: f32) -> Self {
        Self {
            terminal_speed: terminal_speed.max(f32::EPSILON),
            requests: Vec::new(),
        }
    }

    /// Queue requests for this tick's events plus continuous cues.
    pub fn update(&mut self, state: &SlideState, spectrum: &ControlSpectrum, events: &[Event]) {
        for event in events {
            self.on_event(&event.kind);
        }
        if state.speed > 0.0 {
            self.requests.push(EffectRequest::AudioCue {
                cue: FeedbackCue::WindRush,
                volume: (state.speed / self.terminal_speed).clamp(0.0, 1.0),
            });
        }
        if spectrum.level >= ControlLevel::Unstable {
            self.requests.push(EffectRequest::CameraShake {
                intensity: 0.2 + state.risk * 0.6,
                duration: 0.1,
            });
        }
    }

    fn on_event(&mut self, kind: &EventKind) {
        match kind {
            EventKind::SlideStarted { .. } => {
                self.requests.push(EffectRequest::AudioCue {
                    cue: FeedbackCue::SlideStart,
                    volume: 0.8,
                });
            }
            EventKind::SlideControlChanged { new_level, .. } => {
                let strength = match new_level {
                    ControlLevel::Controlled => return,
                    ControlLevel::Marginal => 0.3,
                    ControlLevel::Unstable => 0.6,
                    ControlLevel::Lost => 1.0,
                };
                self.requests.push(EffectRequest::Haptic {
                    strength,
                    duration: 0.25,
                });
            }
            EventKind::ControlWarningStarted => {
                self.requests.push(EffectRequest::AudioCue {
                    cue: FeedbackCue::ControlWarning,
                    volume: 0.6,
                });
            }
            EventKind::PanicStarted => {
                self.requests.push(EffectRequest::AudioCue {
                    cue: FeedbackCue::PanicBreathing,
                    volume: 0.9,
                });
            }
            EventKind::ExitZoneApproached { quality, .. } => {
                self.requests.push(EffectRequest::AudioCue {
                    cue: FeedbackCue::ExitChime,
                    volume: 0.4 + quality * 0.4,
                });
            }
            EventKind::SelfArrestAttempted { .. } => {
                self.requests.push(EffectRequest::AudioCue {
                    cue: FeedbackCue::ArrestScrape,
                    volume: 1.0,
                });
                self.requests.push(EffectRequest::Haptic {
                    strength: 0.8,
                    duration: 0.4,
                });
            }
            EventKind::TerminalVelocityWarning { .. } => {
                self.requests.push(EffectRequest::CameraShake {
                    intensity: 0.5,
                    duration: 0.5,
                });
            }
            EventKind::SlideEnded { outcome, .. } => match outcome {
                SlideOutcome::TerminalRunout => {}
                SlideOutcome::TumbleStop | SlideOutcome::TerrainCatch => {
                    self.requests.push(EffectRequest::CameraShake {
                        intensity: 0.6,
                        duration: 0.3,
                    });
                }
                SlideOutcome::CleanStop | SlideOutcome::CompoundSlide => {
                    self.requests.push(EffectRequest::AudioCue {
                        cue: FeedbackCue::SlideSettle,
                        volume: 0.5,
                    });
                }
            },
            _ => {}
        }
    }

    #[must_use]
    pub fn pending(&self) -> &[EffectRequest] {
        &self.requests
    }

    pub fn clear(&mut self) {
        self.requests.clear();
    }

    pub fn drain(&mut self) -> Vec<EffectRequest> {
        std::mem::take(&mut self.requests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;

    #[test]
    fn losing_control_requests_haptics_and_shake() {
        let mut bus = EventBus::new();
        bus.emit(EventKind::SlideControlChanged {
            old_level: ControlLevel::Unstable,
            new_level: ControlLevel::Lost,
        });
        let state = SlideState {
            speed: 20.0,
            risk: 0.5,
            ..SlideState::default()
        };
        let spectrum = ControlSpectrum {
            level: ControlLevel::Lost,
            ..ControlSpectrum::default()
        };
        let mut feedback = SlideFeedback::new(25.0);
        feedback.update(&state, &spectrum, bus.pending());
        let requests = feedback.drain();
        assert!(requests.iter().any(|r| {
            matches!(r, EffectRequest::Haptic { strength, .. } if (*strength - 1.0).abs() < 1e-6)
        }));
        assert!(requests.iter().any(|r| matches!(r, EffectRequest::CameraShake { .. })));
        assert!(feedback.pending().is_empty());
    }

    #[test]
    fn stationary_calm_slide_is_quiet() {
        let mut feedback = SlideFeedback::new(25.0);
        feedback.update(&SlideState::default(), &ControlSpectrum::default(), &[]);
        assert!(feedback.pending().is_empty());
    }

    #[test]
    fn wind_volume_follows_tuned_terminal_speed() {
        let state = SlideState {
            speed: 15.0,
            ..SlideState::default()
        };
        let wind = |terminal_speed: f32| {
            let mut feedback = SlideFeedback::new(terminal_speed);
            feedback.update(&state, &ControlSpectrum::default(), &[]);
            feedback.drain().into_iter().find_map(|request| match request {
                EffectRequest::AudioCue {
                    cue: FeedbackCue::WindRush,
                    volume,
                } => Some(volume),
                _ => None,
            })
        };
        assert_eq!(wind(30.0), Some(0.5));
        assert_eq!(wind(15.0), Some(1.0));
    }
}
