//! Posture classification: mapping the continuous state to a discrete
//! interaction style.
//!
//! The bare [`classify`] function is total and deterministic but
//! instantaneous — two calls straddling a threshold can flip the label.
//! Callers doing live classification should go through [`PostureTracker`],
//! which smooths the inputs and applies a hysteresis band so small
//! perturbations do not make the posture oscillate.

use crate::state::{LimbicState, Posture};
use serde::{Deserialize, Serialize};

/// Tuning thresholds for the trust x warmth quadrant rule. These are domain
/// tuning values, not structural contracts; override them via configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PostureThresholds {
    /// Trust at or above this counts as "high trust".
    pub trust: f32,
    /// Warmth at or above this counts as "high warmth".
    pub warmth: f32,
    /// Hysteresis half-width around each threshold used by the tracker.
    pub band: f32,
}

impl Default for PostureThresholds {
    fn default() -> Self {
        Self {
            trust: 0.55,
            warmth: 0.55,
            band: 0.05,
        }
    }
}

/// Classify a state into one of the four postures.
///
/// Quadrant rule over trust x warmth:
/// - high trust, high warmth -> Companion
/// - high trust, low warmth  -> Copilot
/// - low trust, high warmth  -> Peer
/// - low trust, low warmth   -> Expert
pub fn classify(state: &LimbicState, thresholds: &PostureThresholds) -> Posture {
    match (
        state.trust >= thresholds.trust,
        state.warmth >= thresholds.warmth,
    ) {
        (true, true) => Posture::Companion,
        (true, false) => Posture::Copilot,
        (false, true) => Posture::Peer,
        (false, false) => Posture::Expert,
    }
}

/// Stateful classifier for live use: exponentially smooths trust and warmth,
/// then classifies with per-axis hysteresis. The label only switches when the
/// smoothed value crosses the threshold shifted *away* from the current side,
/// so a value hovering exactly at the threshold stays put.
#[derive(Debug, Clone)]
pub struct PostureTracker {
    thresholds: PostureThresholds,
    /// Smoothing factor per observation (0.0 = frozen, 1.0 = instant).
    smoothing: f32,
    trust: f32,
    warmth: f32,
    trust_high: bool,
    warmth_high: bool,
    current: Posture,
}

impl PostureTracker {
    pub fn new(initial: &LimbicState, thresholds: PostureThresholds, smoothing: f32) -> Self {
        let trust_high = initial.trust >= thresholds.trust;
        let warmth_high = initial.warmth >= thresholds.warmth;
        Self {
            thresholds,
            smoothing: smoothing.clamp(0.0, 1.0),
            trust: initial.trust,
            warmth: initial.warmth,
            trust_high,
            warmth_high,
            current: Self::quadrant(trust_high, warmth_high),
        }
    }

    fn quadrant(trust_high: bool, warmth_high: bool) -> Posture {
        match (trust_high, warmth_high) {
            (true, true) => Posture::Companion,
            (true, false) => Posture::Copilot,
            (false, true) => Posture::Peer,
            (false, false) => Posture::Expert,
        }
    }

    /// Whether an axis counts as "high", with hysteresis: once high, it stays
    /// high until the value drops below `threshold - band`; once low, it stays
    /// low until the value rises above `threshold + band`.
    fn axis_high(was_high: bool, value: f32, threshold: f32, band: f32) -> bool {
        if was_high {
            value >= threshold - band
        } else {
            value >= threshold + band
        }
    }

    /// Feed a new snapshot and get the (possibly unchanged) posture.
    pub fn observe(&mut self, state: &LimbicState) -> Posture {
        self.trust += (state.trust - self.trust) * self.smoothing;
        self.warmth += (state.warmth - self.warmth) * self.smoothing;

        self.trust_high = Self::axis_high(
            self.trust_high,
            self.trust,
            self.thresholds.trust,
            self.thresholds.band,
        );
        self.warmth_high = Self::axis_high(
            self.warmth_high,
            self.warmth,
            self.thresholds.warmth,
            self.thresholds.band,
        );

        self.current = Self::quadrant(self.trust_high, self.warmth_high);
        self.current
    }

    pub fn current(&self) -> Posture {
        self.current
    }
}
