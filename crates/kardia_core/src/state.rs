//! The limbic state value type and its bounded-update rules.
//!
//! `LimbicState` is immutable-by-replacement: every successful update produces
//! a new snapshot, the previous one is retained for history. All four affective
//! dimensions live in `[0.0, 1.0]`; out-of-range input is clamped, not
//! rejected, so a noisy backend can never push the state out of bounds.

use serde::{Deserialize, Serialize};

/// Guard against NaN and Infinity in state values.
/// If the value is non-finite, replace it with the provided homeostatic fallback.
#[inline]
pub(crate) fn sanitize_f32(v: f32, fallback: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        tracing::warn!("NaN/Inf detected in state, resetting to fallback {}", fallback);
        fallback
    }
}

/// Current Unix time in epoch milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// =============================================================================
// Posture
// =============================================================================

/// Discrete interaction style derived from the continuous state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Posture {
    /// Warm and trusting: emotionally engaged, personal register.
    Companion,
    /// Trusting but task-focused: collaborative, low small talk.
    Copilot,
    /// Warm but unproven: friendly equal footing.
    Peer,
    /// Neither warm nor trusting: formal, professional distance.
    Expert,
}

impl Default for Posture {
    fn default() -> Self {
        Posture::Peer
    }
}

impl std::fmt::Display for Posture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Posture::Companion => "COMPANION",
            Posture::Copilot => "COPILOT",
            Posture::Peer => "PEER",
            Posture::Expert => "EXPERT",
        };
        f.write_str(label)
    }
}

impl std::str::FromStr for Posture {
    type Err = crate::error::KardiaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "COMPANION" => Ok(Posture::Companion),
            "COPILOT" => Ok(Posture::Copilot),
            "PEER" => Ok(Posture::Peer),
            "EXPERT" => Ok(Posture::Expert),
            other => Err(crate::error::KardiaError::Validation(format!(
                "unknown posture: {}",
                other
            ))),
        }
    }
}

// =============================================================================
// LimbicState
// =============================================================================

fn default_trust() -> f32 {
    0.5
}
fn default_warmth() -> f32 {
    0.6
}
fn default_arousal() -> f32 {
    0.7
}
fn default_valence() -> f32 {
    0.6
}

/// The complete affective state of the agent toward its user.
///
/// Missing fields at deserialization time fall back to the default state's
/// value for that field only; extra fields are ignored. This tolerates schema
/// drift between client and backend in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LimbicState {
    /// Confidence the user has earned (0.0 - 1.0).
    #[serde(default = "default_trust")]
    pub trust: f32,

    /// Emotional closeness of the relationship (0.0 - 1.0).
    #[serde(default = "default_warmth")]
    pub warmth: f32,

    /// Activation level of the agent (0.0 - 1.0).
    #[serde(default = "default_arousal")]
    pub arousal: f32,

    /// Positivity of the current affect (0.0 - 1.0).
    #[serde(default = "default_valence")]
    pub valence: f32,

    /// Cached interaction-style classification. Derived, not independently
    /// settable except by explicit override.
    #[serde(default)]
    pub posture: Posture,

    /// Number of applied interactions this session. Monotonically
    /// non-decreasing; server full-state replacements never add to it.
    #[serde(default)]
    pub interaction_count: u64,

    /// Unix epoch milliseconds of the most recent mutation. Monotonically
    /// non-decreasing.
    #[serde(default)]
    pub last_interaction_ts: i64,
}

impl Default for LimbicState {
    fn default() -> Self {
        Self {
            trust: default_trust(),
            warmth: default_warmth(),
            arousal: default_arousal(),
            valence: default_valence(),
            posture: Posture::Peer,
            interaction_count: 0,
            last_interaction_ts: 0,
        }
    }
}

impl LimbicState {
    /// Sanitize and clamp all numeric fields to their valid ranges.
    pub fn normalize(&mut self) {
        self.trust = sanitize_f32(self.trust, default_trust()).clamp(0.0, 1.0);
        self.warmth = sanitize_f32(self.warmth, default_warmth()).clamp(0.0, 1.0);
        self.arousal = sanitize_f32(self.arousal, default_arousal()).clamp(0.0, 1.0);
        self.valence = sanitize_f32(self.valence, default_valence()).clamp(0.0, 1.0);
        if self.last_interaction_ts < 0 {
            self.last_interaction_ts = 0;
        }
    }

    /// Merge a partial update field-by-field (last-write-wins per field),
    /// producing a new snapshot. Counters and timestamp are untouched here;
    /// the store advances them as part of its atomic mutation.
    pub fn apply(&self, delta: &LimbicDelta) -> LimbicState {
        let mut next = *self;
        if let Some(v) = delta.trust {
            next.trust = v;
        }
        if let Some(v) = delta.warmth {
            next.warmth = v;
        }
        if let Some(v) = delta.arousal {
            next.arousal = v;
        }
        if let Some(v) = delta.valence {
            next.valence = v;
        }
        if let Some(p) = delta.posture {
            next.posture = p;
        }
        next.normalize();
        next
    }
}

// =============================================================================
// LimbicDelta
// =============================================================================

/// A statically-typed partial update: every field optional, absent fields
/// leave the current value untouched. Unknown fields in incoming JSON are
/// dropped at this boundary rather than deep inside the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LimbicDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warmth: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arousal: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valence: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posture: Option<Posture>,
}

impl LimbicDelta {
    /// True when no recognized field is present. Applying an empty delta is a
    /// no-op that still advances the timestamp.
    pub fn is_empty(&self) -> bool {
        self.trust.is_none()
            && self.warmth.is_none()
            && self.arousal.is_none()
            && self.valence.is_none()
            && self.posture.is_none()
    }

    /// Pure normalization: clamp each present numeric field into `[0, 1]`,
    /// leave absent fields and posture untouched. No side effects.
    pub fn clamped(&self) -> LimbicDelta {
        let clamp = |v: Option<f32>, fallback: f32| {
            v.map(|x| sanitize_f32(x, fallback).clamp(0.0, 1.0))
        };
        LimbicDelta {
            trust: clamp(self.trust, default_trust()),
            warmth: clamp(self.warmth, default_warmth()),
            arousal: clamp(self.arousal, default_arousal()),
            valence: clamp(self.valence, default_valence()),
            posture: self.posture,
        }
    }

    pub fn trust(v: f32) -> Self {
        LimbicDelta {
            trust: Some(v),
            ..Default::default()
        }
    }

    pub fn posture(p: Posture) -> Self {
        LimbicDelta {
            posture: Some(p),
            ..Default::default()
        }
    }
}

// =============================================================================
// History
// =============================================================================

/// One audit record: the snapshot that was replaced and when.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub state: LimbicState,
    /// Epoch milliseconds at which this snapshot was superseded.
    pub recorded_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_documented_values() {
        let s = LimbicState::default();
        assert_eq!(s.trust, 0.5);
        assert_eq!(s.warmth, 0.6);
        assert_eq!(s.arousal, 0.7);
        assert_eq!(s.valence, 0.6);
        assert_eq!(s.posture, Posture::Peer);
        assert_eq!(s.interaction_count, 0);
        assert_eq!(s.last_interaction_ts, 0);
    }

    #[test]
    fn test_apply_clamps_out_of_range() {
        let s = LimbicState::default();
        let delta = LimbicDelta {
            trust: Some(5.0),
            warmth: Some(-3.0),
            arousal: Some(1.5),
            valence: Some(f32::NAN),
            posture: None,
        };
        let next = s.apply(&delta);
        assert_eq!(next.trust, 1.0);
        assert_eq!(next.warmth, 0.0);
        assert_eq!(next.arousal, 1.0);
        assert!(next.valence >= 0.0 && next.valence <= 1.0);
    }

    #[test]
    fn test_apply_leaves_absent_fields_untouched() {
        let s = LimbicState::default();
        let next = s.apply(&LimbicDelta::trust(0.9));
        assert_eq!(next.trust, 0.9);
        assert_eq!(next.warmth, s.warmth);
        assert_eq!(next.arousal, s.arousal);
        assert_eq!(next.valence, s.valence);
        assert_eq!(next.posture, s.posture);
    }

    #[test]
    fn test_apply_last_write_wins_per_field() {
        let s = LimbicState::default();
        let a = s.apply(&LimbicDelta::trust(0.2));
        let b = a.apply(&LimbicDelta::trust(0.8));
        assert_eq!(b.trust, 0.8);
    }

    #[test]
    fn test_delta_unknown_fields_ignored() {
        let delta: LimbicDelta =
            serde_json::from_str(r#"{"trust": 0.3, "charisma": 9000, "foo": "bar"}"#).unwrap();
        assert_eq!(delta.trust, Some(0.3));
        assert!(delta.warmth.is_none());
    }

    #[test]
    fn test_delta_no_recognized_fields_is_empty() {
        let delta: LimbicDelta = serde_json::from_str(r#"{"charisma": 1.0}"#).unwrap();
        assert!(delta.is_empty());
    }

    #[test]
    fn test_state_missing_fields_fall_back_per_field() {
        let s: LimbicState = serde_json::from_str(r#"{"trust": 0.9}"#).unwrap();
        assert_eq!(s.trust, 0.9);
        assert_eq!(s.warmth, 0.6);
        assert_eq!(s.arousal, 0.7);
        assert_eq!(s.valence, 0.6);
        assert_eq!(s.posture, Posture::Peer);
        assert_eq!(s.interaction_count, 0);
    }

    #[test]
    fn test_posture_wire_format() {
        assert_eq!(
            serde_json::to_string(&Posture::Companion).unwrap(),
            r#""COMPANION""#
        );
        let p: Posture = serde_json::from_str(r#""EXPERT""#).unwrap();
        assert_eq!(p, Posture::Expert);
    }

    #[test]
    fn test_posture_from_str_case_insensitive() {
        assert_eq!("copilot".parse::<Posture>().unwrap(), Posture::Copilot);
        assert!("overlord".parse::<Posture>().is_err());
    }

    #[test]
    fn test_normalize_sanitizes_non_finite() {
        let mut s = LimbicState::default();
        s.trust = f32::NAN;
        s.warmth = f32::INFINITY;
        s.last_interaction_ts = -5;
        s.normalize();
        assert_eq!(s.trust, 0.5);
        assert_eq!(s.warmth, 1.0);
        assert_eq!(s.last_interaction_ts, 0);
    }

    #[test]
    fn test_state_json_roundtrip_all_fields() {
        let mut s = LimbicState::default();
        s.trust = 0.12;
        s.warmth = 0.34;
        s.arousal = 0.56;
        s.valence = 0.78;
        s.posture = Posture::Companion;
        s.interaction_count = 42;
        s.last_interaction_ts = 1_700_000_000_123;
        let json = serde_json::to_string(&s).unwrap();
        let restored: LimbicState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, s);
    }

    #[test]
    fn test_clamped_is_pure() {
        let delta = LimbicDelta {
            trust: Some(2.0),
            warmth: None,
            arousal: Some(-1.0),
            valence: Some(0.5),
            posture: Some(Posture::Expert),
        };
        let c = delta.clamped();
        assert_eq!(c.trust, Some(1.0));
        assert_eq!(c.warmth, None);
        assert_eq!(c.arousal, Some(0.0));
        assert_eq!(c.valence, Some(0.5));
        assert_eq!(c.posture, Some(Posture::Expert));
        // original untouched
        assert_eq!(delta.trust, Some(2.0));
    }
}
