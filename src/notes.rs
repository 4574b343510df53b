//! Equal-tempered note mapping
//!
//! Maps frequencies to the nearest note (A4 = 440 Hz reference) with a cent
//! offset, and derives the companion reference tones played back alongside a
//! finished session.

use serde::{Deserialize, Serialize};

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

const A4_HZ: f32 = 440.0;
const A4_MIDI: i32 = 69;

/// A frequency expressed as the nearest equal-tempered note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteReading {
    pub name: String,
    pub octave: i32,
    /// Offset from the exact note pitch, -50..=50 cents
    pub cents: f32,
    pub frequency_hz: f32,
}

/// A reference tone derived from the session fundamental by a fixed ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanionTone {
    pub interval: String,
    pub ratio: f32,
    pub frequency_hz: f32,
    pub note: NoteReading,
}

/// Map a frequency to the nearest note. `None` for non-positive input.
pub fn note_for_frequency(hz: f32) -> Option<NoteReading> {
    if !(hz.is_finite() && hz > 0.0) {
        return None;
    }
    let midi_exact = A4_MIDI as f32 + 12.0 * (hz / A4_HZ).log2();
    let midi = midi_exact.round() as i32;
    let cents = (midi_exact - midi as f32) * 100.0;
    Some(NoteReading {
        name: NOTE_NAMES[midi.rem_euclid(12) as usize].to_string(),
        octave: midi.div_euclid(12) - 1,
        cents,
        frequency_hz: hz,
    })
}

/// Exact frequency of a named note, e.g. `frequency_for_note("A", 4)` = 440.
/// `None` for unknown note names.
pub fn frequency_for_note(name: &str, octave: i32) -> Option<f32> {
    let index = NOTE_NAMES.iter().position(|n| *n == name)? as i32;
    let midi = (octave + 1) * 12 + index;
    Some(A4_HZ * 2.0f32.powf((midi - A4_MIDI) as f32 / 12.0))
}

/// Companion tones for a fundamental: a perfect fifth (x1.5) and a minor
/// third (x1.2). Empty when there is no fundamental.
pub fn companion_tones(fundamental_hz: f32) -> Vec<CompanionTone> {
    if fundamental_hz <= 0.0 {
        return Vec::new();
    }
    [("fifth", 1.5f32), ("minor third", 1.2)]
        .into_iter()
        .filter_map(|(interval, ratio)| {
            let frequency_hz = fundamental_hz * ratio;
            note_for_frequency(frequency_hz).map(|note| CompanionTone {
                interval: interval.to_string(),
                ratio,
                frequency_hz,
                note,
            })
        })
        .collect()
}
