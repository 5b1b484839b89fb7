//! Tone descriptions for each completion sound.
//!
//! A [`ToneSpec`] is a list of oscillator voices; synthesis belongs to the
//! host. Gains are already scaled by the user's volume.

use serde::{Deserialize, Serialize};

use crate::storage::SoundType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Square,
    Triangle,
}

/// One oscillator. Each voice decays exponentially over `duration_secs`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Voice {
    pub frequency_hz: f64,
    pub waveform: Waveform,
    /// Delay from the start of the tone.
    pub offset_secs: f64,
    pub duration_secs: f64,
    /// Peak gain, 0.0 ..= 1.0.
    pub gain: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToneSpec {
    pub sound: SoundType,
    pub voices: Vec<Voice>,
}

impl ToneSpec {
    /// Seconds from the first voice starting to the last one ending.
    pub fn total_secs(&self) -> f64 {
        self.voices
            .iter()
            .map(|v| v.offset_secs + v.duration_secs)
            .fold(0.0, f64::max)
    }
}

const CHIME_NOTES: [f64; 3] = [523.25, 659.25, 783.99]; // C5 E5 G5
const BELL_FUNDAMENTAL: f64 = 440.0;
const BELL_HARMONICS: [f64; 5] = [1.0, 2.0, 3.0, 4.2, 5.4];
const ALERT_NOTES: [f64; 2] = [523.25, 698.46]; // C5 F5

/// Build the tone for `sound` at `volume` (0..=100).
pub fn tone_for(sound: SoundType, volume: u8) -> ToneSpec {
    let level = f64::from(volume.min(100)) / 100.0;

    let voices = match sound {
        SoundType::Chime => CHIME_NOTES
            .iter()
            .enumerate()
            .map(|(i, &freq)| Voice {
                frequency_hz: freq,
                waveform: Waveform::Sine,
                offset_secs: i as f64 * 0.08,
                duration_secs: 0.6,
                gain: level * 0.3 / (i as f64 + 1.0),
            })
            .collect(),
        SoundType::Beep => (0..3)
            .map(|i| Voice {
                frequency_hz: 800.0,
                waveform: Waveform::Square,
                offset_secs: f64::from(i) * 0.15,
                duration_secs: 0.1,
                gain: level * 0.2,
            })
            .collect(),
        SoundType::Bell => BELL_HARMONICS
            .iter()
            .enumerate()
            .map(|(i, &harmonic)| Voice {
                frequency_hz: BELL_FUNDAMENTAL * harmonic,
                waveform: Waveform::Sine,
                offset_secs: 0.0,
                duration_secs: 1.2,
                gain: level * 0.15 / (i as f64 + 1.0),
            })
            .collect(),
        SoundType::Ping => vec![Voice {
            frequency_hz: 880.0,
            waveform: Waveform::Sine,
            offset_secs: 0.0,
            duration_secs: 0.8,
            gain: level * 0.3,
        }],
        SoundType::Alert => ALERT_NOTES
            .iter()
            .enumerate()
            .map(|(i, &freq)| Voice {
                frequency_hz: freq,
                waveform: Waveform::Triangle,
                offset_secs: i as f64 * 0.2,
                duration_secs: 0.4,
                gain: level * 0.25,
            })
            .collect(),
    };

    ToneSpec { sound, voices }
}
