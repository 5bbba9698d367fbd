//! Playback state mirrored from the commands sent to the server

use marionette_transport::PlaybackCommand;

/// Upper bound of the playback speed slider
pub const MAX_SPEED: f64 = 10.0;

/// Latent values a fresh VAE session starts from
pub const DEFAULT_VAE_VALUES: [f64; 3] = [0.5; 3];

/// Last acknowledged playback settings
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaybackState {
    pub playing: bool,
    pub speed: f64,
    pub vae_values: [f64; 3],
}

impl Default for PlaybackState {
    fn default() -> Self {
        PlaybackState {
            playing: true,
            speed: 1.0,
            vae_values: DEFAULT_VAE_VALUES,
        }
    }
}

impl PlaybackState {
    /// Record a command the server accepted
    pub fn apply(&mut self, command: PlaybackCommand) {
        match command {
            PlaybackCommand::Play => self.playing = true,
            PlaybackCommand::Pause => self.playing = false,
            PlaybackCommand::Speed(speed) => self.speed = speed,
            PlaybackCommand::VaeValues(values) => self.vae_values = values,
        }
    }
}

/// Clamp to `[0, MAX_SPEED]`; NaN becomes normal speed
pub fn clamp_speed(speed: f64) -> f64 {
    if speed.is_nan() {
        1.0
    } else {
        speed.clamp(0.0, MAX_SPEED)
    }
}

/// Clamp each latent value to `[0, 1]`; NaN becomes the midpoint
pub fn clamp_vae_values(values: [f64; 3]) -> [f64; 3] {
    values.map(|v| if v.is_nan() { 0.5 } else { v.clamp(0.0, 1.0) })
}
