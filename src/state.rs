//! Shared control state, written by the control surface and read on every
//! dispatch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::config::Settings;

/// The pause switch and the default notification sound. Reads must always
/// see the latest write, so the flag is an atomic with SeqCst ordering and
/// the sound sits behind a mutex.
pub struct ControlState {
    paused: AtomicBool,
    default_sound: Mutex<Option<String>>,
}

impl ControlState {
    pub fn new(settings: &Settings) -> Self {
        ControlState {
            paused: AtomicBool::new(settings.start_paused),
            default_sound: Mutex::new(settings.default_sound.clone()),
        }
    }

    pub fn paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn set_paused(&self, paused: bool) {
        log::info!("pause switch set to {paused}");
        self.paused.store(paused, Ordering::SeqCst);
    }

    pub fn default_sound(&self) -> Option<String> {
        self.default_sound.lock().unwrap().clone()
    }

    pub fn set_default_sound(&self, sound: Option<String>) {
        *self.default_sound.lock().unwrap() = sound;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pause_flag_round_trips() {
        let state = ControlState::new(&Settings::default());
        assert!(!state.paused());
        state.set_paused(true);
        assert!(state.paused());
        state.set_paused(false);
        assert!(!state.paused());
    }

    #[test]
    fn default_sound_is_replaceable() {
        let state = ControlState::new(&Settings::default());
        assert_eq!(state.default_sound(), None);
        state.set_default_sound(Some("Glass".into()));
        assert_eq!(state.default_sound(), Some("Glass".into()));
        state.set_default_sound(None);
        assert_eq!(state.default_sound(), None);
    }
}
