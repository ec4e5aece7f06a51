//! Capability authorization: the permission gate consulted before any
//! side-effecting action runs.
//!
//! Authorization state lives in the OS, not here: every query goes through
//! a [`CapabilityProbe`] so results are always current and tests can swap in
//! a deterministic double.

pub mod probe;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use probe::CapabilityProbe;

/// The fixed set of OS-gated permission categories this helper cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    Notifications,
    Accessibility,
    ScreenRecording,
}

impl Capability {
    pub const ALL: [Capability; 3] = [
        Capability::Notifications,
        Capability::Accessibility,
        Capability::ScreenRecording,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Notifications => "notifications",
            Capability::Accessibility => "accessibility",
            Capability::ScreenRecording => "screen-recording",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Queries and (optionally, interactively) requests capability grants.
///
/// Results are read live from the probe on every call and never cached:
/// the user can grant or revoke access in System Settings at any moment.
pub struct PermissionStore {
    probe: Box<dyn CapabilityProbe>,
}

impl PermissionStore {
    pub fn new(probe: Box<dyn CapabilityProbe>) -> Self {
        Self { probe }
    }

    /// Current authorization per capability. Never prompts.
    pub fn status(&self, caps: &[Capability]) -> BTreeMap<Capability, bool> {
        caps.iter()
            .map(|&cap| (cap, self.probe.status(cap)))
            .collect()
    }

    /// Per capability: read the current state; if unauthorized and
    /// `interactive`, trigger the platform grant flow (which may block on
    /// the user) and read again. The re-read is authoritative; a grant
    /// flow that was merely shown never counts as authorized.
    pub fn ensure(&self, caps: &[Capability], interactive: bool) -> BTreeMap<Capability, bool> {
        caps.iter()
            .map(|&cap| {
                let mut granted = self.probe.status(cap);
                if !granted && interactive {
                    log::info!("requesting {} authorization interactively", cap);
                    self.probe.request(cap);
                    granted = self.probe.status(cap);
                }
                (cap, granted)
            })
            .collect()
    }

    /// Convenience for single-capability gates.
    pub fn ensure_one(&self, cap: Capability, interactive: bool) -> bool {
        self.ensure(&[cap], interactive)
            .get(&cap)
            .copied()
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// Probe double: fixed status map, `request` flips the entry to granted.
    struct GrantingProbe {
        state: Mutex<BTreeMap<Capability, bool>>,
    }

    impl GrantingProbe {
        fn new(entries: &[(Capability, bool)]) -> Self {
            Self {
                state: Mutex::new(entries.iter().copied().collect()),
            }
        }
    }

    impl CapabilityProbe for GrantingProbe {
        fn status(&self, cap: Capability) -> bool {
            *self.state.lock().unwrap().get(&cap).unwrap_or(&false)
        }

        fn request(&self, cap: Capability) -> bool {
            self.state.lock().unwrap().insert(cap, true);
            true
        }
    }

    /// Probe double that fails the test if the grant flow is ever triggered.
    struct NoPromptProbe;

    impl CapabilityProbe for NoPromptProbe {
        fn status(&self, _cap: Capability) -> bool {
            false
        }

        fn request(&self, cap: Capability) -> bool {
            panic!("prompt triggered for {cap} on a non-interactive path");
        }
    }

    #[test]
    fn status_never_prompts() {
        let store = PermissionStore::new(Box::new(NoPromptProbe));
        let state = store.status(&Capability::ALL);
        assert_eq!(state.len(), 3);
        assert!(state.values().all(|granted| !granted));
    }

    #[test]
    fn ensure_non_interactive_leaves_undetermined_as_denied() {
        let store = PermissionStore::new(Box::new(NoPromptProbe));
        let state = store.ensure(&[Capability::ScreenRecording], false);
        assert_eq!(state.get(&Capability::ScreenRecording), Some(&false));
    }

    #[test]
    fn ensure_interactive_rereads_after_grant() {
        let probe = GrantingProbe::new(&[
            (Capability::ScreenRecording, false),
            (Capability::Notifications, true),
        ]);
        let store = PermissionStore::new(Box::new(probe));
        let state = store.ensure(
            &[Capability::ScreenRecording, Capability::Notifications],
            true,
        );
        assert_eq!(state.get(&Capability::ScreenRecording), Some(&true));
        assert_eq!(state.get(&Capability::Notifications), Some(&true));
    }

    #[test]
    fn capabilities_are_reported_per_key() {
        let probe = GrantingProbe::new(&[
            (Capability::Accessibility, true),
            (Capability::ScreenRecording, false),
        ]);
        let store = PermissionStore::new(Box::new(probe));
        let state = store.ensure(
            &[Capability::Accessibility, Capability::ScreenRecording],
            false,
        );
        assert_eq!(state.get(&Capability::Accessibility), Some(&true));
        assert_eq!(state.get(&Capability::ScreenRecording), Some(&false));
    }
}
