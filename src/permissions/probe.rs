//! Platform capability probes.
//!
//! macOS: screen recording via CGPreflightScreenCaptureAccess /
//! CGRequestScreenCaptureAccess, accessibility via the AX trusted-process
//! check. The request path falls back to deep-linking System Settings,
//! since macOS only shows the consent dialog once per capability.

use super::Capability;

/// One non-prompting read and one possibly-prompting grant trigger per
/// capability. `request` may block awaiting the user; callers re-read
/// `status` afterwards rather than trusting its return value.
pub trait CapabilityProbe: Send + Sync {
    fn status(&self, cap: Capability) -> bool;
    fn request(&self, cap: Capability) -> bool;
}

/// Probe backed by the host OS.
pub struct PlatformProbe;

#[cfg(target_os = "macos")]
impl CapabilityProbe for PlatformProbe {
    fn status(&self, cap: Capability) -> bool {
        match cap {
            Capability::ScreenRecording => macos::has_screen_recording(),
            Capability::Accessibility => macos::is_ax_trusted(false),
            // No preflight API in this stack; denial surfaces at delivery.
            Capability::Notifications => true,
        }
    }

    fn request(&self, cap: Capability) -> bool {
        match cap {
            Capability::ScreenRecording => {
                if macos::request_screen_recording() {
                    return true;
                }
                // Already denied once: the OS will not re-prompt, so point
                // the user at the right Privacy & Security pane instead.
                if let Err(e) = macos::open_privacy_settings("Privacy_ScreenCapture") {
                    log::warn!("could not open screen recording settings: {e}");
                }
                false
            }
            Capability::Accessibility => macos::is_ax_trusted(true),
            Capability::Notifications => true,
        }
    }
}

#[cfg(target_os = "macos")]
mod macos {
    use core_graphics::access::ScreenCaptureAccess;

    /// Check screen recording permission without prompting.
    pub fn has_screen_recording() -> bool {
        let access = ScreenCaptureAccess;
        access.preflight()
    }

    /// Request screen recording permission (prompts if not yet decided).
    pub fn request_screen_recording() -> bool {
        let access = ScreenCaptureAccess;
        access.request()
    }

    /// Accessibility trusted-process check; `prompt` shows the consent
    /// dialog for an undetermined state.
    pub fn is_ax_trusted(prompt: bool) -> bool {
        use accessibility_sys::{
            kAXTrustedCheckOptionPrompt, AXIsProcessTrusted, AXIsProcessTrustedWithOptions,
        };
        use core_foundation::base::TCFType;
        use core_foundation::boolean::CFBoolean;
        use core_foundation::dictionary::CFDictionary;
        use core_foundation::string::CFString;

        unsafe {
            if !prompt {
                return AXIsProcessTrusted();
            }
            let key = CFString::wrap_under_get_rule(kAXTrustedCheckOptionPrompt);
            let options = CFDictionary::from_CFType_pairs(&[(
                key.as_CFType(),
                CFBoolean::true_value().as_CFType(),
            )]);
            AXIsProcessTrustedWithOptions(options.as_concrete_TypeRef() as *const _)
        }
    }

    /// Open System Settings at a Privacy & Security anchor.
    pub fn open_privacy_settings(anchor: &str) -> Result<(), String> {
        let url = format!("x-apple.systempreferences:com.apple.preference.security?{anchor}");
        std::process::Command::new("open")
            .arg(url)
            .spawn()
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

// Non-macOS hosts have no TCC equivalent for this capability set.
#[cfg(not(target_os = "macos"))]
impl CapabilityProbe for PlatformProbe {
    fn status(&self, _cap: Capability) -> bool {
        true
    }

    fn request(&self, _cap: Capability) -> bool {
        true
    }
}
