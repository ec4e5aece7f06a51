//! Request dispatch: decode, gate, act, reply.
//!
//! The boundary contract is one response per request, always: every
//! failure becomes `Response { ok: false, message }` and nothing panics
//! across `handle`.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::actions::capture::{CaptureSession, CaptureTarget};
use crate::actions::notify::Notifier;
use crate::actions::shell::{CommandOutput, ShellRunner, ShellSpec};
use crate::error::ActionError;
use crate::ipc::protocol::{Request, Response};
use crate::permissions::{Capability, PermissionStore};
use crate::state::ControlState;

pub struct Dispatcher {
    control: Arc<ControlState>,
    permissions: PermissionStore,
    notifier: Box<dyn Notifier>,
    capture: CaptureSession,
    runner: Box<dyn ShellRunner>,
}

impl Dispatcher {
    pub fn new(
        control: Arc<ControlState>,
        permissions: PermissionStore,
        notifier: Box<dyn Notifier>,
        capture: CaptureSession,
        runner: Box<dyn ShellRunner>,
    ) -> Self {
        Dispatcher {
            control,
            permissions,
            notifier,
            capture,
            runner,
        }
    }

    /// Handle one opaque request and produce exactly one opaque reply.
    pub async fn handle(&self, raw: &[u8]) -> Vec<u8> {
        let response = match self.dispatch(raw).await {
            Ok(response) => response,
            Err(err) => {
                log::warn!("request failed: {err}");
                Response::failure(&err)
            }
        };
        response.encode()
    }

    async fn dispatch(&self, raw: &[u8]) -> Result<Response, ActionError> {
        let request = Request::decode(raw)?;

        // The pause switch wins over everything: no permission reads, no
        // side effects, just the refusal.
        if self.control.paused() {
            log::debug!("{} rejected while paused", request.kind());
            return Err(ActionError::Paused);
        }

        log::debug!("dispatching {}", request.kind());
        match request {
            Request::Notify { title, body, sound } => self.notify(&title, &body, sound),
            Request::EnsurePermissions { caps, interactive } => {
                self.ensure_permissions(&caps, interactive)
            }
            Request::Status => Ok(Response::ok_message("ready")),
            Request::Screenshot {
                display_id,
                window_id,
            } => {
                self.screenshot(CaptureTarget {
                    display_id,
                    window_id,
                })
                .await
            }
            Request::RunShell {
                command,
                cwd,
                env,
                timeout_seconds,
                needs_screen_recording,
            } => {
                self.run_shell(
                    ShellSpec {
                        command,
                        cwd,
                        env,
                        timeout_seconds,
                    },
                    needs_screen_recording,
                )
                .await
            }
        }
    }

    fn notify(
        &self,
        title: &str,
        body: &str,
        sound: Option<String>,
    ) -> Result<Response, ActionError> {
        let sound = sound.or_else(|| self.control.default_sound());
        self.notifier.send(title, body, sound.as_deref())?;
        Ok(Response::ok())
    }

    fn ensure_permissions(
        &self,
        caps: &BTreeSet<Capability>,
        interactive: bool,
    ) -> Result<Response, ActionError> {
        let caps: Vec<Capability> = caps.iter().copied().collect();
        let state = self.permissions.ensure(&caps, interactive);
        let missing: Vec<Capability> = state
            .iter()
            .filter(|(_, &granted)| !granted)
            .map(|(&cap, _)| cap)
            .collect();
        if missing.is_empty() {
            Ok(Response::ok_message("all permissions granted"))
        } else {
            Err(ActionError::MissingPermissions(missing))
        }
    }

    async fn screenshot(&self, target: CaptureTarget) -> Result<Response, ActionError> {
        if !self
            .permissions
            .ensure_one(Capability::ScreenRecording, false)
        {
            return Err(ActionError::ScreenRecordingDenied);
        }
        match self.capture.capture(&target).await {
            Some(png) => Ok(Response::with_payload(png)),
            None => Err(ActionError::CaptureFailed),
        }
    }

    async fn run_shell(
        &self,
        spec: ShellSpec,
        needs_screen_recording: bool,
    ) -> Result<Response, ActionError> {
        if needs_screen_recording
            && !self
                .permissions
                .ensure_one(Capability::ScreenRecording, false)
        {
            return Err(ActionError::ScreenRecordingDenied);
        }
        let output = self.runner.run(&spec).await?;
        Ok(shell_response(output))
    }
}

/// Exit status maps to `ok`; the payload carries stdout, or stderr when
/// stdout is empty, on success and failure alike so diagnostics survive.
fn shell_response(output: CommandOutput) -> Response {
    let ok = output.exit_code == 0;
    let payload = if output.stdout.is_empty() {
        output.stderr
    } else {
        output.stdout
    };
    Response {
        ok,
        message: (!ok).then(|| format!("exit {}", output.exit_code)),
        payload: (!payload.is_empty()).then_some(payload),
    }
}
