//! Shell-command service controller
//!
//! Start and stop commands are templates: `{role}` and `{member}` are
//! substituted before the command runs under `sh -c`. For a start without
//! an assigned member, `{member}` expands to an empty string and the
//! command is expected to provision one. Configuration arguments are passed
//! as `BLACKNIGHT_ARG_<KEY>` environment variables.

use async_trait::async_trait;
use blacknight_application::{ActionError, ServiceController};
use blacknight_domain::{MemberId, Role};
use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

/// Default timeout for a single start/stop command
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Maximum stderr carried into an error message
const MAX_ERROR_OUTPUT: usize = 512;

/// Command templates for starting and stopping members
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandTemplates {
    pub start: Option<String>,
    pub stop: Option<String>,
}

/// Runs shell commands to start and stop members
#[derive(Debug, Clone)]
pub struct CommandServiceController {
    templates: CommandTemplates,
    dry_run: bool,
    timeout: Duration,
}

impl CommandServiceController {
    pub fn new(templates: CommandTemplates) -> Self {
        Self {
            templates,
            dry_run: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Log commands instead of running them
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(
        &self,
        template: Option<&str>,
        verb: &str,
        role: &Role,
        member: Option<&MemberId>,
        args: &BTreeMap<String, String>,
    ) -> Result<(), ActionError> {
        let Some(template) = template else {
            if self.dry_run {
                info!(role = %role, member = ?member.map(MemberId::as_str), "[dry-run] {}", verb);
                return Ok(());
            }
            return Err(ActionError::Rejected(format!(
                "no {} command configured",
                verb
            )));
        };
        let command = render(template, role, member);

        if self.dry_run {
            info!(command = %command, "[dry-run] {}", verb);
            return Ok(());
        }

        debug!(command = %command, "Running {} command", verb);
        let mut cmd = Command::new("sh");
        cmd.args(["-c", &command])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in args {
            cmd.env(env_key(key), value);
        }

        let child = cmd
            .spawn()
            .map_err(|e| ActionError::CommandFailed(format!("failed to spawn '{}': {}", command, e)))?;
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(ActionError::CommandFailed(format!(
                    "failed to wait for '{}': {}",
                    command, e
                )));
            }
            Err(_) => {
                return Err(ActionError::CommandFailed(format!(
                    "'{}' timed out after {}s",
                    command,
                    self.timeout.as_secs()
                )));
            }
        };

        if output.status.success() {
            return Ok(());
        }
        let mut stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if stderr.len() > MAX_ERROR_OUTPUT {
            let mut cut = MAX_ERROR_OUTPUT;
            while !stderr.is_char_boundary(cut) {
                cut -= 1;
            }
            stderr.truncate(cut);
        }
        Err(ActionError::CommandFailed(format!(
            "'{}' exited with {}: {}",
            command,
            output.status.code().unwrap_or(-1),
            stderr
        )))
    }
}

#[async_trait]
impl ServiceController for CommandServiceController {
    async fn start(
        &self,
        role: &Role,
        member: Option<&MemberId>,
        args: &BTreeMap<String, String>,
    ) -> Result<(), ActionError> {
        self.run(self.templates.start.as_deref(), "start", role, member, args)
            .await
    }

    async fn stop(&self, role: &Role, member: &MemberId) -> Result<(), ActionError> {
        self.run(
            self.templates.stop.as_deref(),
            "stop",
            role,
            Some(member),
            &BTreeMap::new(),
        )
        .await
    }
}

fn render(template: &str, role: &Role, member: Option<&MemberId>) -> String {
    template
        .replace("{role}", role.as_str())
        .replace("{member}", member.map_or("", MemberId::as_str))
}

fn env_key(key: &str) -> String {
    let sanitized: String = key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("BLACKNIGHT_ARG_{}", sanitized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nc() -> Role {
        Role::parse("nc").unwrap()
    }

    #[test]
    fn test_render_substitutes_role_and_member() {
        let member = MemberId::parse("10.0.0.5").unwrap();
        assert_eq!(
            render("svc start {role}@{member}", &nc(), Some(&member)),
            "svc start nc@10.0.0.5"
        );
        assert_eq!(render("provision {role} {member}", &nc(), None), "provision nc ");
    }

    #[test]
    fn test_env_key_sanitized() {
        assert_eq!(env_key("hypervisor"), "BLACKNIGHT_ARG_HYPERVISOR");
        assert_eq!(env_key("net.mode-x"), "BLACKNIGHT_ARG_NET_MODE_X");
    }

    #[tokio::test]
    async fn test_start_runs_command_with_args() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("started");
        let controller = CommandServiceController::new(CommandTemplates {
            start: Some(format!(
                "echo {{role}} {{member}} $BLACKNIGHT_ARG_HYPERVISOR > {}",
                out.display()
            )),
            stop: None,
        });
        let args = BTreeMap::from([("hypervisor".to_string(), "kvm".to_string())]);
        let member = MemberId::parse("a").unwrap();

        controller.start(&nc(), Some(&member), &args).await.unwrap();

        let written = std::fs::read_to_string(&out).unwrap();
        assert_eq!(written.trim(), "nc a kvm");
    }

    #[tokio::test]
    async fn test_failing_command_reports_exit_and_stderr() {
        let controller = CommandServiceController::new(CommandTemplates {
            start: None,
            stop: Some("echo cannot stop {member} >&2; exit 3".to_string()),
        });

        let err = controller
            .stop(&nc(), &MemberId::parse("a").unwrap())
            .await
            .unwrap_err();

        let ActionError::CommandFailed(message) = err else {
            panic!("expected CommandFailed, got {:?}", err);
        };
        assert!(message.contains("exited with 3"));
        assert!(message.contains("cannot stop a"));
    }

    #[tokio::test]
    async fn test_missing_template_rejected_unless_dry_run() {
        let controller = CommandServiceController::new(CommandTemplates::default());
        let member = MemberId::parse("a").unwrap();

        assert!(matches!(
            controller.stop(&nc(), &member).await,
            Err(ActionError::Rejected(_))
        ));

        let dry = controller.with_dry_run(true);
        assert!(dry.stop(&nc(), &member).await.is_ok());
    }

    #[tokio::test]
    async fn test_dry_run_does_not_execute() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("never");
        let controller = CommandServiceController::new(CommandTemplates {
            start: Some(format!("touch {}", out.display())),
            stop: None,
        })
        .with_dry_run(true);

        controller.start(&nc(), None, &BTreeMap::new()).await.unwrap();

        assert!(!out.exists());
    }

    #[tokio::test]
    async fn test_timeout_kills_command() {
        let controller = CommandServiceController::new(CommandTemplates {
            start: Some("sleep 5".to_string()),
            stop: None,
        })
        .with_timeout(Duration::from_millis(50));

        let err = controller.start(&nc(), None, &BTreeMap::new()).await.unwrap_err();

        assert!(err.to_string().contains("timed out"));
    }
}
