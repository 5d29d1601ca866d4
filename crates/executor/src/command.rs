//! Construction of the shell command that runs the coding agent.

use tokio::process::Command;

use pipeline::BranchName;

/// Where the agent script is executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launcher {
    /// Run the script on another host through `ssh <options> <destination>`.
    Ssh {
        /// `user@host`.
        destination: String,
        /// Extra `ssh` arguments placed before the destination.
        options: Vec<String>,
    },
    /// Run the script on this host through `sh -c`.
    Local,
}

impl Launcher {
    /// SSH launcher with host-key checking disabled and quiet logging, for
    /// delegating from a container to its host.
    pub fn ssh(destination: impl Into<String>) -> Self {
        Launcher::Ssh {
            destination: destination.into(),
            options: [
                "-o",
                "StrictHostKeyChecking=no",
                "-o",
                "UserKnownHostsFile=/dev/null",
                "-o",
                "LogLevel=ERROR",
            ]
            .iter()
            .map(|s| (*s).to_string())
            .collect(),
        }
    }

    /// Wraps `script` in a command for this launcher.
    ///
    /// On unix the command leads a new process group, so a terminal ctrl-c
    /// reaches the orchestrator but not the running agent.
    pub fn command(&self, script: &str) -> Command {
        let mut cmd = self.base_command(script);
        #[cfg(unix)]
        cmd.process_group(0);
        cmd
    }

    fn base_command(&self, script: &str) -> Command {
        match self {
            Launcher::Ssh {
                destination,
                options,
            } => {
                let mut cmd = Command::new("ssh");
                cmd.args(options).arg(destination).arg(script);
                cmd
            }
            Launcher::Local => {
                let mut cmd = Command::new("sh");
                cmd.arg("-c").arg(script);
                cmd
            }
        }
    }
}

/// Quotes `value` as a single POSIX shell word.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// The agent invocation, without the task description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentCommand {
    /// Program (or shell fragment) that starts the agent, e.g. `claude`.
    pub program: String,
    /// Arguments placed before the task description.
    pub args: Vec<String>,
}

impl AgentCommand {
    /// The Claude Code CLI in non-interactive mode with permission prompts
    /// disabled.
    pub fn claude(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: vec![
                "--print".to_string(),
                "--permission-mode".to_string(),
                "bypassPermissions".to_string(),
            ],
        }
    }
}

/// Builds the script run in the source's checkout.
///
/// The script changes into `workdir`, optionally resets to the tip of
/// `sync_branch`, then runs the agent with `task` as its final argument.
pub fn agent_script(
    workdir: &str,
    sync_branch: Option<&BranchName>,
    agent: &AgentCommand,
    task: &str,
) -> String {
    let mut steps = vec![format!("cd {}", shell_quote(workdir))];
    if let Some(branch) = sync_branch {
        let branch = shell_quote(branch.as_str());
        steps.push(format!("git checkout {branch}"));
        steps.push(format!("git pull --rebase origin {branch}"));
    }

    let mut invocation = agent.program.clone();
    for arg in &agent.args {
        invocation.push(' ');
        invocation.push_str(&shell_quote(arg));
    }
    invocation.push(' ');
    invocation.push_str(&shell_quote(task));
    steps.push(invocation);

    steps.join(" && ")
}
