//! Command execution abstraction for testability
//!
//! The whole pipeline drives external tools through this trait so the
//! orchestration logic can be exercised with fake invocations.

use anyhow::Result;
use async_trait::async_trait;
use std::process::Output;
use std::time::Duration;

/// Narrow interface to external tools: program, argument list, environment
/// overrides, optional timeout, captured output.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        envs: &[(String, String)],
        timeout: Option<Duration>,
    ) -> Result<Output>;
}

/// Default implementation using real subprocess calls.
#[derive(Debug, Clone, Default)]
pub struct SystemExecutor;

impl SystemExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandExecutor for SystemExecutor {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        envs: &[(String, String)],
        timeout: Option<Duration>,
    ) -> Result<Output> {
        super::command::run_command(program, args, envs, timeout).await
    }
}

/// A mock executor that records calls and replays configured responses.
/// Used by unit tests here and by the `db-backup-tests` crate.
pub mod mock {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};

    /// Recorded command invocation.
    #[derive(Clone, Debug)]
    pub struct CommandCall {
        pub program: String,
        pub args: Vec<String>,
        pub envs: Vec<(String, String)>,
    }

    impl CommandCall {
        /// Value of an environment override passed with this call.
        pub fn env(&self, key: &str) -> Option<&str> {
            self.envs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        }
    }

    /// Response configuration for the mock.
    #[derive(Clone, Debug)]
    pub enum MockResponse {
        Success { stdout: String, stderr: String },
        Failure { exit_code: i32, stderr: String },
        SpawnError { message: String },
    }

    impl MockResponse {
        pub fn ok() -> Self {
            MockResponse::Success {
                stdout: String::new(),
                stderr: String::new(),
            }
        }

        pub fn stdout(stdout: &str) -> Self {
            MockResponse::Success {
                stdout: stdout.to_string(),
                stderr: String::new(),
            }
        }

        pub fn failure(exit_code: i32, stderr: &str) -> Self {
            MockResponse::Failure {
                exit_code,
                stderr: stderr.to_string(),
            }
        }
    }

    #[derive(Clone, Default)]
    pub struct MockExecutor {
        calls: Arc<Mutex<Vec<CommandCall>>>,
        /// Per-program response queues; a program's queue is consumed one
        /// response per call, the last response being sticky.
        responses: Arc<Mutex<HashMap<String, VecDeque<MockResponse>>>>,
    }

    impl MockExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a response for a program. Multiple calls queue multiple
        /// responses; the final queued response repeats once the queue is
        /// otherwise exhausted.
        pub fn expect(self, program: &str, response: MockResponse) -> Self {
            self.responses
                .lock()
                .unwrap()
                .entry(program.to_string())
                .or_default()
                .push_back(response);
            self
        }

        pub fn calls(&self) -> Vec<CommandCall> {
            self.calls.lock().unwrap().clone()
        }

        pub fn calls_for(&self, program: &str) -> Vec<CommandCall> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.program == program)
                .cloned()
                .collect()
        }

        pub fn was_called(&self, program: &str) -> bool {
            !self.calls_for(program).is_empty()
        }

        pub fn call_count(&self, program: &str) -> usize {
            self.calls_for(program).len()
        }

        fn next_response(&self, program: &str) -> MockResponse {
            let mut responses = self.responses.lock().unwrap();
            match responses.get_mut(program) {
                Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
                Some(queue) => queue.front().cloned().unwrap_or_else(MockResponse::ok),
                None => MockResponse::ok(),
            }
        }
    }

    #[cfg(unix)]
    fn exit_status(code: i32) -> std::process::ExitStatus {
        use std::os::unix::process::ExitStatusExt;
        std::process::ExitStatus::from_raw(code << 8)
    }

    #[async_trait]
    impl CommandExecutor for MockExecutor {
        async fn run(
            &self,
            program: &str,
            args: &[String],
            envs: &[(String, String)],
            _timeout: Option<Duration>,
        ) -> Result<Output> {
            self.calls.lock().unwrap().push(CommandCall {
                program: program.to_string(),
                args: args.to_vec(),
                envs: envs.to_vec(),
            });

            match self.next_response(program) {
                MockResponse::Success { stdout, stderr } => Ok(Output {
                    status: exit_status(0),
                    stdout: stdout.into_bytes(),
                    stderr: stderr.into_bytes(),
                }),
                MockResponse::Failure { exit_code, stderr } => Ok(Output {
                    status: exit_status(exit_code),
                    stdout: Vec::new(),
                    stderr: stderr.into_bytes(),
                }),
                MockResponse::SpawnError { message } => Err(anyhow::anyhow!(message)),
            }
        }
    }
}
