//! Typed command lines.
//!
//! Commands are kept as a program plus an ordered argument vector and are
//! spawned directly, never through a shell. [`fmt::Display`] renders a
//! shell-readable form for printing only.

use std::fmt;

use serde::Serialize;

use crate::config::UNSET;

/// CPU/NUMA binding tokens placed in front of the interpreter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchPrefix {
    tokens: Vec<String>,
}

impl LaunchPrefix {
    /// No binding when `socket_id` is unset. A core count additionally pins
    /// the process to physical cores `0..num_cores`.
    pub fn new(socket_id: i64, num_cores: i64) -> Self {
        if socket_id == UNSET {
            return Self::default();
        }
        let mut tokens = vec![
            "numactl".to_string(),
            format!("--cpunodebind={socket_id}"),
            format!("--membind={socket_id}"),
        ];
        if num_cores != UNSET {
            tokens.push(format!("--physcpubind=0-{}", num_cores - 1));
        }
        Self { tokens }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    /// Value of the first `--name=value` argument.
    pub fn flag_value(&self, name: &str) -> Option<&str> {
        let prefix = format!("--{name}=");
        self.args
            .iter()
            .find_map(|arg| arg.strip_prefix(prefix.as_str()))
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&shell_quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", shell_quote(arg))?;
        }
        Ok(())
    }
}

fn shell_quote(token: &str) -> String {
    let safe = |c: char| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c);
    if !token.is_empty() && token.chars().all(safe) {
        token.to_string()
    } else {
        format!("'{}'", token.replace('\'', r"'\''"))
    }
}

#[derive(Debug, Clone)]
pub struct CommandBuilder {
    program: String,
    args: Vec<String>,
}

impl CommandBuilder {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Start a command that runs `program` under `prefix`.
    pub fn with_prefix(prefix: &LaunchPrefix, program: impl Into<String>) -> Self {
        match prefix.tokens().split_first() {
            Some((head, rest)) => {
                let mut builder = Self::new(head.clone());
                builder.args.extend(rest.iter().cloned());
                builder.arg(program)
            }
            None => Self::new(program),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append `--name=value` as a single argument.
    pub fn flag(self, name: &str, value: impl fmt::Display) -> Self {
        self.arg(format!("--{name}={value}"))
    }

    pub fn build(self) -> CommandLine {
        CommandLine {
            program: self.program,
            args: self.args,
        }
    }
}
