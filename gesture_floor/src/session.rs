//! What a mode session hands back to the shell after each frame.

use std::fmt;
use std::str::FromStr;

use crate::render::RenderCommand;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Idle,
    Connect,
    Prayer,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Idle    => "Idle",
            Mode::Connect => "Connect",
            Mode::Prayer  => "Prayer",
        };
        f.write_str(name)
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "idle"    => Ok(Mode::Idle),
            "connect" => Ok(Mode::Connect),
            "prayer"  => Ok(Mode::Prayer),
            other     => Err(format!("unknown mode '{}' (expected idle, connect or prayer)", other)),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionOutput {
    pub commands: Vec<RenderCommand>,
    /// New status-line text, when something notable happened.
    pub status:   Option<String>,
}

impl SessionOutput {
    pub fn push(&mut self, command: RenderCommand) { self.commands.push(command); }

    pub fn set_status(&mut self, status: impl Into<String>) { self.status = Some(status.into()); }

    pub fn is_empty(&self) -> bool { self.commands.is_empty() && self.status.is_none() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("Connect".parse::<Mode>(), Ok(Mode::Connect));
        assert_eq!("prayer".parse::<Mode>(), Ok(Mode::Prayer));
        assert!("dance".parse::<Mode>().is_err());
        assert_eq!(Mode::Prayer.to_string().parse::<Mode>(), Ok(Mode::Prayer));
    }

    #[test]
    fn empty_output() {
        let mut out = SessionOutput::default();
        assert!(out.is_empty());
        out.set_status("hi");
        assert!(!out.is_empty());
    }
}
