//! Operator command grammar.
//!
//! One command per stdin line:
//!
//! ```text
//! show_plane <id>
//! set_velocity <id> <vx> <vy> <vz>
//! update_congestion <seconds>
//! ```
//!
//! Malformed lines are reported and skipped; input reading continues.

use atc_common::geometry::Vec3;
use atc_common::wire::OperatorReply;
use thiserror::Error;

/// A parsed, pending user command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UserCommand {
    ShowPlane { plane_id: i32 },
    SetVelocity { plane_id: i32, velocity: Vec3 },
    UpdateCongestion { seconds: f64 },
}

impl UserCommand {
    /// Wire reply handed to the analyzer for this command.
    pub fn to_reply(&self) -> OperatorReply {
        match *self {
            UserCommand::ShowPlane { plane_id } => OperatorReply::show_plane(plane_id),
            UserCommand::SetVelocity { plane_id, velocity } => {
                OperatorReply::set_velocity(plane_id, velocity)
            }
            UserCommand::UpdateCongestion { seconds } => {
                OperatorReply::set_congestion_horizon(seconds)
            }
        }
    }
}

/// Why a line was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("{command} expects {expected} argument(s)")]
    WrongArity {
        command: &'static str,
        expected: usize,
    },

    #[error("invalid number '{0}'")]
    InvalidNumber(String),
}

fn number<T: std::str::FromStr>(field: &str) -> Result<T, ParseError> {
    field
        .parse()
        .map_err(|_| ParseError::InvalidNumber(field.to_string()))
}

/// Parse one input line. `Ok(None)` for blank lines and comments.
pub fn parse_command(line: &str) -> Result<Option<UserCommand>, ParseError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let fields: Vec<&str> = trimmed.split_whitespace().collect();
    let command = match fields[0] {
        "show_plane" => {
            if fields.len() != 2 {
                return Err(ParseError::WrongArity {
                    command: "show_plane",
                    expected: 1,
                });
            }
            UserCommand::ShowPlane {
                plane_id: number(fields[1])?,
            }
        }
        "set_velocity" => {
            if fields.len() != 5 {
                return Err(ParseError::WrongArity {
                    command: "set_velocity",
                    expected: 4,
                });
            }
            UserCommand::SetVelocity {
                plane_id: number(fields[1])?,
                velocity: Vec3::new(number(fields[2])?, number(fields[3])?, number(fields[4])?),
            }
        }
        "update_congestion" => {
            if fields.len() != 2 {
                return Err(ParseError::WrongArity {
                    command: "update_congestion",
                    expected: 1,
                });
            }
            UserCommand::UpdateCongestion {
                seconds: number(fields[1])?,
            }
        }
        other => return Err(ParseError::UnknownCommand(other.to_string())),
    };
    Ok(Some(command))
}
