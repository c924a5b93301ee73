use std::str::FromStr;

pub const UNRECOGNISED_COMMAND: &str = "Unrecognised command";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Unrecognised command")]
    Unrecognised,

    #[error("Invalid position '{0}'")]
    InvalidPosition(String),

    #[error("Invalid speed '{0}', expected a positive integer")]
    InvalidSpeed(String),
}

/// Payload of a line once the `M<id>` prefix is removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AxisCommand {
    /// Normalized input, 0 is the axis center.
    MoveTo(i32),
    SetSpeed(u32),
    Status,
}

impl FromStr for AxisCommand {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();

        match (parts.next(), parts.next(), parts.next()) {
            (Some("speed"), Some(value), None) => match value.parse::<i64>() {
                Ok(speed) if speed > 0 && speed <= u32::MAX as i64 => {
                    Ok(AxisCommand::SetSpeed(speed as u32))
                }
                _ => Err(CommandError::InvalidSpeed(value.to_string())),
            },
            (Some("speed"), _, _) => Err(CommandError::InvalidSpeed(
                s.trim().trim_start_matches("speed").trim().to_string(),
            )),
            (Some("status"), None, None) => Ok(AxisCommand::Status),
            (Some(value), None, None) => parse_saturating(value)
                .map(AxisCommand::MoveTo)
                .ok_or_else(|| CommandError::InvalidPosition(value.to_string())),
            (None, _, _) => Err(CommandError::Unrecognised),
            _ => Err(CommandError::InvalidPosition(s.trim().to_string())),
        }
    }
}

/// Parses a signed decimal integer, saturating at the `i32` bounds. Mapping
/// saturates anyway, so an oversized input means full travel, not an error.
fn parse_saturating(value: &str) -> Option<i32> {
    let digits = value.strip_prefix(['+', '-']).unwrap_or(value);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    match value.parse::<i64>() {
        Ok(n) => Some(n.clamp(i32::MIN as i64, i32::MAX as i64) as i32),
        Err(_) if value.starts_with('-') => Some(i32::MIN),
        Err(_) => Some(i32::MAX),
    }
}

/// Splits `M<id> <rest>` into the axis id and the untouched remainder.
///
/// The id must be followed by whitespace, so `M10 5` is never read as axis 1.
pub fn split_prefix(line: &str) -> Option<(u32, &str)> {
    let body = line.trim().strip_prefix('M')?;
    let (id, rest) = body.split_once(char::is_whitespace)?;

    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let rest = rest.trim();
    if rest.is_empty() {
        return None;
    }

    Some((id.parse().ok()?, rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_signed_positions() {
        assert_eq!("1234".parse(), Ok(AxisCommand::MoveTo(1234)));
        assert_eq!("-32768".parse(), Ok(AxisCommand::MoveTo(-32768)));
        assert_eq!("+17".parse(), Ok(AxisCommand::MoveTo(17)));
        assert_eq!(" 0 ".parse(), Ok(AxisCommand::MoveTo(0)));
    }

    #[test]
    fn rejects_malformed_positions() {
        assert_eq!(
            "12ab".parse::<AxisCommand>(),
            Err(CommandError::InvalidPosition("12ab".to_string()))
        );
        assert_eq!(
            "--5".parse::<AxisCommand>(),
            Err(CommandError::InvalidPosition("--5".to_string()))
        );
        assert!("-".parse::<AxisCommand>().is_err());
        assert!("1 2".parse::<AxisCommand>().is_err());
        assert_eq!("".parse::<AxisCommand>(), Err(CommandError::Unrecognised));
    }

    #[test]
    fn oversized_positions_saturate() {
        assert_eq!("99999999999".parse(), Ok(AxisCommand::MoveTo(i32::MAX)));
        assert_eq!("-99999999999".parse(), Ok(AxisCommand::MoveTo(i32::MIN)));
        assert_eq!(
            "123456789012345678901234567890".parse(),
            Ok(AxisCommand::MoveTo(i32::MAX))
        );
        assert_eq!("40000".parse(), Ok(AxisCommand::MoveTo(40000)));
    }

    #[test]
    fn parses_speed() {
        assert_eq!("speed 20000".parse(), Ok(AxisCommand::SetSpeed(20000)));
        assert_eq!(
            "speed 0".parse::<AxisCommand>(),
            Err(CommandError::InvalidSpeed("0".to_string()))
        );
        assert_eq!(
            "speed -4".parse::<AxisCommand>(),
            Err(CommandError::InvalidSpeed("-4".to_string()))
        );
        assert_eq!(
            "speed fast".parse::<AxisCommand>(),
            Err(CommandError::InvalidSpeed("fast".to_string()))
        );
        assert!("speed".parse::<AxisCommand>().is_err());
        assert!("speed 1 2".parse::<AxisCommand>().is_err());
    }

    #[test]
    fn parses_status() {
        assert_eq!("status".parse(), Ok(AxisCommand::Status));
    }

    #[test]
    fn prefix_requires_full_id_and_delimiter() {
        assert_eq!(split_prefix("M1 100"), Some((1, "100")));
        assert_eq!(split_prefix("M10 -5"), Some((10, "-5")));
        assert_eq!(split_prefix("M2 speed 300\r"), Some((2, "speed 300")));
        assert_eq!(split_prefix("M1\t42"), Some((1, "42")));

        assert_eq!(split_prefix("M1"), None);
        assert_eq!(split_prefix("M1 "), None);
        assert_eq!(split_prefix("M100"), None);
        assert_eq!(split_prefix("M 1"), None);
        assert_eq!(split_prefix("M+1 5"), None);
        assert_eq!(split_prefix("X1 5"), None);
        assert_eq!(split_prefix("m1 5"), None);
    }
}
