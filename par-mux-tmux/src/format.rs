//! `-F` format strings and parsers for tmux listing commands.
//!
//! Every listing is requested with tab-separated fields. Free-text fields
//! (session and window names, pane paths) always come last so `splitn` keeps
//! any tabs they contain intact.

use std::path::PathBuf;

use crate::error::TmuxError;
use crate::types::{TmuxPane, TmuxSession, TmuxWindow};

pub const FIELD_SEPARATOR: char = '\t';

/// `list-sessions` / `new-session -P` format.
pub const SESSION_FORMAT: &str = "#{session_id}\t#{session_name}";

/// `list-windows` / `new-window -P` format.
pub const WINDOW_FORMAT: &str =
    "#{window_id}\t#{session_id}\t#{window_index}\t#{window_active}\t#{window_name}";

/// `list-panes` / `split-window -P` format.
pub const PANE_FORMAT: &str = "#{pane_id}\t#{window_id}\t#{pane_index}\t#{pane_width}\t#{pane_height}\t#{pane_active}\t#{pane_current_path}";

struct Fields<'a> {
    command: &'a str,
    line: &'a str,
    parts: std::str::SplitN<'a, char>,
}

impl<'a> Fields<'a> {
    fn new(command: &'a str, line: &'a str, count: usize) -> Self {
        Self {
            command,
            line,
            parts: line.splitn(count, FIELD_SEPARATOR),
        }
    }

    fn error(&self) -> TmuxError {
        TmuxError::UnexpectedOutput {
            command: self.command.to_string(),
            output: self.line.to_string(),
        }
    }

    fn text(&mut self) -> Result<&'a str, TmuxError> {
        self.parts.next().ok_or_else(|| self.error())
    }

    fn parse<T: std::str::FromStr>(&mut self) -> Result<T, TmuxError> {
        let raw = self.text()?;
        raw.parse().map_err(|_| self.error())
    }

    fn flag(&mut self) -> Result<bool, TmuxError> {
        match self.text()? {
            "1" => Ok(true),
            "0" | "" => Ok(false),
            _ => Err(self.error()),
        }
    }
}

fn lines(output: &str) -> impl Iterator<Item = &str> {
    output
        .lines()
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .filter(|l| !l.is_empty())
}

/// Parse one line produced by [`SESSION_FORMAT`].
pub fn parse_session(command: &str, line: &str) -> Result<TmuxSession, TmuxError> {
    let mut f = Fields::new(command, line, 2);
    Ok(TmuxSession {
        id: f.parse()?,
        name: f.text()?.to_string(),
    })
}

/// Parse one line produced by [`WINDOW_FORMAT`].
pub fn parse_window(command: &str, line: &str) -> Result<TmuxWindow, TmuxError> {
    let mut f = Fields::new(command, line, 5);
    Ok(TmuxWindow {
        id: f.parse()?,
        session_id: f.parse()?,
        index: f.parse()?,
        active: f.flag()?,
        name: f.text()?.to_string(),
    })
}

/// Parse one line produced by [`PANE_FORMAT`].
pub fn parse_pane(command: &str, line: &str) -> Result<TmuxPane, TmuxError> {
    let mut f = Fields::new(command, line, 7);
    Ok(TmuxPane {
        id: f.parse()?,
        window_id: f.parse()?,
        index: f.parse()?,
        width: f.parse()?,
        height: f.parse()?,
        active: f.flag()?,
        current_path: f
            .text()
            .ok()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from),
    })
}

pub fn parse_sessions(command: &str, output: &str) -> Result<Vec<TmuxSession>, TmuxError> {
    lines(output).map(|l| parse_session(command, l)).collect()
}

pub fn parse_windows(command: &str, output: &str) -> Result<Vec<TmuxWindow>, TmuxError> {
    lines(output).map(|l| parse_window(command, l)).collect()
}

pub fn parse_panes(command: &str, output: &str) -> Result<Vec<TmuxPane>, TmuxError> {
    let mut panes: Vec<TmuxPane> = lines(output)
        .map(|l| parse_pane(command, l))
        .collect::<Result<_, _>>()?;
    panes.sort_by_key(|p| p.index);
    Ok(panes)
}

/// Parse the single line a `-P -F` command prints for the object it created.
pub fn parse_created<T>(
    command: &str,
    output: &str,
    parse: fn(&str, &str) -> Result<T, TmuxError>,
) -> Result<T, TmuxError> {
    let line = lines(output)
        .next()
        .ok_or_else(|| TmuxError::UnexpectedOutput {
            command: command.to_string(),
            output: output.to_string(),
        })?;
    parse(command, line)
}

/// Parse one `show-environment` line.
///
/// Returns `None` for variables tmux marks as removed (`-NAME`).
pub fn parse_environment_line(line: &str) -> Option<(String, String)> {
    if line.starts_with('-') {
        return None;
    }
    let (name, value) = line.split_once('=')?;
    Some((name.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TmuxPaneId, TmuxSessionId, TmuxWindowId};

    #[test]
    fn test_parse_sessions_keeps_names_with_separators() {
        let sessions = parse_sessions("list-sessions", "$0\twork\n$3\tname\twith tab\n").unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].id, TmuxSessionId(0));
        assert_eq!(sessions[1].name, "name\twith tab");
    }

    #[test]
    fn test_parse_windows() {
        let windows = parse_windows("list-windows", "@1\t$0\t1\t1\teditor\n@4\t$0\t2\t0\t\n").unwrap();
        assert_eq!(windows[0].id, TmuxWindowId(1));
        assert_eq!(windows[0].index, 1);
        assert!(windows[0].active);
        assert_eq!(windows[1].name, "");
        assert!(!windows[1].active);
    }

    #[test]
    fn test_parse_panes_sorted_by_index() {
        let out = "%5\t@1\t1\t80\t12\t0\t/tmp\n%2\t@1\t0\t80\t11\t1\t/home/me/a b\n";
        let panes = parse_panes("list-panes", out).unwrap();
        assert_eq!(panes[0].id, TmuxPaneId(2));
        assert_eq!(panes[0].current_path, Some(PathBuf::from("/home/me/a b")));
        assert_eq!(panes[1].index, 1);
        assert_eq!(panes[1].height, 12);
    }

    #[test]
    fn test_parse_pane_without_path() {
        let pane = parse_pane("split-window", "%9\t@2\t3\t40\t10\t1\t").unwrap();
        assert_eq!(pane.current_path, None);
    }

    #[test]
    fn test_malformed_line_is_unexpected_output() {
        let err = parse_windows("list-windows", "@1\t$0\tone\t1\tx").unwrap_err();
        assert!(matches!(err, TmuxError::UnexpectedOutput { .. }));
        let err = parse_created("new-window", "\n", parse_window).unwrap_err();
        assert!(matches!(err, TmuxError::UnexpectedOutput { .. }));
    }

    #[test]
    fn test_parse_environment_line() {
        assert_eq!(
            parse_environment_line("FOO=a=b"),
            Some(("FOO".to_string(), "a=b".to_string()))
        );
        assert_eq!(parse_environment_line("-REMOVED"), None);
        assert_eq!(parse_environment_line("garbage"), None);
    }
}
