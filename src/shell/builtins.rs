//! Tier 1: commands answered from session identity alone.

use crate::core::session::SessionState;
use crate::shell::CommandResult;

/// Home cursor then clear screen.
pub const CLEAR_SCREEN: &str = "\x1b[H\x1b[2J";

pub fn quick_command(state: &SessionState, line: &str) -> Option<CommandResult> {
    if let Some(output) = identity_output(state, line) {
        return Some(CommandResult::ok(output));
    }
    match line.trim() {
        "clear" | "reset" => Some(CommandResult::ok(CLEAR_SCREEN)),
        _ => None,
    }
}

/// Authoritative output for commands that reveal who and where the session
/// is. Also applied over generated text so the two never disagree.
pub fn identity_output(state: &SessionState, line: &str) -> Option<String> {
    let output = match line.trim() {
        "whoami" => state.user().to_string(),
        "hostname" => state.hostname().to_string(),
        "pwd" => state.cwd().to_string(),
        "id" => state.identity().id_line(),
        "date" => state.now_local_string(),
        _ => return None,
    };
    Some(output + "\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::seed::FsTemplate;
    use crate::core::session::Identity;

    fn state() -> SessionState {
        let identity = Identity::new("user", "honeypot");
        let template = FsTemplate::decoy(&identity).expect("template");
        SessionState::new(identity, &template)
    }

    #[test]
    fn identity_commands_answer_from_state() {
        let state = state();
        assert_eq!(quick_command(&state, "whoami"), Some(CommandResult::ok("user\n")));
        assert_eq!(
            quick_command(&state, "hostname"),
            Some(CommandResult::ok("honeypot\n"))
        );
        assert_eq!(
            quick_command(&state, "  pwd "),
            Some(CommandResult::ok("/home/user\n"))
        );
        assert_eq!(
            quick_command(&state, "id"),
            Some(CommandResult::ok(
                "uid=1000(user) gid=1000(user) groups=1000(user)\n"
            ))
        );
    }

    #[test]
    fn date_is_single_line_with_year() {
        let result = quick_command(&state(), "date").expect("date is tier 1");
        assert_eq!(result.exit_code, 0);
        assert!(result.output.ends_with('\n'));
        assert_eq!(result.output.lines().count(), 1);
    }

    #[test]
    fn clear_and_reset_emit_escape() {
        let state = state();
        assert_eq!(
            quick_command(&state, "clear").map(|result| result.output),
            Some(CLEAR_SCREEN.to_string())
        );
        assert!(quick_command(&state, "reset").is_some());
    }

    #[test]
    fn arguments_fall_through() {
        let state = state();
        assert!(quick_command(&state, "whoami --help").is_none());
        assert!(quick_command(&state, "uname -a").is_none());
        assert!(identity_output(&state, "clear").is_none());
    }
}
