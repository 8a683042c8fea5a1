//! Prompt text sent to the generative service.

use crate::core::session::SessionState;

/// Lines of filesystem preview included as context.
pub const SNAPSHOT_LINES: usize = 20;

/// Context-bearing prompt asking the model to answer as a terminal would.
pub fn build_shell_prompt(state: &SessionState, command: &str) -> String {
    let user = state.user();
    let cwd = state.cwd();
    let snapshot = state.fs().snapshot(state.home(), SNAPSHOT_LINES);

    format!(
        "You are a Linux Shell. Behave exactly like a terminal.\n\
         RULES:\n\
         1. Do NOT explain. Do NOT chat.\n\
         2. Output ONLY the standard stdout/stderr.\n\
         3. If the command is silent (like 'cd', 'mkdir', 'export'), output nothing.\n\
         4. If the command is not found, output 'bash: {command}: command not found'.\n\
         \n\
         CONTEXT:\n\
         User: {user}\n\
         Dir: {cwd}\n\
         Files: {snapshot}\n\
         \n\
         EXAMPLES:\n\
         Cmd: whoami\n\
         Out: {user}\n\
         \n\
         Cmd: cd /tmp\n\
         Out:\n\
         \n\
         Cmd: pwd\n\
         Out: /tmp\n\
         \n\
         Cmd: notarealcommand\n\
         Out: bash: notarealcommand: command not found\n\
         \n\
         CURRENT COMMAND:\n\
         Cmd: {command}\n\
         Out:"
    )
}
