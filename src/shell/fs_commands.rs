//! Tier 2: commands that read or mutate the session's virtual filesystem.
//!
//! Messages quote the operand as the user typed it; lookups always go
//! through the normalized path.

use crate::core::session::SessionState;
use crate::core::vfs::FsError;
use crate::shell::CommandResult;

pub const UNTERMINATED_QUOTE: &str = "bash: unexpected EOF while looking for matching quote\n";

/// Runs `line` if it names a filesystem command. `None` is a tier miss,
/// which includes `cat` on a path that does not exist.
pub fn filesystem_command(state: &mut SessionState, line: &str) -> Option<CommandResult> {
    let words = match shell_words::split(line) {
        Ok(words) => words,
        Err(_) => return Some(CommandResult::with_code(UNTERMINATED_QUOTE, 1)),
    };
    let Some((command, args)) = words.split_first() else {
        return Some(CommandResult::ok(""));
    };
    let operand = args.first().map(String::as_str);

    match command.as_str() {
        "cd" => Some(cd(state, operand.unwrap_or("~"))),
        "ls" => Some(ls(state, operand.unwrap_or("."))),
        "cat" => match operand {
            None => Some(CommandResult::ok("")),
            Some(path) => cat(state, path),
        },
        "mkdir" => Some(match operand {
            None => CommandResult::with_code("mkdir: missing operand\n", 1),
            Some(path) => mkdir(state, path),
        }),
        "touch" => Some(match operand {
            None => CommandResult::with_code("touch: missing file operand\n", 1),
            Some(path) => touch(state, path),
        }),
        "rm" => Some(match operand {
            None => CommandResult::with_code("rm: missing operand\n", 1),
            Some(path) => rm(state, path),
        }),
        _ => None,
    }
}

/// Normalized target of `cat <path>` when that path does not exist yet.
pub fn missing_cat_target(state: &SessionState, line: &str) -> Option<String> {
    let words = shell_words::split(line).ok()?;
    match words.as_slice() {
        [command, path, ..] if command == "cat" => {
            let target = state.resolve(path);
            (!state.fs().exists(&target)).then_some(target)
        }
        _ => None,
    }
}

fn cd(state: &mut SessionState, raw: &str) -> CommandResult {
    let target = state.resolve(raw);
    if !state.fs().exists(&target) {
        return CommandResult::with_code(
            format!("bash: cd: {raw}: {}\n", FsError::NotFound),
            1,
        );
    }
    if !state.change_dir(target) {
        return CommandResult::with_code(
            format!("bash: cd: {raw}: {}\n", FsError::NotADirectory),
            1,
        );
    }
    CommandResult::ok("")
}

fn ls(state: &SessionState, raw: &str) -> CommandResult {
    let target = state.resolve(raw);
    match state.fs().list_dir(&target) {
        Some(children) if children.is_empty() => CommandResult::ok(""),
        Some(children) => {
            let names: Vec<&str> = children.iter().map(String::as_str).collect();
            CommandResult::ok(format!("{}\n", names.join("  ")))
        }
        None => {
            let reason = if state.fs().exists(&target) {
                FsError::NotADirectory
            } else {
                FsError::NotFound
            };
            CommandResult::with_code(format!("ls: cannot access '{raw}': {reason}\n"), 2)
        }
    }
}

fn cat(state: &SessionState, raw: &str) -> Option<CommandResult> {
    let target = state.resolve(raw);
    if state.fs().is_dir(&target) {
        return Some(CommandResult::with_code(
            format!("cat: {raw}: {}\n", FsError::IsADirectory),
            1,
        ));
    }
    let content = state.fs().read_file(&target)?;
    let mut output = content.to_string();
    if !output.ends_with('\n') {
        output.push('\n');
    }
    Some(CommandResult::ok(output))
}

fn mkdir(state: &mut SessionState, raw: &str) -> CommandResult {
    let target = state.resolve(raw);
    match state.fs_mut().mkdir(&target) {
        Ok(()) => CommandResult::ok(""),
        Err(error) => CommandResult::with_code(
            format!("mkdir: cannot create directory '{raw}': {error}\n"),
            1,
        ),
    }
}

fn touch(state: &mut SessionState, raw: &str) -> CommandResult {
    let target = state.resolve(raw);
    if state.fs().exists(&target) {
        return CommandResult::ok("");
    }
    match state.fs_mut().write_file(&target, "") {
        Ok(()) => CommandResult::ok(""),
        Err(error) => {
            CommandResult::with_code(format!("touch: cannot touch '{raw}': {error}\n"), 1)
        }
    }
}

fn rm(state: &mut SessionState, raw: &str) -> CommandResult {
    let target = state.resolve(raw);
    match state.fs_mut().remove(&target) {
        Ok(()) => CommandResult::ok(""),
        Err(error) => {
            CommandResult::with_code(format!("rm: cannot remove '{raw}': {error}\n"), 1)
        }
    }
}
