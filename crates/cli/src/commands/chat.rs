use std::io::{self, BufRead, Write};

use structure_agent_agent::runtime::ConversationTurnHandler;
use structure_agent_core::audit::AuditSink;

use crate::commands::CommandResult;

const COMMAND: &str = "chat";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatSummary {
    pub turns: usize,
    pub completed: bool,
}

pub fn run() -> CommandResult {
    let handler = ConversationTurnHandler::default();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    match run_session(&handler, stdin.lock(), &mut stdout) {
        Ok(summary) if summary.completed => {
            CommandResult::success(COMMAND, format!("job completed after {} turns", summary.turns))
        }
        Ok(summary) => CommandResult::success(
            COMMAND,
            format!("input closed after {} turns without confirmation", summary.turns),
        ),
        Err(error) => CommandResult::failure(COMMAND, "io", error.to_string(), 1),
    }
}

/// Reads one message per line and writes each utterance until the job completes
/// or input ends.
pub fn run_session<S, R, W>(
    handler: &ConversationTurnHandler<S>,
    input: R,
    output: &mut W,
) -> io::Result<ChatSummary>
where
    S: AuditSink,
    R: BufRead,
    W: Write,
{
    let session_id = handler.start_session();
    let mut summary = ChatSummary { turns: 0, completed: false };

    for line in input.lines() {
        let line = line?;
        let message = line.trim();
        if message.is_empty() {
            continue;
        }

        summary.turns += 1;
        match handler.take_turn(&session_id, message, &format!("chat-{}", summary.turns)) {
            Ok(reply) => {
                writeln!(output, "{}", reply.utterance)?;
                if reply.done {
                    summary.completed = true;
                    break;
                }
            }
            Err(error) => {
                writeln!(output, "error: {error}")?;
                break;
            }
        }
    }

    output.flush()?;
    Ok(summary)
}
