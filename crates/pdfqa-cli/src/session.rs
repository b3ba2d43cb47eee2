//! Streaming `ask` and the interactive `chat` loop.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Result, bail};
use pdfqa_config::AppConfig;
use pdfqa_core::{
    ChatOrchestrator, ConversationHistory, ExchangeEvent, ExchangeOutcome, ExchangeState, LogReader,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Log lines shown after a failed exchange.
const FAILURE_LOG_LINES: usize = 15;

const CHAT_HELP: &str = "Commands: /reset clears the conversation, /report shows the context plan, \
/logs shows recent log lines, /quit exits. Ctrl-C stops a running answer, \
or exits at the prompt.";

pub async fn ask(
    config: &AppConfig,
    document: String,
    question: &str,
    logs: &LogReader,
) -> Result<()> {
    let mut orchestrator = orchestrator(config)?;
    let document: Arc<str> = Arc::from(document);

    let history = ConversationHistory::new();
    let outcome = stream_answer(&mut orchestrator, question, document, &history, logs, true).await?;
    match outcome.state {
        ExchangeState::Completed | ExchangeState::Cancelled => Ok(()),
        _ => bail!(
            "{}",
            outcome
                .error
                .map_or_else(|| "exchange failed".to_string(), |e| e.to_string())
        ),
    }
}

pub async fn chat(config: &AppConfig, document: String, logs: &LogReader) -> Result<()> {
    let mut orchestrator = orchestrator(config)?;
    let document: Arc<str> = Arc::from(document);
    let mut history = ConversationHistory::new();

    let preview = orchestrator.planner().plan(&document, history.turns(), "");
    println!("{}", preview.report);
    println!();
    println!("{CHAT_HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n> ");
        std::io::stdout().flush()?;

        let Some(line) = next_input(&mut lines, tokio::signal::ctrl_c()).await? else {
            break;
        };
        let input = line.trim();
        match input {
            "" => continue,
            "/quit" | "/exit" => break,
            "/reset" => {
                history.clear();
                println!("Conversation cleared.");
                continue;
            }
            "/report" => {
                let plan = orchestrator.planner().plan(&document, history.turns(), "");
                println!("{}", plan.report);
                continue;
            }
            "/logs" => {
                for line in logs.tail(FAILURE_LOG_LINES) {
                    println!("{line}");
                }
                continue;
            }
            _ => {}
        }

        let outcome =
            stream_answer(&mut orchestrator, input, Arc::clone(&document), &history, logs, false).await?;
        if outcome.state == ExchangeState::Completed {
            history.record(input, outcome.answer);
            debug!(turns = history.len(), "turn recorded");
        }
    }
    Ok(())
}

/// Read the next prompt line. `None` on end of input or when `interrupt`
/// fires while waiting.
async fn next_input<R>(
    lines: &mut Lines<R>,
    interrupt: impl Future<Output = std::io::Result<()>>,
) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    tokio::select! {
        line = lines.next_line() => Ok(line?),
        result = interrupt => match result {
            Ok(()) => {
                println!();
                Ok(None)
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for ctrl-c");
                Ok(lines.next_line().await?)
            }
        },
    }
}

fn orchestrator(config: &AppConfig) -> Result<ChatOrchestrator> {
    let orchestrator = ChatOrchestrator::from_config(config);
    if !orchestrator.is_enabled() {
        bail!("QA engine is not configured or disabled; set [qa] service in the config file");
    }
    Ok(orchestrator)
}

/// Run one exchange, printing answer text as it arrives. Ctrl-C cancels it.
async fn stream_answer(
    orchestrator: &mut ChatOrchestrator,
    question: &str,
    document: Arc<str>,
    history: &ConversationHistory,
    logs: &LogReader,
    show_report: bool,
) -> Result<ExchangeOutcome> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    orchestrator
        .start(question, document, history.turns().to_vec(), Arc::new(tx))
        .await?;

    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);
    let mut interrupted = false;
    let mut answered = false;
    let mut stdout = std::io::stdout();

    loop {
        let event = tokio::select! {
            result = &mut interrupt, if !interrupted => {
                interrupted = true;
                if let Err(err) = result {
                    warn!(error = %err, "failed to listen for ctrl-c");
                } else if orchestrator.cancel() {
                    eprintln!("\n[stopping]");
                }
                continue;
            }
            event = rx.recv() => event,
        };

        match event {
            Some(ExchangeEvent::Report(report)) => {
                if show_report || report.was_truncated || report.budget_exhausted {
                    eprintln!("{report}\n");
                }
            }
            Some(ExchangeEvent::Chunk(text)) => {
                answered = true;
                write!(stdout, "{text}")?;
                stdout.flush()?;
            }
            Some(ExchangeEvent::Heartbeat(elapsed)) => {
                debug!(elapsed_secs = elapsed.as_secs(), "still waiting for the answer");
                if !answered {
                    eprintln!("[waiting for the provider, {}s]", elapsed.as_secs());
                }
            }
            Some(ExchangeEvent::Completed) => println!(),
            Some(ExchangeEvent::Failed(message)) => {
                eprintln!("\nError: {message}");
                eprintln!("Recent log:");
                for line in logs.tail(FAILURE_LOG_LINES) {
                    eprintln!("  {line}");
                }
            }
            None => break,
        }
    }

    let outcome = orchestrator.wait().await;
    Ok(outcome.unwrap_or(ExchangeOutcome {
        id: 0,
        state: ExchangeState::Cancelled,
        answer: String::new(),
        error: None,
    }))
}
