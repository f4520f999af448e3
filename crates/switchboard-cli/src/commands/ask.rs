//! `swb ask <prompt>` -- send a prompt through the fallback chain.
//!
//! Fallback transitions are reported on stderr so stdout carries only the
//! model's answer. Ctrl-C cancels the request.

use std::io::Write;

use clap::Args;
use switchboard_llm::{ChatMessage, Completion, FallbackExecutor, ProviderError, StreamSink};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::load_registry;

/// Arguments for the `ask` subcommand.
#[derive(Args)]
pub struct AskArgs {
    /// Prompt text.
    pub prompt: String,

    /// Print the answer as it is generated.
    #[arg(short, long)]
    pub stream: bool,

    /// Provider to try first (overrides `activeProviderId`).
    #[arg(short, long)]
    pub provider: Option<String>,

    /// System prompt sent before the user prompt.
    #[arg(long)]
    pub system: Option<String>,

    /// Config file path (overrides auto-discovery).
    #[arg(short, long)]
    pub config: Option<String>,
}

pub async fn run(args: AskArgs) -> anyhow::Result<()> {
    let mut registry = load_registry(args.config.as_deref())?;
    if let Some(id) = &args.provider {
        registry.set_active(id)?;
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let executor = FallbackExecutor::from_registry(&registry)
        .with_cancellation(cancel)
        .with_observer(|t| eprintln!("[fallback] {} -> {}: {}", t.from, t.to, t.error));
    debug!(chain = ?executor.chain_ids(), "fallback chain");

    let messages = build_messages(args.system.as_deref(), &args.prompt);

    if args.stream {
        let mut sink = PrintSink::new(std::io::stdout());
        let report = executor.stream(&messages, None, &mut sink).await;
        debug!(attempts = report.attempts.len(), state = ?report.state, "stream finished");
        report.result?;
        return Ok(());
    }

    let report = executor.chat_completion(&messages).await;
    debug!(
        attempts = report.attempts.len(),
        state = ?report.state,
        provider = report.attempts.last().map(|a| a.provider_id.as_str()),
        "completion finished"
    );
    println!("{}", report.result?);
    Ok(())
}

fn build_messages(system: Option<&str>, prompt: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = system.filter(|s| !s.is_empty()) {
        messages.push(ChatMessage::system(system));
    }
    messages.push(ChatMessage::user(prompt));
    messages
}

/// Writes fragments straight to a terminal.
struct PrintSink<W> {
    out: W,
    wrote: bool,
}

impl<W: Write + Send> PrintSink<W> {
    fn new(out: W) -> Self {
        Self { out, wrote: false }
    }

    fn end_line(&mut self) {
        if self.wrote {
            let _ = writeln!(self.out);
        }
    }
}

impl<W: Write + Send> StreamSink for PrintSink<W> {
    fn on_chunk(&mut self, text: &str) {
        self.wrote = true;
        let _ = self.out.write_all(text.as_bytes());
        let _ = self.out.flush();
    }

    fn on_complete(&mut self, _completion: Completion) {
        self.end_line();
    }

    // The error itself is reported from the fallback report.
    fn on_error(&mut self, _error: ProviderError) {
        self.end_line();
    }
}
