//! The interactive conversation loop.
//!
//! One sequential loop: read a line, generate a reply, sanitize it, relay it
//! through the current speech backend. The backend is resolved lazily and
//! kept until a relay fails; the next relay then resolves again.

use pepper_llm::GenerationClient;
use pepper_speech::{preview, sanitize, ConnectivityResolver, SpeechBackend};
use pepper_types::{BackendMode, ConversationContext, SpeakResult, APOLOGY_TEXT, FAREWELL_TEXT};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Inputs that end the conversation, compared case-insensitively.
pub const EXIT_KEYWORDS: [&str; 3] = ["quit", "exit", "bye"];

/// Number of characters of generated text included in log lines.
const LOG_PREVIEW_CHARS: usize = 100;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Counters for one interactive run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// User messages that reached the generator.
    pub turns: usize,
    /// Utterances the sink accepted.
    pub relays: usize,
    /// Utterances the sink rejected.
    pub failures: usize,
    /// Resolutions triggered by a relay failure.
    pub re_resolutions: usize,
    /// Mode of the backend used for the last relay.
    pub final_mode: Option<BackendMode>,
}

#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Blank,
    Exit,
    Message(&'a str),
}

fn classify(line: &str) -> Input<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        Input::Blank
    } else if EXIT_KEYWORDS
        .iter()
        .any(|keyword| trimmed.eq_ignore_ascii_case(keyword))
    {
        Input::Exit
    } else {
        Input::Message(trimmed)
    }
}

pub struct ConversationOrchestrator {
    resolver: ConnectivityResolver,
    generator: GenerationClient,
    context: ConversationContext,
    backend: Option<SpeechBackend>,
    stale: bool,
    summary: RunSummary,
}

impl ConversationOrchestrator {
    pub fn new(resolver: ConnectivityResolver, generator: GenerationClient) -> Self {
        Self {
            resolver,
            generator,
            context: ConversationContext::new(),
            backend: None,
            stale: false,
            summary: RunSummary::default(),
        }
    }

    /// Limits each prompt to the trailing `window` turns of the conversation.
    pub fn with_history_window(mut self, window: usize) -> Self {
        self.context = ConversationContext::with_window(window);
        self
    }

    pub fn context(&self) -> &ConversationContext {
        &self.context
    }

    pub fn resolver(&self) -> &ConnectivityResolver {
        &self.resolver
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Mode of the cached backend, if one is resolved and not stale.
    pub fn mode(&self) -> Option<BackendMode> {
        self.backend.as_ref().map(SpeechBackend::mode)
    }

    /// Resolves a backend now instead of on the first relay.
    pub async fn resolve(&mut self) -> BackendMode {
        let backend = self.resolver.resolve().await;
        let mode = backend.mode();
        self.backend = Some(backend);
        self.stale = false;
        mode
    }

    /// Produces the text to relay for `message` and records the exchange.
    ///
    /// The exchange is recorded only when generation returns a non-empty
    /// reply; otherwise the apology is returned and the context is untouched.
    pub async fn respond(&mut self, message: &str) -> String {
        self.summary.turns += 1;

        match self.generator.generate(message, self.context.prompt_view()).await {
            Ok(reply) if !reply.is_empty() => {
                tracing::info!("generated: {}", preview(&reply, LOG_PREVIEW_CHARS));
                let spoken = sanitize(&reply);
                self.context.record_exchange(message, reply);
                spoken
            }
            Ok(_) => {
                tracing::warn!("generation returned an empty reply");
                APOLOGY_TEXT.to_string()
            }
            Err(e) => {
                tracing::warn!(kind = ?e.kind(), error = %e, "generation failed");
                APOLOGY_TEXT.to_string()
            }
        }
    }

    /// Relays `text` through the current backend, resolving one first if
    /// needed. A failure drops the backend so the next relay re-resolves.
    pub async fn relay(&mut self, text: &str) -> SpeakResult {
        let backend = match self.backend.take() {
            Some(backend) => backend,
            None => {
                if self.stale {
                    self.summary.re_resolutions += 1;
                    tracing::info!("re-resolving speech backend after a relay failure");
                }
                self.resolver.resolve().await
            }
        };
        self.stale = false;

        let result = backend.speak(text).await;
        self.summary.final_mode = Some(backend.mode());

        if result.is_ok() {
            self.summary.relays += 1;
            self.backend = Some(backend);
        } else {
            self.summary.failures += 1;
            self.stale = true;
            tracing::warn!(
                mode = %backend.mode(),
                kind = ?result.failure,
                "relay failed, backend marked stale"
            );
        }
        result
    }

    /// Runs the loop until an exit keyword or end of input.
    ///
    /// `output` receives the prompt and the replies; logs go through tracing.
    pub async fn run<R, W>(&mut self, input: R, output: &mut W) -> Result<RunSummary, ChatError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();

        loop {
            output.write_all(b"You: ").await?;
            output.flush().await?;

            let Some(line) = lines.next_line().await? else {
                output.write_all(b"\nGoodbye!\n").await?;
                break;
            };

            match classify(&line) {
                Input::Blank => continue,
                Input::Exit => {
                    self.relay(FAREWELL_TEXT).await;
                    output
                        .write_all(format!("Pepper: {}\n", FAREWELL_TEXT).as_bytes())
                        .await?;
                    break;
                }
                Input::Message(message) => {
                    let reply = self.respond(message).await;
                    let result = self.relay(&reply).await;
                    output
                        .write_all(format!("Pepper: {}\n\n", reply).as_bytes())
                        .await?;
                    if !result.is_ok() {
                        output
                            .write_all(b"(the robot could not say that; reconnecting on the next reply)\n\n")
                            .await?;
                    }
                }
            }
        }

        output.flush().await?;
        Ok(self.summary.clone())
    }
}
