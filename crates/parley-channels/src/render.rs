//! In-place rendering of a growing reply into one outbound message.

use tokio::time::{sleep, sleep_until, Duration, Instant};
use tracing::debug;

use parley_core::config::RenderConfig;
use parley_markup::{escape_markdown_v2, transcode, transcode_chunks};

use crate::delivery::{Delivery, Rendered};
use crate::error::{DeliveryError, RenderError, Result};

const WARNING_SIGN: &str = "\u{26a0}\u{fe0f}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPhase {
    /// Placeholder sent, no snapshot rendered yet.
    Idle,
    Streaming,
    /// Terminal render done; every further call fails.
    Finished,
}

/// What the outbound message currently shows.
#[derive(Debug, Clone, Default)]
pub struct RenderState {
    pub last_rendered_text: Option<String>,
    pub last_render_time: Option<Instant>,
    /// Set when the platform asks to back off; no edit goes out before it.
    pub not_before: Option<Instant>,
    last_snapshot: String,
}

/// Drives transcoding and de-duplicated edits for one outbound message.
///
/// Pacing is the caller's job: check [`is_due`](Self::is_due) before offering
/// a snapshot. The renderer itself never sleeps, except for the single retry
/// of a rate-limited terminal render.
pub struct IncrementalRenderer<'d, D: Delivery> {
    delivery: &'d D,
    handle: D::Handle,
    completion_marker: String,
    max_message_len: usize,
    phase: RenderPhase,
    state: RenderState,
}

impl<'d, D: Delivery> IncrementalRenderer<'d, D> {
    /// Send the configured placeholder and bind a renderer to that message.
    pub async fn start(
        delivery: &'d D,
        config: &RenderConfig,
    ) -> std::result::Result<Self, DeliveryError> {
        let placeholder = Rendered::literal(&config.placeholder);
        let handle = delivery.send(&placeholder).await?;
        let mut renderer = Self::attach(delivery, handle, config);
        renderer.state.last_rendered_text = Some(placeholder.markup);
        Ok(renderer)
    }

    /// Bind a renderer to a message that was already sent.
    pub fn attach(delivery: &'d D, handle: D::Handle, config: &RenderConfig) -> Self {
        Self {
            delivery,
            handle,
            completion_marker: config.completion_marker.clone(),
            max_message_len: config.max_message_len,
            phase: RenderPhase::Idle,
            state: RenderState::default(),
        }
    }

    pub fn handle(&self) -> &D::Handle {
        &self.handle
    }

    pub fn phase(&self) -> RenderPhase {
        self.phase
    }

    pub fn state(&self) -> &RenderState {
        &self.state
    }

    /// True when at least `interval` has passed since the last edit and no
    /// rate-limit back-off is pending.
    pub fn is_due(&self, interval: Duration) -> bool {
        !self.backing_off()
            && self
                .state
                .last_render_time
                .map_or(true, |at| at.elapsed() >= interval)
    }

    fn backing_off(&self) -> bool {
        self.state
            .not_before
            .is_some_and(|deadline| Instant::now() < deadline)
    }

    /// Render a new snapshot. Returns whether an edit was submitted.
    ///
    /// Skips snapshots that transcode to what is already shown, snapshots that
    /// are a strict prefix of the last rendered one, empty snapshots and
    /// snapshots too long for one message. Render conflicts are swallowed. A
    /// rate-limited edit is dropped and further snapshots are skipped until
    /// the advertised delay has passed; the next one carries the text.
    pub async fn on_snapshot(&mut self, raw: &str) -> Result<bool> {
        if self.phase == RenderPhase::Finished {
            return Err(RenderError::Finished);
        }
        if self.backing_off() {
            return Ok(false);
        }

        let last = &self.state.last_snapshot;
        if raw.len() < last.len() && last.starts_with(raw) {
            debug!(
                len = raw.len(),
                rendered = last.len(),
                "render: snapshot behind last render, skipped"
            );
            return Ok(false);
        }

        let markup = transcode(raw);
        if markup.trim().is_empty() {
            return Ok(false);
        }
        if self.state.last_rendered_text.as_deref() == Some(markup.as_str()) {
            return Ok(false);
        }
        if markup.len() > self.max_message_len {
            debug!(
                len = markup.len(),
                max = self.max_message_len,
                "render: snapshot over message limit, deferred to final render"
            );
            return Ok(false);
        }

        let content = Rendered::new(markup, raw);
        match self.delivery.edit(&self.handle, &content).await {
            Ok(()) => {}
            Err(e) if e.is_render_conflict() => {
                debug!(channel = self.delivery.name(), error = %e, "render: edit conflict ignored");
            }
            Err(DeliveryError::RateLimited { retry_after }) => {
                debug!(
                    channel = self.delivery.name(),
                    retry_after_ms = retry_after.as_millis() as u64,
                    "render: rate limited, snapshot dropped"
                );
                self.state.not_before = Some(Instant::now() + retry_after);
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        }

        self.phase = RenderPhase::Streaming;
        self.state.last_snapshot = raw.to_string();
        self.state.last_rendered_text = Some(content.markup);
        self.state.last_render_time = Some(Instant::now());
        self.state.not_before = None;
        Ok(true)
    }

    /// Terminal render of the complete reply, decorated with the completion
    /// marker. Replies longer than one message continue in follow-up
    /// messages.
    pub async fn on_finish(&mut self, raw_final: &str) -> Result<()> {
        if self.completion_marker.is_empty() {
            return self.render_terminal(raw_final, "", "").await;
        }
        let markup = format!(" {}", escape_markdown_v2(&self.completion_marker));
        let plain = format!(" {}", self.completion_marker);
        self.render_terminal(raw_final, &markup, &plain).await
    }

    /// Terminal render of a partial reply followed by a visible error notice.
    pub async fn on_error(&mut self, raw_partial: &str, notice: &str) -> Result<()> {
        let markup = format!("\n\n{WARNING_SIGN} {}", escape_markdown_v2(notice));
        let plain = format!("\n\n{WARNING_SIGN} {notice}");
        self.render_terminal(raw_partial, &markup, &plain).await
    }

    async fn render_terminal(
        &mut self,
        raw: &str,
        suffix_markup: &str,
        suffix_plain: &str,
    ) -> Result<()> {
        if self.phase == RenderPhase::Finished {
            return Err(RenderError::Finished);
        }
        self.phase = RenderPhase::Finished;
        let state = std::mem::take(&mut self.state);
        if let Some(deadline) = state.not_before {
            sleep_until(deadline).await;
        }

        let budget = self.max_message_len.saturating_sub(suffix_markup.len());
        let chunks = transcode_chunks(raw, budget);
        let last = chunks.len().saturating_sub(1);
        let mut messages = chunks.into_iter().enumerate().map(|(i, chunk)| {
            if i == last {
                Rendered::new(
                    decorate(chunk.markup, suffix_markup),
                    decorate(chunk.raw, suffix_plain),
                )
            } else {
                Rendered::new(chunk.markup, chunk.raw)
            }
        });

        let Some(first) = messages.next() else {
            return Ok(());
        };
        if first.markup.is_empty() {
            debug!("render: nothing to show, terminal render skipped");
            return Ok(());
        }

        if state.last_rendered_text.as_deref() != Some(first.markup.as_str()) {
            match self.edit_with_retry(&first).await {
                Ok(()) => {}
                Err(e) if e.is_render_conflict() => {
                    debug!(channel = self.delivery.name(), error = %e, "render: terminal edit conflict ignored");
                }
                Err(e) => return Err(e.into()),
            }
        }

        let mut follow_ups = 0usize;
        for message in messages {
            self.send_with_retry(&message).await?;
            follow_ups += 1;
        }
        debug!(
            channel = self.delivery.name(),
            follow_ups,
            len = raw.len(),
            "render: finished"
        );
        Ok(())
    }

    async fn edit_with_retry(&self, content: &Rendered) -> std::result::Result<(), DeliveryError> {
        match self.delivery.edit(&self.handle, content).await {
            Err(DeliveryError::RateLimited { retry_after }) => {
                debug!(
                    retry_after_ms = retry_after.as_millis() as u64,
                    "render: terminal edit rate limited, retrying once"
                );
                sleep(retry_after).await;
                self.delivery.edit(&self.handle, content).await
            }
            other => other,
        }
    }

    async fn send_with_retry(
        &self,
        content: &Rendered,
    ) -> std::result::Result<D::Handle, DeliveryError> {
        match self.delivery.send(content).await {
            Err(DeliveryError::RateLimited { retry_after }) => {
                debug!(
                    retry_after_ms = retry_after.as_millis() as u64,
                    "render: follow-up rate limited, retrying once"
                );
                sleep(retry_after).await;
                self.delivery.send(content).await
            }
            other => other,
        }
    }
}

fn decorate(body: String, suffix: &str) -> String {
    if body.trim().is_empty() {
        suffix.trim_start().to_string()
    } else {
        body + suffix
    }
}
