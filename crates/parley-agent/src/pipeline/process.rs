//! Streaming message pipeline, shared by all channel adapters.
//!
//! `process_message_streaming` runs one reply end to end:
//! placeholder → wait for the identity's window → generate → render deltas
//! in place → persist the exchange → terminal render.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use parley_channels::{Delivery, DeliveryError, IncrementalRenderer, RenderError};
use parley_core::{ConversationEntry, EntryContent};
use parley_memory::WindowGuard;

use crate::aggregate::StreamAggregator;
use crate::provider::GenerateRequest;
use crate::stream::StreamEvent;

use super::context::MessageContext;

const STREAM_BUFFER: usize = 64;

/// How a pipeline run ended. Upstream failures are an outcome, not an
/// error: the user already saw the partial reply and the notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Completed { reply: String, model: String },
    Failed { partial: String, reason: String },
    Cancelled { partial: String },
}

/// The reply could not be shown to the user.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("delivery failed: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("render failed: {0}")]
    Render(#[from] RenderError),
}

enum StreamEnd {
    Done,
    Failed(String),
    Cancelled,
}

/// Run the streaming pipeline for one inbound message.
///
/// Steps:
/// 1. Send the placeholder message.
/// 2. Take the identity's conversation window, waiting for any earlier reply
///    to the same identity to finish.
/// 3. Register the reply so `/stop` can cancel it.
/// 4. Stream from the generator, rendering a snapshot whenever the edit
///    interval has elapsed.
/// 5. Persist the user turn and the reply (tagged partial when cut short).
/// 6. Terminal render: completion marker, or partial reply plus notice.
///    A cancelled reply gets no further edits.
pub async fn process_message_streaming<C, D>(
    ctx: &C,
    delivery: &D,
    identity: &str,
    input: EntryContent,
) -> Result<PipelineOutcome, PipelineError>
where
    C: MessageContext + ?Sized,
    D: Delivery,
{
    let reply_id = Uuid::now_v7();
    let config = ctx.render_config();
    let mut renderer = IncrementalRenderer::start(delivery, config).await?;

    let mut window = ctx.store().acquire(identity).await;
    let active = ctx.active().register(identity);
    let cancel = active.token().clone();

    let request = GenerateRequest {
        context: window.context(),
        input: input.clone(),
    };
    debug!(
        %reply_id,
        identity,
        context = request.context.len(),
        generator = ctx.generator().name(),
        "pipeline: generating"
    );

    let (tx, mut rx) = mpsc::channel::<StreamEvent>(STREAM_BUFFER);
    let send_fut = ctx.generator().generate(&request, tx);
    tokio::pin!(send_fut);

    let interval = config.edit_interval();
    let mut aggregator = StreamAggregator::new();
    let mut model = String::new();
    let mut generator_done = false;
    let mut rx_closed = false;

    let end = loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break StreamEnd::Cancelled,
            result = &mut send_fut, if !generator_done => {
                generator_done = true;
                match result {
                    Err(e) => {
                        while let Ok(event) = rx.try_recv() {
                            if let StreamEvent::TextDelta { text } = event {
                                aggregator.feed(&text);
                            }
                        }
                        break StreamEnd::Failed(e.to_string());
                    }
                    Ok(()) if rx_closed => break StreamEnd::Done,
                    Ok(()) => {}
                }
            }
            event = rx.recv(), if !rx_closed => match event {
                Some(StreamEvent::TextDelta { text }) => {
                    aggregator.feed(&text);
                    if renderer.is_due(interval) {
                        if let Err(e) = renderer.on_snapshot(aggregator.snapshot()).await {
                            warn!(%reply_id, error = %e, "pipeline: intermediate render failed");
                        }
                    }
                }
                Some(StreamEvent::Done { model: m }) => model = m,
                Some(StreamEvent::Error { message }) => break StreamEnd::Failed(message),
                None if generator_done => break StreamEnd::Done,
                // Sender dropped early; the generator's result decides.
                None => rx_closed = true,
            },
        }
    };

    let user_turn = ConversationEntry::user(input);
    let outcome = match end {
        StreamEnd::Done => {
            let reply = aggregator.finish();
            persist(&mut window, user_turn, &reply, false);
            renderer.on_finish(&reply).await?;
            info!(
                %reply_id,
                identity,
                model = %model,
                len = reply.len(),
                "pipeline: reply complete"
            );
            PipelineOutcome::Completed { reply, model }
        }
        StreamEnd::Failed(reason) => {
            let err = aggregator.fail(reason);
            warn!(%reply_id, identity, error = %err, "pipeline: generation failed");
            persist(&mut window, user_turn, &err.partial, true);
            let notice = format!("An error has occurred: {}", err.reason);
            renderer.on_error(&err.partial, &notice).await?;
            PipelineOutcome::Failed {
                partial: err.partial,
                reason: err.reason,
            }
        }
        StreamEnd::Cancelled => {
            let partial = aggregator.finish();
            info!(%reply_id, identity, len = partial.len(), "pipeline: reply cancelled");
            persist(&mut window, user_turn, &partial, true);
            PipelineOutcome::Cancelled { partial }
        }
    };

    drop(active);
    Ok(outcome)
}

/// Append the user turn and, if anything was generated, the reply.
fn persist(window: &mut WindowGuard, user_turn: ConversationEntry, reply: &str, partial: bool) {
    window.append(user_turn);
    if reply.is_empty() {
        return;
    }
    let entry = ConversationEntry::assistant(reply);
    window.append(if partial { entry.into_partial() } else { entry });
}
