//! Activity-based timeout decoration for streamed responses.
//!
//! A fixed whole-stream deadline kills slow-but-healthy long streams. The
//! guard instead watches for *stalls*: the deadline resets every time an
//! item is forwarded, so only a stream that has genuinely stopped
//! producing is failed. Items pass through unchanged and in order.
//!
//! The race between "next item arrives", "deadline elapses", and "caller
//! cancelled" is a single `tokio::select!`; whichever wins determines the
//! outcome, so there is exactly one source of truth for whether the stream
//! timed out. Cancellation and timeout deliberately share one failure kind
//! ([`StreamError::TimedOut`]) and one code path.

use std::pin::Pin;
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use runweave_types::stream::StreamError;

/// A boxed, guarded stream of items.
pub type GuardedStream<T> = Pin<Box<dyn Stream<Item = Result<T, StreamError>> + Send + 'static>>;

/// Configuration for one guarded stream consumption.
#[derive(Debug, Clone)]
pub struct StreamGuardConfig {
    /// Maximum gap between consecutive items (or before the first).
    pub timeout: Duration,
    /// Service the stream was opened against, for diagnostics.
    pub service_name: String,
    /// Model requested, for diagnostics.
    pub model_name: Option<String>,
    /// External cancellation; when absent, only the activity timeout can
    /// end the stream early.
    pub cancellation: Option<CancellationToken>,
}

impl StreamGuardConfig {
    pub fn new(timeout: Duration, service_name: impl Into<String>) -> Self {
        Self {
            timeout,
            service_name: service_name.into(),
            model_name: None,
            cancellation: None,
        }
    }

    pub fn with_model(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = Some(model_name.into());
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

/// Winner of the per-item race.
enum Raced<T> {
    Item(Option<Result<T, StreamError>>),
    Stalled,
    Cancelled,
}

/// Wrap `inner` with an activity-based timeout.
///
/// Every `Ok` item is forwarded unchanged and resets the deadline. If no
/// item arrives within `config.timeout` of the previous one (or of stream
/// start), or the cancellation token fires, the guarded stream yields one
/// [`StreamError::TimedOut`] carrying the service name, model, and timeout
/// value, then ends. An `Err` from the producer that is not attributable
/// to the guard is re-raised unchanged and ends the stream.
///
/// On normal completion the deadline future is dropped with the generator
/// state, so no spurious timeout can fire after the fact.
pub fn with_activity_timeout<T, S>(inner: S, config: StreamGuardConfig) -> GuardedStream<T>
where
    T: Send + 'static,
    S: Stream<Item = Result<T, StreamError>> + Send + 'static,
{
    let StreamGuardConfig {
        timeout,
        service_name,
        model_name,
        cancellation,
    } = config;
    let cancellation = cancellation.unwrap_or_default();
    let timeout_ms = timeout.as_millis() as u64;
    let model = model_name.unwrap_or_else(|| "unknown".to_string());

    Box::pin(async_stream::stream! {
        let mut inner = Box::pin(inner);
        let mut deadline = tokio::time::Instant::now() + timeout;

        loop {
            let raced = tokio::select! {
                // Biased so an already-fired cancellation or an already
                // elapsed deadline wins over a ready item.
                biased;
                _ = cancellation.cancelled() => Raced::Cancelled,
                _ = tokio::time::sleep_until(deadline) => Raced::Stalled,
                item = inner.next() => Raced::Item(item),
            };

            let cancelled = matches!(raced, Raced::Cancelled);
            match raced {
                Raced::Item(Some(Ok(event))) => {
                    deadline = tokio::time::Instant::now() + timeout;
                    yield Ok(event);
                }
                Raced::Item(Some(Err(err))) => {
                    yield Err(err);
                    return;
                }
                Raced::Item(None) => return,
                Raced::Stalled | Raced::Cancelled => {
                    tracing::warn!(
                        service = %service_name,
                        model = %model,
                        timeout_ms,
                        cancelled,
                        "stream stalled past activity timeout or was cancelled"
                    );
                    yield Err(StreamError::TimedOut {
                        service: service_name.clone(),
                        model: model.clone(),
                        timeout_ms,
                    });
                    return;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use runweave_types::stream::CompletionEvent;

    fn config(timeout: Duration) -> StreamGuardConfig {
        StreamGuardConfig::new(timeout, "anthropic").with_model("claude-sonnet")
    }

    fn text(s: &str) -> CompletionEvent {
        CompletionEvent::TextDelta {
            text: s.to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn forwards_items_unchanged_in_order() {
        let inner = futures_util::stream::iter(vec![
            Ok(CompletionEvent::Connected),
            Ok(text("a")),
            Ok(text("b")),
            Ok(CompletionEvent::Done),
        ]);

        let mut guarded = with_activity_timeout(inner, config(Duration::from_secs(5)));

        let mut events = Vec::new();
        while let Some(item) = guarded.next().await {
            events.push(item.unwrap());
        }
        assert_eq!(
            events,
            vec![
                CompletionEvent::Connected,
                text("a"),
                text("b"),
                CompletionEvent::Done,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn slow_but_steady_stream_never_times_out() {
        // One item every timeout/2, for 20 items: total duration is 10x
        // the timeout, yet no individual gap exceeds it.
        let inner = async_stream::stream! {
            for i in 0..20u32 {
                tokio::time::sleep(Duration::from_millis(500)).await;
                yield Ok(text(&i.to_string()));
            }
        };

        let guarded = with_activity_timeout(inner, config(Duration::from_millis(1000)));
        let events: Vec<_> = guarded.collect().await;

        assert_eq!(events.len(), 20);
        assert!(events.iter().all(|e| e.is_ok()));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_stream_times_out_exactly_once() {
        let inner = async_stream::stream! {
            yield Ok(text("first"));
            tokio::time::sleep(Duration::from_secs(3600)).await;
            yield Ok(text("never delivered"));
        };

        let guarded = with_activity_timeout(inner, config(Duration::from_millis(1000)));
        let events: Vec<_> = guarded.collect().await;

        assert_eq!(events.len(), 2);
        assert!(events[0].is_ok());
        match events[1].as_ref().unwrap_err() {
            StreamError::TimedOut {
                service,
                model,
                timeout_ms,
            } => {
                assert_eq!(service, "anthropic");
                assert_eq!(model, "claude-sonnet");
                assert_eq!(*timeout_ms, 1000);
            }
            other => panic!("expected TimedOut, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_before_first_item() {
        let inner = async_stream::stream! {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            yield Ok(text("too late"));
        };

        let guarded = with_activity_timeout(inner, config(Duration::from_millis(250)));
        let events: Vec<_> = guarded.collect().await;

        assert_eq!(events.len(), 1);
        assert!(events[0].as_ref().unwrap_err().is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn external_cancellation_raises_timeout_kind() {
        let token = CancellationToken::new();
        let inner = async_stream::stream! {
            yield Ok(text("first"));
            tokio::time::sleep(Duration::from_secs(3600)).await;
            yield Ok(text("never delivered"));
        };

        let cfg = config(Duration::from_secs(7200)).with_cancellation(token.clone());
        let mut guarded = with_activity_timeout(inner, cfg);

        assert!(guarded.next().await.unwrap().is_ok());

        token.cancel();
        let err = guarded.next().await.unwrap().unwrap_err();
        assert!(err.is_timeout(), "cancellation must share the timeout kind");
        assert!(guarded.next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn upstream_error_passes_through_unchanged() {
        let inner = futures_util::stream::iter(vec![
            Ok(text("partial")),
            Err(StreamError::Upstream("connection reset".to_string())),
        ]);

        let guarded = with_activity_timeout(inner, config(Duration::from_secs(5)));
        let events: Vec<_> = guarded.collect().await;

        assert_eq!(events.len(), 2);
        match events[1].as_ref().unwrap_err() {
            StreamError::Upstream(msg) => assert_eq!(msg, "connection reset"),
            other => panic!("expected Upstream, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn completed_stream_yields_no_late_timeout() {
        let inner = futures_util::stream::iter(vec![Ok(text("only"))]);
        let mut guarded = with_activity_timeout(inner, config(Duration::from_millis(10)));

        assert!(guarded.next().await.unwrap().is_ok());
        assert!(guarded.next().await.is_none());

        // Well past the timeout, the exhausted stream stays exhausted.
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(guarded.next().await.is_none());
    }
}
