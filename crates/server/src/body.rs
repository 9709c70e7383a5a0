//! Response body buffering and the post-response hook.

use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Body;
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use http_body::{Body as HttpBody, Frame, SizeHint};
use http_body_util::BodyExt;

use crate::error::HintsError;
use crate::middleware::DeferredHints;

/// Outcome of buffering a response body.
#[derive(Debug)]
pub enum Buffered {
    Complete(Bytes),
    /// The body was larger than the limit; it is handed back intact.
    Oversized(Body),
}

/// Collect `body` into memory if it fits within `limit` bytes.
///
/// Bodies that turn out to be larger are reassembled from what was read
/// plus the untouched remainder, so the client still receives everything.
pub async fn buffer_body(mut body: Body, limit: usize) -> Result<Buffered, HintsError> {
    if body.size_hint().lower() > limit as u64 {
        return Ok(Buffered::Oversized(body));
    }

    let mut buf = BytesMut::new();
    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(|e| HintsError::Body(e.to_string()))?;
        let Ok(data) = frame.into_data() else {
            continue;
        };

        buf.extend_from_slice(&data);
        if buf.len() > limit {
            let head = futures_util::stream::once(async move { Ok::<_, axum::Error>(buf.freeze()) });
            return Ok(Buffered::Oversized(Body::from_stream(head.chain(body.into_data_stream()))));
        }
    }

    Ok(Buffered::Complete(buf.freeze()))
}

/// A fully buffered body that runs [`DeferredHints`] once it has been read to the end.
///
/// The hook also fires when the body is dropped after its data was handed
/// out, or dropped unpolled while empty, since a server stops polling once
/// the stream reports its end.
pub struct CompletionBody {
    data: Option<Bytes>,
    on_complete: Option<DeferredHints>,
}

impl CompletionBody {
    pub fn new(data: Bytes, on_complete: DeferredHints) -> Self {
        Self { data: Some(data), on_complete: Some(on_complete) }
    }

    fn complete(&mut self) {
        let Some(deferred) = self.on_complete.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(deferred.run());
            }
            Err(_) => tracing::warn!("no runtime to run deferred early hints on"),
        }
    }
}

impl Drop for CompletionBody {
    fn drop(&mut self) {
        if self.data.as_ref().is_none_or(Bytes::is_empty) {
            self.complete();
        }
    }
}

impl HttpBody for CompletionBody {
    type Data = Bytes;
    type Error = std::convert::Infallible;

    fn poll_frame(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Bytes>, Self::Error>>> {
        match self.data.take() {
            Some(data) if !data.is_empty() => Poll::Ready(Some(Ok(Frame::data(data)))),
            _ => {
                self.complete();
                Poll::Ready(None)
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.data.as_ref().is_none_or(Bytes::is_empty)
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::with_exact(self.data.as_ref().map_or(0, |d| d.len() as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::EarlyHints;
    use early_hints_core::HintsConfig;
    use http::{HeaderMap, StatusCode};
    use std::time::Duration;

    #[tokio::test]
    async fn test_small_body_is_complete() {
        let buffered = buffer_body(Body::from("<html></html>"), 1024).await.unwrap();
        assert!(matches!(buffered, Buffered::Complete(b) if b == "<html></html>"));
    }

    #[tokio::test]
    async fn test_known_large_body_is_untouched() {
        let buffered = buffer_body(Body::from(vec![b'a'; 64]), 16).await.unwrap();
        let Buffered::Oversized(body) = buffered else {
            panic!("expected oversized body");
        };
        assert_eq!(axum::body::to_bytes(body, usize::MAX).await.unwrap().len(), 64);
    }

    #[tokio::test]
    async fn test_streamed_large_body_is_reassembled() {
        let chunks = vec![Ok::<_, std::io::Error>("0123456789"), Ok("abcdefghij"), Ok("KLMNOPQRST")];
        let body = Body::from_stream(futures_util::stream::iter(chunks));

        let Buffered::Oversized(body) = buffer_body(body, 15).await.unwrap() else {
            panic!("expected oversized body");
        };

        let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        assert_eq!(bytes, "0123456789abcdefghijKLMNOPQRST");
    }

    async fn wait_for_record(hints: &EarlyHints, url: &str) -> bool {
        for _ in 0..50 {
            if hints.cache().lookup(url).await.is_some() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    fn deferred(hints: &EarlyHints, body: &'static str) -> DeferredHints {
        let request = http::Request::builder().uri("http://example.com/").body(()).unwrap().into_parts().0;
        DeferredHints::new(hints.clone(), request, StatusCode::OK, HeaderMap::new(), Bytes::from_static(body.as_bytes()))
    }

    #[tokio::test]
    async fn test_unpolled_empty_body_completes_on_drop() {
        let hints = EarlyHints::builder(HintsConfig::default()).build();

        drop(CompletionBody::new(Bytes::new(), deferred(&hints, "")));

        assert!(wait_for_record(&hints, "http://example.com").await);
    }

    #[tokio::test]
    async fn test_unread_body_does_not_complete() {
        let hints = EarlyHints::builder(HintsConfig::default()).build();

        drop(CompletionBody::new(Bytes::from_static(b"<html></html>"), deferred(&hints, "<html></html>")));

        assert!(!wait_for_record(&hints, "http://example.com").await);
    }

    #[tokio::test]
    async fn test_read_body_completes() {
        let hints = EarlyHints::builder(HintsConfig::default()).build();
        let body = CompletionBody::new(Bytes::from_static(b"<html></html>"), deferred(&hints, "<html></html>"));

        assert_eq!(body.collect().await.unwrap().to_bytes(), "<html></html>");
        assert!(wait_for_record(&hints, "http://example.com").await);
    }

    #[tokio::test]
    async fn test_stream_error_is_reported() {
        let chunks = vec![Ok("<html>"), Err(std::io::Error::other("reset"))];
        let body = Body::from_stream(futures_util::stream::iter(chunks));

        assert!(matches!(buffer_body(body, 1024).await, Err(HintsError::Body(_))));
    }
}
