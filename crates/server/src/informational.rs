//! Preliminary (103 Early Hints) responses.
//!
//! hyper does not expose a way to emit informational responses from a
//! service, so the actual wire write is delegated to an [`InformationalSender`]
//! that the transport installs as a request extension (or that the
//! middleware is built with).

use std::sync::Arc;

use async_trait::async_trait;
use http::header::LINK;
use http::{HeaderMap, HeaderValue, StatusCode};

use crate::error::HintsError;

/// `103 Early Hints`.
pub fn early_hints_status() -> StatusCode {
    StatusCode::from_u16(103).expect("103 is a valid status code")
}

/// Writes an informational response ahead of the final one.
///
/// Implementations must not return before the head has been flushed.
#[async_trait]
pub trait InformationalSender: Send + Sync {
    async fn send_informational(&self, status: StatusCode, headers: &HeaderMap) -> Result<(), HintsError>;
}

/// Request extension through which a transport offers an [`InformationalSender`].
#[derive(Clone)]
pub struct InformationalHandle(pub Arc<dyn InformationalSender>);

impl InformationalHandle {
    pub fn new(sender: impl InformationalSender + 'static) -> Self {
        Self(Arc::new(sender))
    }
}

impl std::fmt::Debug for InformationalHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("InformationalHandle")
    }
}

/// Response extension recording whether headers already reached the wire.
///
/// Set on the final response after a preliminary response was flushed, so
/// code further out does not try to write the head again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitState {
    pub headers_committed: bool,
}

/// A minimal response carrying only the cached `Link` header.
#[derive(Debug, Clone)]
pub struct Preliminary {
    headers: HeaderMap,
    headers_committed: bool,
}

impl Preliminary {
    /// Only `Link` is carried; a 103 must never hold `Cache-Control`.
    pub fn new(link: HeaderValue) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(LINK, link);
        Self { headers, headers_committed: false }
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_committed(&self) -> bool {
        self.headers_committed
    }

    /// Send as a 103 through `sender`, marking the head as committed on success.
    pub async fn send(&mut self, sender: &dyn InformationalSender) -> Result<(), HintsError> {
        sender.send_informational(early_hints_status(), &self.headers).await?;
        self.headers_committed = true;
        Ok(())
    }

    pub fn commit_state(&self) -> CommitState {
        CommitState { headers_committed: self.headers_committed }
    }
}
