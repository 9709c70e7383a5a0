//! HTTP/1.1 connections that can write `103 Early Hints` ahead of the final response.
//!
//! hyper owns the connection and offers no way to emit an informational
//! response from a service. The socket's write half is shared instead: each
//! request gets an [`InformationalHandle`] that writes the 103 head directly,
//! while hyper is still waiting on the handler and has nothing in flight.

use std::future::{Future, poll_fn};
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use http::{HeaderMap, StatusCode, Version};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tower::ServiceExt;

use crate::error::HintsError;
use crate::informational::{InformationalHandle, InformationalSender};

type SharedWriter = Arc<Mutex<OwnedWriteHalf>>;

fn lock(writer: &SharedWriter) -> MutexGuard<'_, OwnedWriteHalf> {
    writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A TCP stream whose write half is shared with [`ConnectionSender`]s.
pub struct HintedStream {
    read: OwnedReadHalf,
    write: SharedWriter,
}

impl HintedStream {
    pub fn new(stream: TcpStream) -> Self {
        let (read, write) = stream.into_split();
        Self { read, write: Arc::new(Mutex::new(write)) }
    }
}

impl AsyncRead for HintedStream {
    fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.read).poll_read(cx, buf)
    }
}

impl AsyncWrite for HintedStream {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        Pin::new(&mut *lock(&self.write)).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut *lock(&self.write)).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut *lock(&self.write)).poll_shutdown(cx)
    }
}

/// Writes informational responses straight onto an HTTP/1.1 connection.
#[derive(Clone)]
pub struct ConnectionSender {
    write: SharedWriter,
    version: Version,
}

#[async_trait]
impl InformationalSender for ConnectionSender {
    async fn send_informational(&self, status: StatusCode, headers: &HeaderMap) -> Result<(), HintsError> {
        // HTTP/1.0 clients do not expect 1xx responses.
        if self.version != Version::HTTP_11 {
            return Err(HintsError::InformationalUnsupported(format!("{:?}", self.version)));
        }

        let head = informational_head(status, headers);
        let mut written = 0;
        while written < head.len() {
            let n = poll_fn(|cx| Pin::new(&mut *lock(&self.write)).poll_write(cx, &head[written..]))
                .await
                .map_err(|e| HintsError::InformationalFailed(e.to_string()))?;
            if n == 0 {
                return Err(HintsError::InformationalFailed("connection closed".into()));
            }
            written += n;
        }

        poll_fn(|cx| Pin::new(&mut *lock(&self.write)).poll_flush(cx))
            .await
            .map_err(|e| HintsError::InformationalFailed(e.to_string()))
    }
}

/// Status line and headers of an informational response, blank line included.
pub fn informational_head(status: StatusCode, headers: &HeaderMap) -> Vec<u8> {
    let reason = status.canonical_reason().unwrap_or("Early Hints");
    let mut head = format!("HTTP/1.1 {} {}\r\n", status.as_u16(), reason).into_bytes();
    for (name, value) in headers {
        head.extend_from_slice(name.as_str().as_bytes());
        head.extend_from_slice(b": ");
        head.extend_from_slice(value.as_bytes());
        head.extend_from_slice(b"\r\n");
    }
    head.extend_from_slice(b"\r\n");
    head
}

/// Serve `app` on one connection, offering every request a [`ConnectionSender`].
pub async fn serve_connection(stream: TcpStream, app: Router) -> Result<(), hyper::Error> {
    let stream = HintedStream::new(stream);
    let writer = stream.write.clone();

    let service = service_fn(move |mut request: http::Request<Incoming>| {
        let sender = ConnectionSender { write: writer.clone(), version: request.version() };
        request.extensions_mut().insert(InformationalHandle::new(sender));
        app.clone().oneshot(request.map(Body::new))
    });

    http1::Builder::new().serve_connection(TokioIo::new(stream), service).await
}

/// Accept connections until `shutdown` resolves.
pub async fn serve(listener: TcpListener, app: Router, shutdown: impl Future<Output = ()>) {
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to accept connection");
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        continue;
                    }
                };
                tokio::spawn(connection(stream, peer, app.clone()));
            }
            () = &mut shutdown => break,
        }
    }
}

async fn connection(stream: TcpStream, peer: SocketAddr, app: Router) {
    if let Err(e) = serve_connection(stream, app).await {
        tracing::debug!(%peer, error = %e, "connection closed with error");
    }
}
