use std::{io::ErrorKind, net::SocketAddr};

use anyhow::Context;
use tokio::net::UdpSocket;
use tracing::{debug, warn};

use pwmfan_common::{
    protocol::{encode_status, is_authorized, REQUEST_BUFFER_BYTES},
    NetworkSettings, StatusFormat,
};

use crate::sampler::SharedEngine;

/// Answers token-authenticated status queries, one datagram at a time.
pub struct StatusServer {
    socket: UdpSocket,
    engine: SharedEngine,
    token: String,
    format: StatusFormat,
}

impl StatusServer {
    pub async fn bind(
        addr: SocketAddr,
        engine: SharedEngine,
        settings: &NetworkSettings,
    ) -> anyhow::Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .with_context(|| format!("failed to bind status server at {addr}"))?;
        Ok(Self {
            socket,
            engine,
            token: settings.token.clone(),
            format: settings.format,
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub async fn serve(self) -> anyhow::Result<()> {
        let mut buf = vec![0u8; REQUEST_BUFFER_BYTES];

        loop {
            let (len, peer) = match self.socket.recv_from(&mut buf).await {
                Ok(received) => received,
                // ICMP errors from an earlier reply surface here on some platforms.
                Err(err)
                    if matches!(
                        err.kind(),
                        ErrorKind::ConnectionReset | ErrorKind::ConnectionRefused
                    ) =>
                {
                    debug!("status socket: {err}");
                    continue;
                }
                Err(err) => return Err(err).context("status server receive failed"),
            };

            if !is_authorized(&buf[..len], &self.token) {
                debug!("dropping {len} byte request from {peer}");
                continue;
            }

            let snapshot = self.engine.lock().await.snapshot();
            let body = match encode_status(&snapshot, self.format) {
                Ok(body) => body,
                Err(err) => {
                    warn!("status encoding failed: {err}");
                    continue;
                }
            };

            if let Err(err) = self.socket.send_to(&body, peer).await {
                warn!("status reply to {peer} failed: {err}");
            }
        }
    }
}
