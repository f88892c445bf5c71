// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Long-lived stream connections.
//!
//! One `Response::Event` frame is written per event until the session is
//! destroyed, the observer is closed for falling behind, or the client
//! hangs up. Dropping the observer on return detaches it.

use sx_adapters::SandboxAdapter;
use sx_core::{Clock, IdGen, SessionId};
use sx_engine::SessionManager;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tracing::debug;

use super::ConnectionError;
use crate::protocol::{self, Response, DEFAULT_TIMEOUT};

pub(super) async fn handle_stream<S, C, G, R, W>(
    manager: &SessionManager<S, C, G>,
    session_id: SessionId,
    mut reader: R,
    writer: &mut W,
) -> Result<(), ConnectionError>
where
    S: SandboxAdapter,
    C: Clock,
    G: IdGen,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut observer = match manager.attach(&session_id) {
        Ok(observer) => observer,
        Err(e) => {
            let response = Response::error(e.kind(), e.to_string());
            protocol::write_response(writer, &response, DEFAULT_TIMEOUT).await?;
            return Ok(());
        }
    };
    debug!(%session_id, observer = %observer.id(), "stream opened");

    let mut probe = [0u8; 64];
    loop {
        tokio::select! {
            event = observer.recv() => {
                // None after the terminal status or an overflow error
                let Some(event) = event else {
                    break;
                };
                protocol::write_response(writer, &Response::Event { event }, DEFAULT_TIMEOUT)
                    .await?;
            }
            read = reader.read(&mut probe) => {
                // Clients never send after the request; EOF or error means gone
                match read {
                    Ok(0) | Err(_) => {
                        debug!(%session_id, observer = %observer.id(), "stream client hung up");
                        break;
                    }
                    Ok(_) => {}
                }
            }
        }
    }

    debug!(%session_id, observer = %observer.id(), "stream closed");
    Ok(())
}
