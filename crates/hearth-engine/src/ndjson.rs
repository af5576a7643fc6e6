// SPDX-FileCopyrightText: 2026 Hearth Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Newline-delimited JSON decoding for streamed engine responses.
//!
//! Chunks from the HTTP body do not respect line boundaries, so bytes are
//! buffered until a full line is available. Blank lines are skipped and a
//! trailing line without a newline is still decoded at end of body.

use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures::stream::{self, Stream, StreamExt};
use hearth_core::HearthError;
use serde::de::DeserializeOwned;

pub type LineStream<T> = Pin<Box<dyn Stream<Item = Result<T, HearthError>> + Send>>;

/// Decode a streaming response body as NDJSON records of type `T`.
pub fn decode_response<T>(response: reqwest::Response) -> LineStream<T>
where
    T: DeserializeOwned + Send + 'static,
{
    decode_lines(response.bytes_stream())
}

struct LineState<S> {
    body: Pin<Box<S>>,
    buf: BytesMut,
    eof: bool,
}

/// Decode any byte-chunk stream as NDJSON. A body error ends the stream
/// after yielding [`HearthError::EngineUnavailable`].
pub fn decode_lines<T, S, E>(body: S) -> LineStream<T>
where
    T: DeserializeOwned + Send + 'static,
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let state = LineState {
        body: Box::pin(body),
        buf: BytesMut::new(),
        eof: false,
    };

    let lines = stream::unfold(state, |mut st| async move {
        loop {
            if let Some(pos) = st.buf.iter().position(|b| *b == b'\n') {
                let line = st.buf.split_to(pos + 1);
                let trimmed = line[..pos].trim_ascii();
                if trimmed.is_empty() {
                    continue;
                }
                return Some((parse_line(trimmed), st));
            }

            if st.eof {
                let rest = st.buf.split();
                let trimmed = rest.trim_ascii();
                if trimmed.is_empty() {
                    return None;
                }
                return Some((parse_line(trimmed), st));
            }

            match st.body.next().await {
                Some(Ok(chunk)) => st.buf.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    st.eof = true;
                    st.buf.clear();
                    return Some((
                        Err(HearthError::unavailable("engine stream interrupted", Some(Box::new(e)))),
                        st,
                    ));
                }
                None => st.eof = true,
            }
        }
    });

    Box::pin(lines)
}

fn parse_line<T: DeserializeOwned>(line: &[u8]) -> Result<T, HearthError> {
    serde_json::from_slice(line).map_err(|e| HearthError::Engine {
        message: format!("malformed stream line: {e}"),
    })
}
