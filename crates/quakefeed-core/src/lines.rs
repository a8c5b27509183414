use std::collections::VecDeque;

use bytes::Bytes;
use futures::{Stream, StreamExt};

use crate::error::{FeedError, Result};

/// Incremental splitter from byte chunks to text lines.
///
/// Network chunks arrive at arbitrary boundaries; the decoder buffers the
/// unterminated tail until the next chunk (or end of stream) completes it.
/// Line endings may be `\n` or `\r\n`.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buf: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk, appending every completed line to `out`.
    pub fn push(&mut self, chunk: &[u8], out: &mut VecDeque<String>) -> Result<()> {
        self.buf.extend_from_slice(chunk);

        let mut start = 0;
        while let Some(rel) = self.buf[start..].iter().position(|&b| b == b'\n') {
            let end = start + rel;
            let mut line = self.buf[start..end].to_vec();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            out.push_back(String::from_utf8(line)?);
            start = end + 1;
        }
        self.buf.drain(..start);
        Ok(())
    }

    /// Yield the final unterminated line, if any.
    pub fn finish(&mut self) -> Result<Option<String>> {
        if self.buf.is_empty() {
            return Ok(None);
        }
        let mut tail = std::mem::take(&mut self.buf);
        if tail.last() == Some(&b'\r') {
            tail.pop();
        }
        Ok(Some(String::from_utf8(tail)?))
    }
}

/// Adapt a stream of byte chunks into a stream of lines, lazily and in
/// source order. The first decode or transport error ends the stream.
pub fn lines_of<S, E>(bytes: S) -> impl Stream<Item = Result<String>>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: Into<FeedError>,
{
    struct State<S> {
        inner: S,
        decoder: LineDecoder,
        pending: VecDeque<String>,
        done: bool,
    }

    let state = State {
        inner: bytes,
        decoder: LineDecoder::new(),
        pending: VecDeque::new(),
        done: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(line) = state.pending.pop_front() {
                return Some((Ok(line), state));
            }
            if state.done {
                return None;
            }
            match state.inner.next().await {
                Some(Ok(chunk)) => {
                    if let Err(err) = state.decoder.push(&chunk, &mut state.pending) {
                        state.done = true;
                        return Some((Err(err), state));
                    }
                }
                Some(Err(err)) => {
                    state.done = true;
                    return Some((Err(err.into()), state));
                }
                None => {
                    state.done = true;
                    match state.decoder.finish() {
                        Ok(Some(tail)) => state.pending.push_back(tail),
                        Ok(None) => {}
                        Err(err) => return Some((Err(err), state)),
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(decoder: &mut LineDecoder, chunk: &[u8]) -> Vec<String> {
        let mut out = VecDeque::new();
        decoder.push(chunk, &mut out).unwrap();
        out.into_iter().collect()
    }

    #[test]
    fn splits_lines_across_chunk_boundaries() {
        let mut decoder = LineDecoder::new();
        assert_eq!(drain(&mut decoder, b"alpha\nbra"), vec!["alpha"]);
        assert_eq!(drain(&mut decoder, b"vo\nchar"), vec!["bravo"]);
        assert_eq!(decoder.finish().unwrap(), Some("char".to_string()));
    }

    #[test]
    fn strips_carriage_returns() {
        let mut decoder = LineDecoder::new();
        assert_eq!(drain(&mut decoder, b"one\r\ntwo\r\n"), vec!["one", "two"]);
        assert_eq!(decoder.finish().unwrap(), None);
    }

    #[test]
    fn multiple_lines_in_one_chunk() {
        let mut decoder = LineDecoder::new();
        assert_eq!(drain(&mut decoder, b"a\nb\nc\n"), vec!["a", "b", "c"]);
    }

    #[test]
    fn invalid_utf8_is_an_error_not_a_panic() {
        let mut decoder = LineDecoder::new();
        let mut out = VecDeque::new();
        let err = decoder.push(b"\xff\xfe\n", &mut out).unwrap_err();
        assert!(matches!(err, FeedError::Utf8(_)));
    }

    #[tokio::test]
    async fn line_stream_yields_tail_without_newline() {
        let chunks: Vec<std::result::Result<Bytes, FeedError>> = vec![
            Ok(Bytes::from_static(b"first\nsec")),
            Ok(Bytes::from_static(b"ond\nlast")),
        ];
        let lines: Vec<String> = lines_of(futures::stream::iter(chunks))
            .map(|line| line.unwrap())
            .collect()
            .await;
        assert_eq!(lines, vec!["first", "second", "last"]);
    }

    #[tokio::test]
    async fn line_stream_surfaces_transport_error_after_complete_lines() {
        let chunks: Vec<std::result::Result<Bytes, FeedError>> = vec![
            Ok(Bytes::from_static(b"good\n")),
            Err(FeedError::Cancelled),
        ];
        let items: Vec<Result<String>> =
            lines_of(futures::stream::iter(chunks)).collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "good");
        assert!(items[1].is_err());
    }
}
