//! Chunk sources
//!
//! Capture is synchronous and never waits on analysis: the ingest loop asks
//! for a chunk on every capture tick and gets whatever the speaker produced
//! since the last one.

use std::collections::VecDeque;
use tokio::sync::mpsc;

use crate::analysis::analyzer::ChunkPayload;

/// Anything that can hand over the next captured chunk
pub trait ChunkSource: Send {
    /// `None` once the source is finished; no further captures are attempted
    fn capture(&mut self) -> Option<ChunkPayload>;
}

/// Pre-recorded chunks, played back in order
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    chunks: VecDeque<ChunkPayload>,
}

impl ScriptedSource {
    pub fn new(chunks: impl IntoIterator<Item = ChunkPayload>) -> Self {
        Self {
            chunks: chunks.into_iter().collect(),
        }
    }

    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(lines.into_iter().map(|l| ChunkPayload::Text(l.into())))
    }

    /// `count` placeholder chunks, for analyzers that ignore the payload
    pub fn placeholders(count: usize) -> Self {
        Self::new((0..count).map(|_| ChunkPayload::Text(String::new())))
    }

    pub fn remaining(&self) -> usize {
        self.chunks.len()
    }
}

impl ChunkSource for ScriptedSource {
    fn capture(&mut self) -> Option<ChunkPayload> {
        self.chunks.pop_front()
    }
}

/// Live text fed through a channel
///
/// Each capture drains everything received since the previous one into a
/// single chunk; an idle speaker yields an empty (silent) chunk. The source
/// finishes when every sender is gone and nothing is left.
pub struct ChannelSource {
    rx: mpsc::UnboundedReceiver<String>,
}

impl ChannelSource {
    pub fn new() -> (mpsc::UnboundedSender<String>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }
}

impl ChunkSource for ChannelSource {
    fn capture(&mut self) -> Option<ChunkPayload> {
        let mut parts = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(text) => parts.push(text),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    if parts.is_empty() {
                        return None;
                    }
                    break;
                }
            }
        }
        Some(ChunkPayload::Text(parts.join(" ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_plays_in_order() {
        let mut source = ScriptedSource::from_lines(["first", "second"]);
        assert_eq!(source.capture(), Some(ChunkPayload::Text("first".into())));
        assert_eq!(source.remaining(), 1);
        assert_eq!(source.capture(), Some(ChunkPayload::Text("second".into())));
        assert_eq!(source.capture(), None);
    }

    #[test]
    fn test_channel_drains_since_last_capture() {
        let (tx, mut source) = ChannelSource::new();
        tx.send("hello".into()).unwrap();
        tx.send("world".into()).unwrap();
        assert_eq!(source.capture(), Some(ChunkPayload::Text("hello world".into())));
        // Idle speaker: silent chunk
        assert_eq!(source.capture(), Some(ChunkPayload::Text(String::new())));

        tx.send("bye".into()).unwrap();
        drop(tx);
        assert_eq!(source.capture(), Some(ChunkPayload::Text("bye".into())));
        assert_eq!(source.capture(), None);
    }
}
