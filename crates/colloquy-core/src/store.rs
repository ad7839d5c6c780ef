//! ChatStore - ordered storage for messages and their content blocks.
//!
//! Messages iterate in insertion order, which is creation order by
//! construction; activity never re-sorts them. Blocks live in a side table
//! keyed by id so a message can reference blocks that are not yet resident
//! (hydrated on demand through [`BlockStore`]).

use crate::error::Result;
use crate::model::{Block, BlockId, BlockKind, ContentStatus, Message, MessageId, Role};
use async_trait::async_trait;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Async fetch seam to block persistence (outside this crate's scope).
#[async_trait]
pub trait BlockStore: Send + Sync {
    async fn get_block(&self, id: &BlockId) -> Result<Option<Block>>;
}

/// Storage for the conversation under display.
#[derive(Debug, Default)]
pub struct ChatStore {
    /// All messages in creation order with O(1) id access.
    messages: IndexMap<MessageId, Message>,
    /// Resident blocks, keyed by id.
    blocks: HashMap<BlockId, Block>,
    /// Block ids that failed their last hydration attempt; retried on the
    /// next pass and surfaced as an inline indicator meanwhile.
    load_failures: HashSet<BlockId>,
    /// Revision number for dirty tracking.
    revision: u64,
}

impl ChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Revision for dirty tracking; bumps on every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages in creation order.
    pub fn messages(&self) -> impl Iterator<Item = &Message> + '_ {
        self.messages.values()
    }

    pub fn message(&self, id: &MessageId) -> Option<&Message> {
        self.messages.get(id)
    }

    /// Message at a display index (creation order).
    pub fn message_at(&self, index: usize) -> Option<&Message> {
        self.messages.get_index(index).map(|(_, m)| m)
    }

    pub fn block(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.get(id)
    }

    /// Append a message at the tail.
    pub fn add_message(&mut self, message: Message) -> MessageId {
        let id = message.id.clone();
        self.messages.insert(id.clone(), message);
        self.revision += 1;
        id
    }

    /// Convenience: a complete user message with a single text block.
    pub fn add_user_message(&mut self, text: &str) -> MessageId {
        let mut block = Block::new(BlockKind::Text);
        block.content = text.to_string();
        block.status = ContentStatus::Complete;
        let block_id = block.id.clone();
        self.blocks.insert(block_id.clone(), block);

        let mut message = Message::new(Role::User);
        message.status = ContentStatus::Complete;
        message.block_ids.push(block_id);
        self.add_message(message)
    }

    /// Placeholder assistant message for deltas that arrive before their
    /// message was announced.
    pub fn insert_placeholder(&mut self, id: &MessageId) -> MessageId {
        let message = Message::with_id(id.clone(), Role::Assistant);
        self.add_message(message)
    }

    /// Make `(message_id, block_id)` the message's streaming block, creating
    /// either side if missing. At most one block per message streams at any
    /// instant: a previously streaming sibling is frozen complete first.
    pub fn ensure_streaming_block(
        &mut self,
        message_id: &MessageId,
        block_id: &BlockId,
        kind: BlockKind,
    ) {
        if !self.messages.contains_key(message_id) {
            debug!(target: "core.store", %message_id, "delta for unknown message, inserting placeholder");
            self.insert_placeholder(message_id);
        }

        let Some(message) = self.messages.get_mut(message_id) else {
            return;
        };

        // Freeze any other streaming sibling.
        for sibling_id in &message.block_ids {
            if sibling_id == block_id {
                continue;
            }
            if let Some(sibling) = self.blocks.get_mut(sibling_id) {
                if sibling.status == ContentStatus::Streaming {
                    sibling.status = ContentStatus::Complete;
                }
            }
        }

        if !message.block_ids.contains(block_id) {
            message.block_ids.push(block_id.clone());
        }
        message.status = ContentStatus::Streaming;

        let block = self
            .blocks
            .entry(block_id.clone())
            .or_insert_with(|| Block::with_id(block_id.clone(), kind));
        block.status = ContentStatus::Streaming;
        self.revision += 1;
    }

    /// Replace a block's visible content with a committed snapshot. The
    /// snapshot is monotonic for a streaming block (throttler guarantee), so
    /// replacement preserves append-only semantics.
    pub fn set_block_content(&mut self, block_id: &BlockId, content: &str) {
        match self.blocks.get_mut(block_id) {
            Some(block) => {
                if block.status.is_terminal() {
                    warn!(target: "core.store", %block_id, "snapshot for terminal block ignored");
                    return;
                }
                block.content.clear();
                block.content.push_str(content);
                self.revision += 1;
            }
            None => {
                warn!(target: "core.store", %block_id, "snapshot for unknown block dropped");
            }
        }
    }

    /// Freeze a block with its final content.
    pub fn complete_block(&mut self, block_id: &BlockId, content: &str) {
        if let Some(block) = self.blocks.get_mut(block_id) {
            block.content.clear();
            block.content.push_str(content);
            block.status = ContentStatus::Complete;
            self.revision += 1;
        }
    }

    /// Mark a message complete once its final block settled.
    pub fn complete_message(&mut self, message_id: &MessageId) {
        if let Some(message) = self.messages.get_mut(message_id) {
            message.status = ContentStatus::Complete;
            self.revision += 1;
        }
    }

    /// Upstream failure: the message turns terminal, partially accumulated
    /// content is preserved, and the in-progress block is frozen in `Error`
    /// so renderers show a terminal error block in its place.
    pub fn fail_message(&mut self, message_id: &MessageId, reason: &str) {
        let Some(message) = self.messages.get_mut(message_id) else {
            warn!(target: "core.store", %message_id, "error for unknown message dropped");
            return;
        };
        message.status = ContentStatus::Error;
        message.error = Some(reason.to_string());
        for block_id in &message.block_ids {
            if let Some(block) = self.blocks.get_mut(block_id) {
                if block.status == ContentStatus::Streaming || block.status == ContentStatus::Pending
                {
                    block.status = ContentStatus::Error;
                }
            }
        }
        self.revision += 1;
    }

    /// Clear a failed message's inline error banner. The terminal status and
    /// the preserved partial content stay.
    pub fn dismiss_error(&mut self, message_id: &MessageId) {
        if let Some(message) = self.messages.get_mut(message_id) {
            if message.error.take().is_some() {
                self.revision += 1;
            }
        }
    }

    /// Remove a message by identity, dropping its blocks and bookkeeping
    /// immediately. Returns `false` when the id is unknown (e.g. a stale
    /// position after an earlier deletion).
    pub fn remove_message(&mut self, message_id: &MessageId) -> bool {
        // shift_remove preserves creation order for the survivors.
        let Some(message) = self.messages.shift_remove(message_id) else {
            return false;
        };
        for block_id in &message.block_ids {
            self.blocks.remove(block_id);
            self.load_failures.remove(block_id);
        }
        self.revision += 1;
        true
    }

    /// Block ids referenced by resident messages but not themselves resident.
    pub fn missing_block_ids(&self) -> Vec<BlockId> {
        self.messages
            .values()
            .flat_map(|m| m.block_ids.iter())
            .filter(|id| !self.blocks.contains_key(*id))
            .cloned()
            .collect()
    }

    /// Whether a block's last hydration attempt failed.
    pub fn block_load_failed(&self, block_id: &BlockId) -> bool {
        self.load_failures.contains(block_id)
    }

    /// Fetch missing blocks from persistence. Failures are recorded and
    /// retried opportunistically on the next pass; they never block sibling
    /// blocks or other messages.
    pub async fn hydrate_missing(&mut self, source: &dyn BlockStore) {
        for block_id in self.missing_block_ids() {
            match source.get_block(&block_id).await {
                Ok(Some(block)) => {
                    self.load_failures.remove(&block_id);
                    self.blocks.insert(block_id, block);
                    self.revision += 1;
                }
                Ok(None) => {
                    debug!(target: "core.store", %block_id, "block not in persistence yet");
                }
                Err(err) => {
                    warn!(target: "core.store", %block_id, "block load failed: {err}");
                    if self.load_failures.insert(block_id) {
                        self.revision += 1;
                    }
                }
            }
        }
    }
}
