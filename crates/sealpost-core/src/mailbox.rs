//! Group directory and pending-message mailbox.
//!
//! Both are owned service objects injected into connection handlers; no
//! global state. The directory is the static membership input (read-only to
//! the engine); the mailbox holds per-recipient FIFO queues of undelivered
//! messages. Separating them is what lets the engine distinguish "the group
//! does not exist" from "the group holds nothing for you".

use std::collections::{HashMap, HashSet, VecDeque};

/// Static group membership: group identifier → member ids.
///
/// Supplied externally at startup. The core never mutates it; adding or
/// removing members is outside this protocol.
#[derive(Debug, Clone, Default)]
pub struct GroupDirectory {
    groups: HashMap<String, HashSet<String>>,
}

impl GroupDirectory {
    /// Build a directory from `(group, members)` pairs.
    pub fn new<G, M, S>(groups: G) -> Self
    where
        G: IntoIterator<Item = (S, M)>,
        M: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let groups = groups
            .into_iter()
            .map(|(group, members)| {
                (group.into(), members.into_iter().map(Into::into).collect())
            })
            .collect();
        Self { groups }
    }

    /// Whether the group exists.
    pub fn contains_group(&self, group: &str) -> bool {
        self.groups.contains_key(group)
    }

    /// Whether `client` belongs to `group`.
    pub fn is_member(&self, group: &str, client: &str) -> bool {
        self.groups.get(group).is_some_and(|members| members.contains(client))
    }

    /// Members of a group, if it exists.
    pub fn members(&self, group: &str) -> Option<&HashSet<String>> {
        self.groups.get(group)
    }
}

/// A message queued for one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMessage {
    /// Group the message was published into
    pub group: String,
    /// Publishing client
    pub sender: String,
    /// Message text
    pub text: String,
}

/// Per-recipient FIFO queues of undelivered messages.
///
/// A queue grows without bound if its recipient never drains it, a known
/// resource-accounting gap of the protocol. [`queue_depth`] exists so a
/// deployment can watch for it.
///
/// [`queue_depth`]: Self::queue_depth
#[derive(Debug, Default)]
pub struct GroupMailbox {
    queues: HashMap<String, VecDeque<PendingMessage>>,
}

impl GroupMailbox {
    /// Create an empty mailbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message to a recipient's queue.
    pub fn enqueue(&mut self, recipient: &str, message: PendingMessage) {
        let queue = self.queues.entry(recipient.to_string()).or_default();
        queue.push_back(message);
        tracing::debug!(recipient, depth = queue.len(), "message queued");
    }

    /// Remove and return the oldest queued message for `recipient` whose
    /// group matches, preserving FIFO order within that group.
    ///
    /// Returns `None` when the queue holds nothing for that group. Whether
    /// the group exists at all is the directory's question, not the
    /// mailbox's.
    pub fn dequeue_matching(&mut self, recipient: &str, group: &str) -> Option<PendingMessage> {
        let queue = self.queues.get_mut(recipient)?;
        let position = queue.iter().position(|message| message.group == group)?;
        queue.remove(position)
    }

    /// Distinct groups with at least one queued message for `recipient`,
    /// in oldest-message-first order.
    pub fn pending_groups(&self, recipient: &str) -> Vec<String> {
        let mut groups = Vec::new();
        if let Some(queue) = self.queues.get(recipient) {
            for message in queue {
                if !groups.contains(&message.group) {
                    groups.push(message.group.clone());
                }
            }
        }
        groups
    }

    /// Number of messages currently queued for `recipient`.
    pub fn queue_depth(&self, recipient: &str) -> usize {
        self.queues.get(recipient).map_or(0, VecDeque::len)
    }
}
