//! Direct messages between users, optionally tagged to a placement.
//!
//! Messages are independent of the workflow: no status transition ever
//! requires one, and sending one never changes a status.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::accounts::{Actor, DirectoryError, UserId, UserRepository};

use super::domain::PlacementId;
use super::repository::RepositoryError;

/// Identifier wrapper for messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// A directed message. `is_read` moves false -> true only, and only the
/// recipient can move it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender: UserId,
    pub recipient: UserId,
    pub subject: String,
    pub content: String,
    pub placement_request: Option<PlacementId>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageSubmission {
    pub recipient: UserId,
    pub subject: String,
    pub content: String,
    #[serde(default)]
    pub placement_request: Option<PlacementId>,
}

/// Storage abstraction for messages.
pub trait MessageRepository: Send + Sync {
    fn insert(&self, record: Message) -> Result<Message, RepositoryError>;
    fn fetch(&self, id: &MessageId) -> Result<Option<Message>, RepositoryError>;
    /// Set `is_read = true`; applying it twice is a no-op.
    fn mark_read(&self, id: &MessageId) -> Result<Message, RepositoryError>;
    fn delete(&self, id: &MessageId) -> Result<(), RepositoryError>;
    fn for_recipient(&self, user: &UserId) -> Result<Vec<Message>, RepositoryError>;
    fn for_sender(&self, user: &UserId) -> Result<Vec<Message>, RepositoryError>;
}

static MESSAGE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_message_id() -> MessageId {
    let id = MESSAGE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    MessageId(format!("msg-{id:06}"))
}

/// Error raised by the message service.
#[derive(Debug, thiserror::Error)]
pub enum MessageServiceError {
    #[error("unknown recipient account")]
    UnknownRecipient,
    #[error("you can only mark messages you received as read")]
    NotRecipient,
    #[error("you can only delete messages you sent")]
    NotSender,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// Service enforcing sender/recipient rules over the message store.
pub struct MessageService<M, D> {
    messages: Arc<M>,
    directory: Arc<D>,
}

impl<M, D> MessageService<M, D>
where
    M: MessageRepository + 'static,
    D: UserRepository + 'static,
{
    pub fn new(messages: Arc<M>, directory: Arc<D>) -> Self {
        Self {
            messages,
            directory,
        }
    }

    pub fn send(
        &self,
        actor: &Actor,
        submission: MessageSubmission,
    ) -> Result<Message, MessageServiceError> {
        let recipient = self
            .directory
            .fetch(&submission.recipient)?
            .filter(|record| record.user.is_active)
            .ok_or(MessageServiceError::UnknownRecipient)?;

        let record = Message {
            id: next_message_id(),
            sender: actor.user_id.clone(),
            recipient: recipient.user.id,
            subject: submission.subject,
            content: submission.content,
            placement_request: submission.placement_request,
            is_read: false,
            created_at: Utc::now(),
        };
        let stored = self.messages.insert(record)?;
        info!(
            from = %stored.sender.0,
            to = %stored.recipient.0,
            "message sent"
        );
        Ok(stored)
    }

    pub fn inbox(&self, actor: &Actor) -> Result<Vec<Message>, MessageServiceError> {
        let mut messages = self.messages.for_recipient(&actor.user_id)?;
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(messages)
    }

    pub fn sent(&self, actor: &Actor) -> Result<Vec<Message>, MessageServiceError> {
        let mut messages = self.messages.for_sender(&actor.user_id)?;
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(messages)
    }

    pub fn unread_count(&self, actor: &Actor) -> Result<usize, MessageServiceError> {
        Ok(self
            .inbox(actor)?
            .iter()
            .filter(|message| !message.is_read)
            .count())
    }

    pub fn mark_read(
        &self,
        actor: &Actor,
        id: &MessageId,
    ) -> Result<Message, MessageServiceError> {
        let message = self
            .messages
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        if message.recipient != actor.user_id {
            return Err(MessageServiceError::NotRecipient);
        }
        Ok(self.messages.mark_read(id)?)
    }

    pub fn mark_all_read(&self, actor: &Actor) -> Result<usize, MessageServiceError> {
        let unread: Vec<MessageId> = self
            .inbox(actor)?
            .into_iter()
            .filter(|message| !message.is_read)
            .map(|message| message.id)
            .collect();
        for id in &unread {
            self.messages.mark_read(id)?;
        }
        Ok(unread.len())
    }

    pub fn delete(&self, actor: &Actor, id: &MessageId) -> Result<(), MessageServiceError> {
        let message = self
            .messages
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        if message.sender != actor.user_id {
            return Err(MessageServiceError::NotSender);
        }
        Ok(self.messages.delete(id)?)
    }
}
