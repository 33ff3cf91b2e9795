/*!
 * # Message Queue Implementation
 *
 * Job queue between the event processor and the notification worker.
 * Delivered messages stay in flight until they are acked or nacked; a nacked
 * message goes back to the tail of its topic with `retry_count + 1` until it
 * has used up `max_retries`, after which it moves to the dead-letter list.
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

const DEFAULT_MAX_SIZE: usize = 1000;
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Message queue errors
#[derive(Error, Debug)]
pub enum MessageQueueError {
    #[error("Queue is full")]
    QueueFull,
    #[error("Unknown message: {0}")]
    UnknownMessage(Uuid),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Queue state poisoned")]
    Poisoned,
}

impl From<MessageQueueError> for crate::errors::ServiceError {
    fn from(err: MessageQueueError) -> Self {
        crate::errors::ServiceError::QueueError(err.to_string())
    }
}

/// Message envelope for queue items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub topic: String,
    pub payload: serde_json::Value,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub retry_count: u32,
    pub max_retries: u32,
}

impl Message {
    pub fn new(topic: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            topic: topic.into(),
            payload,
            timestamp: chrono::Utc::now(),
            retry_count: 0,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn retries_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }
}

/// Message queue trait for different implementations
#[async_trait]
pub trait MessageQueue: Send + Sync {
    async fn publish(&self, message: Message) -> Result<(), MessageQueueError>;
    /// Takes the next message of `topic`, if any, and holds it in flight.
    async fn subscribe(&self, topic: &str) -> Result<Option<Message>, MessageQueueError>;
    async fn ack(&self, message_id: &Uuid) -> Result<(), MessageQueueError>;
    async fn nack(&self, message_id: &Uuid) -> Result<(), MessageQueueError>;
    async fn dead_letters(&self) -> Result<Vec<Message>, MessageQueueError>;
}

#[derive(Debug, Default)]
struct QueueState {
    topics: HashMap<String, VecDeque<Message>>,
    in_flight: HashMap<Uuid, Message>,
    dead_letters: Vec<Message>,
}

/// In-memory message queue implementation
#[derive(Debug, Clone)]
pub struct InMemoryMessageQueue {
    state: Arc<Mutex<QueueState>>,
    max_size: usize,
}

impl Default for InMemoryMessageQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMessageQueue {
    pub fn new() -> Self {
        Self::with_max_size(DEFAULT_MAX_SIZE)
    }

    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState::default())),
            max_size,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, QueueState>, MessageQueueError> {
        self.state.lock().map_err(|_| MessageQueueError::Poisoned)
    }

    /// Number of queued (not in-flight) messages on `topic`.
    pub fn pending(&self, topic: &str) -> usize {
        self.lock()
            .map(|state| state.topics.get(topic).map_or(0, VecDeque::len))
            .unwrap_or(0)
    }
}

#[async_trait]
impl MessageQueue for InMemoryMessageQueue {
    async fn publish(&self, message: Message) -> Result<(), MessageQueueError> {
        let mut state = self.lock()?;
        let queue = state.topics.entry(message.topic.clone()).or_default();

        if queue.len() >= self.max_size {
            return Err(MessageQueueError::QueueFull);
        }

        debug!(message_id = %message.id, topic = %message.topic, "Message published");
        queue.push_back(message);
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<Option<Message>, MessageQueueError> {
        let mut state = self.lock()?;
        let next = state.topics.get_mut(topic).and_then(VecDeque::pop_front);
        if let Some(message) = &next {
            state.in_flight.insert(message.id, message.clone());
        }
        Ok(next)
    }

    async fn ack(&self, message_id: &Uuid) -> Result<(), MessageQueueError> {
        let mut state = self.lock()?;
        state
            .in_flight
            .remove(message_id)
            .map(|_| ())
            .ok_or(MessageQueueError::UnknownMessage(*message_id))
    }

    async fn nack(&self, message_id: &Uuid) -> Result<(), MessageQueueError> {
        let mut state = self.lock()?;
        let mut message = state
            .in_flight
            .remove(message_id)
            .ok_or(MessageQueueError::UnknownMessage(*message_id))?;

        if message.retries_exhausted() {
            warn!(
                message_id = %message.id,
                topic = %message.topic,
                retries = message.retry_count,
                "Message exhausted its retries; moved to dead letters"
            );
            state.dead_letters.push(message);
            return Ok(());
        }

        message.retry_count += 1;
        debug!(message_id = %message.id, retry = message.retry_count, "Message requeued");
        // Requeue ignores max_size.
        state
            .topics
            .entry(message.topic.clone())
            .or_default()
            .push_back(message);
        Ok(())
    }

    async fn dead_letters(&self) -> Result<Vec<Message>, MessageQueueError> {
        Ok(self.lock()?.dead_letters.clone())
    }
}
