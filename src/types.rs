//! Records passed across the pipeline boundary, and run options.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// One transport message; one tar entry on disk.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, with = "body_base64")]
    pub body: Vec<u8>,
    #[serde(default)]
    pub routing_key: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Delivery identifier assigned by the transport. Never written into archives.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_tag: Option<u64>,
}

impl Message {
    pub fn new(body: impl Into<Vec<u8>>, routing_key: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            routing_key: routing_key.into(),
            ..Default::default()
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_delivery_tag(mut self, tag: u64) -> Self {
        self.delivery_tag = Some(tag);
        self
    }
}

/// Which batch a [`Verify`] confirms.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BatchRef {
    /// Per-builder sequence number, starting at 1.
    pub sequence: u64,
    /// Target file inside the output directory.
    pub file: PathBuf,
    pub message_count: usize,
    /// Delivery tag of the last message in the batch, when the transport supplied tags.
    /// With `multiple` set, every delivery up to and including this tag is covered.
    pub last_delivery_tag: Option<u64>,
    pub multiple: bool,
}

/// Outcome of writing one batch. Exactly one per flushed batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Verify {
    pub success: bool,
    pub batch: BatchRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Verify {
    pub fn ok(batch: BatchRef) -> Self {
        Self {
            success: true,
            batch,
            error: None,
        }
    }

    pub fn failed(batch: BatchRef, error: impl ToString) -> Self {
        Self {
            success: false,
            batch,
            error: Some(error.to_string()),
        }
    }
}

/// What the input driver does when an archive fails to decode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop at the first failing archive; remaining queued archives are not read.
    #[default]
    FailFast,
    /// Log the failure and go on with the next archive; report an aggregate error at the end.
    Continue,
}

/// Full run options (CLI, file config, env). Library callers can build it directly.
#[derive(Clone, Debug)]
pub struct Opts {
    /// Archive file or directory of archives (input mode).
    pub input: Option<PathBuf>,
    /// Directory receiving batch files (output mode).
    pub output: Option<PathBuf>,
    /// Maximum messages per output batch.
    pub batch_size: usize,
    /// Capacity of the bounded message queue.
    pub queue_capacity: usize,
    pub policy: FailurePolicy,
    pub verbose: bool,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            input: None,
            output: None,
            batch_size: crate::utils::config::DEFAULT_BATCH_SIZE,
            queue_capacity: crate::utils::config::DEFAULT_QUEUE_CAPACITY,
            policy: FailurePolicy::default(),
            verbose: false,
        }
    }
}

impl Opts {
    pub fn validate(&self) -> crate::Result<()> {
        if self.batch_size == 0 {
            return Err(crate::BridgeError::InvalidConfig(
                "batch_size must be at least 1".into(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(crate::BridgeError::InvalidConfig(
                "queue_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

mod body_base64 {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(body: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}
