use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Peer behaviour observed and classified by the network layer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    InvalidBlock,
    ValidBlock,
    InvalidTransaction,
    ValidTransaction,
    FailedHandshake,
    SuccessfulHandshake,
    InvalidNetwork,
    IncompatibleProtocol,
    UnexpectedMessage,
    InvalidHeader,
    InvalidMessage,
    RepeatedMessage,
    TimeoutMessage,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EventImpact {
    Positive,
    Negative,
    Neutral,
}

impl EventType {
    pub const COUNT: usize = 13;

    pub const ALL: [EventType; EventType::COUNT] = [
        EventType::InvalidBlock,
        EventType::ValidBlock,
        EventType::InvalidTransaction,
        EventType::ValidTransaction,
        EventType::FailedHandshake,
        EventType::SuccessfulHandshake,
        EventType::InvalidNetwork,
        EventType::IncompatibleProtocol,
        EventType::UnexpectedMessage,
        EventType::InvalidHeader,
        EventType::InvalidMessage,
        EventType::RepeatedMessage,
        EventType::TimeoutMessage,
    ];

    /// Position of this event in [`EventType::ALL`], used for counter arrays.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn impact(self) -> EventImpact {
        match self {
            EventType::ValidBlock
            | EventType::ValidTransaction
            | EventType::SuccessfulHandshake => EventImpact::Positive,
            EventType::InvalidBlock
            | EventType::InvalidTransaction
            | EventType::InvalidNetwork
            | EventType::IncompatibleProtocol
            | EventType::InvalidHeader
            | EventType::InvalidMessage => EventImpact::Negative,
            EventType::FailedHandshake
            | EventType::UnexpectedMessage
            | EventType::RepeatedMessage
            | EventType::TimeoutMessage => EventImpact::Neutral,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventType::InvalidBlock => "invalid_block",
            EventType::ValidBlock => "valid_block",
            EventType::InvalidTransaction => "invalid_transaction",
            EventType::ValidTransaction => "valid_transaction",
            EventType::FailedHandshake => "failed_handshake",
            EventType::SuccessfulHandshake => "successful_handshake",
            EventType::InvalidNetwork => "invalid_network",
            EventType::IncompatibleProtocol => "incompatible_protocol",
            EventType::UnexpectedMessage => "unexpected_message",
            EventType::InvalidHeader => "invalid_header",
            EventType::InvalidMessage => "invalid_message",
            EventType::RepeatedMessage => "repeated_message",
            EventType::TimeoutMessage => "timeout_message",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .iter()
            .copied()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| format!("unknown event type {:?}", s))
    }
}
