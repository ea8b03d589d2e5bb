//! Response definitions
//!
//! Represents responses to clients.

use crate::payload::Payload;

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 10,
    NotOk = 11,
    QueueEmpty = 20,
}

impl TryFrom<u8> for Status {
    type Error = u8;

    fn try_from(code: u8) -> std::result::Result<Self, Self::Error> {
        match code {
            10 => Ok(Status::Ok),
            11 => Ok(Status::NotOk),
            20 => Ok(Status::QueueEmpty),
            other => Err(other),
        }
    }
}

/// A response to send to client
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Status code
    pub status: Status,

    /// Optional body (only ever present on OK)
    pub body: Option<Payload>,
}

impl Response {
    /// Create an OK response without a body
    pub fn ok() -> Self {
        Self {
            status: Status::Ok,
            body: None,
        }
    }

    /// Create an OK response carrying a body
    pub fn ok_with(body: impl Into<Payload>) -> Self {
        Self {
            status: Status::Ok,
            body: Some(body.into()),
        }
    }

    /// Create a NOTOK response
    pub fn not_ok() -> Self {
        Self {
            status: Status::NotOk,
            body: None,
        }
    }

    /// Create a QUEUE_EMPTY response
    pub fn queue_empty() -> Self {
        Self {
            status: Status::QueueEmpty,
            body: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    /// The body of an OK response, or `true` when it has none; `None` otherwise
    pub fn parse_body(self) -> Option<Payload> {
        match self.status {
            Status::Ok => Some(self.body.unwrap_or(Payload::Bool(true))),
            Status::NotOk | Status::QueueEmpty => None,
        }
    }
}
