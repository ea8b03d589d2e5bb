//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! Every exchange is one command envelope followed by one response envelope.
//!
//! ### Command Codes
//! - 1x control: 10 EXIT, 11 ECHO, 12 PING
//! - 2x queue:   20 ENQUEUE, 21 QUEUE_POP, 22 QUEUE_SIZE, 23 QUEUE_FLUSH
//! - 3x files:   30 OPEN_FILE, 31 CLOSE_FILE, 32 WRITE_TO_DISK,
//!               33 SAVE_QUEUE, 34 LOAD_QUEUE
//! - 4x vars:    40 GET_VAR, 41 SET_VAR, 42 SAVE_VARS, 43 LOAD_VARS
//!
//! ### Status Codes
//! - 10: OK
//! - 11: NOT_OK
//! - 20: QUEUE_EMPTY

mod command;
mod response;
mod codec;

pub use command::{Command, CommandType, FileMode};
pub use response::{Response, Status};
pub use codec::{
    decode_command, decode_response, encode_command, encode_response, read_command,
    read_response, write_command, write_response, HEADER_SIZE, MAX_PAYLOAD_SIZE,
};
