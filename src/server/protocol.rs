// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Query protocol
//!
//! One ASCII command per line in, one response out:
//!
//! ```text
//! STATUS <code> <word>\n
//! <pretty-printed JSON document>\n
//! ```
//!
//! | Command | Document |
//! |---------|----------|
//! | `GET CURRENT` | status, state, generation id, timestamps, `a0` and `a2` |
//! | `GET STATIC` | generation id, last A0h read, `a0` |
//! | `GET DYNAMIC` | last A2h read, `a2` |
//! | `GET STATE` | state, generation id, timestamps |
//! | `PING` | daemon uptime in seconds |
//!
//! Every document is built from one [`StateStore::snapshot`].

use chrono::{DateTime, Utc};
use log::{debug, error};
use serde::Serialize;

use crate::decoder::{DynamicInfo, StaticInfo};
use crate::state::{DeviceState, SharedRecord, StateStore};

const SERIALIZATION_ERROR_BODY: &str =
    "{\n  \"status\": \"error\",\n  \"message\": \"Failed to serialize response\"\n}";

/// A parsed client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    GetCurrent,
    GetStatic,
    GetDynamic,
    GetState,
    Ping,
    Unknown(String),
}

impl Command {
    /// Parse one request line, ignoring surrounding whitespace and line endings
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "GET CURRENT" => Command::GetCurrent,
            "GET STATIC" => Command::GetStatic,
            "GET DYNAMIC" => Command::GetDynamic,
            "GET STATE" => Command::GetState,
            "PING" => Command::Ping,
            other => Command::Unknown(other.to_string()),
        }
    }
}

/// Response status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok,
    BadRequest,
    Error,
}

impl StatusCode {
    pub fn code(self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::Error => 500,
        }
    }

    pub fn word(self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "BAD_REQUEST",
            StatusCode::Error => "ERROR",
        }
    }
}

/// A complete response ready to be written to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: StatusCode,
    pub body: String,
}

impl Response {
    fn from_document<T: Serialize>(document: &T) -> Self {
        match serde_json::to_string_pretty(document) {
            Ok(body) => Response {
                status: StatusCode::Ok,
                body,
            },
            Err(e) => {
                error!("Failed to serialize response: {}", e);
                Response {
                    status: StatusCode::Error,
                    body: SERIALIZATION_ERROR_BODY.to_string(),
                }
            }
        }
    }

    /// Wire representation: status line, document, trailing newline
    pub fn to_wire(&self) -> String {
        format!(
            "STATUS {} {}\n{}\n",
            self.status.code(),
            self.status.word(),
            self.body
        )
    }
}

#[derive(Serialize)]
struct Timestamps {
    #[serde(with = "chrono::serde::ts_seconds_option")]
    first_detected: Option<DateTime<Utc>>,
    #[serde(with = "chrono::serde::ts_seconds_option")]
    last_a0_read: Option<DateTime<Utc>>,
    #[serde(with = "chrono::serde::ts_seconds_option")]
    last_a2_read: Option<DateTime<Utc>>,
}

impl Timestamps {
    fn of(record: &SharedRecord) -> Self {
        Self {
            first_detected: record.first_detected,
            last_a0_read: record.last_static_read,
            last_a2_read: record.last_dynamic_read,
        }
    }
}

/// `{"valid": bool, ...fields}`, fields only when valid
#[derive(Serialize)]
struct Page<'a, T: Serialize> {
    valid: bool,
    #[serde(flatten)]
    data: Option<&'a T>,
}

impl<'a, T: Serialize> Page<'a, T> {
    fn new(valid: bool, data: &'a T) -> Self {
        Self {
            valid,
            data: valid.then_some(data),
        }
    }
}

#[derive(Serialize)]
struct CurrentDocument<'a> {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    state: DeviceState,
    generation_id: u64,
    timestamps: Timestamps,
    a0: Page<'a, StaticInfo>,
    a2: Page<'a, DynamicInfo>,
}

#[derive(Serialize)]
struct StaticDocument<'a> {
    generation_id: u64,
    #[serde(with = "chrono::serde::ts_seconds_option")]
    last_a0_read: Option<DateTime<Utc>>,
    a0: Page<'a, StaticInfo>,
}

#[derive(Serialize)]
struct DynamicDocument<'a> {
    #[serde(with = "chrono::serde::ts_seconds_option")]
    last_a2_read: Option<DateTime<Utc>>,
    a2: Page<'a, DynamicInfo>,
}

#[derive(Serialize)]
struct StateDocument {
    state: DeviceState,
    generation_id: u64,
    timestamps: Timestamps,
}

#[derive(Serialize)]
struct PingDocument {
    status: &'static str,
    uptime: i64,
}

#[derive(Serialize)]
struct ErrorDocument<'a> {
    status: &'static str,
    message: &'a str,
}

/// Build the response to `command` from a fresh snapshot of `store`.
pub fn handle_command(command: &Command, store: &StateStore) -> Response {
    match command {
        Command::GetCurrent => current_document(&store.snapshot()),
        Command::GetStatic => {
            let record = store.snapshot();
            Response::from_document(&StaticDocument {
                generation_id: record.generation_id,
                last_a0_read: record.last_static_read,
                a0: Page::new(record.static_valid, &record.static_record),
            })
        }
        Command::GetDynamic => {
            let record = store.snapshot();
            Response::from_document(&DynamicDocument {
                last_a2_read: record.last_dynamic_read,
                a2: Page::new(record.dynamic_valid, &record.dynamic_record),
            })
        }
        Command::GetState => {
            let record = store.snapshot();
            Response::from_document(&StateDocument {
                state: record.state,
                generation_id: record.generation_id,
                timestamps: Timestamps::of(&record),
            })
        }
        Command::Ping => Response::from_document(&PingDocument {
            status: "ok",
            uptime: store.uptime_secs(),
        }),
        Command::Unknown(line) => {
            debug!("Unknown command: {:?}", line);
            let mut response = Response::from_document(&ErrorDocument {
                status: "error",
                message: "Invalid command",
            });
            if response.status == StatusCode::Ok {
                response.status = StatusCode::BadRequest;
            }
            response
        }
    }
}

fn current_document(record: &SharedRecord) -> Response {
    let (status, message) = match record.state {
        DeviceState::Absent => ("not_found", Some("SFP not detected on I²C bus")),
        DeviceState::Error => ("error", Some("I²C error or recovery in progress")),
        DeviceState::Init | DeviceState::Present => ("ok", None),
    };
    Response::from_document(&CurrentDocument {
        status,
        message,
        state: record.state,
        generation_id: record.generation_id,
        timestamps: Timestamps::of(record),
        a0: Page::new(record.static_valid, &record.static_record),
        a2: Page::new(record.dynamic_valid, &record.dynamic_record),
    })
}
