use std::fmt::Display;

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::{Map, Value};

const KEY_ERROR_MESSAGES: &str = "errorMessages";

/// One entry of an error's `details` array.
///
/// The server reports batch command failures as `{"<command>": {...item},
/// "errorMessages": [...]}` and everything else as bare strings.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorDetail {
    Structured {
        command: String,
        item: Map<String, Value>,
        messages: Vec<String>,
    },
    Plain(String),
}

impl ErrorDetail {
    /// The command item that caused the failure, when known.
    pub fn item(&self) -> Option<&Map<String, Value>> {
        match self {
            ErrorDetail::Structured { item, .. } => Some(item),
            ErrorDetail::Plain(_) => None,
        }
    }

    pub fn command(&self) -> Option<&str> {
        match self {
            ErrorDetail::Structured { command, .. } => Some(command.as_str()),
            ErrorDetail::Plain(_) => None,
        }
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::String(text) => Ok(ErrorDetail::Plain(text)),
            Value::Object(object) => Self::from_object(object),
            other => Err(format!("unexpected error detail: {}", other)),
        }
    }

    fn from_object(object: Map<String, Value>) -> Result<Self, String> {
        if object.len() != 2 || !object.contains_key(KEY_ERROR_MESSAGES) {
            return Err(format!(
                "malformed error detail, expected a command and {}: {:?}",
                KEY_ERROR_MESSAGES,
                object.keys().collect::<Vec<_>>()
            ));
        }

        let mut command = String::new();
        let mut item = Map::new();
        let mut messages = Vec::new();
        for (key, value) in object {
            if key == KEY_ERROR_MESSAGES {
                if let Value::Array(values) = value {
                    messages = values
                        .into_iter()
                        .filter_map(|v| match v {
                            Value::String(s) => Some(s),
                            _ => None,
                        })
                        .collect();
                }
                continue;
            }
            command = key;
            if let Value::Object(object) = value {
                item = object;
            }
        }

        Ok(ErrorDetail::Structured {
            command,
            item,
            messages,
        })
    }
}

/// Structured details render as `command: [message, message]`. Messages are
/// comma-separated since they are sentences with spaces of their own.
impl Display for ErrorDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorDetail::Structured {
                command, messages, ..
            } => write!(f, "{}: [{}]", command, messages.join(", ")),
            ErrorDetail::Plain(text) => f.write_str(text),
        }
    }
}

impl<'de> Deserialize<'de> for ErrorDetail {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        ErrorDetail::from_value(value).map_err(de::Error::custom)
    }
}

/// The `error` object of a failed response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseError {
    pub code: i64,
    pub message: String,
    pub meta: Vec<String>,
    pub details: Vec<ErrorDetail>,
}

impl ResponseError {
    /// Detail items of structured failures, in order.
    pub fn items(&self) -> impl Iterator<Item = &Map<String, Value>> {
        self.details.iter().filter_map(ErrorDetail::item)
    }
}

impl Display for ResponseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.details.is_empty() {
            return f.write_str(&self.message);
        }
        let details = self
            .details
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{}: {{{}}}", self.message, details)
    }
}

impl std::error::Error for ResponseError {}

impl<'de> Deserialize<'de> for ResponseError {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawResponseError {
            #[serde(default)]
            code: Option<Value>,
            #[serde(default)]
            msg: Option<String>,
            #[serde(default)]
            metadata: Vec<Value>,
            #[serde(default)]
            details: Vec<ErrorDetail>,
        }

        let raw = RawResponseError::deserialize(deserializer)?;
        // The code is sometimes emitted as a float.
        let code = match raw.code {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .unwrap_or_default(),
            _ => 0,
        };

        Ok(ResponseError {
            code,
            message: raw.msg.unwrap_or_default(),
            meta: raw
                .metadata
                .into_iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
            details: raw.details,
        })
    }
}
