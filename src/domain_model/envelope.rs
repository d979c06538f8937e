use serde::{Deserialize, Serialize};

pub const SUCCESS_CODE: u16 = 200;

/// Body wrapper used by every backend endpoint: `{ code, data, message }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub code: u16,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Envelope {
            code: SUCCESS_CODE,
            data: Some(data),
            message: None,
        }
    }

    pub fn err(code: u16, message: impl Into<String>) -> Self {
        Envelope {
            code,
            data: None,
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }
}
