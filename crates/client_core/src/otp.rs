use thiserror::Error;

pub const OTP_LENGTH: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OtpValidationError {
    #[error("Your verification code must be 6 characters.")]
    TooShort { len: usize },
}

/// A verification code that passed the length check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpCode(String);

impl OtpCode {
    pub fn parse(raw: &str) -> Result<Self, OtpValidationError> {
        let len = raw.chars().count();
        if len < OTP_LENGTH {
            return Err(OtpValidationError::TooShort { len });
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Six single-character slots backing the code entry field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OtpInput {
    value: String,
}

impl OtpInput {
    /// Replaces the value, dropping anything past the sixth character.
    pub fn set(&mut self, raw: &str) {
        self.value = raw
            .chars()
            .filter(|ch| !ch.is_whitespace())
            .take(OTP_LENGTH)
            .collect();
    }

    pub fn push(&mut self, ch: char) -> bool {
        if ch.is_whitespace() || self.is_full() {
            return false;
        }
        self.value.push(ch);
        true
    }

    pub fn backspace(&mut self) -> Option<char> {
        self.value.pop()
    }

    pub fn clear(&mut self) {
        self.value.clear();
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_full(&self) -> bool {
        self.value.chars().count() >= OTP_LENGTH
    }

    pub fn slots(&self) -> [Option<char>; OTP_LENGTH] {
        let mut slots = [None; OTP_LENGTH];
        for (slot, ch) in slots.iter_mut().zip(self.value.chars()) {
            *slot = Some(ch);
        }
        slots
    }
}
