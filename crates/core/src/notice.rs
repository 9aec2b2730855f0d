//! User-visible notices raised by cart and checkout actions.

use serde::{Deserialize, Serialize};

/// Visual treatment of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    #[default]
    Success,
    Error,
}

/// A short message shown to the shopper after an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub message: String,
    pub kind: NoticeKind,
}

impl Notice {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: NoticeKind::Success,
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: NoticeKind::Error,
        }
    }

    /// Build an error notice from any error's display text.
    #[must_use]
    pub fn from_error(err: &impl std::error::Error) -> Self {
        Self::error(err.to_string())
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.kind == NoticeKind::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::CartError;
    use crate::checkout::EmptyCartError;

    #[test]
    fn test_error_notices_use_error_text() {
        let notice = Notice::from_error(&CartError::MissingSize);
        assert_eq!(notice.message, "Please select a size");
        assert!(notice.is_error());
        assert_eq!(Notice::from_error(&EmptyCartError).message, "Your cart is empty");
    }
}
