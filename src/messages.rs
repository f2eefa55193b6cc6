//! Localized Messages Module
//!
//! Fallback texts used when the backend does not supply a message of its own.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

// == Locale ==
/// UI language used for fallback messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Ar,
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Locale::En),
            "ar" => Ok(Locale::Ar),
            other => Err(format!("Unsupported locale: {}", other)),
        }
    }
}

// == Message Ids ==
/// Generic messages the gateway can produce on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    Unauthorized,
    SessionExpired,
    NetworkFailure,
    UnexpectedResponse,
    RequestFailed,
    ValidationFailed,
    UnknownOperation,
}

impl Locale {
    /// Returns the text for `message` in this locale.
    pub fn text(self, message: Message) -> &'static str {
        match (self, message) {
            (Locale::En, Message::Unauthorized) => "You must be signed in to do this",
            (Locale::En, Message::SessionExpired) => "Your session has expired, please sign in again",
            (Locale::En, Message::NetworkFailure) => "Could not reach the server, please try again",
            (Locale::En, Message::UnexpectedResponse) => "The server returned an unexpected response",
            (Locale::En, Message::RequestFailed) => "Something went wrong",
            (Locale::En, Message::ValidationFailed) => "Please correct the highlighted fields",
            (Locale::En, Message::UnknownOperation) => "Unknown operation",
            (Locale::Ar, Message::Unauthorized) => "يجب تسجيل الدخول للقيام بهذا الإجراء",
            (Locale::Ar, Message::SessionExpired) => "انتهت صلاحية الجلسة، يرجى تسجيل الدخول مرة أخرى",
            (Locale::Ar, Message::NetworkFailure) => "تعذر الاتصال بالخادم، يرجى المحاولة مرة أخرى",
            (Locale::Ar, Message::UnexpectedResponse) => "أعاد الخادم استجابة غير متوقعة",
            (Locale::Ar, Message::RequestFailed) => "حدث خطأ ما",
            (Locale::Ar, Message::ValidationFailed) => "يرجى تصحيح الحقول المحددة",
            (Locale::Ar, Message::UnknownOperation) => "عملية غير معروفة",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locale_parse() {
        assert_eq!("en".parse::<Locale>().unwrap(), Locale::En);
        assert_eq!(" AR ".parse::<Locale>().unwrap(), Locale::Ar);
        assert!("fr".parse::<Locale>().is_err());
    }

    #[test]
    fn test_texts_differ_per_locale() {
        assert_ne!(
            Locale::En.text(Message::NetworkFailure),
            Locale::Ar.text(Message::NetworkFailure)
        );
    }
}
