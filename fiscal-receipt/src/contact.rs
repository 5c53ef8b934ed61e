//! Buyer contact normalization

use serde::Serialize;

/// Contact used when the request carries none
pub const DEFAULT_CONTACT: &str = "client@example.com";

/// `receipt.client`: exactly one of the two is set, the other is `null`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceiptClient {
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Turn user input into an email or an E.164-ish phone number
pub fn normalize_contact(raw: Option<&str>) -> ReceiptClient {
    let contact = raw.map(str::trim).filter(|c| !c.is_empty()).unwrap_or(DEFAULT_CONTACT);

    if contact.contains('@') {
        return ReceiptClient {
            email: Some(contact.to_string()),
            phone: None,
        };
    }

    let digits: String = contact.chars().filter(char::is_ascii_digit).collect();
    let phone = if digits.len() == 11 && digits.starts_with('8') {
        format!("+7{}", &digits[1..])
    } else {
        format!("+{}", digits)
    };

    ReceiptClient {
        email: None,
        phone: Some(phone),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_russian_trunk_prefix() {
        assert_eq!(normalize_contact(Some("89991234567")).phone.as_deref(), Some("+79991234567"));
        assert_eq!(normalize_contact(Some("8 (999) 123-45-67")).phone.as_deref(), Some("+79991234567"));
    }

    #[test]
    fn test_other_numbers_get_plus() {
        assert_eq!(normalize_contact(Some("+7 999 123 45 67")).phone.as_deref(), Some("+79991234567"));
        assert_eq!(normalize_contact(Some("380501234567")).phone.as_deref(), Some("+380501234567"));
    }

    #[test]
    fn test_email_and_default() {
        let client = normalize_contact(Some("client@x.com"));
        assert_eq!(client.email.as_deref(), Some("client@x.com"));
        assert!(client.phone.is_none());

        assert_eq!(normalize_contact(None).email.as_deref(), Some(DEFAULT_CONTACT));
        assert_eq!(normalize_contact(Some("   ")).email.as_deref(), Some(DEFAULT_CONTACT));
    }
}
