//! User model with exchange and fiscal credentials

use serde::{Deserialize, Serialize};

use crate::model::order::ExchangeType;

/// API key pair for one exchange
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeCredentials {
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
}

impl ExchangeCredentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            api_secret: Some(api_secret.into()),
        }
    }

    /// Both parts, if each is at least `min_len` characters long
    pub fn usable(&self, min_len: usize) -> Option<(&str, &str)> {
        let key = self.api_key.as_deref().map(str::trim)?;
        let secret = self.api_secret.as_deref().map(str::trim)?;
        if key.chars().count() < min_len || secret.chars().count() < min_len {
            return None;
        }
        Some((key, secret))
    }

    /// Whether any key material is present at all
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
            && self.api_secret.as_deref().is_some_and(|s| !s.trim().is_empty())
    }
}

/// Online-cashbox settings as stored; validation happens when a receipt is built
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalCredentials {
    /// Provider login
    pub login: Option<String>,
    /// Provider password
    pub password: Option<String>,
    /// Cashbox group id (`group_code`)
    pub group_code: Option<String>,
    /// Taxpayer identification number
    pub inn: Option<String>,
    /// Free-text tax regime as entered by the user
    pub tax_type: Option<String>,
    /// Registered place of settlement
    pub payment_address: Option<String>,
}

/// Back-office user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub login: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email: Option<String>,
    pub is_admin: bool,
    pub bybit: ExchangeCredentials,
    pub htx: ExchangeCredentials,
    pub mexc: ExchangeCredentials,
    pub fiscal: FiscalCredentials,
}

impl User {
    /// Credentials for the given exchange
    pub fn credentials_for(&self, exchange: ExchangeType) -> &ExchangeCredentials {
        match exchange {
            ExchangeType::Bybit => &self.bybit,
            ExchangeType::Htx => &self.htx,
            ExchangeType::Mexc => &self.mexc,
        }
    }

    /// Apply a partial profile update
    pub fn apply_update(&mut self, update: UserProfileUpdate) {
        fn set(target: &mut Option<String>, value: Option<String>) {
            if let Some(v) = value {
                let v = v.trim().to_string();
                *target = if v.is_empty() { None } else { Some(v) };
            }
        }

        set(&mut self.email, update.email);
        set(&mut self.fiscal.inn, update.inn);
        set(&mut self.fiscal.group_code, update.kkt_id);
        set(&mut self.fiscal.payment_address, update.payment_address);
        set(&mut self.fiscal.tax_type, update.tax_type);
        set(&mut self.fiscal.login, update.evotor_login);
        set(&mut self.fiscal.password, update.evotor_password);
        set(&mut self.bybit.api_key, update.bybit_api_key);
        set(&mut self.bybit.api_secret, update.bybit_api_secret);
        set(&mut self.htx.api_key, update.htx_access_key);
        set(&mut self.htx.api_secret, update.htx_private_key);
        set(&mut self.mexc.api_key, update.mexc_api_key);
        set(&mut self.mexc.api_secret, update.mexc_api_secret);
    }
}

/// New user registration
#[derive(Debug, Clone)]
pub struct NewUser {
    pub login: String,
    pub password_hash: String,
    pub email: Option<String>,
    pub is_admin: bool,
    pub bybit: ExchangeCredentials,
}

/// Partial profile update; `Some("")` clears a field
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfileUpdate {
    pub email: Option<String>,
    pub inn: Option<String>,
    pub kkt_id: Option<String>,
    pub payment_address: Option<String>,
    pub tax_type: Option<String>,
    pub evotor_login: Option<String>,
    pub evotor_password: Option<String>,
    pub bybit_api_key: Option<String>,
    pub bybit_api_secret: Option<String>,
    pub htx_access_key: Option<String>,
    pub htx_private_key: Option<String>,
    pub mexc_api_key: Option<String>,
    pub mexc_api_secret: Option<String>,
}

/// Admin edit of a user: profile fields plus role and password
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserUpdate {
    pub is_admin: Option<bool>,
    /// New password; blank keeps the current one
    pub password: Option<String>,
    #[serde(flatten)]
    pub profile: UserProfileUpdate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_credentials_are_not_usable() {
        assert!(ExchangeCredentials::new("abcd", "secret-1").usable(5).is_none());
        assert!(ExchangeCredentials::default().usable(5).is_none());
        assert_eq!(
            ExchangeCredentials::new("key-12345", " secret-1 ").usable(5),
            Some(("key-12345", "secret-1"))
        );
    }

    #[test]
    fn test_apply_update_sets_and_clears() {
        let mut user = User {
            id: 1,
            login: "trader".to_string(),
            password_hash: String::new(),
            email: Some("old@example.com".to_string()),
            is_admin: false,
            bybit: ExchangeCredentials::default(),
            htx: ExchangeCredentials::default(),
            mexc: ExchangeCredentials::default(),
            fiscal: FiscalCredentials::default(),
        };

        user.apply_update(UserProfileUpdate {
            email: Some(String::new()),
            kkt_id: Some("group-1".to_string()),
            bybit_api_key: Some("key".to_string()),
            ..Default::default()
        });

        assert!(user.email.is_none());
        assert_eq!(user.fiscal.group_code.as_deref(), Some("group-1"));
        assert_eq!(user.bybit.api_key.as_deref(), Some("key"));
        assert!(user.fiscal.inn.is_none());
    }
}
