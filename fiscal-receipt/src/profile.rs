//! Validated fiscal settings of a merchant

use common::model::User;
use serde::Serialize;

use crate::error::ReceiptError;

/// Taxation scheme (`sno`) of the merchant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxRegime {
    /// General regime
    #[default]
    Osn,
    /// Simplified, on income
    UsnIncome,
    /// Simplified, on income minus expenses
    UsnIncomeOutcome,
    Patent,
}

impl TaxRegime {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaxRegime::Osn => "osn",
            TaxRegime::UsnIncome => "usn_income",
            TaxRegime::UsnIncomeOutcome => "usn_income_outcome",
            TaxRegime::Patent => "patent",
        }
    }

    /// Resolve free text entered by the user; unknown text means `osn`
    pub fn from_user_text(raw: Option<&str>) -> Self {
        let normalized = raw.map(|s| s.trim().to_lowercase()).unwrap_or_default();
        match normalized.as_str() {
            "osn" | "och" | "осн" | "osno" | "осно" | "общая" => TaxRegime::Osn,
            "usn_income" | "usn доход" | "усн доход" => TaxRegime::UsnIncome,
            "usn_income_outcome" | "usn доход-расход" | "усн доход-расход" => TaxRegime::UsnIncomeOutcome,
            "patent" | "патент" => TaxRegime::Patent,
            _ => TaxRegime::Osn,
        }
    }
}

/// Everything needed to issue a receipt on behalf of a user
#[derive(Debug, Clone, PartialEq)]
pub struct FiscalProfile {
    pub login: String,
    pub password: String,
    /// Cashbox group id
    pub group_code: String,
    pub inn: String,
    pub payment_address: String,
    pub tax_regime: TaxRegime,
    pub email: Option<String>,
}

impl FiscalProfile {
    /// Validate a user's stored settings
    pub fn from_user(user: &User) -> Result<Self, ReceiptError> {
        let fiscal = &user.fiscal;
        let mut missing = Vec::new();

        let mut require = |value: &Option<String>, name: &'static str| -> String {
            match value.as_deref().map(str::trim) {
                Some(v) if !v.is_empty() => v.to_string(),
                _ => {
                    missing.push(name);
                    String::new()
                }
            }
        };

        let login = require(&fiscal.login, "login");
        let password = require(&fiscal.password, "password");
        let group_code = require(&fiscal.group_code, "group_code");
        let inn = require(&fiscal.inn, "inn");
        let payment_address = require(&fiscal.payment_address, "payment_address");

        if !missing.is_empty() {
            return Err(ReceiptError::IncompleteProfile(missing));
        }

        Ok(Self {
            login,
            password,
            group_code,
            inn,
            payment_address,
            tax_regime: TaxRegime::from_user_text(fiscal.tax_type.as_deref()),
            email: user
                .email
                .as_deref()
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::model::{ExchangeCredentials, FiscalCredentials};

    fn user(fiscal: FiscalCredentials) -> User {
        User {
            id: 1,
            login: "merchant".to_string(),
            password_hash: String::new(),
            email: Some("shop@example.com".to_string()),
            is_admin: false,
            bybit: ExchangeCredentials::default(),
            htx: ExchangeCredentials::default(),
            mexc: ExchangeCredentials::default(),
            fiscal,
        }
    }

    #[test]
    fn test_tax_synonyms() {
        assert_eq!(TaxRegime::from_user_text(Some("УСН доход")), TaxRegime::UsnIncome);
        assert_eq!(TaxRegime::from_user_text(Some("  OCH ")), TaxRegime::Osn);
        assert_eq!(TaxRegime::from_user_text(Some("усн доход-расход")), TaxRegime::UsnIncomeOutcome);
        assert_eq!(TaxRegime::from_user_text(Some("Патент")), TaxRegime::Patent);
        assert_eq!(TaxRegime::from_user_text(Some("unknown_value")), TaxRegime::Osn);
        assert_eq!(TaxRegime::from_user_text(None), TaxRegime::Osn);
    }

    #[test]
    fn test_missing_fields_are_listed() {
        let err = FiscalProfile::from_user(&user(FiscalCredentials {
            login: Some("login".to_string()),
            password: Some("  ".to_string()),
            ..Default::default()
        }))
        .unwrap_err();

        match err {
            ReceiptError::IncompleteProfile(missing) => {
                assert_eq!(missing, vec!["password", "group_code", "inn", "payment_address"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_complete_profile() {
        let profile = FiscalProfile::from_user(&user(FiscalCredentials {
            login: Some("login".to_string()),
            password: Some("pass".to_string()),
            group_code: Some("group-1".to_string()),
            inn: Some("7700000000".to_string()),
            tax_type: Some("patent".to_string()),
            payment_address: Some("https://shop.example.com".to_string()),
        }))
        .unwrap();

        assert_eq!(profile.group_code, "group-1");
        assert_eq!(profile.tax_regime, TaxRegime::Patent);
        assert_eq!(profile.email.as_deref(), Some("shop@example.com"));
    }
}
