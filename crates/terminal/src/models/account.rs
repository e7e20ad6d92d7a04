use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One account summary value as reported by the terminal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountValue {
    pub value: String,
    pub currency: String,
}

/// Account summary for every managed account.
///
/// Values are kept as the strings the terminal sends; some tags are not
/// numeric (`AccountType`, for instance).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub managed_accounts: Vec<String>,
    pub accounts: BTreeMap<String, BTreeMap<String, AccountValue>>,
}

impl AccountInfo {
    pub fn insert(
        &mut self,
        account: impl Into<String>,
        tag: impl Into<String>,
        value: impl Into<String>,
        currency: impl Into<String>,
    ) {
        self.accounts.entry(account.into()).or_default().insert(
            tag.into(),
            AccountValue {
                value: value.into(),
                currency: currency.into(),
            },
        );
    }

    pub fn value(&self, account: &str, tag: &str) -> Option<&AccountValue> {
        self.accounts.get(account).and_then(|tags| tags.get(tag))
    }
}
