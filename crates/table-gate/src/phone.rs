//! Phone number normalization.

use crate::config::PhoneConfig;

/// Expected shape of a customer's number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneFormat {
    /// Country calling code, digits only
    pub country_code: String,
    /// Digits in a national significant number
    pub national_length: usize,
}

impl From<&PhoneConfig> for PhoneFormat {
    fn from(config: &PhoneConfig) -> Self {
        Self {
            country_code: config.country_code.chars().filter(char::is_ascii_digit).collect(),
            national_length: config.national_length,
        }
    }
}

impl PhoneFormat {
    /// Digits-only number including the country code, or `None` if `raw`
    /// does not fit the format.
    ///
    /// Non-digits are stripped, one trunk "0" is dropped, and the country
    /// code is prefixed when exactly a national number remains.
    pub fn normalize(&self, raw: &str) -> Option<String> {
        let mut digits: String = raw.chars().filter(char::is_ascii_digit).collect();

        if digits.starts_with('0') {
            digits.remove(0);
        }

        if digits.len() == self.national_length {
            digits.insert_str(0, &self.country_code);
        }

        let valid = digits.len() == self.country_code.len() + self.national_length
            && digits.starts_with(&self.country_code);

        valid.then_some(digits)
    }
}
