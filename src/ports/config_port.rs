//! Configuration access port trait.

use rust_decimal::Decimal;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;

    /// Parse a decimal exactly from the raw text. `None` when the key is
    /// missing or blank, `Some(Err(raw))` when it does not parse.
    fn get_decimal(&self, section: &str, key: &str) -> Option<Result<Decimal, String>>;
}
