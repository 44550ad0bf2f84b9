use std::fmt;

pub const INVALID_KEY_MESSAGE: &str =
    "Please enter a valid private key (0x followed by 64 hexadecimal characters)";

/// A wallet private key that has passed the client-side shape check.
/// `Debug` is redacted so the key never reaches the logs.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey(String);

impl PrivateKey {
    pub fn parse(input: &str) -> Result<Self, String> {
        let key = input.trim();
        if key.len() != 66 || !key.starts_with("0x") {
            return Err(INVALID_KEY_MESSAGE.to_string());
        }
        if hex::decode(&key[2..]).is_err() {
            return Err(INVALID_KEY_MESSAGE.to_string());
        }
        Ok(Self(key.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(***)")
    }
}

/// `0x1234...abcd` form used in the wallet panel.
pub fn truncate_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 10 {
        return address.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}
