use std::str::SplitWhitespace;

/// Whitespace tokenizer over the value part of one parameter line.
///
/// Numeric readers never fail: a missing or malformed token yields the
/// type's zero value and a warning, so one bad field cannot abort the rest
/// of the message.
pub(crate) struct Fields<'a> {
    param: &'static str,
    tokens: SplitWhitespace<'a>,
}

impl<'a> Fields<'a> {
    pub fn new(param: &'static str, value: &'a str) -> Self {
        Self {
            param,
            tokens: value.split_whitespace(),
        }
    }

    pub fn word(&mut self) -> Option<&'a str> {
        self.tokens.next()
    }

    pub fn is_exhausted(&self) -> bool {
        self.tokens.clone().next().is_none()
    }

    pub fn hex<T>(&mut self) -> T
    where
        T: TryFrom<u64> + Default,
    {
        let token = self.word();
        self.number(token, 16)
    }

    pub fn dec<T>(&mut self) -> T
    where
        T: TryFrom<u64> + Default,
    {
        let token = self.word();
        self.number(token, 10)
    }

    /// Hex field that may be the literal `none`.
    pub fn hex_or_none<T>(&mut self) -> Option<T>
    where
        T: TryFrom<u64> + Default,
    {
        match self.word() {
            None | Some("none") => None,
            token => Some(self.number(token, 16)),
        }
    }

    /// Free-form token that may be the literal `none`.
    pub fn word_or_none(&mut self) -> Option<String> {
        match self.word() {
            None | Some("none") => None,
            Some(word) => Some(word.to_string()),
        }
    }

    pub fn number<T>(&self, token: Option<&str>, radix: u32) -> T
    where
        T: TryFrom<u64> + Default,
    {
        let Some(token) = token else {
            tracing::warn!(param = self.param, "missing numeric field");
            return T::default();
        };
        match u64::from_str_radix(token, radix)
            .ok()
            .and_then(|v| T::try_from(v).ok())
        {
            Some(v) => v,
            None => {
                tracing::warn!(param = self.param, token, "malformed numeric field");
                T::default()
            }
        }
    }
}

pub(crate) fn push_opt_hex4(out: &mut String, value: Option<u16>) {
    match value {
        Some(v) => out.push_str(&format!(" {:04x}", v)),
        None => out.push_str(" none"),
    }
}

pub(crate) fn encode_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{:02x}", b));
    }
    s
}

pub(crate) fn decode_hex(text: &str) -> Option<Vec<u8>> {
    if text.len() % 2 != 0 || !text.is_ascii() {
        return None;
    }
    (0..text.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&text[i..i + 2], 16).ok())
        .collect()
}
