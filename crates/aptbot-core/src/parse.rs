//! Free-text → structured command parsing and argument validation.

/// A parsed `/command arg1 arg2` message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedCommand {
    pub name: String,
    pub args: Vec<String>,
}

/// Split a raw message into a command name and its arguments.
///
/// Telegram group clients may send `/cmd@botname arg`; the bot-name suffix is
/// stripped and the command name lowercased. Arguments keep their original
/// case. Returns `None` for plain text, a bare `/`, and `/ text` (no command
/// token directly after the slash).
pub fn parse_command(text: &str) -> Option<ParsedCommand> {
    let rest = text.trim().strip_prefix('/')?;
    if rest.chars().next().map_or(true, char::is_whitespace) {
        return None;
    }

    let mut parts = rest.split_whitespace();
    let first = parts.next()?;
    let name = first.split('@').next().unwrap_or("").to_lowercase();
    if name.is_empty() {
        return None;
    }

    let args = parts.map(str::to_string).collect();
    Some(ParsedCommand { name, args })
}

/// Strict apartment-number validation.
///
/// Accepts only a non-empty ASCII digit string whose parsed value
/// re-stringifies to exactly the input and is at least 1. Signs, decimals,
/// exponents, whitespace, leading zeros and zero itself are all rejected.
pub fn is_positive_integer(s: &str) -> bool {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    match s.parse::<u32>() {
        Ok(n) => n >= 1 && n.to_string() == s,
        Err(_) => false,
    }
}

/// Parse a validated apartment number, `None` when validation fails.
pub fn parse_apartment(s: &str) -> Option<u32> {
    if is_positive_integer(s) {
        s.parse().ok()
    } else {
        None
    }
}
