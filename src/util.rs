//! Small stack-growth and number-parsing helpers shared across the crate.

use crate::error::RuntimeError;
use std::str::FromStr;

/// Red zone and per-extension size used when growing the native stack for
/// deeply recursive graph walks (the reducer's descent, `collect`, and both
/// readback passes).
const RED_ZONE: usize = 256 * 1024;
const STACK_SIZE: usize = 1024 * 1024;

/// Runs `f` on a stack with headroom, growing the native stack first if less
/// than [`RED_ZONE`] bytes remain. Used anywhere a DFS over the graph could
/// otherwise exceed the default thread stack on a deep input.
#[inline]
pub fn maybe_grow<R>(f: impl FnOnce() -> R) -> R {
  stacker::maybe_grow(RED_ZONE, STACK_SIZE, f)
}

/// Parses a human-friendly size like `"4G"`, `"512M"`, `"65536K"`, or a
/// plain integer, into a count of `T`. Suffixes are binary (powers of 1024).
pub fn parse_abbrev_number<T>(s: &str) -> Result<T, RuntimeError>
where
  T: TryFrom<u64>,
{
  let s = s.trim();
  let (digits, mult) = match s.as_bytes().last() {
    Some(b'K' | b'k') => (&s[..s.len() - 1], 1024u64),
    Some(b'M' | b'm') => (&s[..s.len() - 1], 1024 * 1024),
    Some(b'G' | b'g') => (&s[..s.len() - 1], 1024 * 1024 * 1024),
    _ => (s, 1),
  };
  let base = f64::from_str(digits).map_err(|_| RuntimeError::InvalidMemorySize(s.to_owned()))?;
  if base < 0.0 {
    return Err(RuntimeError::InvalidMemorySize(s.to_owned()));
  }
  let total = (base * mult as f64) as u64;
  T::try_from(total).map_err(|_| RuntimeError::InvalidMemorySize(s.to_owned()))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_plain_integer() {
    assert_eq!(parse_abbrev_number::<usize>("1024").unwrap(), 1024);
  }

  #[test]
  fn parses_suffixes() {
    assert_eq!(parse_abbrev_number::<usize>("4G").unwrap(), 4 * 1024 * 1024 * 1024);
    assert_eq!(parse_abbrev_number::<usize>("512M").unwrap(), 512 * 1024 * 1024);
    assert_eq!(parse_abbrev_number::<usize>("64K").unwrap(), 64 * 1024);
  }

  #[test]
  fn rejects_garbage() {
    assert!(parse_abbrev_number::<usize>("abc").is_err());
  }
}
