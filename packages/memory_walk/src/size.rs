use crate::Error;

const KIB: usize = 1024;
const MIB: usize = 1024 * KIB;
const GIB: usize = 1024 * MIB;

/// Parses a human-friendly size string into a number of bytes.
///
/// The accepted form is a decimal integer optionally followed by a single binary multiplier
/// letter: `K`/`k` (1024), `M`/`m` (1024²) or `G`/`g` (1024³). Whitespace, signs and fractional
/// values are not accepted.
///
/// # Examples
///
/// ```
/// use memory_walk::parse_size;
///
/// assert_eq!(parse_size("64").unwrap(), 64);
/// assert_eq!(parse_size("4k").unwrap(), 4096);
/// assert_eq!(parse_size("32M").unwrap(), 32 * 1024 * 1024);
/// ```
///
/// # Errors
///
/// Returns [`Error::InvalidSize`] if the input is empty, if the numeric part is not a
/// non-negative integer or if the resulting byte count does not fit in `usize`.
pub fn parse_size(value: &str) -> crate::Result<usize> {
    if value.is_empty() {
        return Err(Error::invalid_size(value, "size must not be empty"));
    }

    let (digits, multiplier) = split_multiplier(value);

    // `usize::from_str` tolerates a leading '+', which is not part of our format.
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::invalid_size(
            value,
            "numeric part could not be parsed as an integer",
        ));
    }

    let count = digits.parse::<usize>().map_err(|inner| {
        Error::invalid_size(
            value,
            format!("numeric part could not be parsed as an integer: {inner}"),
        )
    })?;

    count
        .checked_mul(multiplier)
        .ok_or_else(|| Error::invalid_size(value, "size does not fit in the address space"))
}

fn split_multiplier(value: &str) -> (&str, usize) {
    let multiplier = match value.as_bytes().last() {
        Some(b'K' | b'k') => KIB,
        Some(b'M' | b'm') => MIB,
        Some(b'G' | b'g') => GIB,
        _ => return (value, 1),
    };

    // The suffix is a single ASCII byte, so this cannot split a character.
    let digits = value
        .get(..value.len().saturating_sub(1))
        .unwrap_or_default();

    (digits, multiplier)
}
