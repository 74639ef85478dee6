use anyhow::{Result, bail};

const BINARY_SUFFIXES: &[(&str, u64)] = &[
    ("Ki", 1 << 10),
    ("Mi", 1 << 20),
    ("Gi", 1 << 30),
    ("Ti", 1 << 40),
    ("Pi", 1 << 50),
    ("Ei", 1 << 60),
];

const DECIMAL_SUFFIXES: &[(&str, u64)] = &[
    ("k", 1_000),
    ("M", 1_000_000),
    ("G", 1_000_000_000),
    ("T", 1_000_000_000_000),
    ("P", 1_000_000_000_000_000),
    ("E", 1_000_000_000_000_000_000),
];

/// Parse a storage quantity such as `10Gi`, `500M`, `1.5Gi` or `1024`
/// into bytes.
pub fn parse_quantity(quantity: &str) -> Result<u64> {
    let quantity = quantity.trim();
    if quantity.is_empty() {
        bail!("quantity must not be empty");
    }

    let split = quantity
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(quantity.len());
    let (number, suffix) = quantity.split_at(split);
    if number.is_empty() {
        bail!("quantity '{}' has no numeric part", quantity);
    }

    let multiplier = if suffix.is_empty() {
        1
    } else {
        match BINARY_SUFFIXES
            .iter()
            .chain(DECIMAL_SUFFIXES.iter())
            .find(|(s, _)| *s == suffix)
        {
            Some((_, m)) => *m,
            None => bail!("quantity '{}' has unknown suffix '{}'", quantity, suffix),
        }
    };

    if number.contains('.') {
        let value: f64 = number
            .parse()
            .map_err(|_| anyhow::anyhow!("quantity '{}' is not a number", quantity))?;
        let bytes = (value * multiplier as f64).ceil();
        if !bytes.is_finite() || bytes > u64::MAX as f64 {
            bail!("quantity '{}' is out of range", quantity);
        }
        return Ok(bytes as u64);
    }

    let value: u64 = number
        .parse()
        .map_err(|_| anyhow::anyhow!("quantity '{}' is not a number", quantity))?;
    value
        .checked_mul(multiplier)
        .ok_or_else(|| anyhow::anyhow!("quantity '{}' is out of range", quantity))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_quantities() {
        assert_eq!(parse_quantity("10Gi").unwrap(), 10 * 1024 * 1024 * 1024);
        assert_eq!(parse_quantity("500Mi").unwrap(), 500 * 1024 * 1024);
        assert_eq!(parse_quantity("1G").unwrap(), 1_000_000_000);
        assert_eq!(parse_quantity("1024").unwrap(), 1024);
        assert_eq!(parse_quantity("1.5Gi").unwrap(), 1_610_612_736);
        assert_eq!(parse_quantity(" 2k ").unwrap(), 2000);
    }

    #[test]
    fn invalid_quantities() {
        assert!(parse_quantity("").is_err());
        assert!(parse_quantity("Gi").is_err());
        assert!(parse_quantity("10Xi").is_err());
        assert!(parse_quantity("1.2.3Gi").is_err());
        assert!(parse_quantity("99999999999Ei").is_err());
    }
}
