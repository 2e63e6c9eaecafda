//! Serde helpers for the JSON shapes shared by the server, the seed files and
//! the client cache.

/// Timestamps travel as RFC 3339 UTC strings (`2024-03-19T03:31:06.000Z`) but
/// are stored as naive UTC in SQLite.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.and_utc().to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(de::Error::custom)
    }

    /// Accepts RFC 3339 with any offset, or a bare naive timestamp.
    pub fn parse(raw: &str) -> Result<NaiveDateTime, chrono::ParseError> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.naive_utc())
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
    }
}

/// Monetary amounts kept as decimal text so they never pass through a binary
/// float on our side. Numeric JSON input is converted to its decimal text,
/// with exponent forms such as `1e21` written out in full.
pub mod decimal_string {
    use serde::{de, Deserialize, Deserializer};
    use serde_json::Value;

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        let text = match Value::deserialize(deserializer)? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => {
                let text = n.to_string();
                match expand_exponent(&text) {
                    Some(expanded) => expanded,
                    None => text,
                }
            }
            other => {
                return Err(de::Error::custom(format!(
                    "expected a decimal amount, found {}",
                    other
                )))
            }
        };

        if is_decimal(&text) {
            Ok(text)
        } else {
            Err(de::Error::custom(format!("invalid decimal amount: {:?}", text)))
        }
    }

    /// Plain decimal text for numbers printed as `1e21` or `1.5e-7`
    fn expand_exponent(text: &str) -> Option<String> {
        let (mantissa, exponent) = text.split_once(['e', 'E'])?;
        let exponent: i32 = exponent.parse().ok()?;
        if exponent.abs() > 400 {
            return None;
        }

        let (sign, mantissa) = match mantissa.strip_prefix('-') {
            Some(rest) => ("-", rest),
            None => ("", mantissa),
        };
        let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        let digits = format!("{}{}", whole, fraction);
        let point = whole.len() as i32 + exponent;

        let (int_part, frac_part) = if point <= 0 {
            ("0".to_string(), format!("{}{}", "0".repeat((-point) as usize), digits))
        } else if point as usize >= digits.len() {
            let padding = "0".repeat(point as usize - digits.len());
            (format!("{}{}", digits, padding), String::new())
        } else {
            let (int_part, frac_part) = digits.split_at(point as usize);
            (int_part.to_string(), frac_part.to_string())
        };

        let int_part = match int_part.trim_start_matches('0') {
            "" => "0",
            trimmed => trimmed,
        };
        let frac_part = frac_part.trim_end_matches('0');

        if frac_part.is_empty() {
            Some(format!("{}{}", sign, int_part))
        } else {
            Some(format!("{}{}.{}", sign, int_part, frac_part))
        }
    }

    fn is_decimal(text: &str) -> bool {
        let digits = text.strip_prefix('-').unwrap_or(text);
        let mut parts = digits.splitn(2, '.');
        let whole = parts.next().unwrap_or_default();
        let fraction = parts.next();

        !whole.is_empty()
            && whole.bytes().all(|b| b.is_ascii_digit())
            && fraction.map_or(true, |f| !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()))
    }
}
