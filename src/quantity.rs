//! Kubernetes-style resource quantity parsing and formatting (§4.1).

use lazy_static::lazy_static;
use std::collections::HashMap;

use crate::error::{AutoscalerError, Result};

lazy_static! {
    static ref FACTORS: HashMap<&'static str, f64> = {
        let mut m = HashMap::new();
        m.insert("", 1.0);
        m.insert("m", 1e-3);
        m.insert("K", 1e3);
        m.insert("M", 1e6);
        m.insert("G", 1e9);
        m.insert("T", 1e12);
        m.insert("P", 1e15);
        m.insert("E", 1e18);
        m.insert("Ki", (1u64 << 10) as f64);
        m.insert("Mi", (1u64 << 20) as f64);
        m.insert("Gi", (1u64 << 30) as f64);
        m.insert("Ti", (1u64 << 40) as f64);
        m.insert("Pi", (1u64 << 50) as f64);
        m.insert("Ei", (1u64 << 60) as f64);
        m
    };
}

/// Parses a Kubernetes-style quantity string (`"100Mi"`, `"10m"`, `"4"`, ...).
///
/// Splits the leading digits from the trailing suffix and looks the suffix up
/// in the fixed factor table. An unrecognized suffix is treated leniently
/// with a factor of 1, matching the upstream implementation's fallback.
pub fn parse_resource(value: &str) -> Result<f64> {
    let digit_end = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, suffix) = value.split_at(digit_end);
    if digits.is_empty() {
        return Err(AutoscalerError::InvalidQuantity(value.to_string()));
    }
    let amount: f64 = digits
        .parse()
        .map_err(|_| AutoscalerError::InvalidQuantity(value.to_string()))?;
    let factor = FACTORS.get(suffix).copied().unwrap_or(1.0);
    Ok(amount * factor)
}

/// Which resource a formatted value represents, for §4.1's per-resource
/// formatting rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Cpu,
    Memory,
    Pods,
    Other,
}

/// Formats a numeric quantity back into a human-readable string for logs.
pub fn format_resource(value: f64, kind: ResourceKind) -> String {
    match kind {
        ResourceKind::Cpu => format!("{:.1}", value),
        ResourceKind::Memory => format!("{}Mi", (value / (1u64 << 20) as f64) as i64),
        ResourceKind::Pods => format!("{}", value as i64),
        ResourceKind::Other => format!("{}", value as i64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_binary_suffix() {
        assert_eq!(parse_resource("100Mi").unwrap(), 100.0 * 1024.0 * 1024.0);
    }

    #[test]
    fn parses_milli_suffix() {
        assert_eq!(parse_resource("10m").unwrap(), 0.01);
    }

    #[test]
    fn parses_bare_number() {
        assert_eq!(parse_resource("4").unwrap(), 4.0);
    }

    #[test]
    fn lenient_on_unknown_suffix() {
        assert_eq!(parse_resource("7Zz").unwrap(), 7.0);
    }

    #[test]
    fn rejects_missing_digits() {
        assert!(parse_resource("Mi").is_err());
    }

    #[test]
    fn formats_cpu_memory_pods() {
        assert_eq!(format_resource(1.0, ResourceKind::Cpu), "1.0");
        assert_eq!(
            format_resource((1024 * 1024) as f64, ResourceKind::Memory),
            "1Mi"
        );
        assert_eq!(format_resource(1.0, ResourceKind::Pods), "1");
        assert_eq!(format_resource(1.0, ResourceKind::Other), "1");
    }

    proptest! {
        #[test]
        fn parse_format_memory_roundtrips_to_same_mebibytes(mebibytes in 0u32..1_000_000u32) {
            let bytes = (mebibytes as u64) * (1u64 << 20);
            let parsed = parse_resource(&format!("{}", bytes)).unwrap();
            let formatted = format_resource(parsed, ResourceKind::Memory);
            let reparsed = parse_resource(&formatted.trim_end_matches("Mi")).unwrap();
            prop_assert_eq!(reparsed as u64, mebibytes as u64);
        }

        #[test]
        fn parse_is_linear_in_digits(digits in 0u64..1_000_000u64) {
            let parsed = parse_resource(&format!("{}Ki", digits)).unwrap();
            prop_assert_eq!(parsed, digits as f64 * 1024.0);
        }
    }
}
