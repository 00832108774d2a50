//! Human-readable byte sizes

const MB: f64 = 1024.0 * 1024.0;
const GB: f64 = MB * 1024.0;

pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / MB
}

pub fn bytes_to_gb(bytes: u64) -> f64 {
    bytes as f64 / GB
}

/// Format a size in MB, or GB once it passes 1999 MB.
///
/// Whole numbers print without a decimal; everything else gets one.
pub fn format_bytes(bytes: u64) -> String {
    let (value, unit) = match bytes_to_mb(bytes) {
        mb if mb > 1999.0 => (bytes_to_gb(bytes), "GB"),
        mb => (mb, "MB"),
    };

    if value.fract() == 0.0 {
        format!("{:.0}{}", value, unit)
    } else {
        format!("{:.1}{}", value, unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_megabytes_have_no_decimal() {
        assert_eq!(format_bytes(0), "0MB");
        assert_eq!(format_bytes(1024 * 1024), "1MB");
        assert_eq!(format_bytes(300 * 1024 * 1024), "300MB");
    }

    #[test]
    fn test_fractional_megabytes_have_one_decimal() {
        assert_eq!(format_bytes(1024 * 1024 + 512 * 1024), "1.5MB");
        assert_eq!(format_bytes(100 * 1024), "0.1MB");
    }

    #[test]
    fn test_switches_to_gigabytes_above_1999_mb() {
        assert_eq!(format_bytes(1999 * 1024 * 1024), "1999MB");
        assert_eq!(format_bytes(4 * 1024 * 1024 * 1024), "4GB");
        assert_eq!(format_bytes(2000 * 1024 * 1024), "2.0GB");
    }

    #[test]
    fn test_conversions() {
        assert_eq!(bytes_to_mb(2 * 1024 * 1024), 2.0);
        assert_eq!(bytes_to_gb(3 * 1024 * 1024 * 1024), 3.0);
    }
}
