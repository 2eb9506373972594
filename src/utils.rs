//! Formatting helpers for command output

/// Format bytes in human-readable format (B, KB, MB, GB, TB)
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];
    const THRESHOLD: u64 = 1024;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= THRESHOLD as f64 && unit_index < UNITS.len() - 1 {
        size /= THRESHOLD as f64;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

/// Capacity log values are in MiB
pub fn format_mib(mib: u32) -> String {
    format_bytes(u64::from(mib) << 20)
}

pub fn format_speed(bytes: u64, duration_secs: f64) -> String {
    if duration_secs <= 0.0 {
        return "0 B/s".to_string();
    }

    let speed = bytes as f64 / duration_secs;
    format!("{}/s", format_bytes(speed as u64))
}

/// Classic 16 bytes per line hex dump, at most `max_lines` lines
pub fn hexdump(data: &[u8], max_lines: usize) -> String {
    let mut out = String::new();
    for (i, chunk) in data.chunks(16).take(max_lines).enumerate() {
        let hex: Vec<String> = chunk.iter().map(|b| format!("{:02x}", b)).collect();
        let ascii: String = chunk
            .iter()
            .map(|&b| {
                if b.is_ascii_graphic() || b == b' ' {
                    b as char
                } else {
                    '.'
                }
            })
            .collect();
        out.push_str(&format!("{:08x}  {:<47}  |{}|\n", i * 16, hex.join(" "), ascii));
    }
    let shown = max_lines.saturating_mul(16);
    if data.len() > shown {
        out.push_str(&format!("... {} more bytes\n", data.len() - shown));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024 * 1024), "5.00 GB");
        assert_eq!(format_mib(0), "0 B");
        assert_eq!(format_mib(2048), "2.00 GB");
    }

    #[test]
    fn test_format_speed() {
        assert_eq!(format_speed(2048, 2.0), "1.00 KB/s");
        assert_eq!(format_speed(100, 0.0), "0 B/s");
    }

    #[test]
    fn test_hexdump() {
        let dump = hexdump(b"VOL1TAPE01\x00\x01", 4);
        assert!(dump.starts_with("00000000  56 4f 4c 31"));
        assert!(dump.trim_end().ends_with("|VOL1TAPE01..|"));

        let dump = hexdump(&[0u8; 40], 1);
        assert_eq!(dump.lines().count(), 2);
        assert!(dump.ends_with("... 24 more bytes\n"));
    }
}
