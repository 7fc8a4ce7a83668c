//! Statistics display and formatting

use crate::sim::SimReport;
use std::time::Duration;

/// Format bytes in human-readable form
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Format bandwidth in human-readable form
pub fn format_bandwidth(bps: u64) -> String {
    const KBPS: u64 = 1000;
    const MBPS: u64 = KBPS * 1000;
    const GBPS: u64 = MBPS * 1000;

    if bps >= GBPS {
        format!("{:.2} Gbps", bps as f64 / GBPS as f64)
    } else if bps >= MBPS {
        format!("{:.2} Mbps", bps as f64 / MBPS as f64)
    } else if bps >= KBPS {
        format!("{:.2} Kbps", bps as f64 / KBPS as f64)
    } else {
        format!("{} bps", bps)
    }
}

/// Format RTT in human-readable form
pub fn format_rtt(rtt: Duration) -> String {
    let rtt_us = rtt.as_micros();
    if rtt_us == 0 {
        "N/A".to_string()
    } else if rtt_us >= 1_000_000 {
        format!("{:.2}s", rtt_us as f64 / 1_000_000.0)
    } else if rtt_us >= 1_000 {
        format!("{:.2}ms", rtt_us as f64 / 1_000.0)
    } else {
        format!("{}µs", rtt_us)
    }
}

/// Format duration in human-readable form
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Display the final summary table
pub fn display_summary(report: &SimReport) {
    let handler = &report.handler;
    let link = &report.link;
    let receiver = &report.receiver;

    println!("\n┌─────────────────────────────────────────────────────────────┐");
    println!("│ SIMULATION SUMMARY                                          │");
    println!("├─────────────────────────────────────────────────────────────┤");
    println!(
        "│ Result: {}                                          ",
        if report.completed { "completed" } else { "time limit reached" }
    );
    println!(
        "│ Elapsed: {} (simulated)                                 ",
        format_duration(report.elapsed)
    );
    println!(
        "│ Messages: {} delivered / {} total                       ",
        receiver.messages_delivered, report.messages
    );
    println!("├─────────────────────────────────────────────────────────────┤");
    println!("│ LINK                                                        │");
    println!("├─────────────────────────────────────────────────────────────┤");
    println!(
        "│ Packets:  {} sent / {} dropped / {} received           ",
        link.packets_sent, link.data_dropped, receiver.packets_received
    );
    println!(
        "│ Acks:     {} built / {} dropped / {} rejected           ",
        receiver.acks_built, link.acks_dropped, link.acks_rejected
    );
    println!(
        "│ Goodput:  {}                                          ",
        format_bandwidth(goodput_bps(report))
    );
    println!("├─────────────────────────────────────────────────────────────┤");
    println!("│ SENDER                                                      │");
    println!("├─────────────────────────────────────────────────────────────┤");
    println!(
        "│ Bytes:    {} sent / {} acked                        ",
        format_bytes(handler.total_sent),
        format_bytes(handler.total_acked)
    );
    println!(
        "│ Resent:   {} ({} fast / {} timeout)                     ",
        link.retransmissions, handler.fast_retransmits, handler.timeout_retransmits
    );
    println!(
        "│ Duplicates at receiver: {}                              ",
        receiver.duplicate_messages
    );
    println!(
        "│ RTT: {} | Window: {}                           ",
        format_rtt(handler.smoothed_rtt),
        format_bytes(handler.congestion_window as u64)
    );
    println!("└─────────────────────────────────────────────────────────────┘");
}

/// Display compact stats on one line (for continuous updates)
pub fn display_compact_stats(report: &SimReport) {
    let handler = &report.handler;

    print!(
        "\r[{:8}] Delivered: {}/{} | In flight: {} | Window: {} | RTT: {} | Resent: {}         ",
        format_duration(report.elapsed),
        report.receiver.messages_delivered,
        report.messages,
        format_bytes(handler.bytes_in_flight as u64),
        format_bytes(handler.congestion_window as u64),
        format_rtt(handler.smoothed_rtt),
        report.link.retransmissions
    );

    use std::io::Write;
    let _ = std::io::stdout().flush();
}

/// Delivered payload rate over the simulated run
pub fn goodput_bps(report: &SimReport) -> u64 {
    let micros = report.elapsed.as_micros() as u64;
    if micros == 0 {
        return 0;
    }
    report.handler.total_acked * 8 * 1_000_000 / micros
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(500), "500 B");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(2 * 1024 * 1024), "2.00 MB");
    }

    #[test]
    fn test_format_bandwidth() {
        assert_eq!(format_bandwidth(500), "500 bps");
        assert_eq!(format_bandwidth(10_000), "10.00 Kbps");
        assert_eq!(format_bandwidth(10_000_000), "10.00 Mbps");
    }

    #[test]
    fn test_format_rtt() {
        assert_eq!(format_rtt(Duration::ZERO), "N/A");
        assert_eq!(format_rtt(Duration::from_micros(500)), "500µs");
        assert_eq!(format_rtt(Duration::from_millis(50)), "50.00ms");
        assert_eq!(format_rtt(Duration::from_secs(2)), "2.00s");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_secs(3661)), "1h 01m 01s");
    }

    #[test]
    fn test_goodput() {
        let report = SimReport {
            elapsed: Duration::from_secs(2),
            messages: 10,
            completed: true,
            link: Default::default(),
            receiver: Default::default(),
            handler: ugo_protocol::HandlerStats {
                total_acked: 250_000,
                ..Default::default()
            },
        };

        assert_eq!(goodput_bps(&report), 1_000_000);
        assert_eq!(format_bandwidth(goodput_bps(&report)), "1.00 Mbps");
    }
}
