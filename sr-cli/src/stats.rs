//! Statistics display and formatting

use std::time::Duration;

use sr_protocol::{SEQ_SPACE, WINDOW_SIZE};
use sr_sim::SimReport;

/// Format a virtual duration in human-readable form
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

/// Format a ratio as a percentage
pub fn format_percent(part: u64, whole: u64) -> String {
    if whole == 0 {
        "N/A".to_string()
    } else {
        format!("{:.1}%", part as f64 * 100.0 / whole as f64)
    }
}

/// One-line protocol parameters header
pub fn protocol_summary() -> String {
    format!("window {} / sequence space {}", WINDOW_SIZE, SEQ_SPACE)
}

/// Display the final simulation report
pub fn display_report(report: &SimReport) {
    let total_data = report.sender.packets_sent + report.sender.packets_resent;

    println!("\n┌─────────────────────────────────────────────────────────────┐");
    println!("│ SIMULATION SUMMARY                                          │");
    println!("├─────────────────────────────────────────────────────────────┤");
    println!(
        "│ Protocol:  {}                              ",
        protocol_summary()
    );
    println!(
        "│ Delivered: {} messages in {}                          ",
        report.delivered,
        format_duration(report.elapsed)
    );
    println!("├─────────────────────────────────────────────────────────────┤");
    println!("│ SENDER                                                      │");
    println!(
        "│ Data packets:  {} sent / {} resent ({} overhead)       ",
        report.sender.packets_sent,
        report.sender.packets_resent,
        format_percent(report.sender.packets_resent, total_data)
    );
    println!(
        "│ ACKs:          {} received / {} new / {} duplicate      ",
        report.sender.acks_received, report.sender.new_acks, report.sender.duplicate_acks
    );
    println!(
        "│ Discarded:     {} corrupted / {} stale                  ",
        report.sender.corrupted_acks, report.sender.stale_acks
    );
    println!(
        "│ Backpressure:  {} rejections                            ",
        report.sender.window_full_rejections
    );
    println!("├─────────────────────────────────────────────────────────────┤");
    println!("│ RECEIVER                                                    │");
    println!(
        "│ Packets:       {} received / {} duplicate / {} corrupt  ",
        report.receiver.packets_received,
        report.receiver.duplicate_packets,
        report.receiver.corrupted_packets
    );
    println!(
        "│ ACKs sent:     {}                                       ",
        report.receiver.acks_sent
    );
    println!("├─────────────────────────────────────────────────────────────┤");
    println!("│ CHANNEL                                                     │");
    println!(
        "│ Packets:       {} carried / {} lost / {} corrupted      ",
        report.channel.packets_sent, report.channel.packets_lost, report.channel.packets_corrupted
    );
    println!(
        "│ Loss observed: {}                                       ",
        format_percent(report.channel.packets_lost, report.channel.packets_sent)
    );
    println!("└─────────────────────────────────────────────────────────────┘");
}
