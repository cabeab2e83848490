use std::io::{self, Write};

// ── ANSI styling ─────────────────────────────────────────────────────────

pub(crate) const RESET: &str = "\x1b[0m";
pub(crate) const BOLD: &str = "\x1b[1m";
pub(crate) const DIM: &str = "\x1b[2m";
pub(crate) const GREEN: &str = "\x1b[32m";
pub(crate) const CYAN: &str = "\x1b[36m";
pub(crate) const RED: &str = "\x1b[31m";

// ── Box-drawing ──────────────────────────────────────────────────────────

pub(crate) const DASH_LINE: &str = "────────────────────────────────────────────────────────────";
pub(crate) const DOUBLE_LINE: &str = "════════════════════════════════════════════════════════════";

// ── Formatting ───────────────────────────────────────────────────────────

pub(crate) fn format_size(bytes: u64) -> String {
    if bytes >= 1024 * 1024 * 1024 {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    } else if bytes >= 1024 * 1024 {
        format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.2} KB", bytes as f64 / 1024.0)
    } else {
        format!("{bytes} B")
    }
}

pub(crate) fn format_duration(d: std::time::Duration) -> String {
    let ms = d.as_secs_f64() * 1000.0;
    if ms >= 1000.0 {
        format!("{:.2}s", d.as_secs_f64())
    } else if ms >= 1.0 {
        format!("{ms:.1}ms")
    } else {
        format!("{:.0}us", ms * 1000.0)
    }
}

// ── UI output ────────────────────────────────────────────────────────────

pub(crate) fn header(title: &str) {
    println!();
    println!("  {BOLD}{title}{RESET}");
    println!("  {DIM}{DOUBLE_LINE}{RESET}");
}

pub(crate) fn section(title: &str) {
    println!();
    println!("  {CYAN}{BOLD}{title}{RESET}");
    println!("  {DIM}{DASH_LINE}{RESET}");
}

pub(crate) fn kv(key: &str, value: &str) {
    println!("  {DIM}{key:<22}{RESET} {value}");
}

pub(crate) fn kv_highlight(key: &str, value: &str) {
    println!("  {DIM}{key:<22}{RESET} {BOLD}{GREEN}{value}{RESET}");
}

pub(crate) fn spinner_msg(msg: &str) {
    eprint!("  {DIM}>{RESET} {msg}...");
    io::stderr().flush().ok();
}

pub(crate) fn spinner_done(extra: &str) {
    eprintln!(" {GREEN}done{RESET}{DIM}{extra}{RESET}");
}

/// 16-bytes-per-row hex dump with an ASCII gutter, as used by `sector`.
pub(crate) fn hex_dump(data: &[u8]) {
    for (row, chunk) in data.chunks(16).enumerate() {
        let offset = row * 16;
        print!("  {DIM}{offset:08x}{RESET}  ");
        for (i, b) in chunk.iter().enumerate() {
            print!("{b:02x} ");
            if i == 7 {
                print!(" ");
            }
        }
        for _ in chunk.len()..16 {
            print!("   ");
        }
        print!(" {DIM}|{RESET}");
        for &b in chunk {
            let c = if (0x20..0x7f).contains(&b) { b as char } else { '.' };
            print!("{c}");
        }
        println!("{DIM}|{RESET}");
    }
}
