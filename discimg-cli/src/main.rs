//! discimg — explore optical disc container images
//!
//! # Usage
//!
//! ```text
//! discimg <path>                  Disc/session/track summary
//! discimg <path> sector <n>       Hex preview of track 1's sector n
//! discimg <path> bench            Time a full sequential read
//! ```

mod style;

use std::env;
use std::io::{self, Write};
use std::process;
use std::time::Instant;

use discimg_core::password::PasswordPrompt;
use discimg_core::Disc;
use style::{BOLD, DIM, GREEN, RED, RESET};

struct StdinPrompt;

impl PasswordPrompt for StdinPrompt {
    fn prompt(&self, reason: &str) -> Option<String> {
        eprint!("{reason} — password: ");
        io::stderr().flush().ok();
        let mut line = String::new();
        io::stdin().read_line(&mut line).ok()?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let path = std::path::Path::new(&args[1]);
    let result = match args.get(2).map(String::as_str) {
        None => cmd_info(path),
        Some("sector") => match args.get(3).and_then(|s| s.parse::<u32>().ok()) {
            Some(n) => cmd_sector(path, n),
            None => {
                eprintln!("{RED}usage: discimg <path> sector <n>{RESET}");
                process::exit(1);
            }
        },
        Some("bench") => cmd_bench(path),
        Some(other) => {
            eprintln!("{RED}unknown command: {other}{RESET}");
            print_usage();
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("{RED}error:{RESET} {e}");
        process::exit(1);
    }
}

fn open_disc(path: &std::path::Path) -> discimg_core::Result<Disc> {
    discimg_formats::registry::open(path, &StdinPrompt)
}

fn cmd_info(path: &std::path::Path) -> discimg_core::Result<()> {
    let disc = open_disc(path)?;

    style::header(&format!("{}", path.display()));
    style::kv_highlight("sessions", &disc.sessions.len().to_string());
    style::kv_highlight("tracks", &disc.track_count().to_string());

    for session in &disc.sessions {
        style::section(&format!("session {}", session.number));
        style::kv("medium type", &format!("{:?}", session.guess_medium_type()));
        for track in &session.tracks {
            style::kv(
                &format!("track {}", track.number),
                &format!("{:?}/{:?}, {} sectors", track.main_format, track.subchannel_format, track.length()),
            );
        }
    }

    Ok(())
}

fn cmd_sector(path: &std::path::Path, n: u32) -> discimg_core::Result<()> {
    let mut disc = open_disc(path)?;
    let track = disc
        .sessions
        .first_mut()
        .and_then(|s| s.tracks.first_mut())
        .ok_or_else(|| discimg_core::CoreError::Format("disc has no tracks".into()))?;

    let sector = track.read_sector(n)?;
    style::header(&format!("track {} sector {n}", track.number));
    style::kv("main bytes", &sector.main.len().to_string());
    style::hex_dump(&sector.main);
    if let Some(subchannel) = &sector.subchannel {
        style::section("subchannel");
        style::hex_dump(subchannel);
    }

    Ok(())
}

fn cmd_bench(path: &std::path::Path) -> discimg_core::Result<()> {
    let mut disc = open_disc(path)?;
    style::spinner_msg("reading every sector");

    let start = Instant::now();
    let mut total_bytes = 0u64;
    let mut total_sectors = 0u64;

    for session in &mut disc.sessions {
        for track in &mut session.tracks {
            for address in 0..track.length() {
                let sector = track.read_sector(address)?;
                total_bytes += sector.main.len() as u64 + sector.subchannel.as_ref().map_or(0, Vec::len) as u64;
                total_sectors += 1;
            }
        }
    }

    let elapsed = start.elapsed();
    style::spinner_done("");

    style::section("results");
    style::kv("sectors read", &total_sectors.to_string());
    style::kv("bytes read", &style::format_size(total_bytes));
    style::kv_highlight("elapsed", &style::format_duration(elapsed));
    if elapsed.as_secs_f64() > 0.0 {
        let throughput = total_bytes as f64 / elapsed.as_secs_f64();
        style::kv_highlight("throughput", &format!("{}/s", style::format_size(throughput as u64)));
    }

    Ok(())
}

fn print_usage() {
    eprintln!(
        r#"
{BOLD}discimg{RESET} — optical disc container explorer

{DIM}CCD/B6T/CUE/MDS-v1/MDS-v2(MDX)/DAA, uniform Disc/Session/Track model{RESET}

{BOLD}USAGE:{RESET}
    discimg <path>                  Disc/session/track summary
    discimg <path> sector <n>       Hex preview of track 1's sector n
    discimg <path> bench            Time a full sequential read

{GREEN}examples:{RESET}
    discimg image.ccd
    discimg image.mdx sector 16
    discimg image.daa bench
"#
    );
}
