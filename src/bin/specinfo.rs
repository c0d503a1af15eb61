//! specinfo: inspect the scans of a SPEC data file.

use clap::Parser;
use log::warn;
use serde_json::{json, Map, Value};
use specfile_io::{ReadOptions, RowPolicy, Scan, ScanRef, SpecFile};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "specinfo",
    version,
    about = "Inspect the scans of a SPEC data file"
)]
struct Cli {
    /// Input SPEC file
    file: PathBuf,

    /// Scan to show, as "N" or "N.M"
    #[arg(short, long, conflicts_with = "at")]
    scan: Option<String>,

    /// Scan to show, as 0-based position in the file
    #[arg(long)]
    at: Option<usize>,

    /// Print file and scan headers
    #[arg(long, default_value_t = false)]
    header: bool,

    /// Print the data block
    #[arg(long, default_value_t = false)]
    data: bool,

    /// Print MCA spectra
    #[arg(long, default_value_t = false)]
    mca: bool,

    /// Emit JSON instead of text
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Reject short data rows instead of padding them with NaN
    #[arg(long, default_value_t = false)]
    strict: bool,

    /// Verbose mode
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();

    let opts = ReadOptions {
        row_policy: if cli.strict {
            RowPolicy::Strict
        } else {
            RowPolicy::PadWithNan
        },
        verbose: cli.verbose,
    };
    let sf = SpecFile::open_with(&cli.file, &opts)?;

    let selected = match (&cli.scan, cli.at) {
        (Some(key), _) => Some(key.parse::<ScanRef>()?),
        (None, Some(i)) => Some(ScanRef::Index(i)),
        (None, None) => None,
    };

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    match selected {
        None => list_scans(&mut out, &sf, cli.json)?,
        Some(scan) => {
            let scan = sf.get(scan)?;
            if cli.json {
                write_scan_json(&mut out, scan, &cli)?;
            } else {
                write_scan_text(&mut out, scan, &cli)?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

/// One line (or JSON entry) per scan. A scan whose data or spectra fail to
/// parse is reported in place and the listing goes on.
fn list_scans<W: Write>(
    out: &mut W,
    sf: &SpecFile,
    as_json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if as_json {
        let entries = sf
            .iter()
            .map(|scan| match scan.summary() {
                Ok(summary) => serde_json::to_value(summary),
                Err(e) => {
                    warn!("scan {}: {}", scan.key(), e);
                    Ok(json!({
                        "index": scan.index(),
                        "key": scan.key(),
                        "command": scan.command(),
                        "error": e.to_string(),
                    }))
                }
            })
            .collect::<Result<Vec<Value>, _>>()?;
        serde_json::to_writer_pretty(&mut *out, &entries)?;
        writeln!(out)?;
        return Ok(());
    }

    if let Some(path) = sf.source() {
        writeln!(out, "{}: {} scans", path.display(), sf.len())?;
    }
    for scan in sf {
        match scan.summary() {
            Ok(summary) => writeln!(out, "{}", summary)?,
            Err(e) => {
                warn!("scan {}: {}", scan.key(), e);
                writeln!(out, "[{:>4}] {:<8} <{}>", scan.index(), scan.key(), e)?;
            }
        }
    }
    Ok(())
}

fn write_scan_text<W: Write>(
    out: &mut W,
    scan: &Scan,
    cli: &Cli,
) -> Result<(), Box<dyn std::error::Error>> {
    writeln!(out, "{}", scan.summary()?)?;
    if let Some(date) = scan.date() {
        writeln!(out, "  Date: {}", date)?;
    }

    if cli.header {
        writeln!(out, "\nFile header:")?;
        for line in scan.file_header_lines() {
            writeln!(out, "  {}", line)?;
        }
        writeln!(out, "\nScan header:")?;
        for line in scan.scan_header_lines() {
            writeln!(out, "  {}", line)?;
        }
        writeln!(out, "\nMotors:")?;
        let positions = scan.motor_positions()?;
        for (i, name) in scan.motor_names().iter().enumerate() {
            match positions.get(i) {
                Some(p) => writeln!(out, "  {:<24} {}", name, p)?,
                None => writeln!(out, "  {:<24} -", name)?,
            }
        }
    }

    if cli.data {
        writeln!(out, "\n{}", scan.labels().join("\t"))?;
        for row in scan.data()?.iter_rows() {
            let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            writeln!(out, "{}", cells.join("\t"))?;
        }
    }

    if cli.mca {
        let mca = scan.mca()?;
        writeln!(out, "\nMCA: {} spectra, calibration {:?}", mca.len(), mca.calibration())?;
        for (i, spectrum) in mca.iter().enumerate() {
            let cells: Vec<String> = spectrum.iter().map(|v| v.to_string()).collect();
            writeln!(out, "  [{}] {}", i, cells.join(" "))?;
        }
    }
    Ok(())
}

fn write_scan_json<W: Write>(
    out: &mut W,
    scan: &Scan,
    cli: &Cli,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut doc = Map::new();
    doc.insert("summary".into(), serde_json::to_value(scan.summary()?)?);

    if cli.header {
        doc.insert("file_header".into(), json!(scan.file_header_map()));
        doc.insert("scan_header".into(), json!(scan.scan_header_values()));
        doc.insert("mca_header".into(), json!(scan.mca_header()));
        let motors: Map<String, Value> = scan
            .motor_names()
            .iter()
            .cloned()
            .zip(scan.motor_positions()?.iter().map(|&p| json!(p)))
            .collect();
        doc.insert("motors".into(), Value::Object(motors));
    }

    if cli.data {
        let rows: Vec<&[f64]> = scan.data()?.iter_rows().collect();
        doc.insert("labels".into(), json!(scan.labels()));
        doc.insert("data".into(), json!(rows));
    }

    if cli.mca {
        let mca = scan.mca()?;
        doc.insert(
            "mca".into(),
            json!({
                "calibration": mca.calibration(),
                "channels": mca.channels(),
                "spectra": mca.spectra(),
            }),
        );
    }

    serde_json::to_writer_pretty(&mut *out, &Value::Object(doc))?;
    writeln!(out)?;
    Ok(())
}
