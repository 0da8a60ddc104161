mod prompt;
mod registration;

use chrono::NaiveDateTime;
use clap::{Parser, Subcommand, ValueEnum};
use medlog_core::dose_log::format_line;
use medlog_core::*;
use prompt::Prompter;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "medlog")]
#[command(about = "Personal medication log and next-dose scheduler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override the directory where medicine records are stored
    #[arg(long, global = true)]
    meds_dir: Option<PathBuf>,

    /// Override the dose log file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Output more information
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only report errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Register (or update) a medicine
    Register {
        /// Medicine name
        name: String,

        /// Standard dose, a number followed by a unit (e.g. 30ml)
        #[arg(long)]
        dose: Dosage,

        /// Time between standard doses as hours:minutes (e.g. 1:30.5)
        #[arg(long, value_parser = interval_arg)]
        interval: chrono::Duration,

        /// Maximum standard doses per day
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        max_per_day: Option<u32>,

        /// Whether it must be taken with a meal
        #[arg(long, value_enum, default_value_t = Requirement::Unknown)]
        with_meal: Requirement,

        /// Whether it must be taken with water
        #[arg(long, value_enum, default_value_t = Requirement::Unknown)]
        with_water: Requirement,
    },

    /// Log an administered dose and show the next one
    Log {
        /// Name of medicine administered
        #[arg(short, long)]
        medicine: Option<String>,

        /// Amount administered (default: the standard dose)
        #[arg(short, long)]
        dosage: Option<Dosage>,

        /// When it was administered (default: now)
        #[arg(short, long)]
        time: Option<String>,

        /// chrono format used to parse --time (default from config: %m-%d-%Y_%H:%M)
        #[arg(short, long)]
        format: Option<String>,

        /// Ask for anything missing, confirm near matches and offer to
        /// register unknown medicines
        #[arg(long)]
        interactive: bool,
    },

    /// Show when the next dose is due
    Next {
        /// Medicine name
        name: String,
    },

    /// Print the dose log, optionally filtered by medicine (default)
    View {
        /// Only show these medicines (repeatable)
        #[arg(short, long = "medicine")]
        medicines: Vec<String>,

        /// Match medicine names ignoring case
        #[arg(long)]
        ignore_case: bool,
    },

    /// List registered medicines with names similar to NAME
    Find {
        /// Name to look for
        name: String,

        /// Only show candidates scoring below this (default from config: 4)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        cutoff: Option<u64>,

        /// Maximum number of candidates (default from config: 10)
        #[arg(long)]
        max: Option<usize>,
    },
}

/// Tri-state answer for meal/water requirements
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Requirement {
    Yes,
    No,
    #[value(name = "?", alias = "unknown")]
    Unknown,
}

impl From<Requirement> for Option<bool> {
    fn from(r: Requirement) -> Self {
        match r {
            Requirement::Yes => Some(true),
            Requirement::No => Some(false),
            Requirement::Unknown => None,
        }
    }
}

fn interval_arg(s: &str) -> std::result::Result<chrono::Duration, String> {
    parse_interval(s).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    medlog_core::logging::init_with_level(level);

    let config = Config::load()?;
    let meds_dir = cli.meds_dir.unwrap_or_else(|| config.data.meds_dir.clone());
    let log_file = cli.log_file.unwrap_or_else(|| config.data.log_file.clone());

    tracing::debug!("Using medicine records in {:?} and dose log {:?}", meds_dir, log_file);

    let registry = MedRegistry::new(meds_dir);
    let log = DoseLog::new(log_file).with_policy(config.log.read_policy());

    match cli.command {
        Some(Commands::Register {
            name,
            dose,
            interval,
            max_per_day,
            with_meal,
            with_water,
        }) => {
            let mut medicine = Medicine::new(name, dose, interval);
            medicine.max_standard_doses_per_day = max_per_day;
            medicine.must_take_with_meal = with_meal.into();
            medicine.must_take_with_water = with_water.into();
            cmd_register(&registry, &medicine)
        }
        Some(Commands::Log {
            medicine,
            dosage,
            time,
            format,
            interactive,
        }) => {
            let format = format.unwrap_or_else(|| config.log.input_time_format.clone());
            let request = LogRequest {
                medicine,
                dosage,
                time,
                format,
            };
            if interactive {
                let stdin = io::stdin();
                let mut prompter = Prompter::new(stdin.lock(), io::stdout());
                cmd_log(&registry, &log, &config, request, Some(&mut prompter))
            } else {
                cmd_log::<io::StdinLock, io::Stdout>(&registry, &log, &config, request, None)
            }
        }
        Some(Commands::Next { name }) => cmd_next(&registry, &log, &config, &name),
        Some(Commands::View {
            medicines,
            ignore_case,
        }) => cmd_view(&registry, &log, &medicines, ignore_case),
        Some(Commands::Find { name, cutoff, max }) => {
            let cutoff = cutoff.map_or(config.matching.cutoff, |c| c as usize);
            let max = max.unwrap_or(config.matching.max_results);
            cmd_find(&registry, &name, cutoff, max)
        }
        None => {
            // Default to printing the whole log
            cmd_view(&registry, &log, &[], false)
        }
    }
}

fn cmd_register(registry: &MedRegistry, medicine: &Medicine) -> Result<()> {
    std::fs::create_dir_all(registry.dir())?;
    registry.register(medicine)?;

    println!("✓ Registered {}", medicine.name);
    println!("  Standard dose: {}", medicine.standard_dose());
    println!(
        "  Every: {}h {}m",
        medicine.time_between_standard_doses.num_hours(),
        medicine.time_between_standard_doses.num_minutes() % 60
    );
    if let Some(max) = medicine.max_standard_doses_per_day {
        println!("  At most {} per day", max);
    }
    Ok(())
}

struct LogRequest {
    medicine: Option<String>,
    dosage: Option<Dosage>,
    time: Option<String>,
    format: String,
}

fn cmd_log<R: BufRead, W: Write>(
    registry: &MedRegistry,
    log: &DoseLog,
    config: &Config,
    request: LogRequest,
    mut prompter: Option<&mut Prompter<R, W>>,
) -> Result<()> {
    if prompter.is_some() {
        // Lookups and registration both need the records directory
        std::fs::create_dir_all(registry.dir())?;
    }

    let medicine = loop {
        let name = match (&request.medicine, prompter.as_deref_mut()) {
            (Some(name), _) => name.clone(),
            (None, Some(p)) => match p.text("Medicine: ")? {
                Some(name) => name,
                None => return Err(Error::Validation("no medicine given".into())),
            },
            (None, None) => {
                return Err(Error::Validation(
                    "--medicine is required unless --interactive is set".into(),
                ))
            }
        };

        match resolve_medicine(registry, config, &name, prompter.as_deref_mut()) {
            Ok(medicine) => break medicine,
            Err(Error::NotFound(_)) => {
                if let Some(p) = prompter.as_deref_mut() {
                    let question = format!("Do you want to register {}?", name);
                    if p.select(&question, &["yes", "no"], false)?.as_deref() == Some("yes") {
                        let medicine = registration::ask_medicine(p, &name)?;
                        cmd_register(registry, &medicine)?;
                        break medicine;
                    }
                    // Ask again only when the name was typed at the prompt
                    if request.medicine.is_none() {
                        continue;
                    }
                }
                return Err(Error::NotFound(name));
            }
            Err(e) => return Err(e),
        }
    };

    let mut dosage = request.dosage;
    let mut time_str = request.time;
    if let Some(p) = prompter.as_deref_mut() {
        if dosage.is_none() {
            dosage = p.parsed(
                &format!(
                    "Dose administered (default: {}): ",
                    medicine.standard_dose()
                ),
                registration::DOSAGE_HELP,
                registration::parse_dosage,
            )?;
        }
        if time_str.is_none() {
            let format = request.format.clone();
            time_str = p
                .parsed(
                    "Time administered (default: current time): ",
                    &format!("Format must match {:?}", format),
                    |s| NaiveDateTime::parse_from_str(s, &format).map(|_| s.to_string()),
                )?;
        }
    }

    let administered_at = time_str
        .map(|s| {
            NaiveDateTime::parse_from_str(&s, &request.format).map_err(|e| {
                Error::Validation(format!(
                    "time {:?} does not match format {:?}: {}",
                    s, request.format, e
                ))
            })
        })
        .transpose()?;

    let (amount, unit) = match dosage {
        Some(d) => (Some(d.amount), Some(d.unit)),
        None => (None, None),
    };

    let entry = log_dose(log, &medicine, amount, unit, administered_at)?;
    println!("✓ Logged: {}", format_line(&entry));

    let next = next_dose(&medicine, log, registry)?;
    println!("{}", next);
    Ok(())
}

/// Exact registry lookup, falling back to near matches
///
/// With a prompter each near match is offered in turn; without one the
/// candidates are listed and the lookup fails.
fn resolve_medicine<R: BufRead, W: Write>(
    registry: &MedRegistry,
    config: &Config,
    name: &str,
    prompter: Option<&mut Prompter<R, W>>,
) -> Result<Medicine> {
    match registry.get(name) {
        Err(Error::NotFound(_)) => {}
        other => return other,
    }

    let matches = registry.find_near_matches(
        name,
        config.matching.max_results,
        Some(config.matching.cutoff),
    )?;

    match prompter {
        Some(p) => {
            println!(
                "An exact match was not found. {} similarly named results were found.",
                matches.len()
            );
            for candidate in matches {
                let question = format!("Did you mean {}?", candidate.medicine.name);
                match p.select(&question, &["yes", "no", "stop asking"], false)?.as_deref() {
                    Some("yes") => return Ok(candidate.medicine),
                    Some("no") => continue,
                    _ => break,
                }
            }
        }
        None if !matches.is_empty() => {
            eprintln!("No medicine named {:?} is registered. Did you mean:", name);
            for candidate in &matches {
                eprintln!("  {}", candidate.medicine.name);
            }
        }
        None => {}
    }

    Err(Error::NotFound(name.to_string()))
}

fn cmd_next(registry: &MedRegistry, log: &DoseLog, config: &Config, name: &str) -> Result<()> {
    let medicine = resolve_medicine::<io::StdinLock, io::Stdout>(registry, config, name, None)?;
    let next = next_dose(&medicine, log, registry)?;
    println!("{}: {}", medicine.name, next);
    Ok(())
}

fn cmd_view(
    registry: &MedRegistry,
    log: &DoseLog,
    names: &[String],
    ignore_case: bool,
) -> Result<()> {
    let medicines = names
        .iter()
        .map(|name| registry.get(name))
        .collect::<Result<Vec<_>>>()?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let count = print_filtered(&medicines, log, registry, ignore_case, &mut out)?;
    if count == 0 {
        writeln!(out, "No matching doses logged.")?;
    }
    Ok(())
}

fn cmd_find(registry: &MedRegistry, name: &str, cutoff: usize, max: usize) -> Result<()> {
    let matches = registry.find_near_matches(name, max, Some(cutoff))?;
    if matches.is_empty() {
        println!("No near matches for {:?}", name);
        return Ok(());
    }

    for candidate in matches {
        println!("{}\t{}", candidate.score, candidate.medicine.name);
    }
    Ok(())
}
