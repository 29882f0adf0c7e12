use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use spotfetch::ledger::is_plain_name;
use spotfetch::{Ledger, ProcessResult, audit, hash_file, ledger_path, probe, reconcile};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Where Windows keeps the Spotlight lock screen pictures, below the local app data folder.
const SPOTLIGHT_ASSETS: &str =
    "Packages/Microsoft.Windows.ContentDeliveryManager_cw5n1h2txyewy/LocalState/Assets";

#[derive(Parser, Debug)]
#[command(
    name = "spotfetch",
    version,
    about = "Copy new wallpaper pictures into a folder, skipping ones it already has"
)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// No log output at all
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    fetch: FetchArgs,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Copy new pictures from the origin into the destination (default)
    Fetch(FetchArgs),

    /// Check the destination's ledger against the files on disk
    Verify {
        /// Destination folder holding CheckSums.txt
        #[arg(short, long, value_name = "DIR", env = "SPOTFETCH_DEST")]
        dest: Option<PathBuf>,
    },

    /// Rename a copied picture and keep its ledger entry
    Rename {
        /// Destination folder holding CheckSums.txt
        #[arg(short, long, value_name = "DIR", env = "SPOTFETCH_DEST")]
        dest: Option<PathBuf>,
        /// Current file name
        old: String,
        /// New file name
        new: String,
    },
}

#[derive(Args, Debug, Default)]
struct FetchArgs {
    /// Folder to copy from (default: the Windows Spotlight assets folder)
    #[arg(short, long, value_name = "DIR", env = "SPOTFETCH_ORIGIN")]
    origin: Option<PathBuf>,

    /// Folder to copy into (default: current directory)
    #[arg(short, long, value_name = "DIR", env = "SPOTFETCH_DEST")]
    dest: Option<PathBuf>,

    /// Print the run result as JSON
    #[arg(long)]
    json: bool,

    /// Ask for the destination when none is given
    #[arg(short, long)]
    interactive: bool,

    /// Wait for Enter before exiting
    #[arg(long)]
    pause: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    match cli.command {
        None => fetch(cli.fetch, cli.verbose),
        Some(Commands::Fetch(args)) => fetch(args, cli.verbose),
        Some(Commands::Verify { dest }) => verify(&dest.unwrap_or_else(current_dir)),
        Some(Commands::Rename { dest, old, new }) => {
            rename(&dest.unwrap_or_else(current_dir), &old, &new)
        }
    }
}

fn fetch(args: FetchArgs, verbose: u8) -> Result<()> {
    let origin = match args.origin {
        Some(origin) => origin,
        None => default_origin()?,
    };
    let dest = match args.dest {
        Some(dest) => dest,
        None if args.interactive => prompt_destination()?,
        None => current_dir(),
    };

    let spinner = if args.json || verbose > 0 {
        ProgressBar::hidden()
    } else {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    };
    spinner.set_message("Copying new pictures…");

    let (result, elapsed) = timed(|| reconcile(&origin, &dest));
    spinner.finish_and_clear();
    let result = result.with_context(|| {
        format!(
            "Failed to copy pictures from {} to {}",
            origin.display(),
            dest.display()
        )
    })?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_summary(&result, elapsed);
    }

    if args.pause {
        pause()?;
    }
    Ok(())
}

fn print_summary(result: &ProcessResult, elapsed: Duration) {
    println!("▶ Origin folder:      {}", result.origin.display());
    println!("▶ Destination folder: {}", result.destination.display());

    if result.new_files.is_empty() {
        println!("\nNo new pictures found.");
    } else {
        println!();
        for file in &result.new_files {
            println!(
                "   📥 {} ({}x{}, {})",
                file.name(),
                file.width(),
                file.height(),
                file.format().as_str()
            );
        }
    }

    let stats = &result.stats;
    if stats.healed > 0 {
        println!("\n🩹 Added {} untracked picture(s) to the ledger", stats.healed);
    }
    let failures = stats.hash_failures + stats.copy_failures;
    if failures > 0 {
        println!(
            "\n⚠️  {} file(s) could not be read or copied; they will be retried next run",
            failures
        );
    }
    println!(
        "\n✅ {} new picture(s) copied ({} kb), {} already known ⏱ {:.2?}",
        stats.copied,
        stats.copied_bytes / 1024,
        result.existing.len(),
        elapsed
    );
}

fn verify(dest: &Path) -> Result<()> {
    let ledger_file = ledger_path(dest);
    let ledger = Ledger::load(&ledger_file)?;

    let bar = ProgressBar::new(ledger.len() as u64);
    bar.set_style(ProgressStyle::with_template(
        "{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}",
    )?);
    let problems = audit(dest, &ledger, |name| {
        bar.set_message(name.to_string());
        bar.inc(1);
    })
    .with_context(|| format!("Failed to verify {}", dest.display()))?;
    bar.finish_and_clear();

    if problems.is_empty() {
        println!(
            "✅ {} matches the {} picture(s) in {}",
            ledger_file.display(),
            ledger.len(),
            dest.display()
        );
        return Ok(());
    }

    println!("🗂️  Ledger problems in {}:", dest.display());
    for problem in &problems {
        println!("   ⚠️  {problem}");
    }
    anyhow::bail!("{} problem(s) found", problems.len())
}

fn rename(dest: &Path, old: &str, new: &str) -> Result<()> {
    for name in [old, new] {
        if !is_plain_name(name) {
            anyhow::bail!("{name:?} is not a plain file name");
        }
    }
    if new.contains(':') {
        anyhow::bail!("{new:?} contains ':', which the ledger cannot store");
    }
    if dest.join(new).exists() {
        anyhow::bail!("{} already exists", dest.join(new).display());
    }

    let ledger_file = ledger_path(dest);
    let mut ledger = Ledger::load(&ledger_file)?;

    let image = probe(dest, old)
        .with_context(|| format!("{} is not a picture in {}", old, dest.display()))?;
    let renamed = image
        .renamed(new)
        .with_context(|| format!("Failed to rename {:?} → {:?}", old, new))?;

    if !ledger.rename_entry(old, new) {
        let hash = hash_file(&renamed.full_path())
            .with_context(|| format!("Failed to hash {}", renamed.full_path().display()))?;
        ledger.insert(new, hash.fingerprint);
    }
    ledger.save(&ledger_file)?;

    println!("✏️  Renamed {} → {}", old, renamed.name());
    Ok(())
}

fn default_origin() -> Result<PathBuf> {
    dirs::data_local_dir()
        .map(|dir| dir.join(SPOTLIGHT_ASSETS))
        .context("Cannot locate the local app data folder; pass --origin")
}

fn current_dir() -> PathBuf {
    PathBuf::from(".")
}

fn prompt_destination() -> Result<PathBuf> {
    let answer = Input::<String>::new()
        .with_prompt("Destination folder")
        .default(".".to_string())
        .interact_text()
        .context("Failed to read the destination folder")?;
    Ok(PathBuf::from(answer.trim()))
}

fn pause() -> Result<()> {
    if !std::io::stdin().is_terminal() {
        return Ok(());
    }
    Input::<String>::new()
        .with_prompt("Press Enter to continue")
        .allow_empty(true)
        .interact_text()?;
    Ok(())
}

fn setup_logging(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        match verbose {
            0 => tracing_subscriber::EnvFilter::new("warn"),
            1 => tracing_subscriber::EnvFilter::new("info"),
            2 => tracing_subscriber::EnvFilter::new("debug"),
            _ => tracing_subscriber::EnvFilter::new("trace"),
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Run `f()` and return its result together with how long it took.
fn timed<T, F: FnOnce() -> T>(f: F) -> (T, Duration) {
    let start = Instant::now();
    let result = f();
    (result, start.elapsed())
}
