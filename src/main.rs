use anyhow::Result;
use clap::Parser;
use fragua::cli::{Cli, OutputFormat};
use fragua::compilation::Compilation;
use fragua::parser::LogParser;
use fragua::{csv_output, filter, json_output, stats};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Print one line per compilation: signature, method, optional elapsed time
fn print_listing(selected: &[&Compilation], timing: bool) {
    for compilation in selected {
        let method = compilation.method().unwrap_or("?");
        let elapsed = compilation.compile_time();
        if timing && elapsed != 0 {
            println!(
                "{}  {} <{:.3}>",
                compilation.signature(),
                method,
                elapsed as f64 / 1_000.0
            );
        } else {
            println!("{}  {}", compilation.signature(), method);
        }
    }
}

/// Serialize the selected compilations as a JSON report (Sprint 5)
fn print_json(selected: &[&Compilation]) -> Result<()> {
    let mut output = json_output::JsonOutput::new();
    for compilation in selected {
        output.add_compilation(compilation);
    }
    println!("{}", output.to_json()?);
    Ok(())
}

/// Serialize the selected compilations as CSV rows (Sprint 5)
fn print_csv(selected: &[&Compilation], timing: bool) {
    let mut output = csv_output::CsvOutput::new(timing);
    for compilation in selected {
        output.add_compilation(csv_output::CsvCompilation::from_compilation(compilation));
    }
    print!("{}", output.to_csv());
}

/// Aggregate per-compiler statistics and render them in the requested format (Sprint 4)
fn print_statistics(selected: &[&Compilation], args: &Cli) -> Result<()> {
    let mut tracker = stats::StatsTracker::new();
    for compilation in selected {
        tracker.record(compilation);
    }

    match args.format {
        OutputFormat::Text => {
            tracker.print_summary();
            if args.stats_extended {
                tracker.print_extended_summary(args.anomaly_threshold);
            }
        }
        // The JSON envelope already carries the aggregate summary block
        OutputFormat::Json => print_json(selected)?,
        OutputFormat::Csv => {
            // Same ordering as the text table: count descending, name breaks ties
            let mut sorted: Vec<_> = tracker.stats_map().iter().collect();
            sorted.sort_by(|a, b| b.1.count.cmp(&a.1.count).then_with(|| a.0.cmp(b.0)));

            let mut output = csv_output::CsvStatsOutput::new();
            for (name, group) in sorted {
                output.add_stat(csv_output::CsvCompilerStat {
                    compiler: name.clone(),
                    compiles: group.count,
                    native_bytes: group.total_native_size,
                    total_time_ms: Some(group.total_time_ms),
                });
            }
            print!("{}", output.to_csv(args.timing));
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // --stats-extended decorates the -c summary table
    if args.stats_extended && !args.statistics {
        anyhow::bail!("--stats-extended requires -c/--summary");
    }

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);

    // Combine repeated -e expressions into one conjunction
    let filter = if args.filter.is_empty() {
        filter::CompilationFilter::all()
    } else {
        filter::CompilationFilter::from_exprs(&args.filter)?
    };

    let mut parser = LogParser::new();
    let summary = parser.parse_file(&args.log)?;
    let compilations = parser.into_compilations();

    eprintln!(
        "[fragua: parsed {} compilations from {} lines]",
        compilations.len(),
        summary.lines_seen
    );
    if summary.lines_skipped > 0 {
        eprintln!(
            "[fragua: skipped {} non-element lines]",
            summary.lines_skipped
        );
    }
    if summary.records_dropped > 0 {
        eprintln!(
            "[fragua: dropped {} records without a routable compile_id]",
            summary.records_dropped
        );
    }

    let selected: Vec<&Compilation> = compilations
        .iter()
        .filter(|compilation| filter.matches(compilation))
        .collect();

    if args.statistics {
        print_statistics(&selected, &args)?;
    } else {
        match args.format {
            OutputFormat::Text => print_listing(&selected, args.timing),
            OutputFormat::Json => print_json(&selected)?,
            OutputFormat::Csv => print_csv(&selected, args.timing),
        }
    }

    Ok(())
}
