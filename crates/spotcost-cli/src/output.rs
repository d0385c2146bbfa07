//! Rendering of engine results in the selected output format

use anyhow::Result;
use console::style;
use serde::Serialize;
use spotcost_optimization::{Chain, CostQuote, JobEstimateReport, PlacementResponse};

use crate::cli::OutputFormat;

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Cost with the currency symbol and four decimals
pub fn money(currency: &str, value: f64) -> String {
    format!("{}{:.4}", currency, value)
}

/// Start hour as `HH:MM`
pub fn clock(start_hour: f64) -> String {
    let minutes = (start_hour * 60.0).round() as u64;
    format!("{:02}:{:02}", (minutes / 60) % 24, minutes % 60)
}

pub fn print_placement(response: &PlacementResponse, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(response),
        OutputFormat::Plain => {
            let chain = &response.chain;
            println!(
                "{} {} {} {} {} {} {:.4}",
                chain.storage_region,
                chain.compute_region,
                chain.instance_type,
                chain.start_hour,
                chain.parallel_factor,
                chain.duration_hours,
                chain.total_cost
            );
            Ok(())
        }
        OutputFormat::Table => {
            let chain = &response.chain;
            let currency = response.currency.as_str();

            println!("{}", style("Placement").cyan().bold());
            println!("==========");
            println!("  Run:         {}", response.run_id);
            println!("  Provider:    {}", response.provider);
            println!("  Confidence:  {}%", response.confidence_level);
            println!("  Storage SKU: {}", response.storage_sku);
            println!("  Candidates:  {}", response.candidate_count);
            println!();
            println!("  Storage:     {}", chain.storage_region);
            println!(
                "  Compute:     {} x{} in {}",
                chain.instance_type, chain.parallel_factor, chain.compute_region
            );
            println!(
                "  Start:       {} UTC for {:.2}h",
                clock(chain.start_hour),
                chain.duration_hours
            );
            println!();
            println!("{}", style("Cost breakdown").bold());
            println!("  Storage:     {}", money(currency, chain.breakdown.storage));
            println!("  Transfer:    {}", money(currency, chain.breakdown.transfer));
            println!(
                "  Compute:     {} ({} - {})",
                money(currency, chain.breakdown.compute_mean),
                money(currency, chain.breakdown.compute_low),
                money(currency, chain.breakdown.compute_high)
            );
            println!(
                "  Total:       {}",
                style(money(currency, chain.breakdown.total)).green().bold()
            );

            if response.alternatives.len() > 1 {
                println!();
                println!("{}", style("Alternatives").bold());
                print_chains_table(&response.alternatives, currency);
            }
            Ok(())
        }
    }
}

fn print_chains_table(chains: &[Chain], currency: &str) {
    println!(
        "{:16} {:16} {:16} {:6} {:4} {:12}",
        style("STORAGE").bold().underlined(),
        style("COMPUTE").bold().underlined(),
        style("INSTANCE").bold().underlined(),
        style("START").bold().underlined(),
        style("X").bold().underlined(),
        style("TOTAL").bold().underlined()
    );
    for chain in chains {
        println!(
            "{:16} {:16} {:16} {:6} {:4} {:12}",
            chain.storage_region,
            chain.compute_region,
            chain.instance_type,
            clock(chain.start_hour),
            chain.parallel_factor,
            money(currency, chain.total_cost)
        );
    }
}

pub fn print_estimates(report: &JobEstimateReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Plain => {
            for estimate in &report.estimates {
                println!(
                    "{} {} {} {} {:.4} {:.4} {:.4}",
                    estimate.instance_type,
                    estimate.region,
                    estimate.start_hour,
                    estimate.duration_hours,
                    estimate.cost_low,
                    estimate.cost_mean,
                    estimate.cost_high
                );
            }
            Ok(())
        }
        OutputFormat::Table => {
            let currency = report.currency.as_str();
            println!();
            println!(
                "{:16} {:16} {:6} {:8} {:12} {:12} {:12}",
                style("INSTANCE").bold().underlined(),
                style("REGION").bold().underlined(),
                style("START").bold().underlined(),
                style("HOURS").bold().underlined(),
                style("LOW").bold().underlined(),
                style("MEAN").bold().underlined(),
                style("HIGH").bold().underlined()
            );
            for estimate in &report.estimates {
                println!(
                    "{:16} {:16} {:6} {:8.2} {:12} {:12} {:12}",
                    estimate.instance_type,
                    estimate.region,
                    clock(estimate.start_hour),
                    estimate.duration_hours,
                    money(currency, estimate.cost_low),
                    money(currency, estimate.cost_mean),
                    money(currency, estimate.cost_high)
                );
            }

            let totals = &report.totals;
            println!();
            println!(
                "Total: {} ({} - {}) over {:.2}h",
                style(money(currency, totals.cost_mean)).green().bold(),
                money(currency, totals.cost_low),
                money(currency, totals.cost_high),
                totals.duration_hours
            );

            match &report.storage {
                Some(storage) => println!(
                    "Storage: {} in {} for {} + transfer {} = {}",
                    storage.sku,
                    storage.region,
                    money(currency, storage.storage_cost),
                    money(currency, storage.transfer_cost),
                    money(currency, storage.total)
                ),
                None => println!("Storage: {}", style("no region offers the SKU").yellow()),
            }
            Ok(())
        }
    }
}

pub fn print_slots(quotes: &[CostQuote], currency: &str, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(&quotes),
        OutputFormat::Plain => {
            for quote in quotes {
                println!(
                    "{} {} {} {:.4} {:.4} {:.4}",
                    quote.start_hour,
                    quote.parallel_factor,
                    quote.duration_hours,
                    quote.cost_low,
                    quote.cost_mean,
                    quote.cost_high
                );
            }
            Ok(())
        }
        OutputFormat::Table => {
            if quotes.is_empty() {
                println!("No usable slots.");
                return Ok(());
            }
            println!();
            println!(
                "{:6} {:4} {:8} {:12} {:12} {:12}",
                style("START").bold().underlined(),
                style("X").bold().underlined(),
                style("HOURS").bold().underlined(),
                style("LOW").bold().underlined(),
                style("MEAN").bold().underlined(),
                style("HIGH").bold().underlined()
            );
            for quote in quotes {
                println!(
                    "{:6} {:4} {:8.2} {:12} {:12} {:12}",
                    clock(quote.start_hour),
                    quote.parallel_factor,
                    quote.duration_hours,
                    money(currency, quote.cost_low),
                    money(currency, quote.cost_mean),
                    money(currency, quote.cost_high)
                );
            }
            Ok(())
        }
    }
}
