use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};

use billing_aws::diagnostics::{AccessCheck, check_access};
use billing_aws::{CostExplorerProvider, ExplorerConfig};
use billing_core::{
    CostAmount, CurrencyConverter, DEFAULT_USD_TO_INR, fetch_cost_report, fetch_trend_report,
    resolve_period, trend_window,
};

#[derive(Parser, Debug)]
#[command(name = "billing-cli")]
#[command(about = "AWS billing dashboard terminal client", long_about = None)]
struct Args {
    /// Override AWS region (Cost Explorer is served from us-east-1)
    #[arg(long, default_value = "us-east-1")]
    region: String,

    /// AWS shared config profile to load credentials from
    #[arg(long)]
    profile: Option<String>,

    /// USD to INR rate for the secondary currency column
    #[arg(long, default_value_t = DEFAULT_USD_TO_INR)]
    inr_rate: f64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Monthly cost report with a per-service breakdown
    Report {
        /// Month to report on (YYYY-MM, defaults to the current month)
        #[arg(long)]
        month: Option<String>,

        /// Print the raw JSON contract instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Total cost trend over trailing months
    Trend {
        /// Number of trailing months (defaults to 6, clamped to 2..=12)
        #[arg(long)]
        months: Option<i64>,

        /// Print the raw JSON contract instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Verify credentials and Cost Explorer access
    CheckAccess,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = ExplorerConfig::from_env(args.region, args.profile);
    let converter = CurrencyConverter::new(args.inr_rate);
    let today = Utc::now().date_naive();

    match args.command {
        Command::Report { month, json } => {
            let range = resolve_period(month.as_deref(), today)?;
            let provider = CostExplorerProvider::connect(&config).await;
            let report = fetch_cost_report(&provider, range).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }

            println!("AWS Billing Dashboard\n");
            println!("Month: {} ({})", report.month, report.month.label());
            println!(
                "Total cost: {} ({})",
                usd(report.total_cost),
                inr(&converter, report.total_cost)
            );

            println!("\nBreakdown by service:");
            for entry in &report.services {
                println!(
                    "- {}: {} ({})",
                    entry.name,
                    usd(entry.cost),
                    inr(&converter, entry.cost)
                );
            }
        }
        Command::Trend { months, json } => {
            let ranges = trend_window(months, today);
            let provider = CostExplorerProvider::connect(&config).await;
            let points = fetch_trend_report(&provider, &ranges).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&points)?);
                return Ok(());
            }

            println!("Cost trend over {} months:\n", points.len());
            for point in &points {
                println!(
                    "- {} ({}): {} ({})",
                    point.month,
                    point.formatted_month,
                    usd(point.total_cost),
                    inr(&converter, point.total_cost)
                );
            }
        }
        Command::CheckAccess => {
            let check = check_access(&config, today).await;
            print_check(&check);
            if !check.all_passed() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn usd(amount: CostAmount) -> String {
    match amount.value() {
        Some(value) => format!("${value:.2}"),
        None => "N/A".to_string(),
    }
}

fn inr(converter: &CurrencyConverter, amount: CostAmount) -> String {
    match converter.convert(amount).value() {
        Some(value) => format!("₹{value:.2}"),
        None => "N/A".to_string(),
    }
}

fn print_check(check: &AccessCheck) {
    println!("AWS access check\n");
    match &check.identity {
        Ok(identity) => {
            println!("Credentials: OK");
            println!("- ARN: {}", identity.arn);
            println!("- Account: {}", identity.account);
            println!("- UserId: {}", identity.user_id);
        }
        Err(err) => println!("Credentials: FAILED ({err})"),
    }
    match &check.service_dimension {
        Ok(count) => println!("Cost Explorer dimensions: OK ({count} services visible)"),
        Err(err) => println!("Cost Explorer dimensions: FAILED ({err})"),
    }
    match &check.previous_month_total {
        Ok(total) => println!("Previous month total: {}", usd(*total)),
        Err(err) => println!("Previous month total: FAILED ({err})"),
    }
}
