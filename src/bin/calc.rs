//! calc: command-line client for calcd.
//!
//! Issues each call shape against calcd. `calc demo` runs them all in turn.

use std::time::Duration;

use clap::{Parser, Subcommand};
use futures_util::StreamExt;

use calcrpc::client::ServiceClient;

/// calcd CLI client
#[derive(Parser)]
#[command(name = "calc")]
#[command(version = calcrpc::PKG_VERSION)]
#[command(about = "Calculator gRPC client")]
struct Args {
    /// Server address
    #[arg(
        short,
        long,
        env = "CALCD_ADDRESS",
        default_value = "http://127.0.0.1:50051"
    )]
    address: String,

    /// Deadline for each call, in seconds
    #[arg(short, long, default_value_t = 100)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Multiply a number by ten (unary)
    TimesTen {
        #[arg(allow_hyphen_values = true)]
        number: i32,
    },

    /// Stream the prime factors of a number (server streaming)
    Decompose { number: i32 },

    /// Average a list of numbers (client streaming)
    Average {
        #[arg(required = true, allow_hyphen_values = true)]
        numbers: Vec<f32>,
    },

    /// Report every new maximum in a list of numbers (bidirectional streaming)
    Maximum {
        #[arg(required = true, allow_hyphen_values = true)]
        numbers: Vec<i32>,
        /// Pause between sent numbers, in milliseconds
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },

    /// Add two numbers on a slow server with a short deadline
    Deadline {
        #[arg(allow_hyphen_values = true)]
        a: i32,
        #[arg(allow_hyphen_values = true)]
        b: i32,
        /// Deadline in milliseconds
        #[arg(long, default_value_t = 2000)]
        deadline_ms: u64,
    },

    /// Run every call with the sample inputs
    Demo {
        /// Pause between numbers in the bidirectional call, in milliseconds
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    let client = ServiceClient::connect(&args.address)
        .await?
        .with_timeout(Duration::from_secs(args.timeout_secs));

    match args.command {
        Command::TimesTen { number } => {
            println!("{}", client.times_ten(number).await?);
        }

        Command::Decompose { number } => {
            let mut factors = std::pin::pin!(client.decompose_stream(number).await?);
            while let Some(factor) = factors.next().await {
                println!("{}", factor?);
            }
        }

        Command::Average { numbers } => {
            println!("{}", client.compute_average(numbers).await?);
        }

        Command::Maximum {
            numbers,
            interval_ms,
        } => {
            let mut maxima = std::pin::pin!(
                client
                    .find_maximum_stream(numbers, Duration::from_millis(interval_ms))
                    .await?
            );
            while let Some(max) = maxima.next().await {
                println!("{}", max?);
            }
        }

        Command::Deadline { a, b, deadline_ms } => {
            let sum = client
                .calculate_with_timeout(a, b, Duration::from_millis(deadline_ms))
                .await?;
            println!("{sum}");
        }

        Command::Demo { interval_ms } => {
            run_demo(&client, Duration::from_millis(interval_ms)).await?;
        }
    }

    Ok(())
}

/// Exercise every call shape with the sample inputs.
async fn run_demo(client: &ServiceClient, interval: Duration) -> calcrpc::Result<()> {
    println!("TimesTen(100)");
    println!("  result: {}", client.times_ten(100).await?);

    println!("Decompose(4780)");
    let mut factors = std::pin::pin!(client.decompose_stream(4780).await?);
    while let Some(factor) = factors.next().await {
        println!("  factor: {}", factor?);
    }

    println!("ComputeAverage([1, 3, 5, 7])");
    let average = client.compute_average([1.0, 3.0, 5.0, 7.0]).await?;
    println!("  average: {average}");

    println!("FindMaximum([1, 5, 2, 53, 532, 64])");
    let mut maxima = std::pin::pin!(
        client
            .find_maximum_stream(vec![1, 5, 2, 53, 532, 64], interval)
            .await?
    );
    while let Some(max) = maxima.next().await {
        println!("  maximum: {}", max?);
    }

    println!("CalculateWithDeadline(3, 4)");
    match client.calculate_with_deadline(3, 4).await {
        Ok(sum) => println!("  sum: {sum}"),
        Err(e) if e.is_cancellation() => println!("  cancelled: {e}"),
        Err(e) => return Err(e),
    }

    Ok(())
}
