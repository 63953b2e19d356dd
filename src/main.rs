//! content-access CLI
//!
//! Fetches a URL, escalating through strategy combinations until a response
//! with a non-error status comes back.

use std::io::{self, Read};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use clap::{Parser, ValueEnum};
use console::style;
use http::Method;
use once_cell::sync::Lazy;
use regex::Regex;

use content_access_strategies::{
    EventHandler, RequestSpec, RunOutcome, Strategist, StrategistEvent, SuccessfulRun,
};

static KEY_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^((?:\\=|[^=])+?)=(.+)$").expect("valid key=value regex"));

#[derive(Clone, Copy, Debug, ValueEnum)]
#[value(rename_all = "UPPER")]
enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    Trace,
}

impl From<HttpMethod> for Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Head => Method::HEAD,
            HttpMethod::Options => Method::OPTIONS,
            HttpMethod::Trace => Method::TRACE,
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(name = "content-access", version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Args {
    /// Target URL, including its scheme
    url: String,

    /// Query parameter, repeatable
    #[arg(short, long = "params", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    params: Vec<(String, String)>,

    /// Request header, repeatable
    #[arg(long = "headers", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    headers: Vec<(String, String)>,

    #[arg(short, long, value_enum, ignore_case = true, default_value = "GET")]
    method: HttpMethod,

    /// Request body; `-` reads it from stdin
    #[arg(short = 'd', long = "data", value_name = "DATA")]
    data: Option<String>,

    /// Timeout in seconds
    #[arg(short, long, value_parser = parse_timeout)]
    timeout: Option<Duration>,

    /// Skip TLS certificate verification
    #[arg(short = 'k', long = "no-verify")]
    no_verify: bool,

    #[arg(long = "disallow-redirects")]
    disallow_redirects: bool,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let captures = KEY_VALUE
        .captures(raw)
        .ok_or_else(|| format!("expected KEY=VALUE, got {raw:?}"))?;
    let key = captures[1].replace("\\=", "=");
    Ok((key, captures[2].to_string()))
}

fn parse_timeout(raw: &str) -> Result<Duration, String> {
    let seconds: f64 = raw
        .parse()
        .map_err(|_| format!("invalid timeout {raw:?}"))?;
    Duration::try_from_secs_f64(seconds).map_err(|err| format!("invalid timeout {raw:?}: {err}"))
}

fn read_body(data: &str) -> io::Result<Bytes> {
    if data == "-" {
        let mut buffer = Vec::new();
        io::stdin().read_to_end(&mut buffer)?;
        Ok(Bytes::from(buffer))
    } else {
        Ok(Bytes::copy_from_slice(data.as_bytes()))
    }
}

fn build_request(args: Args) -> io::Result<RequestSpec> {
    let mut builder = RequestSpec::builder(args.url)
        .method(args.method.into())
        .verify(!args.no_verify)
        .allow_redirects(!args.disallow_redirects);

    for (key, value) in args.params {
        builder = builder.param(key, value);
    }
    for (key, value) in args.headers {
        builder = builder.header(key, value);
    }
    if let Some(timeout) = args.timeout {
        builder = builder.timeout(timeout);
    }
    if let Some(data) = args.data.as_deref() {
        builder = builder.body(read_body(data)?);
    }

    Ok(builder.build())
}

fn running_line(strategies: &[String]) -> String {
    if strategies.is_empty() {
        "Running using no strategy(s).".to_string()
    } else {
        format!("Running using '{}' strategy(s).", strategies.join("', '"))
    }
}

/// Prints run progress to the terminal.
struct ConsoleReporter;

impl EventHandler for ConsoleReporter {
    fn handle(&self, event: &StrategistEvent) {
        match event {
            StrategistEvent::CandidateStarted(candidate) => {
                println!("On combination {}:", candidate.index);
                println!("\t{}", style(running_line(&candidate.strategies)).yellow());
            }
            StrategistEvent::StrategyExecuting(strategy) => {
                println!(
                    "\t\tExecuting '{}', goal: {}",
                    strategy.strategy, strategy.goal
                );
            }
            StrategistEvent::StrategyFailed(failure) => {
                println!(
                    "\t\t{} failed due to {}",
                    failure.strategy, failure.reason
                );
            }
            StrategistEvent::AttemptFinished(attempt) => {
                let applied = if attempt.applied.is_empty() {
                    "no strategy".to_string()
                } else {
                    format!("'{}'", attempt.applied.join("', '"))
                };
                if attempt.success {
                    println!(
                        "\t{}",
                        style(format!("Obtained valid response using {applied}")).green()
                    );
                } else {
                    let cause = match (attempt.status, &attempt.error) {
                        (Some(status), _) => format!("status {status}"),
                        (None, Some(error)) => error.clone(),
                        (None, None) => "unknown error".to_string(),
                    };
                    println!(
                        "\t{}",
                        style(format!(
                            "Failed to obtain valid response using {applied} ({cause})"
                        ))
                        .red()
                    );
                }
            }
            StrategistEvent::RunFinished(_) => {}
        }
    }
}

fn print_summary(run: &SuccessfulRun) {
    println!();
    for line in run.response.explanation_lines() {
        println!("{line}");
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let request = match build_request(args) {
        Ok(request) => request,
        Err(err) => {
            eprintln!("{}", style(format!("failed to read request body: {err}")).red());
            return ExitCode::from(1);
        }
    };

    let strategist = Strategist::builder()
        .with_event_handler(Arc::new(ConsoleReporter))
        .build();

    match strategist.run(&request).await {
        Ok(RunOutcome::Success(run)) => {
            print_summary(&run);
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::Exhausted { .. }) => {
            println!("{}", style("Nothing worked :/.").red());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}", style(err).red());
            ExitCode::from(1)
        }
    }
}
