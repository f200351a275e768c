use clap::{Parser, ValueEnum};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

#[derive(Parser)]
#[command(name = "load-tester")]
#[command(about = "Drive traffic against the gateway's guarded endpoints", long_about = None)]
struct Cli {
    /// Phase label, e.g. initial | during-chaos | final
    phase: String,

    #[arg(long, value_enum)]
    task: Task,

    /// Number of calls for the circuit task
    #[arg(long, default_value_t = 10)]
    count: u32,

    #[arg(short, long, default_value = "http://localhost:80")]
    url: String,

    /// Directory for the per-run log file
    #[arg(long, default_value = "load-logs")]
    out_dir: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
enum Task {
    /// Many calls to /circuit?mode=chaos
    Circuit,
    /// One call to /retries?mode=chaos
    Retries,
}

impl Task {
    fn name(self) -> &'static str {
        match self {
            Task::Circuit => "circuit",
            Task::Retries => "retries",
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tokio::fs::create_dir_all(&cli.out_dir).await?;
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)?
        .as_secs();
    let log_path = cli.out_dir.join(format!("{}_{}_{}.log", cli.phase, cli.task.name(), timestamp));

    println!("[load_tester] Phase: {} | Task: {}", cli.phase, cli.task.name());
    println!("[load_tester] Writing: {}", log_path.display());

    let mut log = LogFile::open(&log_path).await?;
    match cli.task {
        Task::Circuit => circuit_task(&cli.url, cli.count, &mut log).await?,
        Task::Retries => retries_task(&cli.url, &mut log).await?,
    }

    println!("[load_tester] Done.");
    Ok(())
}

struct LogFile(tokio::fs::File);

impl LogFile {
    async fn open(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path).await?;
        Ok(Self(file))
    }

    async fn line(&mut self, line: String) -> std::io::Result<()> {
        self.0.write_all(line.as_bytes()).await?;
        self.0.write_all(b"\n").await
    }
}

async fn circuit_task(
    url: &str,
    count: u32,
    log: &mut LogFile,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = reqwest::Client::builder().timeout(Duration::from_secs(5)).build()?;

    for _ in 0..count {
        let start = Instant::now();
        let result = client.get(format!("{}/circuit?mode=chaos", url)).send().await;
        let took = start.elapsed().as_secs_f64();

        let pause = match result {
            Ok(res) => match res.status().as_u16() {
                200 => {
                    log.line(format!("200 OK in {:.2}s", took)).await?;
                    Duration::from_millis(300)
                }
                503 => {
                    log.line(format!("503 CIRCUIT OPEN in {:.2}s", took)).await?;
                    Duration::from_millis(500)
                }
                status => {
                    log.line(format!("{} FAILURE in {:.2}s", status, took)).await?;
                    Duration::from_millis(800)
                }
            },
            Err(_) => {
                log.line(format!("NO RESPONSE / TIMEOUT in {:.2}s", took)).await?;
                Duration::from_secs(1)
            }
        };
        tokio::time::sleep(pause).await;
    }
    Ok(())
}

async fn retries_task(url: &str, log: &mut LogFile) -> Result<(), Box<dyn std::error::Error>> {
    // Enough room for every attempt, its timeout and the waits in between
    let client = reqwest::Client::builder().timeout(Duration::from_secs(60)).build()?;

    let start = Instant::now();
    match client.get(format!("{}/retries?mode=chaos", url)).send().await {
        Ok(res) => {
            let status = res.status();
            let took = start.elapsed().as_secs_f64();
            let delays = match res.json::<Value>().await {
                Ok(body) => match body.get("delays") {
                    Some(Value::Array(d)) if !d.is_empty() => {
                        format!(" (delays={})", Value::Array(d.clone()))
                    }
                    _ => String::new(),
                },
                Err(_) => String::new(),
            };
            if status.is_success() {
                log.line(format!("200 OK in {:.2}s{}", took, delays)).await?;
            } else {
                log.line(format!("{} FAILURE in {:.2}s{}", status.as_u16(), took, delays)).await?;
            }
        }
        Err(_) => {
            let took = start.elapsed().as_secs_f64();
            log.line(format!("NO RESPONSE / TIMEOUT in {:.2}s", took)).await?;
        }
    }
    Ok(())
}
