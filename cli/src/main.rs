use clap::Parser;
use colored::*;
use std::io::Write;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use reconhunt_core::{
    init_logger, load_targets, ConsoleSink, Deadline, Finding, HttpClient, PipelineError,
    ResultAggregator, ScanConfig, ScanEngine, Target,
};

#[derive(Parser, Debug)]
#[command(
    name = "reconhunt",
    version,
    about = "Web attack-surface discovery and vulnerability probing",
    override_usage = "reconhunt <target>  <options>",
    after_help = "\x1b[1;36mEXAMPLES:\x1b[0m
  Quick scan:                     reconhunt https://target.com
  Verbose + bigger pool:          reconhunt https://target.com -v -c 30
  Aggressive with wordlists:      reconhunt https://target.com -A --wordlists ./wordlists
  Archive URLs (gau/wayback):     reconhunt https://target.com --external
  With proxy (Burp):              reconhunt https://target.com --proxy http://127.0.0.1:8080
  Custom headers:                 reconhunt https://target.com -H \"Cookie: sess=abc\"
  Scan from file, 10 min budget:  reconhunt -l targets.txt --max-time 600 -o scan.json
  Dry-run test:                   reconhunt https://target.com --dry-run"
)]
pub struct Args {
    #[arg(required_unless_present = "list")]
    pub target: Option<String>,

    #[arg(short = 'l', long = "list", help = "File containing target URLs (one per line)")]
    pub list: Option<String>,

    #[arg(short = 'c', long, default_value_t = 10, allow_negative_numbers = true,
        help = "Workers per phase (non-positive falls back to 10)")]
    pub concurrency: i64,

    #[arg(short = 'o', long, default_value = "reconhunt_result.json", help = "Output file path for the JSON report")]
    pub output: String,

    #[arg(long, default_value_t = 8, help = "Request timeout in seconds")]
    pub timeout: u64,

    #[arg(long = "max-time", default_value_t = 1800, help = "Global runtime budget in seconds")]
    pub max_time: u64,

    #[arg(short = 'A', long, help = "Larger payload sets, extra paths and wordlists")]
    pub aggressive: bool,

    #[arg(long, help = "Collect archived URLs with gau and waybackurls when installed")]
    pub external: bool,

    #[arg(long = "wordlists", default_value = "wordlists", help = "Directory holding aggressive-mode wordlists")]
    pub wordlists: String,

    #[arg(long, help = "Proxy URL (e.g. http://127.0.0.1:8080)")]
    pub proxy: Option<String>,

    #[arg(short = 'H', long = "header", help = "Custom header (e.g. \"Authorization: Bearer TOKEN\")")]
    pub headers: Vec<String>,

    #[arg(short = 'v', long, help = "Debug logging")]
    pub verbose: bool,

    #[arg(long, help = "List the targets without sending any request")]
    pub dry_run: bool,
}

impl Args {
    fn into_config(self) -> ScanConfig {
        ScanConfig {
            target: self.target.unwrap_or_default(),
            list_file: self.list.unwrap_or_default(),
            concurrency: self.concurrency,
            timeout: self.timeout,
            max_runtime: self.max_time,
            aggressive: self.aggressive,
            external: self.external,
            wordlist_dir: self.wordlists,
            output: self.output,
            proxy: self.proxy.unwrap_or_default(),
            headers: self.headers,
            verbose: self.verbose,
            dry_run: self.dry_run,
        }
    }
}

#[tokio::main]
async fn main() {
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    print_banner();

    let config = Args::parse().into_config();
    init_logger(config.verbose);

    let targets = match load_targets(config.single_target(), config.list_file_ref()) {
        Ok(targets) => targets,
        Err(e) => fatal(&format!("{:#}", e)),
    };
    if targets.is_empty() {
        fatal(&PipelineError::NoTargets.to_string());
    }

    if config.dry_run {
        for target in &targets {
            println!("[DRY RUN] Would scan target: {}", target.url);
        }
        return;
    }

    print_scan_config(&targets, &config);
    run_scan(targets, &config).await;
}

/// Discovery, module groups, report. Exits the process on pipeline errors.
async fn run_scan(targets: Vec<Target>, config: &ScanConfig) {
    let deadline = Deadline::after(Duration::from_secs(config.max_runtime));

    let client = match HttpClient::new(config.timeout, config.proxy_ref(), &config.parsed_headers()) {
        Ok(client) => Arc::new(client),
        Err(e) => fatal(&format!("{:#}", e)),
    };
    let sink = ConsoleSink::new_ref();
    let engine = ScanEngine::new(config, client, Arc::clone(&sink));

    sink.on_log("phase", "\n[*] Phase 1: Discovery...");
    let ctx = match engine.build_context(targets, &deadline).await {
        Ok(ctx) => ctx,
        Err(e) => fatal(&e.to_string()),
    };
    if !ctx.external_used.is_empty() {
        sink.on_log("info", &format!("[*] External sources: {}", ctx.external_used.join(", ")));
    }

    sink.on_log("phase", "\n[*] Phase 2: Scanning modules...");
    let (tx, rx) = mpsc::channel::<Finding>(100);
    let (_, findings) = tokio::join!(
        engine.run_default_groups(&ctx, &deadline, tx),
        ResultAggregator::run(rx, Arc::clone(&sink))
    );

    if deadline.is_expired() {
        sink.on_log("warn", "[!] Global runtime budget exhausted; remaining work was skipped.");
    }

    match ResultAggregator::write_report(&config.output, &findings) {
        Ok(()) => sink.on_log("success", &format!("[+] Report written to {}", config.output)),
        Err(e) => sink.on_log("error", &format!("[!] {:#}", e)),
    }
    ResultAggregator::report_summary(&findings, &sink);
}

fn fatal(message: &str) -> ! {
    eprint!("{}\r\n", format!("[!] {}", message).red());
    process::exit(1);
}

fn print_banner() {
    let banner = r#"
   ____                        _   _             _
  |  _ \ ___  ___ ___  _ __   | | | |_   _ _ __ | |_
  | |_) / _ \/ __/ _ \| '_ \  | |_| | | | | '_ \| __|
  |  _ <  __/ (_| (_) | | | | |  _  | |_| | | | | |_
  |_| \_\___|\___\___/|_| |_| |_| |_|\__,_|_| |_|\__|
    "#;
    print!("{}\r\n", banner.bright_cyan().bold());
    print!("{}\r\n", "──────────────────────────────────────────────────".dimmed());
    std::io::stdout().flush().ok();
}

fn print_scan_config(targets: &[Target], config: &ScanConfig) {
    let mode_label = if config.aggressive { "Aggressive" } else { "Standard" };

    if let [single] = targets {
        print!("{}\r\n", format!("[+] Target:      {}", single.url).green().bold());
    } else {
        print!("{}\r\n", format!("[+] Targets:     {}", targets.len()).green().bold());
    }
    print!("{}\r\n", format!("[+] Concurrency: {}", config.concurrency).blue());
    print!("{}\r\n", format!("[+] Timeout:     {}s", config.timeout).blue());
    print!("{}\r\n", format!("[+] Max runtime: {}s", config.max_runtime).blue());
    print!("{}\r\n", format!("[+] Mode:        {}", mode_label).magenta().bold());
    print!("{}\r\n", format!("[+] Output:      {}", config.output).blue());
    if let Some(proxy) = config.proxy_ref() {
        print!("{}\r\n", format!("[+] Proxy:       {}", proxy).yellow());
    }
    let headers = config.header_list();
    if !headers.is_empty() {
        print!("{}\r\n", format!("[+] Headers:     {} custom", headers.len()).yellow());
    }
    if config.external {
        print!("{}\r\n", "[+] External:    gau / waybackurls".yellow());
    }
    print!("{}\r\n", "──────────────────────────────────────────────────".dimmed());
    std::io::stdout().flush().ok();
}
