//! Site Forge - AI-powered website generation and deployment
//!
//! Thin command-line front end over the generation pipeline and the site
//! store. Program output goes to stdout, logs to stderr.

use indicatif::{ProgressBar, ProgressStyle};
use inquire::Confirm;
use serde::Serialize;
use site_forge::{
    types::{
        DeployResponse, ErrorResponse, GenerateResponse, ProviderListResponse, SiteListResponse,
        SwitchResponse,
    },
    AppConfig, DeployRequest, FrameWriter, GenerationContext, MetadataPatch, ProviderRegistry,
    SiteForgeError, SiteGenerator, SiteRecord, SiteStore,
};
use std::env;
use std::io::IsTerminal;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize the library; loads .env before the log filter is read
    if let Err(e) = site_forge::init() {
        eprintln!("❌ Failed to initialize: {}", e);
        process::exit(1);
    }

    init_logging();

    // Get command line arguments
    let args: Vec<String> = env::args().skip(1).collect();

    // Check for help
    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return;
    }

    let cli = match CliArgs::parse(&args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("❌ {}", e);
            eprintln!("💡 Run `site-forge --help` for usage");
            process::exit(2);
        }
    };

    if let Err(e) = run(&cli).await {
        report_error(&e, cli.json);
        process::exit(1);
    }
}

/// Logs go to stderr so stdout only carries program output and stream frames
fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("site_forge=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn report_error(err: &anyhow::Error, json: bool) {
    match err.downcast_ref::<SiteForgeError>() {
        Some(e) if json => {
            let (status, body) = ErrorResponse::from_error(e);
            tracing::debug!(status = %status, "Command failed");
            print_json(&body);
        }
        Some(e) => eprintln!("{}", e.user_message()),
        None if json => print_json(&ErrorResponse { error: err.to_string() }),
        None => eprintln!("❌ Error: {:#}", err),
    }
}

/// Parsed command line
#[derive(Debug, Default)]
struct CliArgs {
    command: String,
    positionals: Vec<String>,
    provider: Option<String>,
    path: Option<String>,
    name: Option<String>,
    description: Option<String>,
    stream: bool,
    deploy: bool,
    json: bool,
    yes: bool,
}

impl CliArgs {
    fn parse(args: &[String]) -> Result<Self, String> {
        let mut cli = CliArgs::default();
        let mut iter = args.iter();

        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--stream" => cli.stream = true,
                "--deploy" => cli.deploy = true,
                "--json" => cli.json = true,
                "--yes" | "-y" => cli.yes = true,
                "--provider" | "--path" | "--name" | "--description" => {
                    let value = iter
                        .next()
                        .ok_or_else(|| format!("{} needs a value", arg))?
                        .clone();
                    match arg.as_str() {
                        "--provider" => cli.provider = Some(value),
                        "--path" => cli.path = Some(value),
                        "--name" => cli.name = Some(value),
                        _ => cli.description = Some(value),
                    }
                }
                flag if flag.starts_with("--") => return Err(format!("Unknown option '{}'", flag)),
                _ if cli.command.is_empty() => cli.command = arg.clone(),
                _ => cli.positionals.push(arg.clone()),
            }
        }

        if cli.command.is_empty() {
            return Err("No command given".to_string());
        }
        Ok(cli)
    }

    fn positional(&self, index: usize, what: &str) -> anyhow::Result<&str> {
        self.positionals
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| SiteForgeError::cli(format!("`{}` needs {}", self.command, what)).into())
    }
}

async fn run(cli: &CliArgs) -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;

    match cli.command.as_str() {
        "generate" => run_generate(cli, &config).await,
        "providers" => run_providers(cli, &config),
        "use" => run_use(cli, &config),
        "deploy" => run_deploy(cli, &config).await,
        "list" => run_list(cli, &config).await,
        "show" => run_show(cli, &config).await,
        "files" => run_files(cli, &config).await,
        "update" => run_update(cli, &config).await,
        "rename" => run_rename(cli, &config).await,
        "delete" => run_delete(cli, &config).await,
        other => Err(SiteForgeError::cli(format!("Unknown command '{}'", other)).into()),
    }
}

/// Generate a site, optionally streaming progress frames and deploying the result
async fn run_generate(cli: &CliArgs, config: &AppConfig) -> anyhow::Result<()> {
    let prompt = cli.positionals.join(" ");
    let registry = Arc::new(ProviderRegistry::from_config(config));
    let generator = SiteGenerator::new(registry.clone());

    let ctx = match &cli.provider {
        Some(id) => GenerationContext::with_provider(id.clone()),
        None => GenerationContext::default(),
    };

    let site = if cli.stream {
        let sink = FrameWriter::new(std::io::stdout());
        generator.generate_stream(&ctx, &prompt, sink).await?
    } else {
        let spinner =
            (!cli.json).then(|| spinner("🤖 Generating website (requirement → HTML)..."));
        let result = generator.generate(&ctx, &prompt).await;
        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }
        let site = result?;

        if site.degraded {
            eprintln!("⚠️  The model could not be reached; showing the fallback page");
        }
        if cli.json && !cli.deploy {
            print_json(&GenerateResponse::from(site.clone()));
        } else if !cli.deploy {
            println!("{}", site.html);
        }
        Some(site)
    };

    let metrics = generator.get_metrics_snapshot();
    tracing::debug!(
        requests = %metrics.requests,
        degraded = %metrics.degraded,
        upstream_failures = %metrics.upstream_failures,
        degraded_ratio = %metrics.degraded_ratio(),
        "Generation metrics"
    );

    let Some(site) = site else {
        return Err(SiteForgeError::internal("Generation failed").into());
    };

    if cli.deploy {
        let model = site
            .provider_id
            .as_deref()
            .and_then(|id| registry.get(id))
            .map(|p| p.adapter().model().to_string());

        let mut request = deploy_request(cli, site.html);
        request.generator = model;
        let outcome = SiteStore::from_config(config).deploy(request).await?;

        if cli.json {
            print_json(&DeployResponse::from(outcome));
        } else if !cli.stream {
            println!("🚀 {}: {} ({})", outcome.message, outcome.path, outcome.url);
        } else {
            eprintln!("🚀 {}: {} ({})", outcome.message, outcome.path, outcome.url);
        }
    }

    Ok(())
}

fn run_providers(cli: &CliArgs, config: &AppConfig) -> anyhow::Result<()> {
    let registry = ProviderRegistry::from_config(config);
    let models = registry.list_available();

    if cli.json {
        print_json(&ProviderListResponse { success: true, models });
        return Ok(());
    }

    let current = registry.current_id();
    println!("🤖 Available Providers ({}):", models.len());
    println!("═══════════════════════════");
    for model in &models {
        let marker = if current.as_deref() == Some(model.id.as_str()) { "▶" } else { " " };
        let key = if model.has_credential { "✅" } else { "⚠️  no API key" };
        println!(
            "{} {:<8} {} ({}) {}",
            marker, model.id, model.display_name, model.vendor_name, key
        );
        println!("   💭 {}", model.description);
    }
    Ok(())
}

fn run_use(cli: &CliArgs, config: &AppConfig) -> anyhow::Result<()> {
    let id = cli.positional(0, "a provider id")?;
    let registry = ProviderRegistry::from_config(config);
    let outcome = registry.switch_current(id);
    let ok = outcome.ok;

    if cli.json {
        print_json(&SwitchResponse::from(outcome));
    } else if ok {
        println!("✅ {}", outcome.message);
    } else {
        println!("❌ {}", outcome.message);
    }

    if ok {
        Ok(())
    } else {
        Err(SiteForgeError::cli(format!("Could not switch to '{}'", id)).into())
    }
}

async fn run_deploy(cli: &CliArgs, config: &AppConfig) -> anyhow::Result<()> {
    let file = cli.positional(0, "an HTML file")?;
    let html = read_html(file).await?;

    let outcome = SiteStore::from_config(config)
        .deploy(deploy_request(cli, html))
        .await?;

    if cli.json {
        print_json(&DeployResponse::from(outcome));
    } else {
        println!("🚀 {}", outcome.message);
        println!("   📁 Path: {}", outcome.path);
        println!("   🔗 URL:  {}", outcome.url);
    }
    Ok(())
}

async fn run_list(cli: &CliArgs, config: &AppConfig) -> anyhow::Result<()> {
    let websites = SiteStore::from_config(config).list().await?;

    if cli.json {
        print_json(&SiteListResponse { success: true, websites });
        return Ok(());
    }

    if websites.is_empty() {
        println!("📭 No websites deployed yet");
        return Ok(());
    }

    println!("🌐 Deployed Websites ({}):", websites.len());
    println!("═══════════════════════════");
    for site in &websites {
        println!(
            "{:<34} {:<24} {:>9}  {}",
            site.path,
            site.name,
            format_size(site.file_size_bytes),
            site.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

async fn run_show(cli: &CliArgs, config: &AppConfig) -> anyhow::Result<()> {
    let path = cli.positional(0, "a site path")?;
    let record = SiteStore::from_config(config)
        .get(path)
        .await?
        .ok_or_else(|| SiteForgeError::not_found(path))?;

    if cli.json {
        print_json(&record);
    } else {
        display_record(&record);
    }
    Ok(())
}

async fn run_files(cli: &CliArgs, config: &AppConfig) -> anyhow::Result<()> {
    let path = cli.positional(0, "a site path")?;
    let files = SiteStore::from_config(config).list_files(path).await?;

    if cli.json {
        print_json(&files);
        return Ok(());
    }

    println!("📁 {} ({} entries)", path, files.len());
    for file in &files {
        println!("   {:<9} {:<24} {:>9}", file.kind.to_string(), file.name, format_size(file.size));
    }
    Ok(())
}

async fn run_update(cli: &CliArgs, config: &AppConfig) -> anyhow::Result<()> {
    let path = cli.positional(0, "a site path")?;
    let file = cli.positional(1, "an HTML file")?;
    let html = read_html(file).await?;

    let record = SiteStore::from_config(config).update_content(path, &html).await?;
    if cli.json {
        print_json(&record);
    } else {
        println!("✅ Updated content of '{}'", record.path);
    }
    Ok(())
}

async fn run_rename(cli: &CliArgs, config: &AppConfig) -> anyhow::Result<()> {
    let path = cli.positional(0, "a site path")?;
    let patch = MetadataPatch {
        name: cli.name.clone(),
        description: cli.description.clone(),
    };
    if patch.name.is_none() && patch.description.is_none() {
        return Err(SiteForgeError::cli("`rename` needs --name and/or --description").into());
    }

    let record = SiteStore::from_config(config).update_metadata(path, &patch).await?;
    if cli.json {
        print_json(&record);
    } else {
        display_record(&record);
    }
    Ok(())
}

async fn run_delete(cli: &CliArgs, config: &AppConfig) -> anyhow::Result<()> {
    let path = cli.positional(0, "a site path")?;
    let store = SiteStore::from_config(config);

    if !cli.yes {
        if !std::io::stdin().is_terminal() {
            return Err(SiteForgeError::cli(
                "Refusing to delete without --yes in non-interactive mode",
            )
            .into());
        }
        let confirmed = Confirm::new(&format!("Delete site '{}' and all its files?", path))
            .with_default(false)
            .prompt()?;
        if !confirmed {
            println!("Deletion cancelled");
            return Ok(());
        }
    }

    store.delete(path).await?;
    if cli.json {
        print_json(&serde_json::json!({
            "success": true,
            "message": "Website deleted successfully"
        }));
    } else {
        println!("🗑️  Deleted '{}'", path);
    }
    Ok(())
}

fn deploy_request(cli: &CliArgs, html: String) -> DeployRequest {
    DeployRequest {
        html,
        path: cli.path.clone(),
        name: cli.name.clone(),
        description: cli.description.clone(),
        generator: None,
    }
}

async fn read_html(file: &str) -> anyhow::Result<String> {
    tokio::fs::read_to_string(file)
        .await
        .map_err(|e| SiteForgeError::io(e.to_string(), Some(file.to_string())).into())
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn display_record(record: &SiteRecord) {
    println!("🌐 {}", record.name);
    println!("═══════════════════");
    println!("   📁 Path:        {}", record.path);
    if !record.description.is_empty() {
        println!("   💭 Description: {}", record.description);
    }
    println!("   🤖 Generator:   {}", record.generator_id);
    println!("   📦 Size:        {}", format_size(record.file_size_bytes));
    println!("   🕐 Created:     {}", record.created_at.to_rfc3339());
    println!("   🕑 Updated:     {}", record.updated_at.to_rfc3339());
}

fn format_size(bytes: u64) -> String {
    match bytes {
        b if b >= 1024 * 1024 => format!("{:.1} MB", b as f64 / (1024.0 * 1024.0)),
        b if b >= 1024 => format!("{:.1} KB", b as f64 / 1024.0),
        b => format!("{} B", b),
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("❌ Failed to encode output: {}", e),
    }
}

/// Print help information
fn print_help() {
    println!("🔥 Site Forge - AI-powered website generation");
    println!("═══════════════════════════════════════════════");
    println!();
    println!("USAGE:");
    println!("    site-forge <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    generate <PROMPT...>       Generate a website from a description");
    println!("        --stream               Print progress frames as they happen");
    println!("        --provider <ID>        Use a specific provider for this request");
    println!("        --deploy               Deploy the generated site");
    println!("    providers                  List available providers");
    println!("    use <ID>                   Switch the current provider");
    println!("    deploy <FILE.html>         Deploy an HTML file");
    println!("    list                       List deployed websites, newest first");
    println!("    show <PATH>                Show one website");
    println!("    files <PATH>               List the files of a website");
    println!("    update <PATH> <FILE.html>  Replace a website's content");
    println!("    rename <PATH>              Change a website's name or description");
    println!("    delete <PATH> [--yes]      Delete a website");
    println!();
    println!("OPTIONS:");
    println!("    --path <PATH>              Site path for deploy (letters, digits, '_' and '-')");
    println!("    --name <NAME>              Display name");
    println!("    --description <TEXT>       Description");
    println!("    --json                     Machine-readable output");
    println!("    -h, --help                 Print this help");
    println!();
    println!("EXAMPLES:");
    println!("    site-forge generate \"a simple personal blog\"");
    println!("    site-forge generate --stream --deploy --path blog \"a personal blog\"");
    println!("    site-forge deploy page.html --path landing --name \"Landing page\"");
    println!();
    println!("ENVIRONMENT VARIABLES:");
    println!("    QWEN_API_KEY                   Alibaba DashScope API key (qwen, qwen3)");
    println!("    DOUBAO_API_KEY                 ByteDance Ark API key (doubao)");
    println!("    ZHIPU_API_KEY                  Zhipu AI API key (zhipu)");
    println!("    SITE_FORGE_DEFAULT_PROVIDER    Provider selected at startup (default: qwen3)");
    println!("    SITE_FORGE_SITES_DIR           Site root (default: public/websites)");
    println!("    SITE_FORGE_URL_PREFIX          Public URL prefix (default: /websites)");
    println!("    SITE_FORGE_LLM_TIMEOUT_SECS    Upstream timeout (default: none)");
    println!("    RUST_LOG                       Log filter (default: site_forge=info)");
    println!();
    println!("Made with ❤️ and 🦀 Rust");
}
