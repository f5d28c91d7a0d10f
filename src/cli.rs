use crate::assistant::{AssistantSession, ChatCommand, ChatEvent, Conversation, Submission};
use crate::search::{SearchPipeline, Selection};
use crate::shared::highlight::render;
use crate::shared::terminal::{emphasis, hyperlink};
use crate::shared::{Catalog, Config, HostPage, Matcher, QuickAction, Resolver, get_config};
use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::Instant;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "markaz")]
#[command(about = "Tutoring center assistant and site search")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Talk to the assistant interactively
    Chat,
    /// Resolve one message without the typing delay
    Ask {
        /// Message text, or course:<key>
        text: String,
    },
    /// Search the site
    Search {
        /// Search query
        query: String,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
        /// Choose the Nth result (1-based) after searching
        #[arg(long)]
        select: Option<usize>,
    },
    /// List courses and their assistant keys
    Courses,
    /// Print the effective configuration
    Config,
}

pub async fn run_cli() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = get_config();
    let catalog = Catalog::builtin();

    match cli.command {
        Commands::Chat => chat(config, &catalog).await?,
        Commands::Ask { text } => ask(config, &catalog, &text),
        Commands::Search {
            query,
            json,
            select,
        } => search(config, &catalog, &query, json, select)?,
        Commands::Courses => list_courses(&catalog),
        Commands::Config => print!("{}", serde_yaml::to_string(config)?),
    }

    Ok(())
}

/// Host that reports page actions on stdout.
#[derive(Debug, Clone)]
pub struct TerminalHost {
    anchors: BTreeSet<String>,
    consultation_url: Option<String>,
}

impl TerminalHost {
    pub fn new(catalog: &Catalog, config: &Config) -> Self {
        Self {
            anchors: catalog.anchors(),
            consultation_url: config.links.consultation_url.clone(),
        }
    }
}

impl HostPage for TerminalHost {
    fn has_anchor(&self, anchor: &str) -> bool {
        self.anchors.contains(anchor)
    }

    fn reveal(&mut self, anchor: &str, highlight_for: Duration) {
        println!(
            "-> #{} (highlighted for {} ms)",
            anchor,
            highlight_for.as_millis()
        );
    }

    fn open_consultation(&mut self, subject: Option<&str>) {
        let label = match subject {
            Some(subject) => format!("Konsultatsiya: {subject}"),
            None => "Konsultatsiya".to_string(),
        };
        match &self.consultation_url {
            Some(url) => println!("-> {}", hyperlink(url, &label)),
            None => println!("-> {label}"),
        }
    }

    fn open_vacancies(&mut self) {
        println!("-> Vakansiyalar");
    }

    fn open_link(&mut self, url: &str) {
        println!("-> {}", hyperlink(url, url));
    }
}

fn print_chips(chips: &[QuickAction]) {
    for (i, chip) in chips.iter().enumerate() {
        println!("   [{}] {}", i + 1, chip.label);
    }
}

async fn chat(config: &Config, catalog: &Catalog) -> Result<()> {
    let resolver = Resolver::new(catalog, Matcher::new(config.matcher.clone()));
    let host = TerminalHost::new(catalog, config);
    let conversation = Conversation::new(resolver, config.assistant.clone(), host);
    let (session, mut events) = AssistantSession::spawn(conversation);

    // Chips of the latest bot message, picked by number.
    let chips: Arc<Mutex<Vec<QuickAction>>> = Arc::default();
    let printer_chips = chips.clone();
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                ChatEvent::Opened => println!("(chat ochildi, /close, /quit)"),
                ChatEvent::Closed => println!("(chat yopildi, /open bilan qayta oching)"),
                ChatEvent::Typing(true) => println!("..."),
                ChatEvent::Typing(false) => {}
                ChatEvent::Message(message) => {
                    println!("{}: {}", message.sender.short_name(), message.text);
                    print_chips(&message.options);
                    if !message.options.is_empty()
                        && let Ok(mut current) = printer_chips.lock()
                    {
                        *current = message.options;
                    }
                }
                ChatEvent::Rejected(Submission::Busy) => println!("(javob kutilmoqda)"),
                ChatEvent::Rejected(Submission::Closed) => println!("(chat yopiq)"),
                ChatEvent::Rejected(Submission::Blank | Submission::Accepted) => {}
            }
        }
    });

    session.send(ChatCommand::Open)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let command = match line {
            "" => continue,
            "/quit" => break,
            "/open" => ChatCommand::Open,
            "/close" => ChatCommand::Close,
            _ => match line.parse::<usize>() {
                Ok(n) => {
                    let chip = chips
                        .lock()
                        .map_err(|_| anyhow!("chip list poisoned"))?
                        .get(n.wrapping_sub(1))
                        .cloned();
                    match chip {
                        Some(chip) => ChatCommand::Choose(chip),
                        None => ChatCommand::Submit(line.to_string()),
                    }
                }
                Err(_) => ChatCommand::Submit(line.to_string()),
            },
        };
        debug!("chat command: {:?}", command);
        session.send(command)?;
    }

    session.shutdown().await?;
    printer.await?;
    Ok(())
}

fn ask(config: &Config, catalog: &Catalog, text: &str) {
    let resolver = Resolver::new(catalog, Matcher::new(config.matcher.clone()));
    let resolution = resolver.resolve(text);
    println!("Siz: {}", resolution.user_text);
    println!("Bot: {}", resolution.bot_text);
    print_chips(&resolution.options);
}

fn search(
    config: &Config,
    catalog: &Catalog,
    query: &str,
    json: bool,
    select: Option<usize>,
) -> Result<()> {
    let host = TerminalHost::new(catalog, config);
    let mut pipeline = SearchPipeline::new(
        catalog.search.clone(),
        Matcher::new(config.matcher.clone()),
        config.search.clone(),
        host,
    );

    // One keystroke followed by a full quiet period.
    let now = Instant::now();
    pipeline.open();
    pipeline.input(query, now);
    pipeline.poll(now + config.search.debounce());

    if json {
        println!("{}", serde_json::to_string_pretty(pipeline.results())?);
    } else if pipeline.results().is_empty() {
        println!("Hech qanday natija topilmadi");
    } else {
        let (open, close) = emphasis();
        for (i, result) in pipeline.results().iter().enumerate() {
            let (title, description) = pipeline.highlighted(result);
            println!(
                "{}. {} [{}] (score: {})",
                i + 1,
                render(&title, open, close),
                result.record.category,
                result.score
            );
            println!("   {}", render(&description, open, close));
        }
    }

    if let Some(n) = select {
        match pipeline.select(n.wrapping_sub(1)) {
            Some(Selection::MissingAnchor { anchor }) => {
                println!("Sahifada #{anchor} topilmadi");
            }
            Some(Selection::Vacancies | Selection::Revealed { .. }) => {}
            None => return Err(anyhow!("No result number {n}")),
        }
    }

    Ok(())
}

fn list_courses(catalog: &Catalog) {
    for (key, course) in catalog.aliases().iter() {
        println!("{:<24} {:<24} #{}", key, course.name, course.anchor());
    }
}
