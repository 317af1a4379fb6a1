//! Sapphire Duck mailbox CLI
//!
//! Operator tool for the local mailbox the MCP server reads from.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use sapphire_duck::Config;
use sapphire_duck_core::{EmailMessage, IncomingEmail, Mailbox, ReadQuery};

/// Sapphire Duck - local mailbox CLI
#[derive(Parser)]
#[command(name = "sapphire-duck-mail")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Manage the local mailbox behind the Sapphire Duck MCP server")]
struct Cli {
    /// Config file (default: platform config dir/config.toml)
    #[arg(long, global = true, env = "SAPPHIRE_DUCK_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Mailbox directory, overrides the config file
    #[arg(long, global = true, env = "SAPPHIRE_DUCK_DATA_DIR", value_name = "PATH")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered accounts
    Accounts,

    /// Register an account
    AddAccount {
        /// Email address
        address: String,
        /// Display name
        #[arg(long)]
        name: Option<String>,
    },

    /// Deliver a message into a local account
    Deliver {
        /// Local recipient account
        #[arg(long)]
        to: String,
        /// Sender address
        #[arg(long)]
        from: String,
        #[arg(long, default_value = "")]
        subject: String,
        #[arg(long, default_value = "")]
        body: String,
        /// Target folder
        #[arg(long)]
        folder: Option<String>,
    },

    /// List messages, newest first
    List {
        /// Account (default: first registered)
        #[arg(long)]
        account: Option<String>,
        /// Folder (default: INBOX)
        #[arg(long)]
        folder: Option<String>,
        /// Maximum messages
        #[arg(long, default_value = "10")]
        limit: usize,
        /// Only unread messages
        #[arg(long)]
        unread: bool,
    },

    /// Show a full message and mark it read
    Show {
        /// Message ID
        id: i64,
        /// Account that owns the message
        #[arg(long)]
        account: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (config, _) = Config::load(cli.config.as_deref())?;
    let mailbox = Mailbox::open(config.data_dir(cli.data_dir))?;

    match cli.command {
        Commands::Accounts => run_accounts(&mailbox),
        Commands::AddAccount { address, name } => run_add_account(&mailbox, &address, name.as_deref()),
        Commands::Deliver {
            to,
            from,
            subject,
            body,
            folder,
        } => run_deliver(
            &mailbox,
            IncomingEmail {
                from,
                to,
                subject,
                body,
                folder,
                date: None,
            },
        ),
        Commands::List {
            account,
            folder,
            limit,
            unread,
        } => run_list(
            &mailbox,
            ReadQuery {
                account,
                folder,
                limit: Some(limit),
                unread_only: unread,
            },
        ),
        Commands::Show { id, account } => run_show(&mailbox, id, account.as_deref()),
    }
}

fn run_accounts(mailbox: &Mailbox) -> anyhow::Result<()> {
    let accounts = mailbox.accounts()?;

    println!("{}", "=== Accounts ===".cyan().bold());
    if accounts.is_empty() {
        println!("{}", "No accounts registered. Use add-account to create one.".yellow());
        return Ok(());
    }

    for (i, account) in accounts.iter().enumerate() {
        let unread = mailbox.count(Some(&account.address), None, true)?;
        let marker = if i == 0 { " (default)".dimmed().to_string() } else { String::new() };
        println!(
            "{}{} {} {}",
            account.address.white().bold(),
            marker,
            account.display_name.as_deref().unwrap_or("").dimmed(),
            format!("[{} unread]", unread).green()
        );
    }
    Ok(())
}

fn run_add_account(mailbox: &Mailbox, address: &str, name: Option<&str>) -> anyhow::Result<()> {
    let account = mailbox.ensure_account(address, name)?;
    println!("{} {}", "Registered".green().bold(), account.address);
    Ok(())
}

fn run_deliver(mailbox: &Mailbox, email: IncomingEmail) -> anyhow::Result<()> {
    let message = mailbox.deliver(email)?;
    println!(
        "{} message {} to {}/{}",
        "Delivered".green().bold(),
        message.id,
        message.account,
        message.folder
    );
    Ok(())
}

fn run_list(mailbox: &Mailbox, query: ReadQuery) -> anyhow::Result<()> {
    let messages = mailbox.read(&query)?;

    println!(
        "{}",
        format!("=== {} ===", query.folder_or_default()).cyan().bold()
    );
    if messages.is_empty() {
        println!("{}", "No messages.".dimmed());
        return Ok(());
    }

    for message in &messages {
        print_line(message);
    }
    Ok(())
}

fn print_line(message: &EmailMessage) {
    let marker = if message.unread { "*".yellow().bold() } else { " ".normal() };
    println!(
        "{} {:>5}  {}  {:<30}  {}",
        marker,
        message.id,
        message.date.format("%Y-%m-%d %H:%M"),
        message.from,
        message.subject.white().bold()
    );
}

fn run_show(mailbox: &Mailbox, id: i64, account: Option<&str>) -> anyhow::Result<()> {
    let message = mailbox.get_message(id, account)?;

    println!("{}: {}", "From".white().bold(), message.from);
    println!("{}: {}", "To".white().bold(), message.to.join(", "));
    println!("{}: {}", "Subject".white().bold(), message.subject);
    println!("{}: {}", "Date".white().bold(), message.date.format("%Y-%m-%d %H:%M:%S"));
    println!("{}: {}", "Folder".white().bold(), message.folder);
    println!();
    println!("{}", message.body);
    Ok(())
}
