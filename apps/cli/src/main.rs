use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    load_settings, reports::MESSAGE_COLUMNS, AuthContext, AuthService, ClientEvent,
    ClientSettings, EventBus, FormView, HttpAuthService, OtpWorkflow, PropertyClient,
    PropertyFormData, PropertyPages, ReportsClient, ResendOutcome, SubmitOutcome, TagDetailsView,
    ToastLevel,
};
use shared::domain::{PropertyId, ReportId, TagId};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "equalify", about = "Equalify accessibility reporting client")]
struct Cli {
    /// Overrides the API base url from settings.
    #[arg(long)]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    SignUp {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    SignIn {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Confirms a sign-up; prompts for the code when `--code` is omitted.
    Confirm {
        #[arg(long)]
        email: String,
        #[arg(long)]
        code: Option<String>,
    },
    ResendCode {
        #[arg(long)]
        email: String,
    },
    Properties {
        #[command(subcommand)]
        command: PropertyCommand,
    },
    TagDetails {
        #[arg(long)]
        report_id: String,
        #[arg(long)]
        tag_id: String,
    },
}

#[derive(Subcommand, Debug)]
enum PropertyCommand {
    List,
    Show {
        property_id: String,
    },
    Update {
        property_id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        sitemap_url: String,
    },
    Delete {
        property_id: String,
        /// Required; deleting a property cannot be undone.
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let cli = Cli::parse();

    let mut settings = load_settings();
    if let Some(api_url) = cli.api_url {
        settings.api_url = api_url;
    }
    settings.api_base()?;

    match cli.command {
        Command::SignUp { email, password } => {
            let auth = HttpAuthService::new(&settings)?;
            let response = auth.sign_up(&email, &password).await?;
            if response.user_confirmed {
                println!("Account created for {email}.");
            } else {
                println!("Account created; a verification code was sent to {email}.");
                println!("Run `equalify confirm --email {email}` to finish signing up.");
            }
        }
        Command::SignIn { email, password } => {
            let auth = HttpAuthService::new(&settings)?;
            let response = auth.sign_in(&email, &password).await?;
            println!("{}", response.access_token);
        }
        Command::Confirm { email, code } => run_confirm(&settings, email, code).await?,
        Command::ResendCode { email } => {
            let auth = HttpAuthService::new(&settings)?;
            auth.resend_sign_up_code(&email).await?;
            println!("A new verification code was sent to {email}.");
        }
        Command::Properties { command } => run_properties(&settings, command).await?,
        Command::TagDetails { report_id, tag_id } => {
            let reports = ReportsClient::new(&settings)?;
            let (tag_id, report_id) = (TagId(tag_id), ReportId(report_id));
            let details = reports.tag_details(&tag_id, &report_id).await?;
            print_tag_details(&TagDetailsView::new(&details, &tag_id, &report_id));
        }
    }

    Ok(())
}

async fn run_confirm(settings: &ClientSettings, email: String, code: Option<String>) -> Result<()> {
    let auth: Arc<dyn AuthService> = Arc::new(HttpAuthService::new(settings)?);
    let workflow = OtpWorkflow::with_resend_cooldown(
        email,
        auth,
        Arc::new(AuthContext::new()),
        settings.resend_cooldown(),
    );

    if let Some(code) = code {
        workflow.enter_code(&code).await;
        return match workflow.submit().await {
            SubmitOutcome::Confirmed => {
                println!("Account confirmed. You can now sign in.");
                Ok(())
            }
            SubmitOutcome::Invalid(err) => bail!("{err}"),
            SubmitOutcome::Rejected(message) => bail!("{message}"),
            SubmitOutcome::Ignored | SubmitOutcome::Discarded => bail!("submission was not sent"),
        };
    }

    println!("{}", workflow.view().await.description);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print_prompt(&workflow.view().await);
        let Some(line) = lines.next_line().await.context("failed to read stdin")? else {
            break;
        };

        match line.trim() {
            "" => continue,
            "q" | "quit" => break,
            "r" | "resend" => match workflow.resend().await {
                ResendOutcome::Sent => println!("A new code is on its way."),
                ResendOutcome::Failed(message) => println!("Could not resend: {message}"),
                ResendOutcome::Ignored => println!("{}", workflow.view().await.resend_label),
                ResendOutcome::Discarded => break,
            },
            code => {
                workflow.enter_code(code).await;
                match workflow.submit().await {
                    SubmitOutcome::Confirmed => {
                        println!("Account confirmed. You can now sign in.");
                        return Ok(());
                    }
                    SubmitOutcome::Invalid(err) => println!("{err}"),
                    SubmitOutcome::Rejected(message) => println!("Error: {message}"),
                    SubmitOutcome::Ignored | SubmitOutcome::Discarded => {}
                }
            }
        }
    }

    workflow.dispose().await;
    Ok(())
}

fn print_prompt(view: &FormView) {
    let slots: String = view
        .slots
        .iter()
        .map(|slot| slot.unwrap_or('_'))
        .collect();
    if view.code_expired {
        println!("That code has expired; request a new one.");
    }
    let resend = if view.resend_enabled {
        "type `r` to resend".to_string()
    } else {
        view.resend_label.clone()
    };
    println!("[{slots}] enter code ({resend}, `q` to quit):");
}

async fn run_properties(settings: &ClientSettings, command: PropertyCommand) -> Result<()> {
    let events = EventBus::default();
    let mut toasts = events.subscribe();
    let pages = PropertyPages::new(PropertyClient::new(settings)?, events);

    let result = match command {
        PropertyCommand::List => {
            for property in pages.list().await? {
                println!("{}\t{}\t{}", property.id, property.name, property.sitemap_url);
            }
            Ok(())
        }
        PropertyCommand::Show { property_id } => {
            let loaded = pages.load(Some(property_id.as_str())).await?;
            let property = loaded.initial_property;
            println!("id:          {}", property.id);
            println!("name:        {}", property.name);
            println!("sitemap url: {}", property.sitemap_url);
            Ok(())
        }
        PropertyCommand::Update {
            property_id,
            name,
            sitemap_url,
        } => pages
            .update(
                Some(property_id.as_str()),
                &PropertyFormData {
                    property_name: name,
                    sitemap_url,
                },
            )
            .await
            .map(|_| ())
            .map_err(anyhow::Error::from),
        PropertyCommand::Delete { property_id, yes } => {
            if !yes {
                bail!("refusing to delete {property_id} without --yes");
            }
            pages
                .delete(&PropertyId(property_id))
                .await
                .map_err(anyhow::Error::from)
        }
    };

    while let Ok(event) = toasts.try_recv() {
        match event {
            ClientEvent::Toast {
                level: ToastLevel::Success,
                message,
            } => println!("{message}"),
            ClientEvent::Toast {
                level: ToastLevel::Error,
                message,
            } => eprintln!("{message}"),
            ClientEvent::Navigate(path) => tracing::debug!(%path, "navigate"),
        }
    }

    result
}

fn print_tag_details(view: &TagDetailsView) {
    println!("{} / {}", view.report_name, view.tag_name);
    for point in &view.timeline {
        println!(
            "  {}  equalified={} active={} ignored={}",
            point.date, point.equalified, point.active, point.ignored
        );
    }
    let [message, equalified, active, total] = MESSAGE_COLUMNS;
    println!("{message:<60} {equalified:>10} {active:>8} {total:>8}");
    for row in &view.rows {
        println!(
            "{:<60} {:>10} {:>8} {:>8}",
            row.title, row.equalified, row.active, row.total
        );
    }
}
