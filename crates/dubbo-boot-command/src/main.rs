use std::collections::BTreeSet;

use clap::{Parser, Subcommand};
use dubbo_boot_core::config::DEFAULT_REGISTRY_ADDRESS;
use dubbo_boot_core::publisher::resolve_http_check_url;
use dubbo_boot_core::{RegistryError, RegistryStore, Settings};
use dubbo_boot_db::DbRegistry;

#[derive(Parser)]
#[command(name = "dubbo-boot")]
#[command(about = "Provider registry administrative CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, env = "DUBBO_REGISTRY_ADDRESS", default_value = DEFAULT_REGISTRY_ADDRESS)]
    registry: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Exported provider management
    Provider {
        #[command(subcommand)]
        sub: ProviderCommands,
    },
    /// Print the health check URL published at startup
    CheckUrl,
    /// Show registry status overview
    Status,
}

#[derive(Subcommand)]
enum ProviderCommands {
    /// List exported providers, optionally for one interface
    List {
        #[arg(long)]
        interface: Option<String>,
    },
    /// Remove a provider by its URL
    Remove {
        #[arg(long)]
        url: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Provider { sub } => {
            let db = DbRegistry::open(&cli.registry)?;
            provider(&db, sub)?;
        }
        Commands::CheckUrl => {
            let settings = Settings::from_env()?;
            println!("{}", resolve_http_check_url(&settings));
        }
        Commands::Status => {
            let db = DbRegistry::open(&cli.registry)?;
            status(&db)?;
        }
    }

    Ok(())
}

fn provider(registry: &dyn RegistryStore, sub: ProviderCommands) -> Result<(), RegistryError> {
    match sub {
        ProviderCommands::List { interface } => {
            let providers = match interface {
                Some(interface) => registry.get_providers(&interface)?,
                None => registry.get_all_providers()?,
            };

            println!("Exported Providers:");
            println!("{:<40} {:<20} {:<20} {}", "Interface", "Application", "Bean", "URL");
            println!("{}", "-".repeat(100));
            for p in providers {
                println!(
                    "{:<40} {:<20} {:<20} {}",
                    p.interface, p.application, p.bean_name, p.url
                );
            }
        }
        ProviderCommands::Remove { url } => {
            registry.remove_provider(&url)?;
            println!("Provider removed: {}", url);
        }
    }
    Ok(())
}

fn status(registry: &dyn RegistryStore) -> Result<(), RegistryError> {
    let providers = registry.get_all_providers()?;
    let interfaces: BTreeSet<_> = providers.iter().map(|p| p.interface.as_str()).collect();
    let applications: BTreeSet<_> = providers.iter().map(|p| p.application.as_str()).collect();

    println!("Provider Registry Status Overview");
    println!("{}", "=".repeat(35));
    println!("Total Providers:  {}", providers.len());
    println!("Interfaces:       {}", interfaces.len());
    println!("Applications:     {}", applications.len());
    Ok(())
}
