mod cli;

use indicatif::ProgressBar;
use inquire::{InquireError, Select};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tcg_collection::{CollectionTracker, Config, HttpGateway};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let gateway = HttpGateway::new(&config)?;
    let tracker = CollectionTracker::new(Arc::new(gateway));

    let user_name = whoami::username();
    println!("Hi, {}! welcome to your card collection.", user_name);

    let spinner = ProgressBar::new_spinner();
    spinner.set_message("Loading expansions...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    let initialized = tracker.initialize().await;
    spinner.finish_and_clear();
    initialized?;

    loop {
        let menu_options: Vec<&str> = vec![
            "Choose expansion",
            "Show collection",
            "Refresh collection",
            "Adjust card quantity",
            "Show stats",
            "Dashboard",
            "Exit",
        ];
        let menu_ans: Result<&str, InquireError> =
            Select::new("What would you like to do?", menu_options).prompt();

        // Operation failures are reported and the menu keeps running.
        let outcome = match menu_ans {
            Ok(choice) => match choice {
                "Choose expansion" => cli::choose_expansion(&tracker).await,
                "Show collection" => {
                    cli::show_collection(&tracker);
                    Ok(())
                }
                "Refresh collection" => cli::refresh(&tracker).await,
                "Adjust card quantity" => cli::adjust_quantity(&tracker).await,
                "Show stats" => {
                    cli::show_stats(&tracker);
                    Ok(())
                }
                "Dashboard" => cli::show_dashboard(&tracker).await,
                "Exit" => break,
                _ => {
                    println!("Invalid choice");
                    Ok(())
                }
            },
            Err(InquireError::OperationInterrupted) => break,
            Err(_) => {
                println!("There was an error, please try again");
                Ok(())
            }
        };

        if let Err(e) = outcome {
            println!("Error: {}", e);
        }
    }

    Ok(())
}
