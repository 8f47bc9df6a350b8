// Demo application for the Identifo client SDK.
//
// Command-line counterpart of a login screen: constructs the client from
// environment configuration, prints or watches the auth state, and exposes
// each auth flow as a subcommand.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use identifo::{AuthState, IdentifoAuth, IdentifoConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "identifo-demo",
    about = "Drive the Identifo auth flows from the command line"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the current authentication state
    Status,
    /// Subscribe to the auth state stream and print every transition
    Watch,
    /// Register a new account
    Register {
        username: String,
        password: String,
        /// Register an anonymous account
        #[arg(long)]
        anonymous: bool,
    },
    /// Log in with username and password
    Login { username: String, password: String },
    /// Request a one-time code for a phone number
    PhoneCode { phone_number: String },
    /// Log in with a phone number and a one-time code
    PhoneLogin { phone_number: String, code: String },
    /// Log in through a federated identity provider
    Federated { provider: String, token: String },
    /// Send a password reset email
    ResetPassword { email: String },
    /// Convert an anonymous account into a named one
    Deanonymize {
        old_username: String,
        old_password: String,
        new_username: String,
        new_password: String,
    },
    /// Log out and clear the local session
    Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = IdentifoConfig::from_env().context("Failed to load Identifo configuration")?;
    let auth = IdentifoAuth::connect(config);

    match cli.command {
        Command::Status => {
            print_state(&auth.auth_state().current());
        }
        Command::Watch => {
            let mut states = auth.auth_state().subscribe();
            while let Some(state) = states.next().await {
                print_state(&state);
            }
        }
        Command::Register {
            username,
            password,
            anonymous,
        } => {
            let response = auth.register(&username, &password, anonymous).await?;
            println!("registered {}", response.user.username);
            print_state(&auth.auth_state().current());
        }
        Command::Login { username, password } => {
            let response = auth.login(&username, &password).await?;
            println!("logged in as {}", response.user.username);
            print_state(&auth.auth_state().current());
        }
        Command::PhoneCode { phone_number } => {
            auth.request_phone_code(&phone_number).await?;
            println!("code sent to {phone_number}");
        }
        Command::PhoneLogin { phone_number, code } => {
            let response = auth.phone_login(&phone_number, &code).await?;
            println!("logged in as {}", response.user.username);
            print_state(&auth.auth_state().current());
        }
        Command::Federated { provider, token } => {
            let response = auth.federated_login(&provider, &token).await?;
            println!("logged in as {}", response.user.username);
            print_state(&auth.auth_state().current());
        }
        Command::ResetPassword { email } => {
            auth.reset_password(&email).await?;
            println!("reset email sent to {email}");
        }
        Command::Deanonymize {
            old_username,
            old_password,
            new_username,
            new_password,
        } => {
            auth.deanonymize(&old_username, &old_password, &new_username, &new_password)
                .await?;
            println!("account renamed to {new_username}; log in to use the new identity");
        }
        Command::Logout => {
            auth.logout().await?;
            println!("logged out");
            print_state(&auth.auth_state().current());
        }
    }

    Ok(())
}

fn print_state(state: &AuthState) {
    match state {
        AuthState::Authenticated { user, .. } => match user {
            Some(user) if user.is_anonymous => {
                println!("authenticated as {} (anonymous)", user.username)
            }
            Some(user) => println!("authenticated as {}", user.username),
            None => println!("authenticated (no stored profile)"),
        },
        AuthState::Deauthenticated => println!("not authenticated"),
    }
}
