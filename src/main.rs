//! `skybook` command line.
//!
//! Each invocation is one "page load": the session starts `Unknown` and is
//! resolved from the persisted state file.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use tracing::info;

use skybook_session::AppState;
use skybook_session::api::RegisterRequest;
use skybook_session::config::{AppConfig, Cli};
use skybook_session::guard::{GuardOutcome, GuardedView, RoleGuard, RouteGuard};
use skybook_session::session::Role;
use skybook_session::status::{ServerStatus, with_fallback};
use skybook_session::telemetry::{self, LogFormat};
use skybook_session::usage::{ApiUsage, DEFAULT_MONTHLY_CAP};

#[derive(Parser, Debug)]
#[command(author, version, about = "Skybook session client", long_about = None)]
struct Args {
    #[command(flatten)]
    cli: Cli,

    /// Log format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "SKYBOOK_PASSWORD", hide_env_values = true)]
        password: String,
        /// Location that sent the user to the login view
        #[arg(long)]
        from: Option<String>,
    },
    /// Create an account and sign in
    Register {
        #[arg(long)]
        email: String,
        #[arg(long, env = "SKYBOOK_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
    },
    /// Sign out
    Logout,
    /// Show session state and profile
    Status,
    /// Evaluate the route guard for a path
    Visit { path: String },
    /// Record user activity
    Touch,
    /// Probe backend availability
    Server,
    /// Upstream flight API usage (admin only)
    Usage,
    /// Checkout widget readiness
    Checkout {
        /// Create a payment order for this booking once ready
        #[arg(long)]
        booking: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load .env (if present)
    let _ = dotenv();

    let args = Args::parse();
    telemetry::init(args.log_format);

    let config = AppConfig::from_cli(&args.cli).context("Failed to load configuration")?;
    info!(
        name: "config.loaded",
        backend = %config.backend.base_url,
        storage = %config.session.storage_path.display(),
        "Configuration loaded"
    );

    let app = AppState::from_config(config).context("Failed to initialise client")?;
    let ok = run(&app, args.command).await?;
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

async fn run(app: &AppState, command: Command) -> anyhow::Result<bool> {
    let session = &app.session;
    match command {
        Command::Login {
            email,
            password,
            from,
        } => {
            if session.login(&email, &password).await {
                let target = app.guards.post_login_target(from.as_deref());
                println!("Signed in as {email}. Continue to {target}");
                Ok(true)
            } else {
                println!("Login failed");
                Ok(false)
            }
        }
        Command::Register {
            email,
            password,
            first_name,
            last_name,
            phone,
            address,
        } => {
            let request = RegisterRequest {
                email,
                password,
                first_name,
                last_name,
                phone,
                address,
            };
            if session.register(&request).await {
                println!("Registered and signed in as {}", request.email);
                Ok(true)
            } else {
                println!("Registration failed");
                Ok(false)
            }
        }
        Command::Logout => {
            session.logout();
            println!("Signed out");
            Ok(true)
        }
        Command::Status => {
            let validity = session.validate();
            println!("state: {}", session.state());
            if let Some(profile) = session.profile() {
                println!("user:  {} <{}> ({})", profile.display_name(), profile.email, profile.role);
            }
            if let Some(deadline) = session.idle_deadline() {
                println!("idle deadline: {}", deadline.to_rfc3339());
            }
            if validity.is_expiry() {
                println!("session expired");
            }
            Ok(validity.is_valid())
        }
        Command::Visit { path } => {
            let Some(access) = app.routes.resolve(&path) else {
                println!("{path}: no such route");
                return Ok(false);
            };
            let Some(guard) = app.guards.guard_for(access) else {
                println!("{path}: render");
                return Ok(true);
            };
            let view = GuardedView::mount(guard, &path, session, app.guards.verify_grace);
            if view.poll(session) == GuardOutcome::Verifying {
                println!("{path}: verifying...");
            }
            match view.resolve(session).await {
                GuardOutcome::Render => {
                    println!("{path}: render");
                    Ok(true)
                }
                GuardOutcome::Redirect(redirect) => {
                    println!("{path}: redirect to {redirect}");
                    Ok(false)
                }
                GuardOutcome::Verifying => {
                    println!("{path}: still verifying");
                    Ok(false)
                }
            }
        }
        Command::Touch => {
            session.check_auth();
            let extended = session.record_activity();
            if extended {
                if let Some(deadline) = session.idle_deadline() {
                    println!("idle deadline extended to {}", deadline.to_rfc3339());
                }
            } else {
                println!("not signed in");
            }
            Ok(extended)
        }
        Command::Server => {
            let availability = app.status.probe().await;
            println!("backend {}: {availability:?}", app.backend.base_url());
            Ok(availability.is_available())
        }
        Command::Usage => usage(app).await,
        Command::Checkout { booking } => checkout(app, booking).await,
    }
}

async fn usage(app: &AppState) -> anyhow::Result<bool> {
    let session = &app.session;
    let admin = RoleGuard::new(Role::Admin, &app.guards.login_path, &app.guards.default_path);
    if let GuardOutcome::Redirect(redirect) = admin.decide(session, "/admin") {
        println!("usage is admin only; redirect to {redirect}");
        return Ok(false);
    }

    let token = session.bearer()?;
    let flight_api = app.backend.flight_api();
    let fetched = with_fallback(
        app.status.as_ref(),
        || flight_api.usage(&token),
        || ApiUsage::new(0, DEFAULT_MONTHLY_CAP),
    )
    .await;

    match fetched {
        Ok(fetched) => {
            if let Some(banner) = fetched.banner() {
                println!("{banner}");
            }
            let live = fetched.is_live();
            let usage = fetched.into_inner();
            println!(
                "API calls this month: {} / {} ({}%), {} remaining",
                usage.calls_this_month,
                usage.max_calls_per_month,
                usage.percent_used,
                usage.remaining()
            );
            if live {
                let enabled = flight_api.enabled(&token).await;
                println!("external flight API: {}", if enabled { "on" } else { "off" });
            }
            Ok(live)
        }
        Err(err) => {
            report(app, &err);
            Ok(false)
        }
    }
}

async fn checkout(app: &AppState, booking: Option<String>) -> anyhow::Result<bool> {
    let session = &app.session;
    let gate = &app.checkout;

    if !session.check_auth() {
        println!("not signed in; checkout needs a session");
        return Ok(false);
    }

    gate.load_widget(app.backend.http()).await;
    gate.refresh_key(session, app.backend.as_ref()).await;

    let readiness = gate.readiness();
    println!("widget ready: {}", readiness.widget_ready);
    println!("public key:   {}", readiness.public_key.as_deref().unwrap_or("-"));
    if let Some(error) = &readiness.error {
        println!("error:        {error}");
    }

    let Some(booking) = booking else {
        return Ok(readiness.can_charge());
    };
    match gate
        .begin_charge(session, app.backend.as_ref(), &booking)
        .await
    {
        Ok(order) => {
            println!(
                "order {} for {} {}",
                order.order_id,
                order.amount,
                order.currency.as_deref().unwrap_or("INR")
            );
            Ok(true)
        }
        Err(err) => {
            report(app, &err);
            Ok(false)
        }
    }
}

fn report(app: &AppState, err: &skybook_session::Error) {
    use skybook_session::error::Recovery;

    match err.recovery(&app.guards.login_path, &app.guards.default_path) {
        Recovery::ClearSessionAndRedirect(to) => {
            app.session.logout();
            println!("{err}; signed out, continue at {to}");
        }
        Recovery::Banner(message) => println!("{message}"),
        Recovery::Redirect(to) => println!("not permitted; continue at {to}"),
        Recovery::Report(message) => println!("{message}"),
    }
}
