use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use dailyx::config::{ClientConfig, ConfigError};
use dailyx::oauth::{CompletionStatus, OAuthCompletion, OAuthError, Platform, parse_redirect};
use dailyx::util::dates;
use dailyx::util::validation::{self, SignInForm, SignUpForm, ValidationError};
use dailyx::{
    ApiError, ExpenseApi, FileStore, HttpAuthApi, Route, RouteDecision, RouteGuard, SessionError, SessionStore,
};
use serde::Serialize;


#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    OAuth(#[from] OAuthError),
    #[error("{0}")]
    Invalid(#[from] ValidationError),
    #[error("not signed in; run `dailyx login` first")]
    NotSignedIn,
    #[error("already signed in as {0}; run `dailyx logout` first")]
    AlreadySignedIn(String),
    #[error("no budget set for {0}; run `dailyx budget add` first")]
    NoBudget(String),
    #[error("invalid day '{0}' (expected YYYY-MM-DD)")]
    InvalidDay(String),
    #[error("google sign-in failed: {0}")]
    OAuthDenied(String),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "dailyx", about = "Daily X expense tracker CLI")]
struct Cli {
    /// Override `DAILYX_API_URL`.
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Log debug events to stderr.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in with email and password.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "DAILYX_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and sign in.
    Signup(SignupArgs),
    Logout,
    Whoami,
    Google(GoogleCommand),
    Budget(BudgetCommand),
    /// Monthly spend summary, `MM-YYYY` (defaults to this month).
    Month { mid: Option<String> },
    Expense(ExpenseCommand),
}

#[derive(Args, Debug)]
struct SignupArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    #[arg(long, env = "DAILYX_PASSWORD", hide_env_values = true)]
    password: String,
    /// Defaults to `--password`.
    #[arg(long)]
    confirm_password: Option<String>,
    #[arg(long, default_value_t = false)]
    accept_terms: bool,
}

#[derive(Args, Debug)]
struct GoogleCommand {
    #[command(subcommand)]
    command: GoogleSubcommand,
}

#[derive(Subcommand, Debug)]
enum GoogleSubcommand {
    /// Print the consent URL to open in a browser.
    Url {
        #[arg(long, default_value = "web")]
        platform: Platform,
    },
    /// Finish sign-in from the URL the browser was redirected to.
    Complete {
        #[arg(long)]
        redirect: String,
        #[arg(long)]
        state: Option<String>,
    },
    /// Exchange a Google access token obtained elsewhere.
    Exchange {
        #[arg(long, env = "DAILYX_GOOGLE_ACCESS_TOKEN", hide_env_values = true)]
        access_token: String,
    },
}

#[derive(Args, Debug)]
struct BudgetCommand {
    #[command(subcommand)]
    command: BudgetSubcommand,
}

#[derive(Subcommand, Debug)]
enum BudgetSubcommand {
    Today,
    Show {
        day: String,
    },
    /// Set today's budget.
    Add {
        amount: String,
    },
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
}

#[derive(Args, Debug)]
struct ExpenseCommand {
    #[command(subcommand)]
    command: ExpenseSubcommand,
}

#[derive(Subcommand, Debug)]
enum ExpenseSubcommand {
    List {
        /// `YYYY-MM-DD`, defaults to today.
        #[arg(long)]
        day: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    Add {
        amount: String,
        #[arg(long)]
        description: String,
        /// Defaults to today's budget.
        #[arg(long)]
        budget_id: Option<i64>,
    },
}

struct CliContext {
    config: ClientConfig,
    store: SessionStore,
    guard: RouteGuard,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = ClientConfig::from_env()?;
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url.trim_end_matches('/').to_owned();
    }

    let auth = HttpAuthApi::from_config(&config)?;
    let store = SessionStore::new(Arc::new(auth), Arc::new(FileStore::new(&config.data_dir)));
    let mut guard = RouteGuard::new(&store);
    store.init().await;
    guard.settled().await;

    let ctx = CliContext { config, store: store.clone(), guard };
    let result = run(&ctx, cli.command).await;
    store.teardown().await;
    result
}

fn init_tracing(verbose: bool) {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::WARN };
    tracing_subscriber::fmt().with_writer(std::io::stderr).with_max_level(level).init();
}

async fn run(ctx: &CliContext, command: Command) -> Result<(), CliError> {
    if let Some(route) = command_route(&command) {
        authorize(ctx, &route)?;
    }
    match command {
        Command::Login { email, password } => run_login(ctx, email, password).await,
        Command::Signup(args) => run_signup(ctx, args).await,
        Command::Logout => {
            ctx.store.sign_out().await;
            eprintln!("signed out");
            Ok(())
        }
        Command::Whoami => {
            let user = ctx.store.user().ok_or(CliError::NotSignedIn)?;
            print_json(&user)
        }
        Command::Google(google) => run_google(ctx, google).await,
        Command::Budget(budget) => run_budget(ctx, budget).await,
        Command::Month { mid } => {
            let mid = mid.unwrap_or_else(|| dates::month_id(dates::today()));
            let summary = expense_api(ctx)?.monthly_summary(&mid).await?;
            print_json(&summary)
        }
        Command::Expense(expense) => run_expense(ctx, expense).await,
    }
}

/// Route a command stands in for; `None` for commands the guard ignores.
fn command_route(command: &Command) -> Option<Route> {
    let route = match command {
        Command::Login { .. } | Command::Signup(_) => Route::Entry,
        Command::Logout => return None,
        Command::Google(google) => match google.command {
            GoogleSubcommand::Url { .. } => return None,
            GoogleSubcommand::Complete { .. } | GoogleSubcommand::Exchange { .. } => Route::OAuthRedirect,
        },
        Command::Whoami => Route::Profile,
        Command::Budget(_) | Command::Month { .. } => Route::Dashboard,
        Command::Expense(expense) => match &expense.command {
            ExpenseSubcommand::List { day: Some(day), .. } => Route::ExpenseDay(day.clone()),
            ExpenseSubcommand::List { day: None, .. } | ExpenseSubcommand::Add { .. } => Route::Expenses,
        },
    };
    Some(route)
}

fn authorize(ctx: &CliContext, route: &Route) -> Result<(), CliError> {
    match ctx.guard.decide(route) {
        RouteDecision::Render(_) => Ok(()),
        RouteDecision::Redirect(Route::Entry) | RouteDecision::Loading => Err(CliError::NotSignedIn),
        RouteDecision::Redirect(_) => {
            let email = ctx.store.user().map(|u| u.email).unwrap_or_default();
            Err(CliError::AlreadySignedIn(email))
        }
    }
}

// =============================================================================
// AUTH
// =============================================================================

async fn run_login(ctx: &CliContext, email: String, password: String) -> Result<(), CliError> {
    let form = SignInForm { email: email.trim().to_owned(), password };
    form.validate()?;
    let user = ctx.store.sign_in_with_email(&form.email, &form.password).await?;
    eprintln!("signed in as {}", user.email);
    Ok(())
}

async fn run_signup(ctx: &CliContext, args: SignupArgs) -> Result<(), CliError> {
    let form = SignUpForm {
        name: args.name.trim().to_owned(),
        email: args.email.trim().to_owned(),
        confirm_password: args.confirm_password.unwrap_or_else(|| args.password.clone()),
        password: args.password,
        accepted_terms: args.accept_terms,
    };
    form.validate()?;
    let user = ctx.store.sign_up_with_email(&form.name, &form.email, &form.password).await?;
    eprintln!("account created; signed in as {}", user.email);
    Ok(())
}

async fn run_google(ctx: &CliContext, google: GoogleCommand) -> Result<(), CliError> {
    let completion = OAuthCompletion::new(ctx.store.clone());
    match google.command {
        GoogleSubcommand::Url { platform } => {
            let request = ctx.config.google.authorization_request(platform)?;
            println!("{}", request.url);
            eprintln!("state: {}", request.state);
            Ok(())
        }
        GoogleSubcommand::Complete { redirect, state } => {
            let outcome = parse_redirect(&redirect, state.as_deref());
            completion.begin().await;
            report_completion(completion.complete(outcome).await?)
        }
        GoogleSubcommand::Exchange { access_token } => {
            completion.begin().await;
            let outcome = dailyx::OAuthOutcome::Success { access_token };
            report_completion(completion.complete(outcome).await?)
        }
    }
}

fn report_completion(status: CompletionStatus) -> Result<(), CliError> {
    match status {
        CompletionStatus::SignedIn(user) => {
            eprintln!("signed in as {}", user.email);
            Ok(())
        }
        CompletionStatus::AlreadyAuthenticated => {
            eprintln!("already signed in");
            Ok(())
        }
        CompletionStatus::Cancelled => {
            eprintln!("google sign-in cancelled");
            Ok(())
        }
        CompletionStatus::Denied(message) => Err(CliError::OAuthDenied(message)),
    }
}

// =============================================================================
// BUDGETS & EXPENSES
// =============================================================================

fn expense_api(ctx: &CliContext) -> Result<ExpenseApi, CliError> {
    Ok(ExpenseApi::from_config(&ctx.config, ctx.store.clone())?)
}

fn today() -> String {
    dates::day_string(dates::today())
}

fn checked_day(raw: &str) -> Result<String, CliError> {
    dates::parse_day(raw).map(dates::day_string).ok_or_else(|| CliError::InvalidDay(raw.to_owned()))
}

async fn run_budget(ctx: &CliContext, budget: BudgetCommand) -> Result<(), CliError> {
    let api = expense_api(ctx)?;
    match budget.command {
        BudgetSubcommand::Today => {
            let day = today();
            let budget = api.budget_for_day(&day).await?.ok_or(CliError::NoBudget(day))?;
            print_json(&budget)
        }
        BudgetSubcommand::Show { day } => {
            let day = checked_day(&day)?;
            let budget = api.budget_for_day(&day).await?.ok_or(CliError::NoBudget(day))?;
            print_json(&budget)
        }
        BudgetSubcommand::Add { amount } => {
            let amount = validation::parse_amount(&amount)?;
            let budget = api.add_budget(amount).await?;
            print_json(&budget)
        }
        BudgetSubcommand::List { page, limit } => {
            let budgets = api.budgets_page(page, limit).await?;
            print_json(&budgets)
        }
    }
}

async fn run_expense(ctx: &CliContext, expense: ExpenseCommand) -> Result<(), CliError> {
    let api = expense_api(ctx)?;
    match expense.command {
        ExpenseSubcommand::List { day, page, limit } => {
            let day = match day {
                Some(day) => checked_day(&day)?,
                None => today(),
            };
            let expenses = api.expenses_page(page, limit, &day).await?;
            print_json(&expenses)
        }
        ExpenseSubcommand::Add { amount, description, budget_id } => {
            let amount = validation::parse_amount(&amount)?;
            let budget_id = match budget_id {
                Some(id) => id,
                None => {
                    let day = today();
                    api.budget_for_day(&day).await?.ok_or(CliError::NoBudget(day))?.id
                }
            };
            let expense = api.add_expense(amount, description.trim(), budget_id).await?;
            print_json(&expense)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
