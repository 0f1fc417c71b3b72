use std::{error::Error, fs::File, io::Write};

use clap::{Args, Parser, Subcommand, ValueEnum};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    style::Print,
    terminal,
    terminal::ClearType,
};
use engine::{Engine, MoneyCents, NewUser, UserFilter, UserState};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};

mod import;

#[derive(Parser, Debug)]
#[command(name = "borgia_admin")]
#[command(about = "Admin utilities for Borgia (bootstrap, user import, shops)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./borgia.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    President(President),
    User(User),
    Shop(Shop),
}

#[derive(Args, Debug)]
struct President {
    #[command(subcommand)]
    command: PresidentCommand,
}

#[derive(Subcommand, Debug)]
enum PresidentCommand {
    /// Creates the first president. Refused once one exists.
    Create(PresidentCreateArgs),
}

#[derive(Args, Debug)]
struct PresidentCreateArgs {
    #[arg(long)]
    username: String,
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
    #[arg(long)]
    email: Option<String>,
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    /// Creates one user per CSV row, on behalf of `operator`.
    Import(UserImportArgs),
    List(UserListArgs),
}

#[derive(Args, Debug)]
struct UserImportArgs {
    #[arg(long)]
    operator: String,
    #[arg(long)]
    file: String,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StateArg {
    Active,
    Inactive,
    Negative,
}

#[derive(Args, Debug)]
struct UserListArgs {
    #[arg(long, value_enum)]
    state: Option<StateArg>,
    /// Active users whose balance is below this amount, e.g. `-10,50`.
    #[arg(long, conflicts_with = "state", allow_hyphen_values = true)]
    below: Option<String>,
    #[arg(long)]
    year: Option<i32>,
    #[arg(long)]
    search: Option<String>,
}

#[derive(Args, Debug)]
struct Shop {
    #[command(subcommand)]
    command: ShopCommand,
}

#[derive(Subcommand, Debug)]
enum ShopCommand {
    Create(ShopCreateArgs),
}

#[derive(Args, Debug)]
struct ShopCreateArgs {
    #[arg(long)]
    operator: String,
    /// Lowercase letters and digits.
    #[arg(long)]
    name: String,
    #[arg(long, default_value = "")]
    description: String,
    #[arg(long, default_value = "")]
    color: String,
}

struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> Result<Self, Box<dyn Error + Send + Sync>> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn prompt_password(prompt: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
    let _raw = RawModeGuard::enter()?;

    let mut out = std::io::stderr();
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(prompt)
    )?;
    out.flush()?;

    let mut buf = String::new();
    loop {
        let Event::Key(KeyEvent {
            code, modifiers, ..
        }) = event::read()?
        else {
            continue;
        };

        match code {
            KeyCode::Enter => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                break;
            }
            KeyCode::Backspace => {
                if buf.pop().is_some() {
                    execute!(out, cursor::MoveLeft(1), Print(" "), cursor::MoveLeft(1))?;
                    out.flush()?;
                }
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                return Err("interrupted".into());
            }
            KeyCode::Char(ch) if !modifiers.contains(KeyModifiers::CONTROL) => {
                buf.push(ch);
                execute!(out, Print("*"))?;
                out.flush()?;
            }
            _ => {}
        }
    }

    Ok(buf)
}

fn prompt_password_twice() -> Result<String, Box<dyn Error + Send + Sync>> {
    let mut out = std::io::stderr();
    for _ in 0..3 {
        let p1 = prompt_password("Password: ")?;
        if p1.is_empty() {
            execute!(
                out,
                cursor::MoveToColumn(0),
                terminal::Clear(ClearType::CurrentLine),
                Print("A president needs a password.\r\n")
            )?;
            continue;
        }

        let p2 = prompt_password("Confirm password: ")?;
        if p1 == p2 {
            return Ok(p1);
        }

        execute!(
            out,
            cursor::MoveToColumn(0),
            terminal::Clear(ClearType::CurrentLine),
            Print("Passwords do not match. Try again.\r\n")
        )?;
    }

    Err("too many attempts".into())
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

fn user_state(args: &UserListArgs) -> Result<Option<UserState>, Box<dyn Error + Send + Sync>> {
    if let Some(below) = &args.below {
        let threshold: MoneyCents = below.parse()?;
        return Ok(Some(UserState::BelowThreshold(threshold)));
    }
    Ok(args.state.map(|state| match state {
        StateArg::Active => UserState::Active,
        StateArg::Inactive => UserState::Inactive,
        StateArg::Negative => UserState::NegativeBalance,
    }))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    match cli.command {
        Command::President(President {
            command: PresidentCommand::Create(args),
        }) => {
            let password = prompt_password_twice()?;
            let mut new_user =
                NewUser::new(&args.username, password, args.first_name, args.last_name);
            new_user.email = args.email;

            let president = engine.bootstrap_president(new_user).await?;
            println!("created president: {} ({})", president.username, president.id);
        }
        Command::User(User {
            command: UserCommand::Import(args),
        }) => {
            let operator = engine.user_by_username(&args.operator).await?;
            let file = File::open(&args.file)?;

            let (mut created, mut failed) = (0, 0);
            for (line, row) in import::read_rows(file) {
                let outcome = match row {
                    Ok(row) => engine
                        .create_user(operator.id, row.into())
                        .await
                        .map_err(|err| err.to_string()),
                    Err(err) => Err(err.to_string()),
                };
                match outcome {
                    Ok(user) => {
                        created += 1;
                        println!("line {line}: created {}", user.username);
                    }
                    Err(err) => {
                        failed += 1;
                        eprintln!("line {line}: {err}");
                    }
                }
            }
            println!("{created} users created, {failed} rows rejected");
        }
        Command::User(User {
            command: UserCommand::List(args),
        }) => {
            let filter = UserFilter {
                state: user_state(&args)?,
                search: args.search,
                year: args.year,
            };
            for user in engine.list_users(filter).await? {
                println!(
                    "{}\t{} {}\t{}\t{}",
                    user.username,
                    user.first_name,
                    user.last_name,
                    user.year.map_or_else(String::new, |year| year.to_string()),
                    user.balance
                );
            }
        }
        Command::Shop(Shop {
            command: ShopCommand::Create(args),
        }) => {
            let operator = engine.user_by_username(&args.operator).await?;
            let shop = engine
                .create_shop(operator.id, &args.name, &args.description, &args.color)
                .await?;
            println!("created shop: {} ({})", shop.name, shop.id);
        }
    }

    Ok(())
}
