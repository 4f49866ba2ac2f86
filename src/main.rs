//! CLI aclsync
//!
//! Хост-привязка адаптера жизненного цикла: приводит ACL-пользователей живого
//! Redis в соответствие с объявленным состоянием. Каждая подкоманда
//! выполняет одно событие жизненного цикла и печатает итоговую запись или
//! диагностику.

use std::{path::PathBuf, process::ExitCode, time::Duration};

use aclsync::{
    config::Settings,
    logging::{init_logging, LogFormat, LoggingHandle},
    AccountRecord, AclSyncResult, CancelHandle, Cancellation, Connection, ConnectionParams,
    Diagnostic, Operation, ReconcilerAdapter, Secret, StatusCode,
};
use aclsync_error::{ensure, ResultExt};
use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::debug;

/// Основная структура CLI аргументов
#[derive(Parser)]
#[command(name = "aclsync")]
#[command(author = "aclsync contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "aclsync - reconcile declared Redis ACL users with a live server", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Путь к TOML-файлу настроек
    #[arg(short, long, env = "ACLSYNC_CONFIG", help = "Файл настроек (TOML)")]
    config: Option<PathBuf>,
    /// Хост Redis
    #[arg(short = 'H', long, help = "Хост Redis (по умолчанию 127.0.0.1)")]
    host: Option<String>,
    /// Порт Redis
    #[arg(short, long, help = "Порт Redis (по умолчанию 6379)")]
    port: Option<u16>,
    /// Пользователь для подключения
    #[arg(short, long, help = "Пользователь Redis для подключения")]
    username: Option<String>,
    /// Пароль для подключения
    #[arg(
        long,
        help = "Пароль для подключения (можно использовать переменную окружения ACLSYNC_PASSWORD)"
    )]
    password: Option<String>,
    /// Дедлайн операции в секундах
    #[arg(long, help = "Дедлайн операции в секундах")]
    timeout: Option<u64>,
    /// Подробный вывод (debug)
    #[arg(short, long, help = "Включить подробный вывод для отладки")]
    verbose: bool,
    /// Подавить логи (только error)
    #[arg(short = 'q', long, help = "Подавить логирование (только error)")]
    quiet: bool,
    /// Формат логов
    #[arg(long, value_enum, help = "Формат логов")]
    log_format: Option<LogFormat>,
    /// Формат вывода результата
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        help = "Формат вывода результата"
    )]
    output: OutputFormat,
    #[command(subcommand)]
    command: Commands,
}

/// Формат вывода CLI
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum OutputFormat {
    /// Человекочитаемый формат
    Pretty,
    /// JSON формат
    Json,
}

/// Аргументы объявленной учётной записи
#[derive(clap::Args, Debug)]
struct AccountArgs {
    /// Имя ACL-пользователя
    username: String,
    /// Пароль ACL-пользователя
    #[arg(
        long,
        env = "ACLSYNC_ACCOUNT_PASSWORD",
        hide_env_values = true,
        help = "Пароль создаваемого пользователя"
    )]
    account_password: Option<String>,
    /// Индекс базы; -1 или отсутствие означает без ограничения
    #[arg(long, allow_hyphen_values = true, help = "Разрешённая база (-1 = любая)")]
    db: Option<i64>,
}

/// Подкоманды CLI
#[derive(Subcommand)]
enum Commands {
    /// Создать пользователя (declare)
    Create(AccountArgs),
    /// Пересоздать пользователя с новыми параметрами (modify)
    Update {
        #[command(flatten)]
        account: AccountArgs,
        /// Прежнее имя, если пользователь переименован
        #[arg(long, help = "Прежнее имя пользователя")]
        prior_username: Option<String>,
    },
    /// Удалить пользователя (remove)
    Delete {
        /// Имя ACL-пользователя
        username: String,
    },
    /// Вернуть запись без обращения к Redis (observe)
    Read(AccountArgs),
    /// Принять под управление существующего пользователя
    Import {
        /// Имя ACL-пользователя
        id: String,
    },
    /// Проверить существование пользователя
    Exists {
        /// Имя ACL-пользователя
        username: String,
    },
}

/// Результат подкоманды
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Outcome {
    Record(AccountRecord),
    Exists { username: String, exists: bool },
    Deleted { username: String, deleted: bool },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let (settings, logging) = bootstrap(&cli)?;
    debug!(host = %settings.host, port = ?settings.port, "settings loaded");

    let code = run(&cli, &settings).await;
    logging.shutdown();
    code
}

/// Настройки (файл, окружение, флаги) и логирование
fn bootstrap(cli: &Cli) -> AclSyncResult<(Settings, LoggingHandle)> {
    ensure!(
        cli.timeout != Some(0),
        StatusCode::InvalidArgs,
        "--timeout must be at least 1 second"
    );

    let mut settings = Settings::load(cli.config.as_deref()).context("failed to load settings")?;
    apply_overrides(&mut settings, cli);
    settings
        .validate()
        .context("invalid command line overrides")?;

    let logging = init_logging(&settings.log).context("failed to initialize logging")?;
    Ok((settings, logging))
}

/// CLI-флаги поверх настроек из файла и окружения
fn apply_overrides(
    settings: &mut Settings,
    cli: &Cli,
) {
    if let Some(host) = &cli.host {
        settings.host = host.clone();
    }
    if cli.port.is_some() {
        settings.port = cli.port;
    }
    if cli.username.is_some() {
        settings.username = cli.username.clone();
    }
    if let Some(password) = &cli.password {
        settings.password = Some(Secret::new(password.clone()));
    }
    if let Some(format) = cli.log_format {
        settings.log.format = format;
    }
    // quiet имеет приоритет над verbose
    if cli.quiet {
        settings.log.level = "error".to_string();
    } else if cli.verbose {
        settings.log.level = "debug".to_string();
    }
}

async fn run(
    cli: &Cli,
    settings: &Settings,
) -> Result<ExitCode> {
    let handle = CancelHandle::new();
    let mut cancel = handle.token();
    if let Some(secs) = cli.timeout {
        cancel = cancel.with_timeout(Duration::from_secs(secs));
    }

    // Ctrl-C отменяет операцию, выполняющуюся в данный момент
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling");
            handle.cancel();
        }
    });

    let conn = connect(&settings.connection_params(), &cancel).await?;
    let mut adapter = ReconcilerAdapter::new();
    adapter.configure(conn);

    match execute(&adapter, &cli.command, &cancel).await {
        Ok(outcome) => {
            print_outcome(&outcome, cli.output)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(diagnostic) => {
            print_diagnostic(&diagnostic, cli.output)?;
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn connect(
    params: &ConnectionParams,
    cancel: &Cancellation,
) -> AclSyncResult<Connection> {
    cancel
        .run(Operation::Read, Connection::establish(params))
        .await
        .context("connection interrupted")?
        .with_context(|| format!("failed to connect to {}", params.endpoint()))
}

/// Обработчик выполнения команд
async fn execute(
    adapter: &ReconcilerAdapter,
    command: &Commands,
    cancel: &Cancellation,
) -> Result<Outcome, Diagnostic> {
    match command {
        Commands::Create(args) => adapter
            .declare(args.record(), cancel)
            .await
            .map(Outcome::Record),
        Commands::Update {
            account,
            prior_username,
        } => {
            let desired = account.record();
            let prior = AccountRecord::new(
                prior_username
                    .clone()
                    .unwrap_or_else(|| desired.username.clone()),
                None,
                None,
            );
            adapter
                .modify(desired, &prior, cancel)
                .await
                .map(Outcome::Record)
        }
        Commands::Delete { username } => {
            let prior = AccountRecord::new(username.clone(), None, None);
            adapter.remove(&prior, cancel).await?;
            Ok(Outcome::Deleted {
                username: username.clone(),
                deleted: true,
            })
        }
        Commands::Read(args) => adapter.observe(args.record()).await.map(Outcome::Record),
        Commands::Import { id } => adapter.import(id).map(Outcome::Record),
        Commands::Exists { username } => {
            let record = AccountRecord::new(username.clone(), None, None);
            let exists = adapter.exists(&record, cancel).await?;
            Ok(Outcome::Exists {
                username: username.clone(),
                exists,
            })
        }
    }
}

impl AccountArgs {
    fn record(&self) -> AccountRecord {
        AccountRecord::new(
            self.username.clone(),
            self.account_password.clone().map(Secret::new),
            self.db,
        )
    }
}

fn print_outcome(
    outcome: &Outcome,
    output: OutputFormat,
) -> Result<()> {
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(outcome)?),
        OutputFormat::Pretty => match outcome {
            Outcome::Record(record) => {
                println!("username: {}", record.username);
                match record.db {
                    Some(db) if db >= 0 => println!("db:       {db}"),
                    _ => println!("db:       unrestricted"),
                }
            }
            Outcome::Exists { username, exists } => println!("{username}: exists={exists}"),
            Outcome::Deleted { username, .. } => println!("{username}: deleted"),
        },
    }
    Ok(())
}

fn print_diagnostic(
    diagnostic: &Diagnostic,
    output: OutputFormat,
) -> Result<()> {
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(diagnostic)?),
        OutputFormat::Pretty => {
            eprintln!("{diagnostic}");
            if diagnostic.status.is_retryable() {
                eprintln!("hint: the store did not confirm the change; the command can be retried");
            }
        }
    }
    Ok(())
}
