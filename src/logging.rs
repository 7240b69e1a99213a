//! # Logging モジュール
//!
//! 戦闘シミュレーションのログ管理機能を提供します。
//!
//! tracing-appenderによる非同期ファイル出力とコンソール出力を組み合わせ、
//! フレームループの処理速度に影響を与えずに構造化ログを記録します。
//!
//! ## 設定可能な出力先
//!
//! - `Console`: コンソールのみ（compact形式）
//! - `File`: ファイルのみ（logs/battlesim.YYYY-MM-DD、JSON形式）
//! - `Both`: コンソールとファイルの両方
//!
//! 環境変数 `RUST_LOG` が設定されている場合は、設定ファイルのレベルより優先されます。

use std::str::FromStr;
use tracing::Level;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// ログ出力先の設定
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogOutput {
    /// コンソールのみ
    Console,
    /// ファイルのみ
    File,
    /// コンソールとファイルの両方
    Both,
}

impl FromStr for LogOutput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "console" | "stdout" => Ok(LogOutput::Console),
            "file" => Ok(LogOutput::File),
            "both" | "all" => Ok(LogOutput::Both),
            _ => Err(format!("無効な出力先: {}. 利用可能: console, file, both", s)),
        }
    }
}

/// ログ設定構造体
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// ログレベル
    pub level: Level,
    /// 出力先
    pub output: LogOutput,
    /// ログファイルのディレクトリ（Fileまたは Bothの場合）
    pub log_dir: String,
    /// ログファイル名のプレフィックス
    pub file_prefix: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            output: LogOutput::Console,
            log_dir: "logs".to_string(),
            file_prefix: "battlesim".to_string(),
        }
    }
}

impl LogConfig {
    /// ファイル出力を伴う設定か
    pub fn writes_file(&self) -> bool {
        matches!(self.output, LogOutput::File | LogOutput::Both)
    }
}

/// ログシステムを初期化
///
/// 指定された設定に基づいてtracing-subscriberを設定します。
///
/// # 戻り値
///
/// ファイル出力を行う場合は非同期書き込みのガード。呼び出し側はシミュレーション
/// 終了まで保持する必要があります（破棄時に未書き込みのログをフラッシュします）。
///
/// # 例
///
/// ```no_run
/// use battlesim::logging::{LogConfig, LogOutput, init_logging};
/// use tracing::Level;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = LogConfig {
///     level: Level::DEBUG,
///     output: LogOutput::Both,
///     log_dir: "logs".to_string(),
///     file_prefix: "battlesim".to_string(),
/// };
///
/// let _guard = init_logging(config)?;
/// # Ok(())
/// # }
/// ```
pub fn init_logging(config: LogConfig) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
    // 環境変数またはconfigからログレベルを設定
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.level.to_string()))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if config.writes_file() {
        ensure_log_directory(&config.log_dir)?;
    }

    match config.output {
        LogOutput::Console => {
            Registry::default()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_thread_ids(false)
                        .with_file(false)
                        .with_line_number(false)
                        .compact(),
                )
                .try_init()?;
            Ok(None)
        }
        LogOutput::File => {
            // ファイルのみ（非同期）
            let file_appender = rolling::daily(&config.log_dir, &config.file_prefix);
            let (non_blocking_appender, guard) = non_blocking(file_appender);

            Registry::default()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_writer(non_blocking_appender)
                        .with_target(true)
                        .with_thread_ids(true)
                        .with_file(false)
                        .with_line_number(false)
                        .json(),
                )
                .try_init()?;
            Ok(Some(guard))
        }
        LogOutput::Both => {
            // コンソールとファイルの両方（非同期）
            let file_appender = rolling::daily(&config.log_dir, &config.file_prefix);
            let (non_blocking_appender, guard) = non_blocking(file_appender);

            Registry::default()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_thread_ids(false)
                        .with_file(false)
                        .with_line_number(false)
                        .compact(),
                )
                .with(
                    fmt::layer()
                        .with_writer(non_blocking_appender)
                        .with_target(true)
                        .with_thread_ids(true)
                        .with_file(false)
                        .with_line_number(false)
                        .json(),
                )
                .try_init()?;
            Ok(Some(guard))
        }
    }
}

/// ログレベルを文字列から解析
///
/// 無効な文字列の場合は警告を表示してINFOを返します。
pub fn parse_log_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!("警告: 無効なログレベル '{}'. INFOを使用します", level_str);
            Level::INFO
        }
    }
}

/// 詳細出力レベル（-v の回数）からログレベルを決定
pub fn level_for_verbosity(verbose_level: u8) -> Level {
    match verbose_level {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// ログディレクトリを作成
pub fn ensure_log_directory(log_dir: &str) -> Result<(), std::io::Error> {
    std::fs::create_dir_all(log_dir)?;
    Ok(())
}
