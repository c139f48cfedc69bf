//! logbridge-tracing：把原生日志接入 `tracing` 生态的零配置集成层。
//!
//! # 设计背景（Why）
//! - 多数 Rust 宿主已经以 `tracing` 作为日志门面，原生库的输出应与宿主日志进入同一条管线；
//! - 核心 crate 只定义 Sink 契约，不决定最终输出形态，这里提供最常用的一种实现。
//!
//! # 使用方式（How）
//! - [`install`] 组装 `fmt + EnvFilter` 并设为全局 Subscriber（可选，宿主已有 Subscriber 时跳过）；
//! - [`attach`] 把 [`TracingSink`] 注册到注册表的两个槽位；
//! - 原生消息以 [`NATIVE_TARGET`] 为 target 输出，可用 `RUST_LOG=logbridge::native=debug` 单独调节。

use std::sync::OnceLock;

use logbridge_core::{LegacySink, LeveledSink, SinkRegistry};
use tracing::dispatcher;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt};

/// 原生消息事件使用的 target。
pub const NATIVE_TARGET: &str = "logbridge::native";

static INSTALLED: OnceLock<()> = OnceLock::new();

/// 把每条原生消息转成一条 `tracing` 事件的 Sink。
///
/// 带级别协议按 `error/warn/info/debug` 一一对应；旧式协议的 `info` / `warning`
/// 分别对应 `info` / `warn`。
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LeveledSink for TracingSink {
    fn debug(&self, message: &str) {
        tracing::debug!(target: NATIVE_TARGET, "{message}");
    }

    fn info(&self, message: &str) {
        tracing::info!(target: NATIVE_TARGET, "{message}");
    }

    fn warning(&self, message: &str) {
        tracing::warn!(target: NATIVE_TARGET, "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(target: NATIVE_TARGET, "{message}");
    }
}

impl LegacySink for TracingSink {
    fn info(&self, message: &str) {
        tracing::info!(target: NATIVE_TARGET, "{message}");
    }

    fn warning(&self, message: &str) {
        tracing::warn!(target: NATIVE_TARGET, "{message}");
    }
}

/// 把 [`TracingSink`] 注册到两个槽位。
pub fn attach(registry: &SinkRegistry) {
    registry.register_leveled(TracingSink);
    registry.register_legacy(TracingSink);
}

/// 安装阶段可能出现的错误。
#[derive(Debug)]
pub enum Error {
    /// `install` 被重复调用。
    AlreadyInstalled,
    /// 外部提前设置了全局 `tracing` Subscriber。
    SubscriberAlreadySet,
    /// 默认过滤指令无法解析。
    InvalidFilter(String),
    /// 设置全局 Subscriber 失败的底层错误。
    SetGlobalSubscriber(tracing::dispatcher::SetGlobalDefaultError),
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::AlreadyInstalled => {
                f.write_str("logbridge-tracing 已完成安装，禁止重复调用 install")
            }
            Error::SubscriberAlreadySet => {
                f.write_str("全局 tracing Subscriber 已存在，logbridge-tracing 无法覆盖")
            }
            Error::InvalidFilter(reason) => write!(f, "默认过滤指令无法解析: {reason}"),
            Error::SetGlobalSubscriber(err) => {
                write!(f, "设置 tracing 全局 Subscriber 失败: {err}")
            }
        }
    }
}

impl std::error::Error for Error {}

/// 安装全局 `fmt + EnvFilter` Subscriber。
///
/// # 教案式说明
/// - **意图（Why）**：没有自带日志管线的宿主调用一次即可看到原生日志；
/// - **逻辑（How）**：`RUST_LOG` 存在时优先使用，否则采用 `default_directives`；
/// - **契约（What）**：重复调用返回 [`Error::AlreadyInstalled`]；外部已设置 Subscriber 时返回
///   [`Error::SubscriberAlreadySet`]，此时宿主只需调用 [`attach`]。
pub fn install(default_directives: &str) -> Result<(), Error> {
    if INSTALLED.get().is_some() {
        return Err(Error::AlreadyInstalled);
    }
    if dispatcher::has_been_set() {
        return Err(Error::SubscriberAlreadySet);
    }

    let filter = build_env_filter(default_directives)?;
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer());
    tracing::subscriber::set_global_default(subscriber).map_err(Error::SetGlobalSubscriber)?;

    INSTALLED.set(()).map_err(|_| Error::AlreadyInstalled)
}

fn build_env_filter(default_directives: &str) -> Result<EnvFilter, Error> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default_directives)
            .map_err(|err| Error::InvalidFilter(err.to_string())),
    }
}
