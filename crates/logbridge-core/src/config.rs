//! 桥接层配置：TOML 文件 + `LOGBRIDGE_*` 环境变量覆盖。
//!
//! # 设计背景（Why）
//! - 桥接层的行为差异都集中在“出错或无人接收时怎么办”，这些策略应可在部署时调整而无需改代码；
//! - 与原生库初始化一样，配置在进程启动时读取一次，注册表构建后不再变化。
//!
//! # 契约说明（What）
//! - 所有字段都有默认值，空文档即默认配置；未知键被拒绝，避免拼写错误被静默忽略；
//! - 环境变量优先级高于文件，取值大小写不敏感。
//!
//! | 键 | 取值 | 默认 |
//! |---|---|---|
//! | `decode` | `strict` / `lossy` | `strict` |
//! | `assembly` | `line_buffered` / `per_call` | `line_buffered` |
//! | `on_sink_failure` | `drop` / `diagnose` | `diagnose` |
//! | `leveled_fallback` | `silent` / `legacy` | `silent` |
//! | `legacy_stream` | `stdout` / `stderr` | `stdout` |
//! | `info_method` / `warning_method` | 字符串 | `info` / `warning` |

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::capability::LegacyMethodNames;
use crate::error::ConfigError;

macro_rules! config_choice {
    (
        $(#[$meta:meta])*
        $name:ident [default = $default:ident] {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl $name {
            fn parse(value: &str) -> Option<Self> {
                match value.trim().to_ascii_lowercase().as_str() {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

config_choice! {
    /// 原生字节不是合法 UTF-8 时的处理方式。
    DecodePolicy [default = Strict] {
        /// 丢弃整条消息。
        Strict => "strict",
        /// 以 U+FFFD 替换非法序列后照常投递。
        Lossy => "lossy",
    }
}

config_choice! {
    /// 无级别通道上的消息拼装方式。
    ///
    /// 原生库把一行拆成前缀、正文、换行三次调用；默认的 `LineBuffered` 按调用线程拼接，
    /// 直到遇到空白块或以换行结尾的块再整体投递。带级别通道始终逐次投递。
    AssemblyMode [default = LineBuffered] {
        LineBuffered => "line_buffered",
        /// 每次调用视为一条完整消息，仅适用于确定不分块输出的原生库。
        PerCall => "per_call",
    }
}

config_choice! {
    /// Sink 方法 panic 后的降级方式。
    FailurePolicy [default = Diagnose] {
        /// 静默丢弃消息。
        Drop => "drop",
        /// 丢弃消息，并通过 `tracing` 输出一条 warn 级诊断。
        Diagnose => "diagnose",
    }
}

config_choice! {
    /// 带级别槽位仍为默认 Sink 时消息的去向。
    LeveledFallback [default = Silent] {
        /// 交给空操作 Sink，即静默丢弃。
        Silent => "silent",
        /// 转投旧式槽位：error/warning 走 `warning`，info/debug 走 `info`。
        Legacy => "legacy",
    }
}

config_choice! {
    /// 默认旧式 Sink 写入的标准流。
    LegacyStream [default = Stdout] {
        Stdout => "stdout",
        Stderr => "stderr",
    }
}

/// 桥接层配置。
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    pub decode: DecodePolicy,
    pub assembly: AssemblyMode,
    pub on_sink_failure: FailurePolicy,
    pub leveled_fallback: LeveledFallback,
    pub legacy_stream: LegacyStream,
    pub info_method: String,
    pub warning_method: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        let names = LegacyMethodNames::default();
        Self {
            decode: DecodePolicy::default(),
            assembly: AssemblyMode::default(),
            on_sink_failure: FailurePolicy::default(),
            leveled_fallback: LeveledFallback::default(),
            legacy_stream: LegacyStream::default(),
            info_method: names.info().to_owned(),
            warning_method: names.warning().to_owned(),
        }
    }
}

impl BridgeConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// 用 `lookup` 提供的 `LOGBRIDGE_*` 变量覆盖当前配置。
    ///
    /// `lookup` 以参数注入，测试无需修改真实进程环境。
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("LOGBRIDGE_DECODE") {
            self.decode = parse_env("LOGBRIDGE_DECODE", value, DecodePolicy::parse)?;
        }
        if let Some(value) = lookup("LOGBRIDGE_ASSEMBLY") {
            self.assembly = parse_env("LOGBRIDGE_ASSEMBLY", value, AssemblyMode::parse)?;
        }
        if let Some(value) = lookup("LOGBRIDGE_ON_SINK_FAILURE") {
            self.on_sink_failure =
                parse_env("LOGBRIDGE_ON_SINK_FAILURE", value, FailurePolicy::parse)?;
        }
        if let Some(value) = lookup("LOGBRIDGE_LEVELED_FALLBACK") {
            self.leveled_fallback =
                parse_env("LOGBRIDGE_LEVELED_FALLBACK", value, LeveledFallback::parse)?;
        }
        if let Some(value) = lookup("LOGBRIDGE_LEGACY_STREAM") {
            self.legacy_stream = parse_env("LOGBRIDGE_LEGACY_STREAM", value, LegacyStream::parse)?;
        }
        if let Some(value) = lookup("LOGBRIDGE_INFO_METHOD") {
            self.info_method = parse_env("LOGBRIDGE_INFO_METHOD", value, method_name)?;
        }
        if let Some(value) = lookup("LOGBRIDGE_WARNING_METHOD") {
            self.warning_method = parse_env("LOGBRIDGE_WARNING_METHOD", value, method_name)?;
        }
        Ok(self)
    }

    /// `register_logger` 未显式给出方法名时使用的默认名。
    pub fn legacy_method_names(&self) -> LegacyMethodNames {
        LegacyMethodNames::new(self.info_method.clone(), self.warning_method.clone())
    }
}

fn parse_env<T>(
    key: &'static str,
    value: String,
    parse: impl FnOnce(&str) -> Option<T>,
) -> Result<T, ConfigError> {
    parse(&value).ok_or(ConfigError::InvalidEnv { key, value })
}

fn method_name(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}
