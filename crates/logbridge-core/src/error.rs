//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 集中定义桥接层向宿主暴露的错误语义：注册期校验失败、原生注册失败、配置加载失败；
//! - 解码异常与 Sink 调用失败属于边界内自愈的情况，不在这里出现（见
//!   [`DecodeAnomaly`](crate::DecodeAnomaly) 与 [`Delivery`](crate::Delivery)）。
//!
//! ## 设计要求（What）
//! - 所有错误派生 `thiserror::Error`，可直接交给 `anyhow` 等上层框架；
//! - [`ValidationError`] 的 `Display` 文本是对外契约，措辞不得改动。

use std::fmt;
use std::io;
use std::path::PathBuf;

/// 注册期能力校验失败。
///
/// # 教案式说明
/// - **意图（Why）**：在注册调用处同步给出可操作的提示，指明缺失的具体方法；
/// - **契约（What）**：
///   - 旧式协议总是同时点名两个配置的方法名，无论实际缺失哪一个；
///   - 带级别协议只点名检查顺序中第一个缺失的方法；
///   - 返回该错误时注册表保持原状，调用方可修正后重试。
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Logger must provide '{info}' and '{warning}' method")]
    MissingLegacyMethods { info: String, warning: String },
    #[error("Logger must provide '{method}' method")]
    MissingLeveledMethod { method: &'static str },
}

impl ValidationError {
    /// 错误涉及的方法名。
    pub fn methods(&self) -> Vec<&str> {
        match self {
            ValidationError::MissingLegacyMethods { info, warning } => {
                vec![info.as_str(), warning.as_str()]
            }
            ValidationError::MissingLeveledMethod { method } => vec![*method],
        }
    }
}

/// 原生库提供的两个注册入口。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryPoint {
    Unleveled,
    Leveled,
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryPoint::Unleveled => f.write_str("unleveled log callback"),
            EntryPoint::Leveled => f.write_str("leveled log callback"),
        }
    }
}

/// 桥接层初始化错误。
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// 原生注册入口返回非零状态码；在修复之前不会有任何原生日志到达 Sink。
    #[error("native registration of the {entry} returned status {status}")]
    Registration { entry: EntryPoint, status: i32 },
    /// 蹦床已绑定到另一个注册表；蹦床终身只服务一个注册表。
    #[error("native trampolines are already bound to a different sink registry")]
    TargetAlreadyBound,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse bridge configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to read bridge configuration from `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("environment variable `{key}` has unsupported value `{value}`")]
    InvalidEnv { key: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_match_contract() {
        let legacy = ValidationError::MissingLegacyMethods {
            info: "custom_info".into(),
            warning: "custom_warning".into(),
        };
        assert_eq!(
            legacy.to_string(),
            "Logger must provide 'custom_info' and 'custom_warning' method"
        );
        assert_eq!(legacy.methods(), ["custom_info", "custom_warning"]);

        let leveled = ValidationError::MissingLeveledMethod { method: "error" };
        assert_eq!(leveled.to_string(), "Logger must provide 'error' method");
        assert_eq!(leveled.methods(), ["error"]);
    }

    #[test]
    fn registration_failure_names_entry_and_status() {
        let err = BridgeError::Registration {
            entry: EntryPoint::Leveled,
            status: -1,
        };
        assert_eq!(
            err.to_string(),
            "native registration of the leveled log callback returned status -1"
        );
    }
}
