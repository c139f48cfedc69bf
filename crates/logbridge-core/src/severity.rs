use core::fmt;

/// 原生日志的严重度，四级封闭枚举。
///
/// # 设计背景（Why）
/// - 原生库通过 `int32` 携带级别，线上编码固定为 `Error = -1`（原生侧亦称 fatal）、
///   `Warning = 0`、`Info = 1`、`Debug = 2`；
/// - 桥接层不做阈值过滤，每个级别只映射到唯一的 Sink 方法，因此这里**不**派生 `Ord`，
///   避免调用方误以为级别之间存在冗长度排序。
///
/// # 契约说明（What）
/// - [`SeverityLevel::from_wire`] 对任意整数都给出结果：小于 0 归入 `Error`，大于 1 归入 `Debug`；
/// - [`TryFrom<i32>`] 是严格版本，仅接受四个定义值，供宿主侧需要拒绝未知编码的场景使用。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SeverityLevel {
    Error,
    Warning,
    Info,
    Debug,
}

impl SeverityLevel {
    /// 全部级别，顺序与线上编码递增一致。
    pub const ALL: [SeverityLevel; 4] = [
        SeverityLevel::Error,
        SeverityLevel::Warning,
        SeverityLevel::Info,
        SeverityLevel::Debug,
    ];

    /// 将原生整数编码收敛到最近的定义桶。
    ///
    /// 蹦床只使用该函数：未知编码永远不会让原生调用失败。
    pub const fn from_wire(code: i32) -> Self {
        match code {
            i32::MIN..=-1 => SeverityLevel::Error,
            0 => SeverityLevel::Warning,
            1 => SeverityLevel::Info,
            _ => SeverityLevel::Debug,
        }
    }

    /// 线上整数编码。
    pub const fn wire(self) -> i32 {
        match self {
            SeverityLevel::Error => -1,
            SeverityLevel::Warning => 0,
            SeverityLevel::Info => 1,
            SeverityLevel::Debug => 2,
        }
    }

    /// 该级别对应的 Sink 方法名。
    pub const fn method_name(self) -> &'static str {
        match self {
            SeverityLevel::Error => "error",
            SeverityLevel::Warning => "warning",
            SeverityLevel::Info => "info",
            SeverityLevel::Debug => "debug",
        }
    }
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method_name())
    }
}

/// 严格解码时遇到的未定义级别编码。
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown native log level code {0}")]
pub struct UnknownSeverity(pub i32);

impl TryFrom<i32> for SeverityLevel {
    type Error = UnknownSeverity;

    fn try_from(code: i32) -> Result<Self, UnknownSeverity> {
        match code {
            -1 => Ok(SeverityLevel::Error),
            0 => Ok(SeverityLevel::Warning),
            1 => Ok(SeverityLevel::Info),
            2 => Ok(SeverityLevel::Debug),
            other => Err(UnknownSeverity(other)),
        }
    }
}
