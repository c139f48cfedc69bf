//! Sink 契约与内置默认实现。
//!
//! # 设计背景（Why）
//! - 宿主侧日志系统千差万别，桥接层只约定“接收一段文本”的最小方法集合：
//!   带级别协议四个方法，旧式协议两个方法；
//! - 槽位在任意时刻都必须持有某个 Sink，因此这里同时提供两个永远安全的默认实现。
//!
//! # 契约说明（What）
//! - Sink 只需 `Send`：注册表对同一槽位的调用做互斥，Sink 自身无需感知并发；
//! - 方法没有返回值，失败应以 panic 表达，由蹦床边界统一兜底；
//! - 同时实现两个 trait 的类型调用时需写成 `LeveledSink::info(&sink, ..)` 以消除歧义。

use std::io::{self, Write};
use std::sync::Arc;

use crate::config::LegacyStream;

/// 带级别协议的 Sink：`debug` / `info` / `warning` / `error`。
pub trait LeveledSink: Send + 'static {
    fn debug(&self, message: &str);
    fn info(&self, message: &str);
    fn warning(&self, message: &str);
    fn error(&self, message: &str);
}

/// 旧式协议的 Sink：只有 `info` 与 `warning` 两条路由。
///
/// 方法名在运行时对象上可配置（见 [`LegacyMethodNames`](crate::LegacyMethodNames)），
/// 静态类型实现则固定为这两个方法。
pub trait LegacySink: Send + 'static {
    fn info(&self, message: &str);
    fn warning(&self, message: &str);
}

impl<S> LeveledSink for Arc<S>
where
    S: LeveledSink + Sync + ?Sized,
{
    fn debug(&self, message: &str) {
        (**self).debug(message);
    }

    fn info(&self, message: &str) {
        (**self).info(message);
    }

    fn warning(&self, message: &str) {
        (**self).warning(message);
    }

    fn error(&self, message: &str) {
        (**self).error(message);
    }
}

impl<S> LegacySink for Arc<S>
where
    S: LegacySink + Sync + ?Sized,
{
    fn info(&self, message: &str) {
        (**self).info(message);
    }

    fn warning(&self, message: &str) {
        (**self).warning(message);
    }
}

/// 带级别槽位的默认 Sink，四个方法均为空操作。
///
/// # 教案式说明
/// - **意图（Why）**：保证蹦床在任何 Sink 注册之前也有安全的落点；
/// - **契约（What）**：调用无任何外部可观测效果；“重置”带级别日志即换回该实现；
/// - **权衡（Trade-offs）**：默认静默丢弃 error 级消息；需要保留时可把
///   [`LeveledFallback`](crate::LeveledFallback) 配置为 `legacy`，由注册表转投旧式槽位。
#[derive(Debug, Default, Clone, Copy)]
pub struct DummyLeveledSink;

impl LeveledSink for DummyLeveledSink {
    fn debug(&self, _message: &str) {}

    fn info(&self, _message: &str) {}

    fn warning(&self, _message: &str) {}

    fn error(&self, _message: &str) {}
}

/// 旧式槽位的默认 Sink：把每条消息作为一行写到标准输出或标准错误。
///
/// 写入错误（例如管道已关闭）被忽略；这里不能用 `println!`，它在写失败时会 panic。
#[derive(Debug, Clone, Copy)]
pub struct StdStreamLegacySink {
    stream: LegacyStream,
}

impl StdStreamLegacySink {
    pub fn new(stream: LegacyStream) -> Self {
        Self { stream }
    }

    pub fn stream(&self) -> LegacyStream {
        self.stream
    }

    fn emit(&self, message: &str) {
        let _ = match self.stream {
            LegacyStream::Stdout => writeln!(io::stdout().lock(), "{message}"),
            LegacyStream::Stderr => writeln!(io::stderr().lock(), "{message}"),
        };
    }
}

impl Default for StdStreamLegacySink {
    fn default() -> Self {
        Self::new(LegacyStream::Stdout)
    }
}

impl LegacySink for StdStreamLegacySink {
    fn info(&self, message: &str) {
        self.emit(message);
    }

    fn warning(&self, message: &str) {
        self.emit(message);
    }
}
