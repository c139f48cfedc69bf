#![deny(unsafe_code)]
#![deny(unsafe_op_in_unsafe_fn)]
#![doc = "logbridge-core: 原生计算库日志回调到宿主可插拔 Sink 的安全桥接核心。"]
#![doc = ""]
#![doc = "== 边界约定 =="]
#![doc = "原生库只认识两个固定签名的 C 回调（无级别 / 带级别），注册一次后终身有效；"]
#![doc = "宿主侧通过 [`SinkRegistry`] 原子替换活跃 Sink，蹦床（trampoline）本身永不注销。"]
#![doc = "任何解码或 Sink 调用失败都在蹦床边界被吞掉，绝不回卷（unwind）进原生调用栈。"]

//! # 模块概览（How）
//! - [`severity`]：四级严重度与线上整数编码。
//! - [`sink`]：`LeveledSink` / `LegacySink` 契约与内置默认实现。
//! - [`capability`]：运行时描述对象的能力校验，产出可注册的适配器。
//! - [`assembler`]：原始字节 → 修剪后的非空消息。
//! - [`router`]：严重度 → Sink 方法的路由表。
//! - [`registry`]：两个独立槽位及其投递流程。
//! - [`trampoline`]：交给原生库的 `extern "C"` 入口。
//! - [`native`]：原生注册 ABI 的抽象与一次性初始化。
//! - [`config`]：TOML + 环境变量配置。
//! - [`test_stubs`]：记录型 Sink、恐慌 Sink 与进程内模拟原生库。

pub mod assembler;
pub mod capability;
pub mod config;
pub mod error;
pub mod native;
pub mod registry;
pub mod router;
pub mod severity;
pub mod sink;
pub mod test_stubs;
pub mod trampoline;

pub use assembler::{DecodeAnomaly, MessageAssembler};
pub use capability::{
    AttrValue, CapabilityValidator, DynamicSink, LegacyMethodNames, Member, MethodFn, SinkObject,
};
pub use config::{
    AssemblyMode, BridgeConfig, DecodePolicy, FailurePolicy, LegacyStream, LeveledFallback,
};
pub use error::{BridgeError, ConfigError, EntryPoint, ValidationError};
pub use native::{
    ExternLogApi, LeveledLogCallback, LogCallback, NativeBridge, NativeLogApi, STATUS_OK,
};
pub use registry::{Delivery, SinkRegistry, Slot, StatsSnapshot};
pub use router::{LegacyRoute, SeverityRouter};
pub use severity::{SeverityLevel, UnknownSeverity};
pub use sink::{DummyLeveledSink, LegacySink, LeveledSink, StdStreamLegacySink};
