//! Sink 注册表：两个独立槽位与完整的投递流程。
//!
//! # 设计背景（Why）
//! - 原生库在多个工作线程上同步回调，宿主却可能随时替换 Sink；
//! - 槽位必须永不为空，且 Sink 的任何失败都不能越过蹦床边界。
//!
//! # 逻辑解析（How）
//! - 每个槽位是一把 `parking_lot::Mutex`，投递时持锁完成“读取当前 Sink → 调用方法”，
//!   因而 Sink 实现只需 `Send`，无需自行处理并发；
//! - 注册与重置在同一把锁下整体替换 Sink，旧 Sink 在释放锁之后才析构；
//! - Sink 调用包裹在 `catch_unwind` 中，panic 被折算为 [`Delivery::SinkFailed`]。
//!
//! # 契约说明（What）
//! - 同一槽位上的消息严格串行投递；两个槽位互不阻塞；
//! - 投递过程中替换 Sink 是“未定义但安全”的：边界附近的消息可能落到新旧任一 Sink；
//! - 槽位锁不可重入，Sink 方法内部不得再进入同一槽位，否则会在同一把锁上自锁：
//!   - 任一 Sink 调用本注册表的注册 / 重置接口；
//!   - 旧式 Sink 调用 [`SinkRegistry::log_info`] / [`SinkRegistry::log_warning`]、
//!     [`SinkRegistry::dispatch_legacy`] 或 [`SinkRegistry::with_legacy`]；
//!   - 带级别 Sink 调用 [`SinkRegistry::dispatch_leveled`] 或 [`SinkRegistry::with_leveled`]；
//!   - `leveled_fallback = "legacy"` 时带级别消息最终由旧式 Sink 处理，该 Sink 同样不得回调上述旧式接口。

use std::any::Any;
use std::fmt;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::assembler::{DecodeAnomaly, MessageAssembler};
use crate::capability::{CapabilityValidator, LegacyMethodNames, SinkObject};
use crate::config::{BridgeConfig, FailurePolicy, LeveledFallback};
use crate::error::ValidationError;
use crate::router::{LegacyRoute, SeverityRouter};
use crate::severity::SeverityLevel;
use crate::sink::{DummyLeveledSink, LegacySink, LeveledSink, StdStreamLegacySink};

/// 注册表中的两个槽位。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Slot {
    Legacy,
    Leveled,
}

/// 一次投递的结果。
///
/// 蹦床丢弃该值；宿主侧直接调用 `dispatch_*` 时可据此断言行为。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// 恰好一个 Sink 方法被调用并正常返回。
    Delivered,
    /// 分块已缓存，等待成行（仅 `line_buffered` 模式的无级别通道）。
    Buffered,
    /// 消息在到达 Sink 之前被丢弃。
    Dropped(DecodeAnomaly),
    /// Sink 方法 panic，消息已丢弃。
    SinkFailed,
}

/// 投递计数快照。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub delivered: u64,
    pub dropped: u64,
    pub sink_failures: u64,
}

#[derive(Debug, Default)]
struct BridgeStats {
    delivered: AtomicU64,
    dropped: AtomicU64,
    sink_failures: AtomicU64,
}

impl BridgeStats {
    fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
        }
    }
}

struct SlotState<S: ?Sized> {
    is_default: bool,
    sink: Box<S>,
}

impl<S: ?Sized> SlotState<S> {
    fn custom(sink: Box<S>) -> Self {
        Self {
            is_default: false,
            sink,
        }
    }

    fn builtin(sink: Box<S>) -> Self {
        Self {
            is_default: true,
            sink,
        }
    }
}

fn default_legacy(config: &BridgeConfig) -> SlotState<dyn LegacySink> {
    let sink: Box<dyn LegacySink> = Box::new(StdStreamLegacySink::new(config.legacy_stream));
    SlotState::builtin(sink)
}

fn default_leveled() -> SlotState<dyn LeveledSink> {
    let sink: Box<dyn LeveledSink> = Box::new(DummyLeveledSink);
    SlotState::builtin(sink)
}

/// 旧式与带级别两个槽位的持有者。
///
/// # 教案式说明
/// - **意图（Why）**：以显式对象取代模块级全局变量；宿主持有 `Arc<SinkRegistry>` 完成注册，
///   蹦床通过 [`trampoline::bind`](crate::trampoline::bind) 获得同一个 `Arc`；
/// - **契约（What）**：
///   - 构造后两个槽位分别持有 [`StdStreamLegacySink`] 与 [`DummyLeveledSink`]；
///   - `register_*` 校验失败时返回错误且槽位保持原状；
///   - `dispatch_*` 永不 panic，所有异常都体现为 [`Delivery`]；
/// - **权衡（Trade-offs）**：选择互斥而非无锁快照，牺牲高并行下的日志吞吐，换取 Sink 无需线程安全。
pub struct SinkRegistry {
    config: BridgeConfig,
    assembler: MessageAssembler,
    legacy: Mutex<SlotState<dyn LegacySink>>,
    leveled: Mutex<SlotState<dyn LeveledSink>>,
    stats: BridgeStats,
}

impl SinkRegistry {
    pub fn new(config: BridgeConfig) -> Self {
        let assembler = MessageAssembler::new(config.decode, config.assembly);
        Self {
            legacy: Mutex::new(default_legacy(&config)),
            leveled: Mutex::new(default_leveled()),
            assembler,
            stats: BridgeStats::default(),
            config,
        }
    }

    /// 以共享句柄形式构造，供蹦床绑定。
    pub fn shared(config: BridgeConfig) -> Arc<Self> {
        Arc::new(Self::new(config))
    }

    // ---------------------------------------------------------------------
    // 注册与重置
    // ---------------------------------------------------------------------

    /// 安装静态类型的旧式 Sink。
    pub fn register_legacy<S: LegacySink>(&self, sink: S) {
        let sink: Box<dyn LegacySink> = Box::new(sink);
        self.replace_legacy(SlotState::custom(sink));
    }

    /// 安装静态类型的带级别 Sink。
    pub fn register_leveled<S: LeveledSink>(&self, sink: S) {
        let sink: Box<dyn LeveledSink> = Box::new(sink);
        self.replace_leveled(SlotState::custom(sink));
    }

    /// 校验并安装运行时旧式对象，方法名取配置中的默认值（通常为 `info` / `warning`）。
    pub fn register_logger(&self, object: &dyn SinkObject) -> Result<(), ValidationError> {
        self.register_logger_with(object, &self.config.legacy_method_names())
    }

    /// 校验并安装运行时旧式对象，使用给定的方法名。
    pub fn register_logger_with(
        &self,
        object: &dyn SinkObject,
        names: &LegacyMethodNames,
    ) -> Result<(), ValidationError> {
        let sink = CapabilityValidator::validate_legacy(object, names)?;
        tracing::debug!(
            info = names.info(),
            warning = names.warning(),
            "legacy logger registered"
        );
        self.register_legacy(sink);
        Ok(())
    }

    /// 校验并安装运行时带级别对象。
    pub fn register_leveled_logger(&self, object: &dyn SinkObject) -> Result<(), ValidationError> {
        let sink = CapabilityValidator::validate_leveled(object)?;
        tracing::debug!("leveled logger registered");
        self.register_leveled(sink);
        Ok(())
    }

    /// 恢复指定槽位的内置默认 Sink。
    pub fn reset(&self, slot: Slot) {
        match slot {
            Slot::Legacy => self.replace_legacy(default_legacy(&self.config)),
            Slot::Leveled => self.replace_leveled(default_leveled()),
        }
    }

    pub fn reset_logger(&self) {
        self.reset(Slot::Legacy);
    }

    pub fn reset_leveled_logger(&self) {
        self.reset(Slot::Leveled);
    }

    /// 槽位当前是否为内置默认 Sink。
    pub fn is_default(&self, slot: Slot) -> bool {
        match slot {
            Slot::Legacy => self.legacy.lock().is_default,
            Slot::Leveled => self.leveled.lock().is_default,
        }
    }

    /// 在持锁状态下访问当前旧式 Sink；槽位永不为空。
    pub fn with_legacy<R>(&self, f: impl FnOnce(&dyn LegacySink) -> R) -> R {
        let slot = self.legacy.lock();
        f(&*slot.sink)
    }

    /// 在持锁状态下访问当前带级别 Sink；槽位永不为空。
    pub fn with_leveled<R>(&self, f: impl FnOnce(&dyn LeveledSink) -> R) -> R {
        let slot = self.leveled.lock();
        f(&*slot.sink)
    }

    fn replace_legacy(&self, next: SlotState<dyn LegacySink>) {
        let previous = mem::replace(&mut *self.legacy.lock(), next);
        // 旧 Sink 的析构可能执行任意宿主代码，放在锁外。
        drop(previous);
    }

    fn replace_leveled(&self, next: SlotState<dyn LeveledSink>) {
        let previous = mem::replace(&mut *self.leveled.lock(), next);
        drop(previous);
    }

    // ---------------------------------------------------------------------
    // 投递
    // ---------------------------------------------------------------------

    /// 带级别通道：解码、修剪、按级别路由。
    pub fn dispatch_leveled(&self, code: i32, raw: &[u8]) -> Delivery {
        match self.assembler.decode(raw) {
            Ok(message) => self.deliver_leveled(SeverityLevel::from_wire(code), &message),
            Err(anomaly) => self.record_anomaly(anomaly),
        }
    }

    /// 无级别通道：按配置的拼装方式产出消息，走 `info` 路由。
    pub fn dispatch_legacy(&self, raw: &[u8]) -> Delivery {
        match self.assembler.assemble(raw) {
            Ok(Some(message)) => self.deliver_legacy(LegacyRoute::Info, &message),
            Ok(None) => Delivery::Buffered,
            Err(anomaly) => self.record_anomaly(anomaly),
        }
    }

    /// 投递当前线程在 `line_buffered` 模式下尚未成行的内容。
    pub fn flush_legacy(&self) -> Delivery {
        match self.assembler.flush_current_thread() {
            Some(message) => self.deliver_legacy(LegacyRoute::Info, &message),
            None => Delivery::Dropped(DecodeAnomaly::Blank),
        }
    }

    /// 投递所有线程残留的未成行内容，每行一个结果。
    ///
    /// 原生训练结束后调用，回收已退出工作线程留下的分块。
    pub fn flush_all_legacy(&self) -> Vec<Delivery> {
        self.assembler
            .flush_all()
            .iter()
            .map(|message| self.deliver_legacy(LegacyRoute::Info, message))
            .collect()
    }

    /// 宿主侧文本经旧式槽位的 `info` 路由输出。
    pub fn log_info(&self, message: &str) -> Delivery {
        self.log_host(LegacyRoute::Info, message)
    }

    /// 宿主侧文本经旧式槽位的 `warning` 路由输出。
    pub fn log_warning(&self, message: &str) -> Delivery {
        self.log_host(LegacyRoute::Warning, message)
    }

    /// 记录一条在解码前就被拒绝的消息。
    pub fn record_anomaly(&self, anomaly: DecodeAnomaly) -> Delivery {
        self.stats.dropped.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(%anomaly, "native message dropped");
        Delivery::Dropped(anomaly)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    fn log_host(&self, route: LegacyRoute, message: &str) -> Delivery {
        match self.assembler.decode(message.as_bytes()) {
            Ok(message) => self.deliver_legacy(route, &message),
            Err(anomaly) => self.record_anomaly(anomaly),
        }
    }

    fn deliver_leveled(&self, level: SeverityLevel, message: &str) -> Delivery {
        let slot = self.leveled.lock();
        if slot.is_default && self.config.leveled_fallback == LeveledFallback::Legacy {
            drop(slot);
            return self.deliver_legacy(LegacyRoute::for_severity(level), message);
        }
        self.invoke(level.method_name(), || {
            SeverityRouter::route_leveled(&*slot.sink, level, message)
        })
    }

    fn deliver_legacy(&self, route: LegacyRoute, message: &str) -> Delivery {
        let slot = self.legacy.lock();
        let method = match route {
            LegacyRoute::Info => "info",
            LegacyRoute::Warning => "warning",
        };
        self.invoke(method, || {
            SeverityRouter::route_legacy(&*slot.sink, route, message)
        })
    }

    fn invoke(&self, method: &'static str, call: impl FnOnce()) -> Delivery {
        match panic::catch_unwind(AssertUnwindSafe(call)) {
            Ok(()) => {
                self.stats.delivered.fetch_add(1, Ordering::Relaxed);
                Delivery::Delivered
            }
            Err(payload) => {
                self.stats.sink_failures.fetch_add(1, Ordering::Relaxed);
                if self.config.on_sink_failure == FailurePolicy::Diagnose {
                    tracing::warn!(
                        method,
                        reason = panic_reason(payload.as_ref()),
                        "sink method panicked; message dropped"
                    );
                }
                Delivery::SinkFailed
            }
        }
    }
}

impl Default for SinkRegistry {
    fn default() -> Self {
        Self::new(BridgeConfig::default())
    }
}

impl fmt::Debug for SinkRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkRegistry")
            .field("config", &self.config)
            .field("legacy_default", &self.is_default(Slot::Legacy))
            .field("leveled_default", &self.is_default(Slot::Leveled))
            .field("stats", &self.stats())
            .finish()
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> &str {
    if let Some(text) = payload.downcast_ref::<&'static str>() {
        text
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{AttrValue, DynamicSink};
    use crate::config::{AssemblyMode, LegacyStream};
    use crate::test_stubs::{CapturingSink, PanickingSink};
    use std::cell::RefCell;
    use std::sync::{Weak, mpsc};
    use std::thread;
    use tracing_test::traced_test;

    fn registry_with(config: BridgeConfig) -> (SinkRegistry, CapturingSink) {
        let registry = SinkRegistry::new(config);
        let capture = CapturingSink::new();
        registry.register_leveled(capture.clone());
        registry.register_legacy(capture.clone());
        (registry, capture)
    }

    #[test]
    fn starts_with_default_sinks() {
        let registry = SinkRegistry::default();
        assert!(registry.is_default(Slot::Legacy));
        assert!(registry.is_default(Slot::Leveled));
        assert_eq!(registry.dispatch_leveled(-1, b"dropped by dummy"), Delivery::Delivered);
    }

    #[test]
    fn leveled_codes_route_to_matching_method() {
        let (registry, capture) = registry_with(BridgeConfig::default());

        for (code, text) in [
            (-1, "fatal message"),
            (0, "warning message"),
            (1, "info message"),
            (2, "debug message"),
        ] {
            assert_eq!(registry.dispatch_leveled(code, text.as_bytes()), Delivery::Delivered);
        }

        let seen = capture.snapshot();
        assert_eq!(seen.error, ["fatal message"]);
        assert_eq!(seen.warning, ["warning message"]);
        assert_eq!(seen.info, ["info message"]);
        assert_eq!(seen.debug, ["debug message"]);
        assert!(seen.legacy_info.is_empty() && seen.legacy_warning.is_empty());
    }

    #[test]
    fn blank_and_invalid_messages_never_reach_sink() {
        let (registry, capture) = registry_with(BridgeConfig::default());

        assert_eq!(
            registry.dispatch_leveled(1, b"   \n"),
            Delivery::Dropped(DecodeAnomaly::Blank)
        );
        assert_eq!(
            registry.dispatch_leveled(1, b"\xc3\x28"),
            Delivery::Dropped(DecodeAnomaly::InvalidUtf8 { valid_up_to: 0 })
        );
        assert_eq!(
            registry.dispatch_legacy(b"\n"),
            Delivery::Dropped(DecodeAnomaly::Blank)
        );

        assert_eq!(capture.snapshot().total(), 0);
        assert_eq!(registry.stats().dropped, 3);
    }

    #[test]
    fn reset_detaches_previous_leveled_sink() {
        let (registry, capture) = registry_with(BridgeConfig::default());
        registry.dispatch_leveled(1, b"before reset");
        registry.reset_leveled_logger();

        assert!(registry.is_default(Slot::Leveled));
        assert_eq!(registry.dispatch_leveled(1, b"after reset"), Delivery::Delivered);
        assert_eq!(capture.snapshot().info, ["before reset"]);
    }

    #[test]
    fn failed_validation_keeps_active_sink() {
        let (registry, capture) = registry_with(BridgeConfig::default());
        let broken = DynamicSink::new()
            .with_value("debug", AttrValue::Integer(1))
            .with_value("info", AttrValue::Integer(1))
            .with_value("warning", AttrValue::Integer(1))
            .with_value("error", AttrValue::Integer(1));

        let err = registry
            .register_leveled_logger(&broken)
            .expect_err("integers are not callable");
        assert_eq!(err.to_string(), "Logger must provide 'debug' method");

        registry.dispatch_leveled(0, b"still routed");
        assert_eq!(capture.snapshot().warning, ["still routed"]);
        assert!(!registry.is_default(Slot::Leveled));
    }

    #[test]
    fn registered_object_receives_host_helpers_with_custom_names() {
        let registry = SinkRegistry::default();
        let (tx, rx) = mpsc::channel();
        let info_tx = tx.clone();
        let object = DynamicSink::new()
            .with_method("custom_info", move |m| {
                let _ = info_tx.send(m.to_owned());
            })
            .with_method("custom_warning", move |m| {
                let _ = tx.send(m.to_owned());
            });

        registry
            .register_logger_with(
                &object,
                &LegacyMethodNames::new("custom_info", "custom_warning"),
            )
            .expect("valid legacy object");
        registry.log_info("info message");
        registry.log_warning("warning message");

        let received: Vec<String> = rx.try_iter().collect();
        assert_eq!(received, ["info message", "warning message"]);
    }

    #[test]
    fn panicking_sink_is_contained() {
        let (registry, capture) = registry_with(BridgeConfig {
            on_sink_failure: FailurePolicy::Drop,
            ..BridgeConfig::default()
        });
        registry.register_leveled(PanickingSink::on(SeverityLevel::Warning));

        assert_eq!(registry.dispatch_leveled(0, b"explodes"), Delivery::SinkFailed);
        assert_eq!(registry.dispatch_leveled(1, b"survives"), Delivery::Delivered);
        assert_eq!(registry.stats().sink_failures, 1);
        // 旧式槽位不受影响。
        assert_eq!(registry.log_warning("legacy ok"), Delivery::Delivered);
        assert_eq!(capture.snapshot().legacy_warning, ["legacy ok"]);
    }

    #[test]
    #[traced_test]
    fn diagnose_policy_reports_sink_panic() {
        let registry = SinkRegistry::default();
        registry.register_leveled(PanickingSink::on(SeverityLevel::Error));

        assert_eq!(registry.dispatch_leveled(-1, b"fatal"), Delivery::SinkFailed);
        assert!(logs_contain("sink method panicked; message dropped"));
        assert!(logs_contain("sink rejected error message: fatal"));
    }

    #[test]
    fn default_leveled_sink_can_fall_back_to_legacy_slot() {
        let registry = SinkRegistry::new(BridgeConfig {
            leveled_fallback: LeveledFallback::Legacy,
            ..BridgeConfig::default()
        });
        let capture = CapturingSink::new();
        registry.register_legacy(capture.clone());

        registry.dispatch_leveled(-1, b"fatal message");
        registry.dispatch_leveled(1, b"info message");
        registry.dispatch_leveled(2, b"debug message");

        let seen = capture.snapshot();
        assert_eq!(seen.legacy_warning, ["fatal message"]);
        assert_eq!(seen.legacy_info, ["info message", "debug message"]);

        // 一旦注册了真正的带级别 Sink，降级通道关闭。
        let leveled = CapturingSink::new();
        registry.register_leveled(leveled.clone());
        registry.dispatch_leveled(-1, b"direct");
        assert_eq!(leveled.snapshot().error, ["direct"]);
        assert_eq!(capture.snapshot().legacy_warning, ["fatal message"]);
    }

    #[test]
    fn default_config_joins_native_line_chunks() {
        let (registry, capture) = registry_with(BridgeConfig::default());

        assert_eq!(registry.dispatch_legacy(b"[LightGBM] [Info] "), Delivery::Buffered);
        assert_eq!(registry.dispatch_legacy(b"Total Bins 0"), Delivery::Buffered);
        assert_eq!(registry.dispatch_legacy(b"\n"), Delivery::Delivered);

        let seen = capture.snapshot();
        assert_eq!(seen.legacy_info, ["[LightGBM] [Info] Total Bins 0"]);
        assert_eq!(seen.total(), 1);
    }

    #[test]
    fn per_call_assembly_delivers_each_chunk() {
        let (registry, capture) = registry_with(BridgeConfig {
            assembly: AssemblyMode::PerCall,
            ..BridgeConfig::default()
        });

        assert_eq!(registry.dispatch_legacy(b"whole message"), Delivery::Delivered);
        assert_eq!(
            registry.dispatch_legacy(b"\n"),
            Delivery::Dropped(DecodeAnomaly::Blank)
        );
        assert_eq!(capture.snapshot().legacy_info, ["whole message"]);
    }

    #[test]
    fn invalid_chunk_drops_the_pending_prefix() {
        let (registry, capture) = registry_with(BridgeConfig::default());

        assert_eq!(registry.dispatch_legacy(b"[LightGBM] [Info] "), Delivery::Buffered);
        assert_eq!(
            registry.dispatch_legacy(b"bad \xff body"),
            Delivery::Dropped(DecodeAnomaly::InvalidUtf8 { valid_up_to: 4 })
        );
        assert_eq!(
            registry.dispatch_legacy(b"\n"),
            Delivery::Dropped(DecodeAnomaly::Blank)
        );

        assert_eq!(capture.snapshot().total(), 0);
        assert_eq!(registry.stats().dropped, 2);
    }

    #[test]
    fn flush_all_legacy_recovers_chunks_from_finished_workers() {
        let (registry, capture) = registry_with(BridgeConfig::default());

        thread::scope(|scope| {
            for worker in 0..3 {
                let registry = &registry;
                scope.spawn(move || {
                    let chunk = format!("[LightGBM] [Info] worker {worker}");
                    assert_eq!(registry.dispatch_legacy(chunk.as_bytes()), Delivery::Buffered);
                });
            }
        });

        assert_eq!(registry.flush_all_legacy(), [Delivery::Delivered; 3]);
        assert!(registry.flush_all_legacy().is_empty());

        let mut lines = capture.snapshot().legacy_info;
        lines.sort();
        assert_eq!(
            lines,
            [
                "[LightGBM] [Info] worker 0",
                "[LightGBM] [Info] worker 1",
                "[LightGBM] [Info] worker 2",
            ]
        );
    }

    #[test]
    fn current_sink_accessors_follow_register_and_reset() {
        let registry = SinkRegistry::new(BridgeConfig {
            legacy_stream: LegacyStream::Stderr,
            ..BridgeConfig::default()
        });
        let capture = CapturingSink::new();

        registry.with_leveled(|sink| sink.info("to default leveled"));
        registry.with_legacy(|sink| sink.info("to default legacy"));
        assert_eq!(capture.snapshot().total(), 0);

        registry.register_leveled(capture.clone());
        registry.register_legacy(capture.clone());
        registry.with_leveled(|sink| sink.info("to registered leveled"));
        registry.with_legacy(|sink| sink.warning("to registered legacy"));
        let seen = capture.snapshot();
        assert_eq!(seen.info, ["to registered leveled"]);
        assert_eq!(seen.legacy_warning, ["to registered legacy"]);

        registry.reset(Slot::Leveled);
        registry.reset(Slot::Legacy);
        registry.with_leveled(|sink| sink.info("after reset"));
        registry.with_legacy(|sink| sink.info("after reset"));
        assert_eq!(capture.snapshot().total(), 2);
    }

    #[test]
    fn line_buffered_legacy_path_delivers_whole_lines() {
        let (registry, capture) = registry_with(BridgeConfig::default());

        assert_eq!(registry.dispatch_legacy(b"[LightGBM] [Info] "), Delivery::Buffered);
        assert_eq!(registry.dispatch_legacy(b"Total Bins 0"), Delivery::Buffered);
        assert_eq!(registry.dispatch_legacy(b"\n"), Delivery::Delivered);
        assert_eq!(registry.dispatch_legacy(b"dangling"), Delivery::Buffered);
        assert_eq!(registry.flush_legacy(), Delivery::Delivered);

        assert_eq!(
            capture.snapshot().legacy_info,
            ["[LightGBM] [Info] Total Bins 0", "dangling"]
        );
    }

    /// 把带级别消息经宿主接口转交旧式槽位的 Sink。
    struct ForwardingSink(Weak<SinkRegistry>);

    impl ForwardingSink {
        fn forward(&self, level: SeverityLevel, message: &str) {
            if let Some(registry) = self.0.upgrade() {
                registry.log_info(&format!("{level}: {message}"));
            }
        }
    }

    impl LeveledSink for ForwardingSink {
        fn debug(&self, message: &str) {
            self.forward(SeverityLevel::Debug, message);
        }

        fn info(&self, message: &str) {
            self.forward(SeverityLevel::Info, message);
        }

        fn warning(&self, message: &str) {
            self.forward(SeverityLevel::Warning, message);
        }

        fn error(&self, message: &str) {
            self.forward(SeverityLevel::Error, message);
        }
    }

    #[test]
    fn leveled_sink_may_reenter_the_legacy_slot() {
        let registry = SinkRegistry::shared(BridgeConfig::default());
        let capture = CapturingSink::new();
        registry.register_legacy(capture.clone());
        registry.register_leveled(ForwardingSink(Arc::downgrade(&registry)));

        assert_eq!(registry.dispatch_leveled(0, b"crossed slots"), Delivery::Delivered);
        assert_eq!(registry.dispatch_leveled(-1, b"fatal"), Delivery::Delivered);

        assert_eq!(
            capture.snapshot().legacy_info,
            ["warning: crossed slots", "error: fatal"]
        );
        assert_eq!(registry.stats().delivered, 4);
    }

    /// 只满足 `Send` 的 Sink：析构时把收到的消息交回测试线程。
    struct SendOnlySink {
        seen: RefCell<Vec<String>>,
        report: mpsc::Sender<Vec<String>>,
    }

    impl LeveledSink for SendOnlySink {
        fn debug(&self, message: &str) {
            self.seen.borrow_mut().push(message.to_owned());
        }

        fn info(&self, message: &str) {
            self.seen.borrow_mut().push(message.to_owned());
        }

        fn warning(&self, message: &str) {
            self.seen.borrow_mut().push(message.to_owned());
        }

        fn error(&self, message: &str) {
            self.seen.borrow_mut().push(message.to_owned());
        }
    }

    impl Drop for SendOnlySink {
        fn drop(&mut self) {
            let _ = self.report.send(self.seen.take());
        }
    }

    #[test]
    fn concurrent_dispatch_is_serialized_per_slot() {
        let registry = SinkRegistry::default();
        let (tx, rx) = mpsc::channel();
        registry.register_leveled(SendOnlySink {
            seen: RefCell::new(Vec::new()),
            report: tx,
        });

        thread::scope(|scope| {
            for worker in 0..8 {
                let registry = &registry;
                scope.spawn(move || {
                    for seq in 0..100 {
                        let text = format!("worker {worker} line {seq}");
                        registry.dispatch_leveled(seq % 4 - 1, text.as_bytes());
                    }
                });
            }
        });

        registry.reset_leveled_logger();
        let mut seen = rx.recv().expect("sink dropped on reset");
        assert_eq!(seen.len(), 800);
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 800);
        assert_eq!(registry.stats().delivered, 800);
    }
}
