//! 桥接层的测试桩集合：记录型 Sink、恐慌 Sink 与进程内模拟原生库。
//!
//! # 设计定位（Why）
//! - 单元测试、集成测试与下游宿主的测试都需要“能回读内容的 Sink”和“会在边界上失败的 Sink”；
//! - 真实原生库无法在测试中加载，[`SimulatedNative`] 以纯 Rust 复现其注册与回调行为，
//!   包括多工作线程并发回调、旧式通道的分块输出以及注册失败。
//!
//! # 契约说明（What）
//! - 这些类型随 crate 公开，仅用于测试或示例；生产代码不应依赖；
//! - [`SimulatedNative`] 通过真实的函数指针调用已注册的蹦床，覆盖的是与原生库完全相同的 ABI 路径。

#![allow(unsafe_code)]

use std::ffi::{CString, c_int};
use std::ptr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use parking_lot::Mutex;

use crate::capability::{DynamicSink, LegacyMethodNames};
use crate::error::EntryPoint;
use crate::native::{LeveledLogCallback, LogCallback, NativeLogApi, STATUS_OK};
use crate::router::LegacyRoute;
use crate::severity::SeverityLevel;
use crate::sink::{LegacySink, LeveledSink};

/// [`CapturingSink`] 收到的全部消息，按路由分组。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Captured {
    pub debug: Vec<String>,
    pub info: Vec<String>,
    pub warning: Vec<String>,
    pub error: Vec<String>,
    pub legacy_info: Vec<String>,
    pub legacy_warning: Vec<String>,
}

impl Captured {
    /// 所有路由上的消息总数。
    pub fn total(&self) -> usize {
        self.debug.len()
            + self.info.len()
            + self.warning.len()
            + self.error.len()
            + self.legacy_info.len()
            + self.legacy_warning.len()
    }

    pub fn leveled(&self, level: SeverityLevel) -> &[String] {
        match level {
            SeverityLevel::Error => &self.error,
            SeverityLevel::Warning => &self.warning,
            SeverityLevel::Info => &self.info,
            SeverityLevel::Debug => &self.debug,
        }
    }

    pub fn legacy(&self, route: LegacyRoute) -> &[String] {
        match route {
            LegacyRoute::Info => &self.legacy_info,
            LegacyRoute::Warning => &self.legacy_warning,
        }
    }

    fn leveled_mut(&mut self, level: SeverityLevel) -> &mut Vec<String> {
        match level {
            SeverityLevel::Error => &mut self.error,
            SeverityLevel::Warning => &mut self.warning,
            SeverityLevel::Info => &mut self.info,
            SeverityLevel::Debug => &mut self.debug,
        }
    }

    fn legacy_mut(&mut self, route: LegacyRoute) -> &mut Vec<String> {
        match route {
            LegacyRoute::Info => &mut self.legacy_info,
            LegacyRoute::Warning => &mut self.legacy_warning,
        }
    }
}

/// 记录型 Sink：同时实现两种协议，克隆体共享同一份记录。
///
/// 注册时传入克隆体，测试线程保留原件调用 [`snapshot`](Self::snapshot) 回读。
#[derive(Clone, Debug, Default)]
pub struct CapturingSink {
    inner: Arc<Mutex<Captured>>,
}

impl CapturingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Captured {
        self.inner.lock().clone()
    }

    /// 包装为带级别协议的运行时对象，四个方法写入本记录。
    pub fn leveled_object(&self) -> DynamicSink {
        SeverityLevel::ALL
            .into_iter()
            .fold(DynamicSink::new(), |object, level| {
                let sink = self.clone();
                object.with_method(level.method_name(), move |message| {
                    sink.record_leveled(level, message)
                })
            })
    }

    /// 包装为旧式协议的运行时对象，方法名取自 `names`。
    pub fn legacy_object(&self, names: &LegacyMethodNames) -> DynamicSink {
        let info = self.clone();
        let warning = self.clone();
        DynamicSink::new()
            .with_method(names.info(), move |message| {
                info.record_legacy(LegacyRoute::Info, message)
            })
            .with_method(names.warning(), move |message| {
                warning.record_legacy(LegacyRoute::Warning, message)
            })
    }

    fn record_leveled(&self, level: SeverityLevel, message: &str) {
        self.inner
            .lock()
            .leveled_mut(level)
            .push(message.to_owned());
    }

    fn record_legacy(&self, route: LegacyRoute, message: &str) {
        self.inner.lock().legacy_mut(route).push(message.to_owned());
    }
}

impl LeveledSink for CapturingSink {
    fn debug(&self, message: &str) {
        self.record_leveled(SeverityLevel::Debug, message);
    }

    fn info(&self, message: &str) {
        self.record_leveled(SeverityLevel::Info, message);
    }

    fn warning(&self, message: &str) {
        self.record_leveled(SeverityLevel::Warning, message);
    }

    fn error(&self, message: &str) {
        self.record_leveled(SeverityLevel::Error, message);
    }
}

impl LegacySink for CapturingSink {
    fn info(&self, message: &str) {
        self.record_legacy(LegacyRoute::Info, message);
    }

    fn warning(&self, message: &str) {
        self.record_legacy(LegacyRoute::Warning, message);
    }
}

/// 在指定路由上 panic 的 Sink，用于验证边界兜底。
///
/// `trigger` 为 `None` 时每个方法都会 panic。旧式协议按
/// [`LegacyRoute::for_severity`] 判断是否命中。
#[derive(Clone, Copy, Debug, Default)]
pub struct PanickingSink {
    trigger: Option<SeverityLevel>,
}

impl PanickingSink {
    pub fn on(level: SeverityLevel) -> Self {
        Self {
            trigger: Some(level),
        }
    }

    pub fn everywhere() -> Self {
        Self { trigger: None }
    }

    fn leveled(&self, level: SeverityLevel, message: &str) {
        if self.trigger.is_none_or(|trigger| trigger == level) {
            panic!("sink rejected {level} message: {message}");
        }
    }

    fn legacy(&self, route: LegacyRoute, message: &str) {
        if self
            .trigger
            .is_none_or(|trigger| LegacyRoute::for_severity(trigger) == route)
        {
            panic!("sink rejected legacy {route:?} message: {message}");
        }
    }
}

impl LeveledSink for PanickingSink {
    fn debug(&self, message: &str) {
        self.leveled(SeverityLevel::Debug, message);
    }

    fn info(&self, message: &str) {
        self.leveled(SeverityLevel::Info, message);
    }

    fn warning(&self, message: &str) {
        self.leveled(SeverityLevel::Warning, message);
    }

    fn error(&self, message: &str) {
        self.leveled(SeverityLevel::Error, message);
    }
}

impl LegacySink for PanickingSink {
    fn info(&self, message: &str) {
        self.legacy(LegacyRoute::Info, message);
    }

    fn warning(&self, message: &str) {
        self.legacy(LegacyRoute::Warning, message);
    }
}

/// 训练过程中带级别通道输出的 info 消息。
pub const TRAINING_INFO: &str = "Number of positive: 2, number of negative: 2";
/// 训练过程中带级别通道输出的 warning 消息。
pub const TRAINING_WARNING: &str =
    "There are no meaningful features which satisfy the provided configuration. \
     Decreasing Dataset parameters min_data_in_bin or min_data_in_leaf and re-constructing \
     Dataset might resolve this warning.";
/// 旧式通道每行的前缀，与正文、换行分三次回调输出。
pub const LEGACY_PREFIX: &str = "[LightGBM] [Info] ";

/// 进程内模拟原生库。
///
/// # 教案式说明
/// - **意图（Why）**：以与真实库相同的函数指针形态保存回调，再从任意线程触发；
/// - **逻辑（How）**：注册入口返回构造时配置的状态码，仅在返回 [`STATUS_OK`] 时保存回调；
///   `emit_*` 把文本转成 NUL 结尾的 C 字符串后直接调用回调；
/// - **契约（What）**：未注册对应回调时 `emit_*` 返回 `false`，不做任何事。
#[derive(Debug)]
pub struct SimulatedNative {
    unleveled_status: c_int,
    leveled_status: c_int,
    unleveled: Mutex<Option<LogCallback>>,
    leveled: Mutex<Option<LeveledLogCallback>>,
    unleveled_attempts: AtomicUsize,
    leveled_attempts: AtomicUsize,
}

impl Default for SimulatedNative {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedNative {
    pub fn new() -> Self {
        Self {
            unleveled_status: STATUS_OK,
            leveled_status: STATUS_OK,
            unleveled: Mutex::new(None),
            leveled: Mutex::new(None),
            unleveled_attempts: AtomicUsize::new(0),
            leveled_attempts: AtomicUsize::new(0),
        }
    }

    /// 让指定入口的注册返回 `status`。
    pub fn failing(mut self, entry: EntryPoint, status: c_int) -> Self {
        match entry {
            EntryPoint::Unleveled => self.unleveled_status = status,
            EntryPoint::Leveled => self.leveled_status = status,
        }
        self
    }

    pub fn has_callback(&self, entry: EntryPoint) -> bool {
        match entry {
            EntryPoint::Unleveled => self.unleveled.lock().is_some(),
            EntryPoint::Leveled => self.leveled.lock().is_some(),
        }
    }

    /// 指定入口收到的注册调用次数，失败的调用同样计数。
    pub fn registration_attempts(&self, entry: EntryPoint) -> usize {
        match entry {
            EntryPoint::Unleveled => self.unleveled_attempts.load(Ordering::SeqCst),
            EntryPoint::Leveled => self.leveled_attempts.load(Ordering::SeqCst),
        }
    }

    /// 以带级别回调输出一条消息；文本中的 NUL 字节会被去掉。
    pub fn emit_leveled(&self, level: c_int, message: &str) -> bool {
        let Some(callback) = *self.leveled.lock() else {
            return false;
        };
        let text = c_string(message);
        // SAFETY: `text` 在调用期间存活且以 NUL 结尾，满足回调契约。
        unsafe { callback(level, text.as_ptr()) };
        true
    }

    /// 以带级别回调传入空指针。
    pub fn emit_leveled_null(&self, level: c_int) -> bool {
        let Some(callback) = *self.leveled.lock() else {
            return false;
        };
        // SAFETY: 回调契约允许空指针。
        unsafe { callback(level, ptr::null()) };
        true
    }

    /// 以无级别回调输出一段文本。
    pub fn emit_unleveled(&self, chunk: &str) -> bool {
        let Some(callback) = *self.unleveled.lock() else {
            return false;
        };
        let text = c_string(chunk);
        // SAFETY: 同 `emit_leveled`。
        unsafe { callback(text.as_ptr()) };
        true
    }

    /// 按“前缀、正文、换行”三次回调输出一行。
    pub fn emit_unleveled_line(&self, body: &str) -> bool {
        self.emit_unleveled(LEGACY_PREFIX) && self.emit_unleveled(body) && self.emit_unleveled("\n")
    }

    /// 模拟一次训练：`workers` 个工作线程并发输出日志。
    ///
    /// 每个线程经带级别通道输出 [`TRAINING_INFO`] 与 [`TRAINING_WARNING`] 各一条，
    /// 并经旧式通道输出一行分块消息。
    pub fn run_training(&self, workers: usize) {
        thread::scope(|scope| {
            for worker in 0..workers {
                scope.spawn(move || {
                    self.emit_leveled(SeverityLevel::Info.wire(), TRAINING_INFO);
                    self.emit_leveled(SeverityLevel::Warning.wire(), TRAINING_WARNING);
                    self.emit_unleveled_line(&format!("worker {worker} finished"));
                });
            }
        });
    }
}

impl NativeLogApi for SimulatedNative {
    fn register_log_callback(&self, callback: LogCallback) -> c_int {
        self.unleveled_attempts.fetch_add(1, Ordering::SeqCst);
        if self.unleveled_status == STATUS_OK {
            *self.unleveled.lock() = Some(callback);
        }
        self.unleveled_status
    }

    fn register_log_callback_with_level(&self, callback: LeveledLogCallback) -> c_int {
        self.leveled_attempts.fetch_add(1, Ordering::SeqCst);
        if self.leveled_status == STATUS_OK {
            *self.leveled.lock() = Some(callback);
        }
        self.leveled_status
    }
}

fn c_string(text: &str) -> CString {
    let bytes: Vec<u8> = text.bytes().filter(|byte| *byte != 0).collect();
    CString::new(bytes).unwrap_or_default()
}
