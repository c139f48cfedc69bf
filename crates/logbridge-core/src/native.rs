//! 原生注册 ABI 的抽象与一次性初始化。
//!
//! # 设计背景（Why）
//! - 原生库暴露两个注册入口，各接收一个回调函数指针并返回整数状态码（`0` 表示成功）；
//! - 宿主通常在加载库时初始化一次，此后原生库终身持有蹦床指针。
//!
//! # 逻辑解析（How）
//! - [`NativeLogApi`] 把两个注册入口抽象为 trait：真实库由 [`ExternLogApi`] 包装函数指针，
//!   测试由 [`SimulatedNative`](crate::test_stubs::SimulatedNative) 在进程内模拟；
//! - [`NativeBridge::initialize`] 先绑定蹦床目标，再依次注册两个入口，任一入口失败即返回错误。
//!
//! # 契约说明（What）
//! - 初始化成功后再次调用（同一注册表）直接返回已有的桥接句柄，不会重复注册；
//! - 初始化失败可以用同一注册表重试；换用其他注册表会得到
//!   [`BridgeError::TargetAlreadyBound`]。

#![allow(unsafe_code)]

use std::ffi::{c_char, c_int};
use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::error::{BridgeError, EntryPoint};
use crate::registry::SinkRegistry;
use crate::trampoline;

/// 无级别回调签名：`void (*)(const char*)`。
pub type LogCallback = unsafe extern "C" fn(message: *const c_char);

/// 带级别回调签名：`void (*)(int, const char*)`。
pub type LeveledLogCallback = unsafe extern "C" fn(level: c_int, message: *const c_char);

/// 原生注册入口约定的成功状态码。
pub const STATUS_OK: c_int = 0;

/// 原生库的日志注册入口。
pub trait NativeLogApi {
    fn register_log_callback(&self, callback: LogCallback) -> c_int;
    fn register_log_callback_with_level(&self, callback: LeveledLogCallback) -> c_int;
}

/// 无级别注册入口的 C 签名。
pub type RegisterLogCallbackFn = unsafe extern "C" fn(callback: LogCallback) -> c_int;

/// 带级别注册入口的 C 签名。
pub type RegisterLeveledLogCallbackFn =
    unsafe extern "C" fn(callback: LeveledLogCallback) -> c_int;

/// 由动态加载得到的注册入口函数指针。
#[derive(Clone, Copy)]
pub struct ExternLogApi {
    register: RegisterLogCallbackFn,
    register_with_level: RegisterLeveledLogCallbackFn,
}

impl ExternLogApi {
    /// # Safety
    /// 两个指针必须指向原生库中签名完全一致的注册函数，且在进程剩余生命周期内保持有效。
    pub unsafe fn new(
        register: RegisterLogCallbackFn,
        register_with_level: RegisterLeveledLogCallbackFn,
    ) -> Self {
        Self {
            register,
            register_with_level,
        }
    }
}

impl fmt::Debug for ExternLogApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternLogApi")
            .field("register", &(self.register as *const ()))
            .field("register_with_level", &(self.register_with_level as *const ()))
            .finish()
    }
}

impl NativeLogApi for ExternLogApi {
    fn register_log_callback(&self, callback: LogCallback) -> c_int {
        // SAFETY: `new` 的调用方保证指针有效且签名一致。
        unsafe { (self.register)(callback) }
    }

    fn register_log_callback_with_level(&self, callback: LeveledLogCallback) -> c_int {
        // SAFETY: 同上。
        unsafe { (self.register_with_level)(callback) }
    }
}

static BRIDGE: OnceLock<NativeBridge> = OnceLock::new();
static INIT: Mutex<()> = parking_lot::const_mutex(());

/// 已完成原生注册的桥接句柄，进程内唯一。
#[derive(Debug)]
pub struct NativeBridge {
    registry: Arc<SinkRegistry>,
}

impl NativeBridge {
    /// 绑定蹦床并向原生库注册两个回调。
    ///
    /// # 教案式说明
    /// - **意图（Why）**：把“绑定目标 → 注册无级别 → 注册带级别”固定为一个不可拆分的步骤，
    ///   避免宿主遗漏其中任何一步；
    /// - **逻辑（How）**：双重检查 `OnceLock`，初始化过程由一把全局锁串行化；
    /// - **契约（What）**：返回 `Err` 时不会记录桥接句柄，原生日志可能只接通了一部分，
    ///   调用方应视为初始化失败；
    /// - **重试**：失败后再次调用会从头注册两个入口，包括上次已成功的入口。原生库对同一入口
    ///   只保存最后一次注册的指针，而两次交出的都是同一个蹦床，因此重复注册不会产生重复投递。
    pub fn initialize(
        api: &dyn NativeLogApi,
        registry: Arc<SinkRegistry>,
    ) -> Result<&'static NativeBridge, BridgeError> {
        if let Some(bridge) = existing(&registry)? {
            return Ok(bridge);
        }

        let _guard = INIT.lock();
        if let Some(bridge) = existing(&registry)? {
            return Ok(bridge);
        }

        trampoline::bind(Arc::clone(&registry))?;
        register(
            EntryPoint::Unleveled,
            api.register_log_callback(trampoline::log_trampoline),
        )?;
        register(
            EntryPoint::Leveled,
            api.register_log_callback_with_level(trampoline::leveled_log_trampoline),
        )?;

        tracing::info!("native log callbacks registered");
        Ok(BRIDGE.get_or_init(|| NativeBridge { registry }))
    }

    /// 已初始化的桥接句柄。
    pub fn get() -> Option<&'static NativeBridge> {
        BRIDGE.get()
    }

    pub fn registry(&self) -> &Arc<SinkRegistry> {
        &self.registry
    }
}

fn existing(registry: &Arc<SinkRegistry>) -> Result<Option<&'static NativeBridge>, BridgeError> {
    match BRIDGE.get() {
        Some(bridge) if Arc::ptr_eq(&bridge.registry, registry) => Ok(Some(bridge)),
        Some(_) => Err(BridgeError::TargetAlreadyBound),
        None => Ok(None),
    }
}

fn register(entry: EntryPoint, status: c_int) -> Result<(), BridgeError> {
    if status == STATUS_OK {
        tracing::debug!(%entry, "native registration succeeded");
        Ok(())
    } else {
        tracing::error!(%entry, status, "native registration failed");
        Err(BridgeError::Registration { entry, status })
    }
}
