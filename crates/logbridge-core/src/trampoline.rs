//! 交给原生库的两个 `extern "C"` 入口。
//!
//! # 设计背景（Why）
//! - 原生库只保存函数指针，不携带任何上下文；蹦床需要一个进程级目标来找到注册表；
//! - 原生库在注册后终身持有这两个指针，因此蹦床一经绑定不再解绑，替换 Sink 只发生在注册表内部。
//!
//! # 逻辑解析（How）
//! - [`bind`] 把 `Arc<SinkRegistry>` 写入一次性单元；同一个注册表可重复绑定，其他注册表被拒绝；
//! - 每个入口都包裹在 `catch_unwind` 中：空指针记为丢弃，其余交给注册表的 `dispatch_*`。
//!
//! # 契约说明（What）
//! - 蹦床永不回卷进原生调用栈，也不向原生库返回任何值；
//! - 绑定之前到达的消息被静默丢弃。

#![allow(unsafe_code)]

use std::ffi::{CStr, c_char, c_int};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};

use crate::assembler::DecodeAnomaly;
use crate::error::BridgeError;
use crate::registry::SinkRegistry;

static TARGET: OnceLock<Arc<SinkRegistry>> = OnceLock::new();

/// 把蹦床绑定到 `registry`。
///
/// 必须在把蹦床交给原生库之前调用；[`NativeBridge::initialize`](crate::NativeBridge::initialize)
/// 会自动完成这一步。
pub fn bind(registry: Arc<SinkRegistry>) -> Result<(), BridgeError> {
    let bound = TARGET.get_or_init(|| Arc::clone(&registry));
    if Arc::ptr_eq(bound, &registry) {
        Ok(())
    } else {
        Err(BridgeError::TargetAlreadyBound)
    }
}

/// 无级别回调入口。
///
/// # Safety
/// `message` 为空，或指向在本次调用期间有效、以 NUL 结尾的字节序列。
pub unsafe extern "C" fn log_trampoline(message: *const c_char) {
    let _ = panic::catch_unwind(AssertUnwindSafe(|| {
        let Some(registry) = TARGET.get() else {
            return;
        };
        if message.is_null() {
            registry.record_anomaly(DecodeAnomaly::NullPointer);
            return;
        }
        // SAFETY: 非空且满足调用方契约。
        let raw = unsafe { CStr::from_ptr(message) };
        registry.dispatch_legacy(raw.to_bytes());
    }));
}

/// 带级别回调入口。
///
/// # Safety
/// 同 [`log_trampoline`]；`level` 可以是任意整数。
pub unsafe extern "C" fn leveled_log_trampoline(level: c_int, message: *const c_char) {
    let _ = panic::catch_unwind(AssertUnwindSafe(|| {
        let Some(registry) = TARGET.get() else {
            return;
        };
        if message.is_null() {
            registry.record_anomaly(DecodeAnomaly::NullPointer);
            return;
        }
        // SAFETY: 同上。
        let raw = unsafe { CStr::from_ptr(message) };
        registry.dispatch_leveled(level, raw.to_bytes());
    }));
}
